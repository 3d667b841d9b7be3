//! Build decisions and build-site countdowns.

use flotilla_core::{
    AdmiralId, Attributes, BaseId, BuildFlags, Event, Fixed, ObjectId, RandomSource,
};
use flotilla_system_actions::Interpreter;
use flotilla_world::{DestinationId, InvariantError, SpawnRequest, World};
use tracing::{debug, info};

/// Attempts at picking an acceptable class per think.
pub const BUILD_ATTEMPTS: usize = 7;

/// Countdown removed from every build site per major tick.
pub const BUILD_STEP: i32 = 10;

/// Counts every build site down, launches finished builds and pays income.
pub(crate) fn progress_sites(
    world: &mut World,
    interpreter: &mut Interpreter,
    out: &mut Vec<Event>,
) -> Result<(), InvariantError> {
    let records: Vec<DestinationId> = world.destinations().map(|(id, _)| id).collect();
    for record in records {
        let Some(site) = world.destination_mut(record) else {
            continue;
        };
        site.build_time = site.build_time.saturating_sub(BUILD_STEP);
        let finished = if site.build_time <= 0 {
            site.build_time = 0;
            site.build_object.take()
        } else {
            None
        };
        let (holder, earn) = (site.object, site.earn);

        if let Some(base) = finished {
            launch(world, interpreter, holder, base, out)?;
        }
        if let Some(owner) = world.object(holder).and_then(|object| object.owner) {
            if let Some(state) = world.admiral_mut(owner) {
                state.pay(earn);
            }
        }
    }
    Ok(())
}

fn launch(
    world: &mut World,
    interpreter: &mut Interpreter,
    holder: ObjectId,
    base: BaseId,
    out: &mut Vec<Event>,
) -> Result<(), InvariantError> {
    let Some((location, Some(admiral))) = world
        .object(holder)
        .map(|object| (object.location, object.owner))
    else {
        debug!(?holder, base = base.get(), "finished build has no owner");
        return Ok(());
    };
    let request = SpawnRequest::new(base, location).owned_by(Some(admiral));
    let Some(object) = interpreter.spawn_object(world, request, out)? else {
        return Ok(());
    };
    world.set_object_destination(object, None, out);
    info!(admiral = admiral.get(), base = base.get(), ?object, "build completed");
    out.push(Event::BuildCompleted {
        admiral,
        object,
        base,
    });
    Ok(())
}

/// Spends savings: picks a site and a class, then builds or saves up for it.
pub(crate) fn consider_building(world: &mut World, admiral: AdmiralId, out: &mut Vec<Event>) {
    let Some(state) = world.admiral_mut(admiral) else {
        return;
    };
    if state.cash <= state.save_goal {
        return;
    }
    state.save_goal = Fixed::ZERO;

    let site = next_site(world, admiral);
    if let Some(state) = world.admiral_mut(admiral) {
        state.build_at = site.or(state.build_at);
    }
    let Some(site) = site else {
        return;
    };
    if world
        .destination(site)
        .map_or(true, |destination| destination.build_time > 0)
    {
        return;
    }

    if world
        .admiral(admiral)
        .is_some_and(|state| state.hope_to_build.is_none())
    {
        let mut attempts = 0;
        let mut hope = None;
        while hope.is_none() && attempts < BUILD_ATTEMPTS {
            attempts += 1;
            hope = choose(world, admiral);
        }
        if let Some(state) = world.admiral_mut(admiral) {
            state.hope_to_build = hope;
        }
    }

    if !world.has_room_for_ships() {
        debug!(admiral = admiral.get(), "no room for another ship");
        return;
    }
    let level = world.level_arc();
    let Some(hope) = world.admiral(admiral).and_then(|state| state.hope_to_build) else {
        return;
    };
    let offered = world
        .destination(site)
        .is_some_and(|destination| destination.can_build.contains(&hope));
    if !offered {
        return;
    }
    let Some(price) = level.template(hope).map(|template| Fixed::from_int(template.price)) else {
        return;
    };
    let cash = world.admiral(admiral).map_or(Fixed::ZERO, |state| state.cash);
    if cash >= price {
        if world.schedule_build(admiral, site, hope, out) {
            if let Some(state) = world.admiral_mut(admiral) {
                state.hope_to_build = None;
                state.save_goal = Fixed::ZERO;
            }
        }
    } else if let Some(state) = world.admiral_mut(admiral) {
        state.save_goal = price;
    }
}

/// Next owned record after the current build site that can accept builds.
fn next_site(world: &World, admiral: AdmiralId) -> Option<DestinationId> {
    let capacity = world.config().destination_capacity();
    if capacity == 0 {
        return None;
    }
    let start = world
        .admiral(admiral)
        .and_then(|state| state.build_at)
        .map_or(0, DestinationId::index);
    (1..=capacity)
        .map(|step| (start + step) % capacity)
        .filter_map(|index| u16::try_from(index).ok().map(DestinationId::new))
        .find(|&record| {
            world
                .destination(record)
                .and_then(|destination| world.object(destination.object))
                .is_some_and(|holder| {
                    holder.owner == Some(admiral)
                        && holder.attributes.contains(Attributes::CAN_ACCEPT_BUILD)
                })
        })
}

/// Draws a class from the weighted build table and checks its preconditions.
fn choose(world: &mut World, admiral: AdmiralId) -> Option<BaseId> {
    let total = world.admiral(admiral)?.total_build_chance;
    let roll = Fixed::from_raw(world.random_mut().next(total.raw()));
    let choice = world.admiral(admiral)?.build_choice(roll)?;
    let level = world.level_arc();
    let template = level.template(choice)?;

    if template.build_flags.contains(BuildFlags::SUFFICIENT_ESCORTS_EXIST) {
        let unescorted = world.objects().alive().any(|(_, object)| {
            object.is_in_use()
                && object.owner == Some(admiral)
                && object.base == choice
                && object.escort_strength < template.friend_deficit
        });
        if unescorted {
            return None;
        }
    }
    if template.build_flags.contains(BuildFlags::MATCHING_FOE_EXISTS) {
        let matched = world.objects().alive().any(|(_, object)| {
            object.is_in_use()
                && object.owner != Some(admiral)
                && level
                    .template(object.base)
                    .is_some_and(|foe| foe.level_key_tag == template.order_key_tag)
        });
        if !matched {
            return None;
        }
    }
    Some(choice)
}
