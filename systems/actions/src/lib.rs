#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Verb interpreter that executes the data-driven action lists of a level.
//!
//! Every effect in a scenario (weapon shots, explosions, captures, score
//! changes, victory) is an [`Action`] run by [`Interpreter::exec`] with a
//! subject and an optional direct object. The interpreter also owns the
//! object lifecycle helpers that run action lists as a side effect:
//! creating objects, destroying them, applying damage, firing weapons and
//! the per-tick aging pass.

mod alter;
mod lifecycle;

use flotilla_core::{
    Action, ActionFilter, ActionRange, Attributes, CreateObject, DieKind, Event, Fixed,
    FixedPoint, InitialId, ObjectId, OwnerFilter, Point, RandomSource, RuntimeFlags, Verb,
    WeaponSlot, ENERGY_POD_AMOUNT,
};
use flotilla_world::{
    InvariantError, ObjectState, Outcome, Presence, QueuedActions, SpawnRequest, World,
    TIME_TO_CHECK_HOME,
};
use tracing::{debug, info, warn};

/// Deepest chain of action lists that may run inside one another.
pub const MAX_NESTING: u32 = 16;

/// Executes action lists against a world.
#[derive(Debug, Default)]
pub struct Interpreter {
    depth: u32,
    handles: Vec<ObjectId>,
    followers: Vec<ObjectId>,
}

impl Interpreter {
    /// Creates an interpreter with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs an action list for a subject and an optional direct object.
    ///
    /// A delayed action queues the rest of the list and stops. Creation
    /// verbs place their products at `offset` from the focus.
    pub fn exec(
        &mut self,
        world: &mut World,
        actions: ActionRange,
        subject: ObjectId,
        direct: ObjectId,
        offset: Option<Point>,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        self.run(world, actions, subject, direct, offset, true, out)
    }

    /// Advances the delayed queue and runs every entry that became due.
    ///
    /// Entries whose subject or direct object was freed meanwhile are dropped.
    pub fn run_queue(
        &mut self,
        world: &mut World,
        ticks: i32,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        world.queue_mut().advance(ticks);
        while let Some(entry) = world.queue_mut().pop_due() {
            let current = |id: ObjectId| id.is_none() || world.objects().is_current(id);
            if !current(entry.subject) || !current(entry.direct) {
                debug!(start = entry.actions.start(), "dropping delayed actions of a freed object");
                continue;
            }
            self.run(
                world,
                entry.actions,
                entry.subject,
                entry.direct,
                entry.offset,
                false,
                out,
            )?;
        }
        Ok(())
    }

    /// Ages every object and fires periodic activate lists.
    ///
    /// Objects whose age runs out are marked for removal unless their
    /// template says otherwise, then run their expire list.
    pub fn upkeep(
        &mut self,
        world: &mut World,
        ticks: i32,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = world.level_arc();
        let mut handles = std::mem::take(&mut self.handles);
        world.objects().alive_handles(&mut handles);

        let mut result = Ok(());
        for &id in &handles {
            let Some(object) = world.object_mut(id) else {
                continue;
            };
            if !object.is_in_use() {
                continue;
            }
            let Some(template) = level.template(object.base) else {
                continue;
            };

            let mut expired = false;
            if object.age >= 0 {
                object.age -= ticks;
                if object.age < 0 {
                    expired = true;
                    if !template.expire_dont_die {
                        object.state = ObjectState::ToBeFreed;
                    }
                }
            }

            let mut activate = false;
            if object.periodic_time > 0 {
                object.periodic_time -= 1;
                if object.periodic_time <= 0 {
                    activate = true;
                    object.periodic_time = template.activate_period
                        + object.random.next(template.activate_period_range);
                }
            }

            if expired {
                out.push(Event::ObjectExpired { object: id });
                result = self.exec(world, template.actions.expire, id, ObjectId::none(), None, out);
                if result.is_err() {
                    break;
                }
            }
            if activate {
                result =
                    self.exec(world, template.actions.activate, id, ObjectId::none(), None, out);
                if result.is_err() {
                    break;
                }
            }
        }

        self.handles = handles;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &mut self,
        world: &mut World,
        actions: ActionRange,
        subject: ObjectId,
        direct: ObjectId,
        offset: Option<Point>,
        allow_delay: bool,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        if actions.is_empty() {
            return Ok(());
        }
        if self.depth >= MAX_NESTING {
            warn!(
                start = actions.start(),
                depth = self.depth,
                "action lists nested too deeply"
            );
            return Ok(());
        }
        self.depth += 1;
        let result = self.run_list(world, actions, subject, direct, offset, allow_delay, out);
        self.depth -= 1;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_list(
        &mut self,
        world: &mut World,
        actions: ActionRange,
        original_subject: ObjectId,
        original_direct: ObjectId,
        offset: Option<Point>,
        mut allow_delay: bool,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = world.level_arc();
        let mut recheck = false;

        for (position, action) in level.action_slice(actions).iter().enumerate() {
            if matches!(action.verb, Verb::NoAction) {
                break;
            }

            let subject = action
                .initial_subject_override
                .map_or(original_subject, |initial| live_initial(world, initial));
            let direct = action
                .initial_direct_override
                .map_or(original_direct, |initial| live_initial(world, initial));

            if action.delay > 0 && allow_delay {
                let rest = actions.skip(u32::try_from(position).unwrap_or(u32::MAX));
                let queued = world.queue_mut().push(QueuedActions {
                    actions: rest,
                    time: action.delay,
                    subject,
                    direct,
                    offset,
                });
                if !queued {
                    warn!(
                        start = rest.start(),
                        capacity = world.queue().capacity(),
                        "action queue full, dropping delayed actions"
                    );
                }
                return Ok(());
            }
            allow_delay = true;

            let focus = if action.reflexive || world.object(direct).is_none() {
                subject
            } else {
                direct
            };

            if !owner_filter_passes(world, action.owner, subject, direct)
                || !filter_passes(world, &action.filter, direct)
            {
                continue;
            }

            self.dispatch(world, action, Targets { subject, direct, focus }, offset, out)?;
            if matches!(
                action.verb,
                Verb::ChangeScore { .. } | Verb::DisplayMessage { .. }
            ) {
                recheck = true;
            }
        }

        if recheck {
            world.request_condition_recheck();
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        world: &mut World,
        action: &Action,
        targets: Targets,
        offset: Option<Point>,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Targets { subject, focus, .. } = targets;
        match action.verb {
            Verb::NoAction => {}
            Verb::CreateObject(create) => {
                self.create_object(world, action, &create, false, targets, offset, out)?;
            }
            Verb::CreateObjectSetDest(create) => {
                self.create_object(world, action, &create, true, targets, offset, out)?;
            }
            Verb::PlaySound {
                priority,
                persistence,
                absolute,
                volume,
                id_minimum,
                id_range,
            } => {
                let Some(source) = world.object_mut(focus) else {
                    return Ok(());
                };
                let mut id = id_minimum;
                if id_range > 0 {
                    id += source.random.next(id_range + 1);
                }
                out.push(Event::SoundRequested {
                    id,
                    volume,
                    priority,
                    persistence,
                    source: (!absolute).then_some(focus),
                });
            }
            Verb::Alter(alter) => self.alter(world, action, &alter, targets, out)?,
            Verb::MakeSparks {
                count,
                speed,
                velocity_range,
                color,
            } => {
                if let Some(source) = world.object(focus) {
                    out.push(Event::SparksRequested {
                        at: source.location,
                        count,
                        speed,
                        velocity_range,
                        color,
                    });
                }
            }
            Verb::ReleaseEnergy { percent } => self.release_energy(world, focus, percent, out)?,
            Verb::LandAt { speed } => {
                if let Some(object) = world.object_mut(subject) {
                    object.presence = Presence::Landing { speed };
                    out.push(Event::LandingStarted { object: subject });
                }
            }
            Verb::EnterWarp { speed } => self.enter_warp(world, subject, speed, out)?,
            Verb::DisplayMessage { resource, pages } => {
                world.start_message(resource);
                out.push(Event::MessageStarted { resource, pages });
            }
            Verb::ChangeScore {
                admiral,
                which,
                amount,
            } => {
                let admiral = admiral.or_else(|| world.object(focus).and_then(|o| o.owner));
                if let Some(admiral) = admiral {
                    let score = world
                        .admiral_mut(admiral)
                        .and_then(|state| state.alter_score(which, amount));
                    if let Some(score) = score {
                        out.push(Event::ScoreChanged {
                            admiral,
                            which,
                            score,
                        });
                    }
                }
            }
            Verb::DeclareWinner {
                admiral,
                next_level,
                text,
            } => {
                let winner = admiral.or_else(|| world.object(focus).and_then(|o| o.owner));
                info!(winner = ?winner, ?next_level, "winner declared");
                world.declare_winner(Outcome {
                    winner,
                    next_level,
                    text,
                });
                out.push(Event::WinnerDeclared {
                    winner,
                    next_level,
                    text,
                });
            }
            Verb::Die(kind) => match kind {
                DieKind::None => world.mark_to_be_freed(focus),
                DieKind::Expire => {
                    if world.object(subject).is_some() {
                        world.mark_to_be_freed(subject);
                        out.push(Event::ObjectExpired { object: subject });
                    }
                }
                DieKind::Destroy => {
                    if world.object(subject).is_some() {
                        self.destroy(world, subject, None, out)?;
                    }
                }
            },
            Verb::SetDestination => {
                if world.object(focus).is_some() {
                    world.override_object_destination(subject, focus, out);
                }
            }
            Verb::ActivateSpecial => {
                self.fire_weapon(world, subject, ObjectId::none(), WeaponSlot::Special, out)?;
            }
            Verb::ActivatePulse => {
                self.fire_weapon(world, subject, ObjectId::none(), WeaponSlot::Pulse, out)?;
            }
            Verb::ActivateBeam => {
                self.fire_weapon(world, subject, ObjectId::none(), WeaponSlot::Beam, out)?;
            }
            Verb::ColorFlash {
                length,
                color,
                shade,
            } => out.push(Event::ColorFlash {
                length,
                color,
                shade,
            }),
            Verb::NilTarget => {
                if let Some(object) = world.object_mut(focus) {
                    object.target = ObjectId::none();
                }
            }
            Verb::DisableKeys(keys) => {
                let disabled = world.disabled_keys() | keys;
                world.set_disabled_keys(disabled);
                out.push(Event::KeyMaskChanged { disabled });
            }
            Verb::EnableKeys(keys) => {
                let disabled = world.disabled_keys() & !keys;
                world.set_disabled_keys(disabled);
                out.push(Event::KeyMaskChanged { disabled });
            }
            Verb::SetZoom(level) => {
                if level != world.zoom() {
                    world.set_zoom(level);
                    out.push(Event::ZoomChanged { level });
                }
            }
            Verb::ComputerSelect { screen, line } => {
                world.select_computer(screen, line);
                out.push(Event::ComputerSelected { screen, line });
            }
            Verb::AssumeInitialObject(which) => {
                let first_admiral = world.admiral_ids().next();
                let shift = first_admiral
                    .and_then(|admiral| world.admiral(admiral))
                    .map_or(0, |state| state.scores[0]);
                if let Ok(index) = u16::try_from(which.saturating_add(shift)) {
                    let initial = InitialId::new(index);
                    if usize::from(index) < world.level().initial_objects.len() {
                        world.bind_initial(initial, focus);
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn create_object(
        &mut self,
        world: &mut World,
        action: &Action,
        create: &CreateObject,
        set_dest: bool,
        targets: Targets,
        offset: Option<Point>,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Targets { subject, focus, .. } = targets;
        let level = world.level_arc();
        let Some(template) = level.template(create.base) else {
            return Ok(());
        };
        let subject_angle = world.object(subject).map_or(0, |object| object.target_angle);

        let Some(source) = world.object_mut(focus) else {
            return Ok(());
        };
        let mut count = create.how_many_minimum;
        if create.how_many_range > 0 {
            count += source.random.next(create.how_many_range);
        }

        for _ in 0..count {
            let Some(source) = world.object_mut(focus) else {
                break;
            };
            let velocity = if create.velocity_relative {
                source.velocity
            } else {
                FixedPoint::ZERO
            };
            let direction = if template.attributes.contains(Attributes::AUTO_TARGET) {
                subject_angle
            } else if create.direction_relative {
                source.direction
            } else {
                0
            };
            let mut at = source.location;
            if let Some(offset) = offset {
                at = at.offset(offset);
            }
            let distance = create.random_distance;
            if distance > 0 {
                let h = source.random.next(distance * 2) - distance;
                let v = source.random.next(distance * 2) - distance;
                at = at.offset(Point::new(h, v));
            }
            let owner = source.owner;
            let inherited_target = source.target;
            let focus_dest = source.dest;

            let request = SpawnRequest::new(create.base, at)
                .with_velocity(velocity)
                .with_direction(direction)
                .owned_by(owner);
            let Some(product) = self.spawn_object(world, request, out)? else {
                continue;
            };

            let accepts = world.object(product).is_some_and(|object| {
                object
                    .attributes
                    .contains(Attributes::CAN_ACCEPT_DESTINATION)
            });
            if accepts && action.reflexive {
                if owner.is_some() {
                    if !set_dest {
                        world.override_object_destination(product, focus, out);
                    } else if world.object(focus_dest).is_some() {
                        world.override_object_destination(product, focus_dest, out);
                    }
                } else if let Some(object) = world.object_mut(product) {
                    object.dest = focus;
                    object.time_from_origin = TIME_TO_CHECK_HOME;
                    object.runtime.remove(RuntimeFlags::HAS_ARRIVED);
                }
            }
            if let Some(object) = world.object_mut(product) {
                object.target = inherited_target;
                object.closest = inherited_target;
            }
        }
        Ok(())
    }

    fn release_energy(
        &mut self,
        world: &mut World,
        focus: ObjectId,
        percent: Fixed,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Some(source) = world.object(focus) else {
            return Ok(());
        };
        let amount = Fixed::from_int(source.energy)
            .mul(percent)
            .to_int()
            .clamp(0, source.energy);
        let (location, velocity, direction) = (source.location, source.velocity, source.direction);
        world.alter_energy(focus, -amount);
        self.scatter_energy(world, amount / ENERGY_POD_AMOUNT, location, velocity, direction, out)
    }

    /// Sends an object into warp at `speed` and places the level's warp flare.
    pub fn enter_warp(
        &mut self,
        world: &mut World,
        subject: ObjectId,
        speed: Fixed,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Some(object) = world.object_mut(subject) else {
            return Ok(());
        };
        object.presence = Presence::Warping { speed };
        object.attributes.remove(Attributes::OCCUPIES_SPACE);
        let (location, direction) = (object.location, object.direction);
        out.push(Event::WarpEntered { object: subject });

        if let Some(flare) = world.level().warp_flare {
            let request =
                SpawnRequest::new(flare, location).with_direction(direction);
            let _ = self.spawn_object(world, request, out)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Targets {
    subject: ObjectId,
    direct: ObjectId,
    focus: ObjectId,
}

fn live_initial(world: &World, initial: InitialId) -> ObjectId {
    let id = world.initial_object(initial);
    if world.object(id).is_some_and(|object| object.is_in_use()) {
        id
    } else {
        ObjectId::none()
    }
}

fn owner_filter_passes(
    world: &World,
    filter: OwnerFilter,
    subject: ObjectId,
    direct: ObjectId,
) -> bool {
    let (Some(subject), Some(direct)) = (world.object(subject), world.object(direct)) else {
        return true;
    };
    match filter {
        OwnerFilter::Any => true,
        OwnerFilter::Same => subject.owner == direct.owner,
        OwnerFilter::Different => subject.owner != direct.owner,
        OwnerFilter::Never => false,
    }
}

fn filter_passes(world: &World, filter: &ActionFilter, direct: ObjectId) -> bool {
    if !filter.is_active() {
        return true;
    }
    let Some(direct) = world.object(direct) else {
        return false;
    };
    match *filter {
        ActionFilter::None => true,
        ActionFilter::Attributes {
            inclusive,
            exclusive,
        } => direct.attributes.contains(inclusive) && !direct.attributes.intersects(exclusive),
        ActionFilter::LevelKeyTag(tag) => direct.level_key_tag == tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        AdmiralId, AdmiralSetup, Alter, AlterKind, BaseId, BaseObject, Coord, KeyTag, Level,
        LevelBuilder, WeaponStats,
    };
    use flotilla_world::Config;

    fn world_of(level: Level) -> World {
        World::from_level(level, Config::default()).expect("valid level")
    }

    fn place(world: &mut World, base: BaseId, owner: Option<AdmiralId>) -> ObjectId {
        let mut out = Vec::new();
        world
            .spawn(
                SpawnRequest::new(base, Coord::from_center(0, 0)).owned_by(owner),
                &mut out,
            )
            .expect("room in the pool")
    }

    #[test]
    fn attribute_filters_need_every_inclusive_bit_and_no_exclusive_bit() {
        let mut builder = LevelBuilder::new("filters");
        let mut hull = BaseObject::named("Hull");
        hull.attributes = Attributes::CAN_BE_HIT | Attributes::CAN_TURN;
        let hull = builder.add_template(hull);
        let mut shielded = BaseObject::named("Shielded");
        shielded.attributes = Attributes::CAN_BE_HIT | Attributes::HATED;
        let shielded = builder.add_template(shielded);
        let age = Verb::Alter(Alter::set(AlterKind::Age, 77));
        let list = builder.push_actions([Action::new(age).with_filter(ActionFilter::Attributes {
            inclusive: Attributes::CAN_BE_HIT,
            exclusive: Attributes::HATED,
        })]);
        let mut world = world_of(builder.build());
        let subject = place(&mut world, hull, None);
        let plain = place(&mut world, hull, None);
        let hated = place(&mut world, shielded, None);

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        interpreter
            .exec(&mut world, list, subject, plain, None, &mut out)
            .expect("runs");
        interpreter
            .exec(&mut world, list, subject, hated, None, &mut out)
            .expect("runs");

        assert_eq!(world.object(plain).map(|o| o.age), Some(77));
        assert_eq!(world.object(hated).map(|o| o.age), Some(-1));
    }

    #[test]
    fn key_tag_and_owner_filters_compare_against_the_direct_object() {
        let mut builder = LevelBuilder::new("tags");
        let mut tagged = BaseObject::named("Tagged");
        tagged.level_key_tag = KeyTag::new(4);
        let tagged = builder.add_template(tagged);
        let plain = builder.add_template(BaseObject::named("Plain"));
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let blue = builder.add_admiral(AdmiralSetup::computer("Blue"));
        let age = Verb::Alter(Alter::set(AlterKind::Age, 5));
        let by_tag = builder
            .push_actions([Action::new(age).with_filter(ActionFilter::LevelKeyTag(KeyTag::new(4)))]);
        let by_owner = builder.push_actions([Action::new(age).with_owner(OwnerFilter::Different)]);
        let mut world = world_of(builder.build());
        let subject = place(&mut world, plain, Some(red));
        let matching = place(&mut world, tagged, Some(red));
        let other = place(&mut world, plain, Some(blue));
        let friend = place(&mut world, plain, Some(red));

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        for direct in [matching, other] {
            interpreter
                .exec(&mut world, by_tag, subject, direct, None, &mut out)
                .expect("runs");
        }
        for direct in [other, friend] {
            interpreter
                .exec(&mut world, by_owner, subject, direct, None, &mut out)
                .expect("runs");
        }

        assert_eq!(world.object(matching).map(|o| o.age), Some(5));
        assert_eq!(world.object(other).map(|o| o.age), Some(5));
        assert_eq!(world.object(friend).map(|o| o.age), Some(-1));
    }

    #[test]
    fn create_object_places_the_exact_count_of_distinct_products() {
        let mut builder = LevelBuilder::new("spawn");
        let rock = builder.add_template(BaseObject::named("Rock"));
        let shard = builder.add_template(BaseObject::named("Shard"));
        let list = builder.push_actions([Action::new(Verb::CreateObject(CreateObject::new(
            shard, 2,
        )))]);
        let mut world = world_of(builder.build());
        let subject = place(&mut world, rock, None);

        let mut out = Vec::new();
        Interpreter::new()
            .exec(&mut world, list, subject, ObjectId::none(), None, &mut out)
            .expect("runs");

        let products: Vec<ObjectId> = world
            .objects()
            .alive()
            .filter(|(_, object)| object.base == shard)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(products.len(), 2);
        assert_ne!(products[0], products[1]);
        let created = out
            .iter()
            .filter(|event| matches!(event, Event::ObjectCreated { base, .. } if *base == shard))
            .count();
        assert_eq!(created, 2);
    }

    #[test]
    fn delayed_actions_wait_in_the_queue_until_due() {
        let mut builder = LevelBuilder::new("delay");
        let rock = builder.add_template(BaseObject::named("Rock"));
        let list = builder.push_actions([
            Action::new(Verb::Alter(Alter::set(AlterKind::Age, 10))).with_delay(3),
            Action::new(Verb::Alter(Alter::adjust(AlterKind::Age, 5))),
        ]);
        let mut world = world_of(builder.build());
        let subject = place(&mut world, rock, None);

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        interpreter
            .exec(&mut world, list, subject, ObjectId::none(), None, &mut out)
            .expect("runs");
        assert_eq!(world.queue().len(), 1);
        assert_eq!(world.object(subject).map(|o| o.age), Some(-1));

        interpreter.run_queue(&mut world, 2, &mut out).expect("runs");
        assert_eq!(world.object(subject).map(|o| o.age), Some(-1));

        interpreter.run_queue(&mut world, 1, &mut out).expect("runs");
        assert!(world.queue().is_empty());
        assert_eq!(world.object(subject).map(|o| o.age), Some(15));
    }

    #[test]
    fn delayed_actions_of_freed_subjects_are_dropped() {
        let mut builder = LevelBuilder::new("stale");
        let rock = builder.add_template(BaseObject::named("Rock"));
        let shard = builder.add_template(BaseObject::named("Shard"));
        let list = builder.push_actions([Action::new(Verb::CreateObject(CreateObject::new(
            shard, 1,
        )))
        .with_delay(1)]);
        let mut world = world_of(builder.build());
        let subject = place(&mut world, rock, None);

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        interpreter
            .exec(&mut world, list, subject, ObjectId::none(), None, &mut out)
            .expect("runs");
        world.mark_to_be_freed(subject);
        world.release_freed(&mut out);
        interpreter.run_queue(&mut world, 1, &mut out).expect("runs");

        assert_eq!(world.objects().len(), 0);
    }

    #[test]
    fn neutral_death_keeps_the_object_but_disarms_it() {
        let mut builder = LevelBuilder::new("neutral");
        let mut planet = BaseObject::named("Planet");
        planet.attributes = Attributes::NEUTRAL_DEATH
            | Attributes::CAN_BE_HIT
            | Attributes::CAN_COLLIDE
            | Attributes::HATED;
        planet.health = 40;
        let planet = builder.add_template(planet);
        let owner = builder.add_admiral(AdmiralSetup::computer("Red"));
        let mut world = world_of(builder.build());
        let id = place(&mut world, planet, Some(owner));
        if let Some(object) = world.object_mut(id) {
            object.health = -3;
        }

        let mut out = Vec::new();
        Interpreter::new()
            .destroy(&mut world, id, None, &mut out)
            .expect("destroys");

        let object = world.object(id).expect("still present");
        assert!(object.is_in_use());
        assert_eq!(object.owner, None);
        assert_eq!(object.health, 40);
        assert!(!object.attributes.intersects(
            Attributes::HATED | Attributes::CAN_BE_HIT | Attributes::CAN_COLLIDE
        ));
    }

    #[test]
    fn damage_below_zero_destroys_and_credits_the_killer() {
        let mut builder = LevelBuilder::new("damage");
        let mut fighter = BaseObject::named("Fighter");
        fighter.attributes = Attributes::CAN_ACCEPT_DESTINATION | Attributes::CAN_BE_HIT;
        fighter.health = 10;
        let fighter = builder.add_template(fighter);
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let blue = builder.add_admiral(AdmiralSetup::computer("Blue"));
        let mut world = world_of(builder.build());
        let id = place(&mut world, fighter, Some(red));

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        interpreter
            .alter_health(&mut world, id, -10, Some(blue), &mut out)
            .expect("applies");
        assert!(world.object(id).is_some_and(|o| o.is_in_use()));
        interpreter
            .alter_health(&mut world, id, -1, Some(blue), &mut out)
            .expect("applies");

        assert!(world.object(id).is_some_and(|o| !o.is_in_use()));
        assert_eq!(world.admiral(blue).map(|a| a.kills), Some(1));
        assert_eq!(world.admiral(red).map(|a| a.losses), Some(1));
        assert!(out
            .iter()
            .any(|event| matches!(event, Event::ObjectDestroyed { object, .. } if *object == id)));
    }

    #[test]
    fn upkeep_expires_objects_and_fires_periodic_lists() {
        let mut builder = LevelBuilder::new("upkeep");
        let shard = builder.add_template(BaseObject::named("Shard"));
        let spawn_shard = builder.push_actions([Action::new(Verb::CreateObject(
            CreateObject::new(shard, 1),
        ))]);
        let mut spark = BaseObject::named("Spark");
        spark.initial_age = 2;
        spark.actions.expire = spawn_shard;
        let spark = builder.add_template(spark);
        let mut beacon = BaseObject::named("Beacon");
        beacon.activate_period = 2;
        beacon.actions.activate = spawn_shard;
        let beacon = builder.add_template(beacon);
        let mut world = world_of(builder.build());
        let spark_id = place(&mut world, spark, None);
        let _ = place(&mut world, beacon, None);

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        interpreter.upkeep(&mut world, 1, &mut out).expect("runs");
        let shards = |world: &World| {
            world
                .objects()
                .alive()
                .filter(|(_, object)| object.base == shard)
                .count()
        };
        assert_eq!(shards(&world), 0);

        interpreter.upkeep(&mut world, 2, &mut out).expect("runs");
        assert_eq!(
            world.object(spark_id).map(|o| o.state),
            Some(ObjectState::ToBeFreed)
        );
        assert_eq!(shards(&world), 2);
        assert!(out
            .iter()
            .any(|event| matches!(event, Event::ObjectExpired { object } if *object == spark_id)));
    }

    #[test]
    fn weapons_fire_only_when_charged_and_loaded() {
        let mut builder = LevelBuilder::new("weapons");
        let bolt = builder.add_template(BaseObject::named("Bolt"));
        let fire = builder.push_actions([Action::new(Verb::CreateObject(CreateObject::new(
            bolt, 1,
        )))]);
        let mut gun = BaseObject::named("Gun");
        gun.weapon = Some(WeaponStats {
            ammo: 1,
            fire_time: 4,
            range: 600,
            energy_cost: 10,
            usage_attacking: true,
        });
        gun.actions.activate = fire;
        let gun = builder.add_template(gun);
        let mut ship = BaseObject::named("Ship");
        ship.energy = 15;
        ship.weapons = [Some(gun), None, None];
        let ship = builder.add_template(ship);
        let mut world = world_of(builder.build());
        let id = place(&mut world, ship, None);

        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        interpreter
            .fire_weapon(&mut world, id, ObjectId::none(), WeaponSlot::Pulse, &mut out)
            .expect("fires");
        let object = world.object(id).expect("present");
        assert_eq!(object.energy, 5);
        assert_eq!(object.weapons[0].ammo, 0);
        assert_eq!(object.weapons[0].time, 4);

        if let Some(object) = world.object_mut(id) {
            object.weapons[0].time = 0;
            object.energy = 15;
        }
        interpreter
            .fire_weapon(&mut world, id, ObjectId::none(), WeaponSlot::Pulse, &mut out)
            .expect("does nothing");
        let fired = out
            .iter()
            .filter(|event| matches!(event, Event::WeaponFired { .. }))
            .count();
        assert_eq!(fired, 1);
        let bolts = world
            .objects()
            .alive()
            .filter(|(_, object)| object.base == bolt)
            .count();
        assert_eq!(bolts, 1);
    }

    #[test]
    fn nested_lists_stop_at_the_depth_limit() {
        let mut builder = LevelBuilder::new("recursion");
        let echo = builder.add_template(BaseObject::named("Echo"));
        let list = builder.push_actions([Action::new(Verb::CreateObject(CreateObject::new(
            echo, 1,
        )))]);
        if let Some(template) = builder.template_mut(echo) {
            template.actions.create = list;
        }
        let mut world = world_of(builder.build());
        let subject = place(&mut world, echo, None);

        let mut out = Vec::new();
        Interpreter::new()
            .exec(&mut world, list, subject, ObjectId::none(), None, &mut out)
            .expect("runs");

        assert_eq!(world.objects().len(), 1 + MAX_NESTING as usize);
    }
}
