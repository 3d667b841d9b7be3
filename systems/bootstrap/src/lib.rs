#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Populates a freshly built world with the level's initial objects.

mod skirmish;

pub use skirmish::{skirmish, SKIRMISH_TIME_LIMIT};

use flotilla_core::{Event, InitialId};
use flotilla_system_actions::Interpreter;
use flotilla_world::{LevelError, World};
use tracing::info;

/// Places the starting fleet before the first tick.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Creates every initial object that is not hidden, hands out the
    /// initial orders and builds the admirals' build tables.
    ///
    /// Returns the number of objects placed.
    pub fn populate(
        &self,
        world: &mut World,
        interpreter: &mut Interpreter,
        out: &mut Vec<Event>,
    ) -> Result<usize, LevelError> {
        let level = world.level_arc();
        let mut placed = Vec::new();
        for (index, setup) in level.initial_objects.iter().enumerate() {
            if setup.initially_hidden {
                continue;
            }
            let initial = InitialId::new(
                u16::try_from(index).map_err(|_| LevelError::TooManyInitialObjects {
                    count: level.initial_objects.len(),
                    capacity: world.config().object_capacity(),
                })?,
            );
            if interpreter.place_initial(world, initial, out)?.is_some() {
                placed.push(initial);
            }
        }
        for &initial in &placed {
            interpreter.set_initial_destination(world, initial, false, out);
        }
        world.recalc_build_data()?;

        info!(level = %level.name, placed = placed.len(), "level populated");
        Ok(placed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        AdmiralSetup, Attributes, BaseObject, Fixed, InitialObject, LevelBuilder, Point,
    };
    use flotilla_world::Config;

    #[test]
    fn places_visible_initials_and_hands_out_orders() {
        let mut builder = LevelBuilder::new("opening");
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let mut cruiser = BaseObject::named("Cruiser");
        cruiser.attributes = Attributes::CAN_ACCEPT_DESTINATION;
        cruiser.build_ratio = Fixed::ONE;
        let cruiser = builder.add_template(cruiser);
        let mut outpost = BaseObject::named("Outpost");
        outpost.attributes = Attributes::CAN_BE_DESTINATION
            | Attributes::IS_DESTINATION
            | Attributes::CAN_ACCEPT_BUILD;
        let outpost = builder.add_template(outpost);

        let home = builder.add_initial(
            InitialObject::new(outpost, Point::new(0, 0))
                .owned_by(red)
                .building(vec![cruiser]),
        );
        let flagship = builder.add_initial(
            InitialObject::new(cruiser, Point::new(400, 0))
                .owned_by(red)
                .flagship()
                .heading_for(home),
        );
        let reserve =
            builder.add_initial(InitialObject::new(cruiser, Point::new(800, 0)).hidden());
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");

        let mut out = Vec::new();
        let placed = Bootstrap
            .populate(&mut world, &mut Interpreter::new(), &mut out)
            .expect("populates");

        assert_eq!(placed, 2);
        assert!(world.initial_object(reserve).is_none());
        let flagship = world.initial_object(flagship);
        let home = world.initial_object(home);
        assert_eq!(world.admiral(red).expect("admiral").flagship, flagship);
        assert_eq!(world.object(flagship).expect("flagship").dest, home);
        assert_eq!(world.admiral_target(red), home);
        let admiral = world.admiral(red).expect("admiral");
        assert_eq!(admiral.total_build_chance, Fixed::ONE);
    }
}
