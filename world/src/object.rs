//! Live space objects and their template-derived starting state.

use flotilla_core::{
    rotation, AdmiralId, Attributes, BaseId, BaseObject, Coord, Duty, Fixed, FixedPoint, KeyTag,
    Level, ObjectId, Random, RandomSource, Rect, RuntimeFlags, WeaponSlot,
    MAXIMUM_RELEVANT_DISTANCE, MAXIMUM_RELEVANT_DISTANCE_SQUARED,
};

use crate::DestinationId;

/// Squared distance inside which thinking objects engage their target.
pub const ENGAGE_RANGE: u64 = 1_048_576;

/// Energy stored in the battery for every unit of template energy.
pub const BATTERY_RATIO: i32 = 5;

/// Ticks after an assignment during which a ship still heads home.
pub const TIME_TO_CHECK_HOME: i32 = 900;

/// Width of a collision grid unit as a power of two.
pub const COLLISION_UNIT_SHIFT: u32 = 7;

/// Width of a locality grid unit as a power of two.
pub const DISTANCE_UNIT_SHIFT: u32 = 11;

/// Lifecycle state of a pooled object.
///
/// Free slots hold no object at all, so the third state of the pool is
/// represented by the slot being empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectState {
    /// Participates in every phase.
    InUse,
    /// Marked for removal by the cleanup phase.
    ToBeFreed,
}

/// How an object currently exists in space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Presence {
    /// Ordinary flight.
    #[default]
    Normal,
    /// Shrinking toward a landing, freed once the scale reaches zero.
    Landing {
        /// Scale removed per major tick.
        speed: i32,
    },
    /// Accelerating past its speed limit until it leaves the area.
    Warping {
        /// Velocity targeted while warping.
        speed: Fixed,
    },
}

/// Per-slot weapon state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WeaponState {
    /// Mounted weapon template.
    pub base: Option<BaseId>,
    /// Remaining shots; negative for unlimited.
    pub ammo: i32,
    /// Major ticks until the slot may fire again.
    pub time: i32,
}

/// Strength an object added to its destination's tallies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Contribution {
    /// Object whose tallies were raised.
    pub target: ObjectId,
    /// Raised the friendly and escort tallies rather than the foe tally.
    pub friendly: bool,
    /// Amount added.
    pub amount: Fixed,
}

/// Bucket of the proximity grid plus the super-cell it belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Bucket column in `0..16`.
    pub h: u32,
    /// Bucket row in `0..16`.
    pub v: u32,
    /// Super-cell column.
    pub super_h: u32,
    /// Super-cell row.
    pub super_v: u32,
}

impl Cell {
    /// Buckets of a proximity grid side.
    pub const GRID_SIZE: u32 = 16;

    /// Locates a coordinate on a grid whose units are `1 << unit_shift` wide.
    #[must_use]
    pub const fn of(location: Coord, unit_shift: u32) -> Self {
        let units_h = location.h >> unit_shift;
        let units_v = location.v >> unit_shift;
        Self {
            h: units_h % Self::GRID_SIZE,
            v: units_v % Self::GRID_SIZE,
            super_h: units_h / Self::GRID_SIZE,
            super_v: units_v / Self::GRID_SIZE,
        }
    }

    /// Index of the bucket in a row-major grid.
    #[must_use]
    pub const fn bucket(&self) -> usize {
        (self.v * Self::GRID_SIZE + self.h) as usize
    }
}

/// Everything needed to place a new object.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Template.
    pub base: BaseId,
    /// Absolute location.
    pub location: Coord,
    /// Velocity added to the template's launch velocity.
    pub velocity: FixedPoint,
    /// Heading added to the template's initial direction.
    pub direction: i32,
    /// Owner.
    pub owner: Option<AdmiralId>,
    /// Classes buildable when the object is a destination.
    pub can_build: Vec<BaseId>,
    /// Destination income.
    pub earning: Fixed,
    /// Destination name overriding the template's.
    pub name: Option<String>,
}

impl SpawnRequest {
    /// Requests an unowned, motionless object.
    #[must_use]
    pub fn new(base: BaseId, location: Coord) -> Self {
        Self {
            base,
            location,
            velocity: FixedPoint::ZERO,
            direction: 0,
            owner: None,
            can_build: Vec::new(),
            earning: Fixed::ZERO,
            name: None,
        }
    }

    /// Adds an inherited velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: FixedPoint) -> Self {
        self.velocity = velocity;
        self
    }

    /// Adds an inherited heading.
    #[must_use]
    pub fn with_direction(mut self, direction: i32) -> Self {
        self.direction = direction;
        self
    }

    /// Assigns an owner.
    #[must_use]
    pub fn owned_by(mut self, owner: Option<AdmiralId>) -> Self {
        self.owner = owner;
        self
    }

    /// Supplies the destination record data.
    #[must_use]
    pub fn as_destination(
        mut self,
        can_build: Vec<BaseId>,
        earning: Fixed,
        name: Option<String>,
    ) -> Self {
        self.can_build = can_build;
        self.earning = earning;
        self.name = name;
        self
    }
}

/// A live entity.
#[derive(Clone, Debug)]
pub struct SpaceObject {
    /// Template.
    pub base: BaseId,
    /// Lifecycle state.
    pub state: ObjectState,
    /// Behavioural attributes, initially the template's.
    pub attributes: Attributes,
    /// Flags that change during play.
    pub runtime: RuntimeFlags,
    /// Level key tag.
    pub level_key_tag: KeyTag,
    /// Order key tag.
    pub order_key_tag: KeyTag,
    /// Engage key tag.
    pub engage_key_tag: KeyTag,
    /// Owning admiral.
    pub owner: Option<AdmiralId>,
    /// Absolute location.
    pub location: Coord,
    /// Sub-unit motion carried between minor ticks.
    pub motion_fraction: FixedPoint,
    /// Velocity per minor tick.
    pub velocity: FixedPoint,
    /// Heading in whole degrees.
    pub direction: i32,
    /// Free rotation per minor tick.
    pub turn_velocity: Fixed,
    /// Sub-degree rotation carried between minor ticks.
    pub turn_fraction: Fixed,
    /// Heading a goal-directed object turns toward.
    pub direction_goal: i32,
    /// Current thrust; negative brakes.
    pub thrust: Fixed,
    /// Speed ceiling.
    pub max_velocity: Fixed,
    /// Thrust ceiling.
    pub max_thrust: Fixed,
    /// Turn rate ceiling.
    pub max_turn_rate: Fixed,
    /// Display and collision scale.
    pub scale: Fixed,
    /// Health; negative means destroyed.
    pub health: i32,
    /// Energy.
    pub energy: i32,
    /// Reserve energy that recharges `energy`.
    pub battery: i32,
    /// Major ticks since the last recharge step.
    pub recharge_time: i32,
    /// Remaining lifetime in ticks; negative lives forever.
    pub age: i32,
    /// Major ticks until the activate list runs; zero never runs it.
    pub periodic_time: i32,
    /// Major ticks the object ignores its controls.
    pub offline_time: i32,
    /// Weapon slots.
    pub weapons: [WeaponState; 3],
    /// Longest attacking weapon range.
    pub longest_weapon_range: u32,
    /// Shortest attacking weapon range.
    pub shortest_weapon_range: u32,
    /// Squared distance inside which the target is engaged.
    pub engage_range: u64,
    /// Object being attacked or approached.
    pub target: ObjectId,
    /// Heading toward the target.
    pub target_angle: i32,
    /// Closest engageable foe found by the locality pass.
    pub closest: ObjectId,
    /// Squared distance to `closest`.
    pub closest_distance: u64,
    /// Squared distance to the target the last time the pilot changed speed.
    pub last_target_distance: u64,
    /// Destination the object is heading for.
    pub dest: ObjectId,
    /// Role derived from the destination.
    pub duty: Duty,
    /// Strength added to the destination's tallies.
    pub contribution: Option<Contribution>,
    /// Ticks left in which the object still heads for its destination.
    pub time_from_origin: i32,
    /// Friendly strength nearby.
    pub local_friend_strength: Fixed,
    /// Hostile strength nearby.
    pub local_foe_strength: Fixed,
    /// Friendly strength ordered to this object.
    pub remote_friend_strength: Fixed,
    /// Hostile strength ordered to this object.
    pub remote_foe_strength: Fixed,
    /// Friendly strength escorting this object.
    pub escort_strength: Fixed,
    /// Best score seen during the admiral's current pass.
    pub best_considered_target_value: Fixed,
    /// Score of the destination currently adopted.
    pub current_target_value: Fixed,
    /// Candidate that produced `best_considered_target_value`.
    pub best_considered_target: ObjectId,
    /// Destination record owned by this object.
    pub destination: Option<DestinationId>,
    /// Landing or warp state.
    pub presence: Presence,
    /// Per-object random stream.
    pub random: Random,
    /// Collision rectangle.
    pub bounds: Rect,
    /// Collision grid location.
    pub collision_cell: Cell,
    /// Locality grid location.
    pub distance_cell: Cell,
}

impl SpaceObject {
    pub(crate) fn from_template(
        level: &Level,
        template: &BaseObject,
        request: &SpawnRequest,
        seed: i32,
    ) -> Self {
        let mut random = Random::new(seed);

        let periodic_time = if template.activate_period > 0 {
            template.activate_period + random.next(template.activate_period_range)
        } else {
            0
        };

        let mut direction = template.initial_direction + request.direction;
        if template.initial_direction_range > 0 {
            direction += random.next(template.initial_direction_range);
        }
        let direction = rotation::normalize_angle(direction);

        let mut speed = template.initial_velocity;
        if template.initial_velocity_range.is_positive() {
            speed += Fixed::from_raw(random.next(template.initial_velocity_range.raw()));
        }
        let heading = rotation::rot_point(direction);
        let velocity = FixedPoint::new(
            heading.h.mul(speed) + request.velocity.h,
            heading.v.mul(speed) + request.velocity.v,
        );

        let attributes = template.attributes;
        let thrust = if attributes.intersects(Attributes::CAN_THINK | Attributes::REMOTE_OR_HUMAN)
        {
            Fixed::ZERO
        } else {
            template.max_thrust
        };

        let age = if template.initial_age >= 0 {
            template.initial_age + random.next(template.initial_age_range)
        } else {
            -1
        };

        let mut object = Self {
            base: request.base,
            state: ObjectState::InUse,
            attributes,
            runtime: RuntimeFlags::NONE,
            level_key_tag: template.level_key_tag,
            order_key_tag: template.order_key_tag,
            engage_key_tag: template.engage_key_tag,
            owner: request.owner,
            location: request.location,
            motion_fraction: FixedPoint::ZERO,
            velocity,
            direction,
            turn_velocity: Fixed::ZERO,
            turn_fraction: Fixed::ZERO,
            direction_goal: direction,
            thrust,
            max_velocity: template.max_velocity,
            max_thrust: template.max_thrust,
            max_turn_rate: template.max_turn_rate,
            scale: Fixed::ONE,
            health: template.health,
            energy: template.energy,
            battery: template.energy.saturating_mul(BATTERY_RATIO),
            recharge_time: 0,
            age,
            periodic_time,
            offline_time: 0,
            weapons: [WeaponState::default(); 3],
            longest_weapon_range: 0,
            shortest_weapon_range: 0,
            engage_range: ENGAGE_RANGE,
            target: ObjectId::none(),
            target_angle: 0,
            closest: ObjectId::none(),
            closest_distance: MAXIMUM_RELEVANT_DISTANCE_SQUARED,
            last_target_distance: 0,
            dest: ObjectId::none(),
            duty: Duty::NoDuty,
            contribution: None,
            time_from_origin: 0,
            local_friend_strength: Fixed::ZERO,
            local_foe_strength: Fixed::ZERO,
            remote_friend_strength: Fixed::ZERO,
            remote_foe_strength: Fixed::ZERO,
            escort_strength: Fixed::ZERO,
            best_considered_target_value: Fixed::UNSET,
            current_target_value: Fixed::UNSET,
            best_considered_target: ObjectId::none(),
            destination: None,
            presence: Presence::Normal,
            random,
            bounds: Rect::default(),
            collision_cell: Cell::default(),
            distance_cell: Cell::default(),
        };
        for slot in WeaponSlot::ALL {
            object.mount_weapon(level, slot, template.weapon_in(slot));
        }
        object.update_bounds(template.size);
        object.refresh_cells();
        object
    }

    /// Turns the object into another class in place.
    ///
    /// Location, velocity, heading and the random stream are kept. Control
    /// attributes survive the swap. A relative swap keeps the weapon ammo and
    /// recharge state.
    pub fn rebase(&mut self, level: &Level, base: BaseId, template: &BaseObject, relative: bool) {
        let kept = self.attributes
            & (Attributes::IS_HUMAN_CONTROLLED
                | Attributes::IS_REMOTE
                | Attributes::IS_PLAYER_SHIP
                | Attributes::STATIC_DESTINATION);
        self.attributes = template.attributes | kept;
        self.base = base;
        self.direction_goal = 0;
        self.turn_fraction = Fixed::ZERO;
        self.turn_velocity = Fixed::ZERO;
        self.max_velocity = template.max_velocity;
        self.age = if template.initial_age >= 0 {
            template.initial_age + self.random.next(template.initial_age_range)
        } else {
            -1
        };
        self.periodic_time = if template.activate_period > 0 {
            template.activate_period + self.random.next(template.activate_period_range)
        } else {
            0
        };

        for slot in WeaponSlot::ALL {
            let weapon = &mut self.weapons[slot.index()];
            weapon.base = template.weapon_in(slot);
            let stats = weapon
                .base
                .and_then(|base| level.template(base))
                .and_then(|template| template.weapon);
            match stats {
                None => weapon.time = 0,
                Some(_) if relative => {}
                Some(stats) => {
                    weapon.ammo = stats.ammo;
                    weapon.time = weapon.time.clamp(0, stats.fire_time.max(0));
                }
            }
        }
        self.refresh_weapon_ranges(level);
        self.update_bounds(template.size);
    }

    /// Puts a weapon template into a slot and refreshes the weapon ranges.
    pub fn mount_weapon(&mut self, level: &Level, slot: WeaponSlot, weapon: Option<BaseId>) {
        let ammo = weapon
            .and_then(|base| level.template(base))
            .and_then(|template| template.weapon)
            .map_or(0, |stats| stats.ammo);
        self.weapons[slot.index()] = WeaponState {
            base: weapon,
            ammo,
            time: 0,
        };
        self.refresh_weapon_ranges(level);
    }

    fn refresh_weapon_ranges(&mut self, level: &Level) {
        let mut longest = 0;
        let mut shortest = MAXIMUM_RELEVANT_DISTANCE;
        let attacking = self
            .weapons
            .iter()
            .filter_map(|weapon| weapon.base)
            .filter_map(|base| level.template(base))
            .filter_map(|template| template.weapon)
            .filter(|stats| stats.range > 0 && stats.usage_attacking);
        for stats in attacking {
            longest = longest.max(stats.range);
            shortest = shortest.min(stats.range);
        }
        if longest == 0 {
            shortest = 0;
        }
        self.longest_weapon_range = longest;
        self.shortest_weapon_range = shortest;
        self.engage_range = (u64::from(longest) * u64::from(longest)).max(ENGAGE_RANGE);
    }

    /// Recomputes the collision rectangle from the location and scale.
    pub fn update_bounds(&mut self, size: u32) {
        let extent = self
            .scale
            .mul(Fixed::from_int(i32::try_from(size).unwrap_or(i32::MAX >> 16)))
            .to_int()
            .max(0) as u32;
        self.bounds = Rect::centered(self.location, extent, extent);
    }

    /// Recomputes both proximity grid cells from the location.
    pub fn refresh_cells(&mut self) {
        self.collision_cell = Cell::of(self.location, COLLISION_UNIT_SHIFT);
        self.distance_cell = Cell::of(self.location, DISTANCE_UNIT_SHIFT);
    }

    /// Reports whether the object takes part in every phase.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.state == ObjectState::InUse
    }

    /// Reports whether the object makes its own decisions.
    #[must_use]
    pub fn can_think(&self) -> bool {
        self.attributes.intersects(Attributes::CAN_THINK)
    }

    /// Reports whether a human or remote peer flies the object.
    #[must_use]
    pub fn is_remote_or_human(&self) -> bool {
        self.attributes.intersects(Attributes::REMOTE_OR_HUMAN)
    }

    /// Reports whether the computer flies the object.
    #[must_use]
    pub fn is_computer_piloted(&self) -> bool {
        !self.is_remote_or_human() || self.attributes.contains(Attributes::ON_AUTO_PILOT)
    }

    /// Offense value of the template, used by every strength tally.
    #[must_use]
    pub fn offense(&self, level: &Level) -> Fixed {
        level
            .template(self.base)
            .map_or(Fixed::ZERO, |template| template.offense_value)
    }

    /// Health as a fraction of the template's health.
    #[must_use]
    pub fn health_fraction(&self, level: &Level) -> Fixed {
        level
            .template(self.base)
            .map_or(Fixed::ZERO, |template| Fixed::ratio(self.health, template.health))
    }

    /// Energy as a fraction of the template's energy.
    #[must_use]
    pub fn energy_fraction(&self, level: &Level) -> Fixed {
        level
            .template(self.base)
            .map_or(Fixed::ZERO, |template| Fixed::ratio(self.energy, template.energy))
    }

    /// Speed as the larger velocity component.
    #[must_use]
    pub fn speed(&self) -> Fixed {
        self.velocity.max_component()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{LevelBuilder, WeaponStats};

    #[test]
    fn spawn_reads_template_and_weapons() {
        let mut builder = LevelBuilder::new("spawn");
        let mut gun = BaseObject::named("Gun");
        gun.weapon = Some(WeaponStats {
            ammo: 12,
            fire_time: 4,
            range: 2_000,
            energy_cost: 1,
            usage_attacking: true,
        });
        let gun = builder.add_template(gun);
        let mut ship = BaseObject::named("Ship");
        ship.attributes = Attributes::CAN_THINK | Attributes::CAN_TURN;
        ship.energy = 100;
        ship.max_thrust = Fixed::ONE;
        ship.weapons[WeaponSlot::Pulse.index()] = Some(gun);
        let ship_id = builder.add_template(ship.clone());
        let level = builder.build();

        let request = SpawnRequest::new(ship_id, Coord::from_center(0, 0));
        let object = SpaceObject::from_template(&level, &ship, &request, 9);

        assert_eq!(object.battery, 500);
        assert_eq!(object.thrust, Fixed::ZERO);
        assert_eq!(object.weapons[0].ammo, 12);
        assert_eq!(object.longest_weapon_range, 2_000);
        assert_eq!(object.shortest_weapon_range, 2_000);
        assert_eq!(object.engage_range, 4_000_000);
        assert_eq!(object.age, -1);
        assert_eq!(object.current_target_value, Fixed::UNSET);
    }

    #[test]
    fn unarmed_objects_have_no_weapon_range() {
        let mut builder = LevelBuilder::new("unarmed");
        let rock = BaseObject::named("Rock");
        let id = builder.add_template(rock.clone());
        let level = builder.build();

        let object = SpaceObject::from_template(
            &level,
            &rock,
            &SpawnRequest::new(id, Coord::from_center(5, 5)),
            1,
        );
        assert_eq!(object.shortest_weapon_range, 0);
        assert_eq!(object.engage_range, ENGAGE_RANGE);
        assert_eq!(object.bounds.right - object.bounds.left, 16);
    }

    #[test]
    fn grid_cells_split_units_and_super_cells() {
        let cell = Cell::of(Coord::new((35 << 7) + 3, 17 << 7), 7);
        assert_eq!((cell.h, cell.v), (3, 1));
        assert_eq!((cell.super_h, cell.super_v), (2, 1));
        assert_eq!(cell.bucket(), 19);
    }
}
