//! Immutable object templates shared by every instance of a class.

use serde::{Deserialize, Serialize};

use crate::{ActionRange, Attributes, BuildFlags, Fixed, KeyTag, OrderFlags};

/// Size in bytes of one template record in the legacy scenario format.
pub const BASE_OBJECT_RECORD_BYTES: usize = 318;

/// Energy carried by one released energy pod.
pub const ENERGY_POD_AMOUNT: i32 = 500;

/// Identifies a template inside the level's template table.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BaseId(u32);

impl BaseId {
    /// Creates a template identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Table index.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Weapon slots of a ship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponSlot {
    /// Primary gun.
    Pulse,
    /// Secondary gun.
    Beam,
    /// Special device.
    Special,
}

impl WeaponSlot {
    /// All slots in firing order.
    pub const ALL: [Self; 3] = [Self::Pulse, Self::Beam, Self::Special];

    /// Position of the slot in per-object arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Pulse => 0,
            Self::Beam => 1,
            Self::Special => 2,
        }
    }
}

/// Firing characteristics of a weapon template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Shots available; negative means unlimited.
    pub ammo: i32,
    /// Major-tick countdown between shots.
    pub fire_time: i32,
    /// Effective range in world units.
    pub range: u32,
    /// Energy spent per shot.
    pub energy_cost: i32,
    /// Fired by computer pilots only when a target is inside range.
    pub usage_attacking: bool,
}

/// The six verb lists attached to a template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLists {
    /// Runs after an instance is created.
    pub create: ActionRange,
    /// Runs when an instance hits something.
    pub collide: ActionRange,
    /// Runs periodically, or when fired as a weapon.
    pub activate: ActionRange,
    /// Runs when an instance ages out.
    pub expire: ActionRange,
    /// Runs when an instance is destroyed.
    pub destroy: ActionRange,
    /// Runs when an instance reaches its destination.
    pub arrive: ActionRange,
}

/// Description of an entity class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseObject {
    /// Display name, used in capture messages.
    pub name: String,
    /// Behavioural attributes given to new instances.
    pub attributes: Attributes,
    /// Build restrictions.
    pub build_flags: BuildFlags,
    /// Target preferences for the admiral AI.
    pub order_flags: OrderFlags,
    /// Tag matched by key-tag filters and `MatchingFoeExists`.
    pub level_key_tag: KeyTag,
    /// Tag matched by destinations against ships' order tags.
    pub order_key_tag: KeyTag,
    /// Tag restricting what may engage the class.
    pub engage_key_tag: KeyTag,
    /// Strength contributed to tallies.
    pub offense_value: Fixed,
    /// Escort strength the class wants around it.
    pub friend_deficit: Fixed,
    /// Rank used to decide whether same-owner objects may be escorted.
    pub destination_class: i32,
    /// Health of a fresh instance.
    pub health: i32,
    /// Energy of a fresh instance.
    pub energy: i32,
    /// Damage dealt on impact.
    pub damage: i32,
    /// Speed ceiling.
    pub max_velocity: Fixed,
    /// Acceleration per major tick.
    pub max_thrust: Fixed,
    /// Degrees per major tick a goal-directed turn may cover.
    pub max_turn_rate: Fixed,
    /// Speed reached by `EnterWarp` when no speed is given.
    pub warp_speed: Fixed,
    /// Inertia; zero disables pushes.
    pub mass: Fixed,
    /// Collision extent in world units.
    pub size: u32,
    /// Speed at creation.
    pub initial_velocity: Fixed,
    /// Random extra speed at creation.
    pub initial_velocity_range: Fixed,
    /// Heading offset at creation.
    pub initial_direction: i32,
    /// Random extra heading at creation.
    pub initial_direction_range: i32,
    /// Lifetime in ticks; negative lives forever.
    pub initial_age: i32,
    /// Random extra lifetime.
    pub initial_age_range: i32,
    /// Ticks between activate-list runs; zero never activates.
    pub activate_period: i32,
    /// Random extra ticks between activations.
    pub activate_period_range: i32,
    /// Expiry runs the expire list but keeps the object.
    pub expire_dont_die: bool,
    /// Destruction runs the destroy list but keeps the object.
    pub destroy_dont_die: bool,
    /// Distance at which a ship counts as arrived.
    pub arrive_distance: u32,
    /// Cash cost of building.
    pub price: i32,
    /// Build countdown.
    pub build_time: i32,
    /// Weight in the admiral's build table.
    pub build_ratio: Fixed,
    /// Occupation needed to capture a neutral-death destination.
    pub capture_threshold: i32,
    /// Weapon templates mounted in each slot.
    pub weapons: [Option<BaseId>; 3],
    /// Firing characteristics when the template is itself a weapon.
    pub weapon: Option<WeaponStats>,
    /// Number of distinct shapes for rendering.
    pub shape_count: u16,
    /// Verb lists.
    pub actions: ActionLists,
}

impl BaseObject {
    /// Creates a named template with neutral defaults.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::NONE,
            build_flags: BuildFlags::NONE,
            order_flags: OrderFlags::NONE,
            level_key_tag: KeyTag::default(),
            order_key_tag: KeyTag::default(),
            engage_key_tag: KeyTag::default(),
            offense_value: Fixed::ZERO,
            friend_deficit: Fixed::ZERO,
            destination_class: 0,
            health: 1,
            energy: 0,
            damage: 0,
            max_velocity: Fixed::ZERO,
            max_thrust: Fixed::ZERO,
            max_turn_rate: Fixed::ZERO,
            warp_speed: Fixed::ZERO,
            mass: Fixed::ONE,
            size: 16,
            initial_velocity: Fixed::ZERO,
            initial_velocity_range: Fixed::ZERO,
            initial_direction: 0,
            initial_direction_range: 0,
            initial_age: -1,
            initial_age_range: 0,
            activate_period: 0,
            activate_period_range: 0,
            expire_dont_die: false,
            destroy_dont_die: false,
            arrive_distance: 512,
            price: 0,
            build_time: 0,
            build_ratio: Fixed::ZERO,
            capture_threshold: 0,
            weapons: [None; 3],
            weapon: None,
            shape_count: 1,
            actions: ActionLists::default(),
        }
    }

    /// Weapon template mounted in a slot.
    #[must_use]
    pub const fn weapon_in(&self, slot: WeaponSlot) -> Option<BaseId> {
        self.weapons[slot.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_survive_bincode() {
        let mut template = BaseObject::named("Cruiser");
        template.attributes = Attributes::CAN_THINK | Attributes::CAN_BE_ENGAGED;
        template.offense_value = Fixed::from_int(3);
        template.weapons[WeaponSlot::Pulse.index()] = Some(BaseId::new(4));
        template.actions.destroy = ActionRange::new(10, 2);

        let bytes = bincode::serialize(&template).expect("serialize");
        let decoded: BaseObject = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(decoded, template);
        assert_eq!(decoded.weapon_in(WeaponSlot::Pulse), Some(BaseId::new(4)));
    }
}
