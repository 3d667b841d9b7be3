//! Scenario description consumed when a world is built.

use serde::{Deserialize, Serialize};

use crate::{Action, ActionRange, AdmiralId, BaseId, BaseObject, Condition, Fixed, Point};

/// Version stamped on every level; worlds refuse other versions.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum number of classes a destination can build.
pub const MAX_CAN_BUILD: usize = 12;

/// Identifies a placed initial object.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InitialId(u16);

impl InitialId {
    /// Creates an initial object identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Table index.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

/// Who drives an admiral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmiralKind {
    /// A local player.
    Human,
    /// The built-in AI.
    #[default]
    Computer,
    /// A networked peer.
    Remote,
}

/// Starting state of an admiral.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdmiralSetup {
    /// Display name used in capture messages.
    pub name: String,
    /// Who issues its orders.
    pub kind: AdmiralKind,
    /// Starting cash.
    pub cash: Fixed,
    /// Multiplier applied to destination income.
    pub earning_power: Fixed,
}

impl AdmiralSetup {
    /// Creates a computer admiral with no cash and unit earning power.
    #[must_use]
    pub fn computer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AdmiralKind::Computer,
            cash: Fixed::ZERO,
            earning_power: Fixed::ONE,
        }
    }

    /// Changes who drives the admiral.
    #[must_use]
    pub fn with_kind(mut self, kind: AdmiralKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the starting cash.
    #[must_use]
    pub fn with_cash(mut self, cash: Fixed) -> Self {
        self.cash = cash;
        self
    }
}

/// An object placed at level start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialObject {
    /// Template.
    pub base: BaseId,
    /// Owner, if any.
    pub owner: Option<AdmiralId>,
    /// Position relative to the universal centre.
    pub location: Point,
    /// Income paid to the owner each major tick when the object is a destination.
    pub earning: Fixed,
    /// Classes the object can build when it is a destination.
    pub can_build: Vec<BaseId>,
    /// Initial destination.
    pub destination: Option<InitialId>,
    /// Overrides the template name.
    pub name: Option<String>,
    /// Created only when unhidden by `Alter::Hidden`.
    pub initially_hidden: bool,
    /// Becomes the owner's flagship.
    pub is_flagship: bool,
}

impl InitialObject {
    /// Places an unowned object.
    #[must_use]
    pub fn new(base: BaseId, location: Point) -> Self {
        Self {
            base,
            owner: None,
            location,
            earning: Fixed::ZERO,
            can_build: Vec::new(),
            destination: None,
            name: None,
            initially_hidden: false,
            is_flagship: false,
        }
    }

    /// Assigns an owner.
    #[must_use]
    pub fn owned_by(mut self, owner: AdmiralId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets the destination income.
    #[must_use]
    pub fn earning(mut self, earning: Fixed) -> Self {
        self.earning = earning;
        self
    }

    /// Sets the buildable classes.
    #[must_use]
    pub fn building(mut self, can_build: Vec<BaseId>) -> Self {
        self.can_build = can_build;
        self
    }

    /// Orders the object toward another initial object.
    #[must_use]
    pub fn heading_for(mut self, destination: InitialId) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Hides the object until unhidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.initially_hidden = true;
        self
    }

    /// Marks the object as its owner's flagship.
    #[must_use]
    pub fn flagship(mut self) -> Self {
        self.is_flagship = true;
        self
    }

    /// Renames the object.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A complete scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Format version the level was authored against.
    pub format_version: u32,
    /// Display name.
    pub name: String,
    /// Template table.
    pub templates: Vec<BaseObject>,
    /// Action table referenced by [`ActionRange`] values.
    pub actions: Vec<Action>,
    /// Admirals in play.
    pub admirals: Vec<AdmiralSetup>,
    /// Objects placed at start.
    pub initial_objects: Vec<InitialObject>,
    /// Triggers.
    pub conditions: Vec<Condition>,
    /// Template released as energy pods on death.
    pub energy_blob: Option<BaseId>,
    /// Template emitted as a flare when a ship enters warp.
    pub warp_flare: Option<BaseId>,
}

impl Level {
    /// Looks up a template.
    #[must_use]
    pub fn template(&self, id: BaseId) -> Option<&BaseObject> {
        self.templates.get(id.get() as usize)
    }

    /// Actions covered by a range, clamped to the table.
    #[must_use]
    pub fn action_slice(&self, range: ActionRange) -> &[Action] {
        let start = (range.start() as usize).min(self.actions.len());
        let end = start
            .saturating_add(range.len() as usize)
            .min(self.actions.len());
        &self.actions[start..end]
    }
}

/// Incremental level constructor.
#[derive(Debug)]
pub struct LevelBuilder {
    level: Level,
}

impl LevelBuilder {
    /// Starts an empty level.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            level: Level {
                format_version: FORMAT_VERSION,
                name: name.into(),
                templates: Vec::new(),
                actions: Vec::new(),
                admirals: Vec::new(),
                initial_objects: Vec::new(),
                conditions: Vec::new(),
                energy_blob: None,
                warp_flare: None,
            },
        }
    }

    /// Appends a list of actions, returning the range that names it.
    pub fn push_actions(&mut self, actions: impl IntoIterator<Item = Action>) -> ActionRange {
        let start = self.level.actions.len() as u32;
        self.level.actions.extend(actions);
        let len = self.level.actions.len() as u32 - start;
        ActionRange::new(start, len)
    }

    /// Adds a template.
    pub fn add_template(&mut self, template: BaseObject) -> BaseId {
        let id = BaseId::new(self.level.templates.len() as u32);
        self.level.templates.push(template);
        id
    }

    /// Mutable access to a template added earlier.
    pub fn template_mut(&mut self, id: BaseId) -> Option<&mut BaseObject> {
        self.level.templates.get_mut(id.get() as usize)
    }

    /// Adds an admiral.
    pub fn add_admiral(&mut self, setup: AdmiralSetup) -> AdmiralId {
        let id = AdmiralId::new(self.level.admirals.len() as u8);
        self.level.admirals.push(setup);
        id
    }

    /// Places an initial object.
    pub fn add_initial(&mut self, initial: InitialObject) -> InitialId {
        let id = InitialId::new(self.level.initial_objects.len() as u16);
        self.level.initial_objects.push(initial);
        id
    }

    /// Adds a trigger.
    pub fn add_condition(&mut self, condition: Condition) {
        self.level.conditions.push(condition);
    }

    /// Sets the energy pod template.
    pub fn energy_blob(&mut self, base: BaseId) {
        self.level.energy_blob = Some(base);
    }

    /// Sets the warp flare template.
    pub fn warp_flare(&mut self, base: BaseId) {
        self.level.warp_flare = Some(base);
    }

    /// Finishes the level.
    #[must_use]
    pub fn build(self) -> Level {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Verb;

    #[test]
    fn builder_hands_out_sequential_ranges() {
        let mut builder = LevelBuilder::new("ranges");
        let first = builder.push_actions([Action::new(Verb::NilTarget)]);
        let second = builder.push_actions([
            Action::new(Verb::SetZoom(2)),
            Action::new(Verb::NoAction),
        ]);
        let level = builder.build();

        assert_eq!(first, ActionRange::new(0, 1));
        assert_eq!(second, ActionRange::new(1, 2));
        assert_eq!(level.action_slice(second).len(), 2);
        assert!(level.action_slice(ActionRange::new(5, 3)).is_empty());
    }

    #[test]
    fn levels_survive_bincode() {
        let mut builder = LevelBuilder::new("roundtrip");
        let base = builder.add_template(BaseObject::named("Outpost"));
        let admiral = builder.add_admiral(AdmiralSetup::computer("Red"));
        let _ = builder.add_initial(
            InitialObject::new(base, Point::new(10, -20))
                .owned_by(admiral)
                .earning(Fixed::ONE),
        );
        let level = builder.build();

        let bytes = bincode::serialize(&level).expect("serialize");
        let decoded: Level = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(decoded, level);
    }
}
