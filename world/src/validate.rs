//! Load-time checks that keep every runtime lookup in bounds.

use flotilla_core::{
    ActionRange, AlterKind, BaseId, Condition, InitialId, Level, ObjectRef, Verb, When,
    FORMAT_VERSION, MAX_ADMIRALS, MAX_CAN_BUILD,
};

use crate::{Config, LevelError};

pub(crate) fn level(level: &Level, config: &Config) -> Result<(), LevelError> {
    if level.format_version != FORMAT_VERSION {
        return Err(LevelError::FormatVersion {
            found: level.format_version,
            expected: FORMAT_VERSION,
        });
    }
    if level.admirals.len() > MAX_ADMIRALS {
        return Err(LevelError::TooManyAdmirals(level.admirals.len()));
    }

    let checker = Checker { level };
    for template in &level.templates {
        for weapon in template.weapons.iter().flatten() {
            let _ = checker.template(*weapon)?;
        }
        let lists = template.actions;
        for range in [
            lists.create,
            lists.collide,
            lists.activate,
            lists.expire,
            lists.destroy,
            lists.arrive,
        ] {
            checker.range(range)?;
        }
    }
    for action in &level.actions {
        checker.verb(&action.verb)?;
        if let Some(initial) = action.initial_subject_override {
            checker.initial(initial)?;
        }
        if let Some(initial) = action.initial_direct_override {
            checker.initial(initial)?;
        }
    }
    for extra in [level.energy_blob, level.warp_flare].into_iter().flatten() {
        let _ = checker.template(extra)?;
    }

    if level.initial_objects.len() > config.object_capacity() {
        return Err(LevelError::TooManyInitialObjects {
            count: level.initial_objects.len(),
            capacity: config.object_capacity(),
        });
    }
    let mut destinations = 0;
    for (index, initial) in level.initial_objects.iter().enumerate() {
        let template = checker.template(initial.base)?;
        if let Some(owner) = initial.owner {
            checker.admiral(owner.index())?;
        }
        if let Some(destination) = initial.destination {
            checker.initial(destination)?;
        }
        for base in &initial.can_build {
            let _ = checker.template(*base)?;
        }
        if initial.can_build.len() > MAX_CAN_BUILD {
            return Err(LevelError::TooManyBuildClasses {
                initial: InitialId::new(u16::try_from(index).unwrap_or(u16::MAX)),
                count: initial.can_build.len(),
            });
        }
        if template
            .attributes
            .contains(flotilla_core::Attributes::IS_DESTINATION)
        {
            destinations += 1;
        }
    }
    if destinations > config.destination_capacity() {
        return Err(LevelError::TooManyDestinations {
            count: destinations,
            capacity: config.destination_capacity(),
        });
    }

    for condition in &level.conditions {
        checker.condition(condition)?;
    }
    Ok(())
}

struct Checker<'a> {
    level: &'a Level,
}

impl Checker<'_> {
    fn template(&self, id: BaseId) -> Result<&flotilla_core::BaseObject, LevelError> {
        self.level
            .template(id)
            .ok_or(LevelError::UnknownTemplate(id))
    }

    fn admiral(&self, index: usize) -> Result<(), LevelError> {
        if index < self.level.admirals.len() {
            Ok(())
        } else {
            Err(LevelError::UnknownAdmiral(flotilla_core::AdmiralId::new(
                u8::try_from(index).unwrap_or(u8::MAX),
            )))
        }
    }

    fn initial(&self, id: InitialId) -> Result<(), LevelError> {
        if usize::from(id.get()) < self.level.initial_objects.len() {
            Ok(())
        } else {
            Err(LevelError::UnknownInitial(id))
        }
    }

    fn range(&self, range: ActionRange) -> Result<(), LevelError> {
        let start = range.start() as usize;
        let end = start + range.len() as usize;
        if end > self.level.actions.len() {
            return Err(LevelError::ActionRange {
                start,
                end,
                len: self.level.actions.len(),
            });
        }
        Ok(())
    }

    fn verb(&self, verb: &Verb) -> Result<(), LevelError> {
        match verb {
            Verb::CreateObject(create) | Verb::CreateObjectSetDest(create) => {
                let _ = self.template(create.base)?;
            }
            Verb::Alter(alter) => match alter.kind {
                AlterKind::Weapon1 | AlterKind::Weapon2 | AlterKind::Special
                    if alter.minimum >= 0 =>
                {
                    let _ = self.template(BaseId::new(alter.minimum.unsigned_abs()))?;
                }
                AlterKind::BaseType => {
                    let _ = self.template(BaseId::new(alter.minimum.unsigned_abs()))?;
                }
                _ => {}
            },
            Verb::ChangeScore {
                admiral: Some(admiral),
                ..
            }
            | Verb::DeclareWinner {
                admiral: Some(admiral),
                ..
            } => self.admiral(admiral.index())?,
            _ => {}
        }
        Ok(())
    }

    fn object(&self, object: ObjectRef) -> Result<(), LevelError> {
        match object {
            ObjectRef::Initial(initial) => self.initial(initial),
            ObjectRef::Flagship(admiral)
            | ObjectRef::Control(admiral)
            | ObjectRef::Target(admiral) => self.admiral(admiral.index()),
        }
    }

    fn condition(&self, condition: &Condition) -> Result<(), LevelError> {
        self.range(condition.actions)?;
        for object in [condition.subject, condition.direct].into_iter().flatten() {
            self.object(object)?;
        }
        match &condition.when {
            When::Autopilot { admiral, .. }
            | When::Building { admiral, .. }
            | When::Cash { admiral, .. }
            | When::Ships { admiral, .. } => self.admiral(admiral.index()),
            When::Counter { counter, .. } => self.admiral(counter.admiral.index()),
            When::Destroyed { object, .. }
            | When::Health { object, .. }
            | When::Speed { object, .. } => self.object(*object),
            When::Owner { object, admiral, .. } => {
                self.object(*object)?;
                admiral.map_or(Ok(()), |admiral| self.admiral(admiral.index()))
            }
            When::Distance { from: a, to: b, .. }
            | When::Object { a, b, .. }
            | When::Target {
                object: a,
                target: b,
                ..
            } => {
                self.object(*a)?;
                self.object(*b)
            }
            When::Computer { .. } | When::Message { .. } | When::Time { .. } | When::Zoom { .. } => {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        Action, AdmiralSetup, BaseObject, CreateObject, InitialObject, LevelBuilder, Point,
    };

    #[test]
    fn rejects_foreign_format_versions() {
        let mut level = LevelBuilder::new("old").build();
        level.format_version = FORMAT_VERSION + 1;
        assert_eq!(
            super::level(&level, &Config::default()),
            Err(LevelError::FormatVersion {
                found: FORMAT_VERSION + 1,
                expected: FORMAT_VERSION,
            })
        );
    }

    #[test]
    fn rejects_unknown_templates_in_actions() {
        let mut builder = LevelBuilder::new("dangling");
        let _ = builder.push_actions([Action::new(Verb::CreateObject(CreateObject::new(
            BaseId::new(9),
            1,
        )))]);
        let level = builder.build();
        assert_eq!(
            super::level(&level, &Config::default()),
            Err(LevelError::UnknownTemplate(BaseId::new(9)))
        );
    }

    #[test]
    fn rejects_unknown_owners_and_overfull_pools() {
        let mut builder = LevelBuilder::new("owners");
        let base = builder.add_template(BaseObject::named("Rock"));
        let _ = builder.add_admiral(AdmiralSetup::computer("Only"));
        let _ = builder.add_initial(
            InitialObject::new(base, Point::new(0, 0))
                .owned_by(flotilla_core::AdmiralId::new(3)),
        );
        let level = builder.build();
        assert!(matches!(
            super::level(&level, &Config::default()),
            Err(LevelError::UnknownAdmiral(_))
        ));

        let mut builder = LevelBuilder::new("crowded");
        let base = builder.add_template(BaseObject::named("Rock"));
        for _ in 0..3 {
            let _ = builder.add_initial(InitialObject::new(base, Point::new(0, 0)));
        }
        let level = builder.build();
        assert_eq!(
            super::level(&level, &Config::new(2, 1, 4, 1)),
            Err(LevelError::TooManyInitialObjects {
                count: 3,
                capacity: 2,
            })
        );
    }
}
