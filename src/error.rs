use std::fmt;

use thiserror::Error;

/// Errors raised by the conversion core.
///
/// Every variant except [`ConvertError::Entity`] means the source data broke a
/// grammar the converter relies on. They abort the whole run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unparseable challenge rating: {0:?}")]
    ChallengeRating(String),
    #[error("unrecognised spellcasting frequency: {0}")]
    SpellFrequency(String),
    #[error("malformed spellcasting frequency `{key}`: {reason}")]
    SpellFrequencyShape { key: String, reason: String },
    #[error("missing {field} for spell {spell}")]
    DamageCondition { field: &'static str, spell: String },
    #[error("error with {kind} {name} in {source_name}")]
    Entity {
        kind: EntityKind,
        name: String,
        source_name: String,
        #[source]
        cause: Box<ConvertError>,
    },
}

impl ConvertError {
    pub fn in_entity(self, kind: EntityKind, name: &str, source_name: &str) -> Self {
        Self::Entity {
            kind,
            name: name.to_owned(),
            source_name: source_name.to_owned(),
            cause: Box::new(self),
        }
    }

    /// The innermost error, skipping entity wrappers.
    pub fn root(&self) -> &ConvertError {
        match self {
            Self::Entity { cause, .. } => cause.root(),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Monster,
    Spell,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monster => f.write_str("monster"),
            Self::Spell => f.write_str("spell"),
        }
    }
}
