//! Guards evaluated before a command is entered.

use std::fmt;
use std::sync::Arc;

use crate::parameters::CommandParameters;

type Predicate = Arc<dyn Fn(&CommandParameters) -> bool + Send + Sync>;

/// Predicate over the parameters bound so far.
///
/// A failing condition stops parsing at the gated command, so nothing about
/// its parts or sub-commands is revealed.
#[derive(Clone, Default)]
pub enum Condition {
    #[default]
    Always,
    Never,
    Predicate(Predicate),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&CommandParameters) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    pub fn satisfied(&self, parameters: &CommandParameters) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Predicate(predicate) => predicate(parameters),
            Self::And(a, b) => a.satisfied(parameters) && b.satisfied(parameters),
            Self::Or(a, b) => a.satisfied(parameters) || b.satisfied(parameters),
            Self::Not(inner) => !inner.satisfied(parameters),
        }
    }

    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Self::Always, other) | (other, Self::Always) => other,
            (Self::Never, _) | (_, Self::Never) => Self::Never,
            (a, b) => Self::And(Box::new(a), Box::new(b)),
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        match (self, other) {
            (Self::Never, other) | (other, Self::Never) => other,
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (a, b) => Self::Or(Box::new(a), Box::new(b)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Condition {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Predicate(_) => f.write_str("Predicate"),
            Self::And(a, b) => f.debug_tuple("And").field(a).field(b).finish(),
            Self::Or(a, b) => f.debug_tuple("Or").field(a).field(b).finish(),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
        }
    }
}
