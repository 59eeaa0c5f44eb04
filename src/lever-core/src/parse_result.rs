//! Output of a parse.

use std::sync::Arc;

use crate::command::Command;
use crate::parameters::CommandParameters;
use crate::part::CommandPart;

/// A part a token was bound to, and whether the conversion was exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartMatch {
    pub part: CommandPart,
    pub exact: bool,
}

/// One consumed input token and the parts it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgBinding {
    input: String,
    parts: Vec<PartMatch>,
}

impl ArgBinding {
    pub fn new(input: impl Into<String>, parts: Vec<PartMatch>) -> Self {
        Self {
            input: input.into(),
            parts,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn parts(&self) -> &[PartMatch] {
        &self.parts
    }

    /// Exact when every matched part converted exactly.
    pub fn is_exact(&self) -> bool {
        self.parts.iter().all(|m| m.exact)
    }

    pub fn matches(&self, part: &CommandPart) -> bool {
        self.parts.iter().any(|m| &m.part == part)
    }
}

/// Commands walked, tokens bound and the resulting parameters.
///
/// Parse errors carry the partial result reached before failing.
#[derive(Debug, Clone)]
pub struct CommandParseResult {
    execution_path: Vec<Arc<Command>>,
    bound_arguments: Vec<ArgBinding>,
    parameters: CommandParameters,
}

impl CommandParseResult {
    pub fn new(
        execution_path: Vec<Arc<Command>>,
        bound_arguments: Vec<ArgBinding>,
        parameters: CommandParameters,
    ) -> Self {
        Self {
            execution_path,
            bound_arguments,
            parameters,
        }
    }

    /// Commands from the root to the deepest sub-command reached.
    pub fn execution_path(&self) -> &[Arc<Command>] {
        &self.execution_path
    }

    pub fn bound_arguments(&self) -> &[ArgBinding] {
        &self.bound_arguments
    }

    pub fn parameters(&self) -> &CommandParameters {
        &self.parameters
    }

    /// The deepest command reached, whose action runs.
    pub fn primary_command(&self) -> Option<&Arc<Command>> {
        self.execution_path.last()
    }

    /// Whether `part` was bound to some token.
    pub fn is_bound(&self, part: &CommandPart) -> bool {
        self.bound_arguments.iter().any(|binding| binding.matches(part))
    }
}
