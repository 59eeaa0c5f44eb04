//! Error types for parsing, execution, registration and value access.

use std::sync::Arc;

use thiserror::Error;

use crate::command::Command;
use crate::converter::ConversionFailure;
use crate::parse_result::CommandParseResult;

fn path_names(path: &[Arc<Command>]) -> String {
    path.iter()
        .map(|cmd| cmd.name())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors from parsing or executing a command line.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The first token is not a registered command or alias.
    #[error("No such command '{name}'")]
    NoSuchCommand { name: String },

    /// A flag character unknown to the current command.
    #[error("Unknown flag '-{flag}' for '{}'", path_names(.parse.execution_path()))]
    NoSuchFlag {
        flag: char,
        parse: Box<CommandParseResult>,
    },

    /// No candidate converter accepted a token.
    #[error("Invalid value '{input}' for {part}, expected {acceptable}: {failure}")]
    ConversionFailed {
        part: String,
        input: String,
        acceptable: String,
        failure: ConversionFailure,
        parse: Box<CommandParseResult>,
    },

    /// A command's condition rejected the invocation. Carries only the path
    /// up to the gated command.
    #[error("You are not permitted to use '{}'", path_names(.path))]
    ConditionFailed { path: Vec<Arc<Command>> },

    /// A required argument had no token.
    #[error("Missing argument {part} for '{}'", path_names(.parse.execution_path()))]
    MissingRequiredArgument {
        part: String,
        parse: Box<CommandParseResult>,
    },

    /// A required sub-command slot had no token.
    #[error("Missing sub-command, expected one of: {}", .options.join(", "))]
    MissingSubCommand {
        options: Vec<String>,
        parse: Box<CommandParseResult>,
    },

    /// A token did not name any command of a required sub-command slot.
    #[error("Invalid sub-command '{input}', expected one of: {}", .options.join(", "))]
    InvalidSubCommand {
        input: String,
        options: Vec<String>,
        parse: Box<CommandParseResult>,
    },

    /// Tokens remained after every part was filled.
    #[error("Too many arguments, unexpected: {}", .extra.join(" "))]
    TooManyArguments {
        extra: Vec<String>,
        parse: Box<CommandParseResult>,
    },

    /// A value-taking flag was not the last character of its cluster.
    #[error("Flag '-{flag}' takes a value and must be last in '-{group}'")]
    ArgFlagNotLast {
        flag: char,
        group: String,
        parse: Box<CommandParseResult>,
    },

    /// The action of the primary command failed.
    #[error("Command '{}' failed: {source}", path_names(.path))]
    Execution {
        path: Vec<Arc<Command>>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CommandError {
    /// Parser errors, as opposed to action failures. Callers typically show
    /// usage for these.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::Execution { .. })
    }

    /// The partial parse reached before the error, where one is available.
    pub fn parse_result(&self) -> Option<&CommandParseResult> {
        match self {
            Self::NoSuchFlag { parse, .. }
            | Self::ConversionFailed { parse, .. }
            | Self::MissingRequiredArgument { parse, .. }
            | Self::MissingSubCommand { parse, .. }
            | Self::InvalidSubCommand { parse, .. }
            | Self::TooManyArguments { parse, .. }
            | Self::ArgFlagNotLast { parse, .. } => Some(parse),
            Self::NoSuchCommand { .. } | Self::ConditionFailed { .. } | Self::Execution { .. } => {
                None
            }
        }
    }

    /// Commands walked before the error.
    pub fn execution_path(&self) -> &[Arc<Command>] {
        match self {
            Self::ConditionFailed { path } | Self::Execution { path, .. } => path,
            other => other
                .parse_result()
                .map(CommandParseResult::execution_path)
                .unwrap_or(&[]),
        }
    }

    /// Take the partial parse out of the error.
    pub fn into_parse_result(self) -> Option<CommandParseResult> {
        match self {
            Self::NoSuchFlag { parse, .. }
            | Self::ConversionFailed { parse, .. }
            | Self::MissingRequiredArgument { parse, .. }
            | Self::MissingSubCommand { parse, .. }
            | Self::InvalidSubCommand { parse, .. }
            | Self::TooManyArguments { parse, .. }
            | Self::ArgFlagNotLast { parse, .. } => Some(*parse),
            _ => None,
        }
    }
}

/// Shape rules a command must satisfy to be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralViolation {
    /// A required sub-command part is followed by other parts.
    #[error("required sub-command part '{part}' must be the last part")]
    RequiredSubCommandNotLast { part: String },

    /// More than one argument is variable.
    #[error("only one variable argument is allowed, found '{first}' and '{second}'")]
    TooManyVariableArguments { first: String, second: String },

    /// A variable argument is followed by another positional argument.
    #[error("variable argument '{variable}' must be the last argument, '{following}' follows it")]
    VariableArgumentNotLast { variable: String, following: String },

    /// An optional argument precedes a required one in a command that also
    /// requires a sub-command, so the parser cannot tell where tokens belong.
    #[error(
        "optional argument '{optional}' before required argument '{required}' is ambiguous with a required sub-command"
    )]
    AmbiguousOptionalArgument { optional: String, required: String },

    /// Two flags share a character.
    #[error("flag '-{flag}' is declared more than once")]
    DuplicateFlag { flag: char },

    /// A command declares more than one sub-command part.
    #[error("only one sub-command part is allowed")]
    MultipleSubCommandParts,

    /// Two commands in one sub-command part share a name or alias.
    #[error("sub-command name '{name}' is used by more than one command")]
    DuplicateSubCommandName { name: String },
}

/// Errors raised when registering a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// `command`, or a command nested in it, has an invalid shape.
    #[error("Invalid command '{command}': {violation}")]
    Structural {
        command: String,
        violation: StructuralViolation,
    },

    /// A command is reachable from itself; `path` lists the names walked.
    #[error("Command '{command}' is self-referential: {}", .path.join(" -> "))]
    SelfReferential { command: String, path: Vec<String> },

    /// A name or alias is held by a different registered command.
    #[error("Cannot register '{rejected}': name '{name}' is already used by '{existing}'")]
    Conflict {
        name: String,
        existing: String,
        rejected: String,
    },
}

/// Errors from reading values out of [`CommandParameters`](crate::CommandParameters).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Nothing was bound to the part and it has no defaults.
    #[error("No value for '{part}'")]
    NoValue { part: String },

    /// A single value was requested but several were bound.
    #[error("Expected a single value for '{part}', got {count}")]
    TooManyValues { part: String, count: usize },

    /// No converter is registered for the requested type.
    #[error("No converter registered for {key}")]
    NoConverter { key: String },

    /// The converter rejected a bound token.
    #[error("Invalid value '{input}' for '{part}': {failure}")]
    Conversion {
        part: String,
        input: String,
        failure: ConversionFailure,
    },
}

/// Errors raised by the built-in converters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConverterError {
    /// Input is not one of a fixed set of choices.
    #[error("Invalid value '{input}', acceptable values are {expected}")]
    Invalid { input: String, expected: String },

    /// Input could not be parsed as the target type.
    #[error("Cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },
}
