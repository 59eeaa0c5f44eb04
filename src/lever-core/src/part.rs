//! Command parts: the positional arguments, flags and sub-command slots that
//! make up a command's surface.

use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::key::{AnyKey, Key};

/// One declared piece of a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandPart {
    /// Positional argument.
    Argument(CommandArgument),
    /// Presence-only flag.
    Flag(NoArgCommandFlag),
    /// Flag followed by a value token.
    ArgFlag(ArgAcceptingCommandFlag),
    /// Slot dispatching to a nested command.
    SubCommand(SubCommandPart),
}

impl CommandPart {
    /// Display name: the argument or slot name, or the flag character.
    pub fn name(&self) -> String {
        match self {
            Self::Argument(arg) => arg.name.clone(),
            Self::Flag(flag) => flag.name.to_string(),
            Self::ArgFlag(flag) => flag.name.to_string(),
            Self::SubCommand(sub) => sub.name.clone(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Argument(arg) => &arg.description,
            Self::Flag(flag) => &flag.description,
            Self::ArgFlag(flag) => &flag.description,
            Self::SubCommand(sub) => &sub.description,
        }
    }

    /// Whether parsing fails when no token binds to this part.
    pub fn is_required(&self) -> bool {
        match self {
            Self::Argument(arg) => arg.is_required(),
            Self::Flag(_) | Self::ArgFlag(_) => false,
            Self::SubCommand(sub) => sub.required,
        }
    }

    /// Flag character, for either kind of flag.
    pub fn flag_char(&self) -> Option<char> {
        match self {
            Self::Flag(flag) => Some(flag.name),
            Self::ArgFlag(flag) => Some(flag.name),
            _ => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        self.flag_char().is_some()
    }

    /// Candidate value types, for parts that take a value.
    pub fn types(&self) -> &[AnyKey] {
        match self {
            Self::Argument(arg) => &arg.types,
            Self::ArgFlag(flag) => &flag.types,
            _ => &[],
        }
    }

    /// Values used when no token binds to this part.
    pub fn defaults(&self) -> &[String] {
        match self {
            Self::Argument(arg) => &arg.defaults,
            Self::ArgFlag(flag) => &flag.defaults,
            _ => &[],
        }
    }

    /// Plain-text usage form, e.g. `<target>`, `[-v]` or `<add|remove>`.
    pub fn text_representation(&self) -> String {
        match self {
            Self::Argument(arg) => {
                let ellipsis = if arg.variable { "..." } else { "" };
                if arg.is_required() {
                    format!("<{}{ellipsis}>", arg.name)
                } else {
                    format!("[{}{ellipsis}]", arg.name)
                }
            }
            Self::Flag(flag) => format!("[-{}]", flag.name),
            Self::ArgFlag(flag) => format!("[-{} <{}>]", flag.name, flag.argument_name),
            Self::SubCommand(sub) => {
                let names = sub
                    .commands
                    .iter()
                    .map(|cmd| cmd.name())
                    .collect::<Vec<_>>()
                    .join("|");
                if sub.required {
                    format!("<{names}>")
                } else {
                    format!("[{names}]")
                }
            }
        }
    }
}

impl fmt::Display for CommandPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text_representation())
    }
}

fn default_types(types: Vec<AnyKey>) -> Vec<AnyKey> {
    if types.is_empty() {
        vec![Key::<String>::of().into()]
    } else {
        types
    }
}

// ============================================================================
// Argument
// ============================================================================

/// Positional argument. Required unless it has default values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandArgument {
    name: String,
    description: String,
    defaults: Vec<String>,
    variable: bool,
    types: Vec<AnyKey>,
}

impl CommandArgument {
    pub fn builder(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> CommandArgumentBuilder {
        CommandArgumentBuilder {
            name: name.into(),
            description: description.into(),
            defaults: Vec::new(),
            variable: false,
            types: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// Whether this argument takes every remaining matching token.
    pub fn is_variable(&self) -> bool {
        self.variable
    }

    pub fn types(&self) -> &[AnyKey] {
        &self.types
    }

    pub fn is_required(&self) -> bool {
        self.defaults.is_empty()
    }
}

/// Builder for [`CommandArgument`].
#[derive(Debug)]
pub struct CommandArgumentBuilder {
    name: String,
    description: String,
    defaults: Vec<String>,
    variable: bool,
    types: Vec<AnyKey>,
}

impl CommandArgumentBuilder {
    /// Default values; a non-empty list makes the argument optional.
    pub fn defaults<I, S>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = defaults.into_iter().map(Into::into).collect();
        self
    }

    pub fn variable(mut self, variable: bool) -> Self {
        self.variable = variable;
        self
    }

    /// Add a candidate type. Candidates are tried in the order added;
    /// without any, the argument is a `String`.
    pub fn of_type<T>(mut self, key: Key<T>) -> Self {
        self.types.push(key.into());
        self
    }

    pub fn build(self) -> CommandArgument {
        CommandArgument {
            name: self.name,
            description: self.description,
            defaults: self.defaults,
            variable: self.variable,
            types: default_types(self.types),
        }
    }
}

// ============================================================================
// Flags
// ============================================================================

/// Flag whose value is its presence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoArgCommandFlag {
    name: char,
    description: String,
}

impl NoArgCommandFlag {
    pub fn new(name: char, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
        }
    }

    pub fn name(&self) -> char {
        self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Flag taking the following token as its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgAcceptingCommandFlag {
    name: char,
    description: String,
    argument_name: String,
    defaults: Vec<String>,
    types: Vec<AnyKey>,
}

impl ArgAcceptingCommandFlag {
    pub fn builder(name: char, description: impl Into<String>) -> ArgAcceptingCommandFlagBuilder {
        ArgAcceptingCommandFlagBuilder {
            name,
            description: description.into(),
            argument_name: "value".to_string(),
            defaults: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn name(&self) -> char {
        self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the value in usage text.
    pub fn argument_name(&self) -> &str {
        &self.argument_name
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    pub fn types(&self) -> &[AnyKey] {
        &self.types
    }
}

/// Builder for [`ArgAcceptingCommandFlag`].
#[derive(Debug)]
pub struct ArgAcceptingCommandFlagBuilder {
    name: char,
    description: String,
    argument_name: String,
    defaults: Vec<String>,
    types: Vec<AnyKey>,
}

impl ArgAcceptingCommandFlagBuilder {
    pub fn argument_name(mut self, argument_name: impl Into<String>) -> Self {
        self.argument_name = argument_name.into();
        self
    }

    pub fn defaults<I, S>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = defaults.into_iter().map(Into::into).collect();
        self
    }

    pub fn of_type<T>(mut self, key: Key<T>) -> Self {
        self.types.push(key.into());
        self
    }

    pub fn build(self) -> ArgAcceptingCommandFlag {
        ArgAcceptingCommandFlag {
            name: self.name,
            description: self.description,
            argument_name: self.argument_name,
            defaults: self.defaults,
            types: default_types(self.types),
        }
    }
}

// ============================================================================
// Sub-commands
// ============================================================================

/// Slot whose token names one of a set of nested commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubCommandPart {
    name: String,
    description: String,
    required: bool,
    commands: Vec<Arc<Command>>,
}

impl SubCommandPart {
    pub fn builder(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> SubCommandPartBuilder {
        SubCommandPartBuilder {
            name: name.into(),
            description: description.into(),
            required: true,
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }

    /// Nested command reachable as `name`, by name or alias.
    pub fn find(&self, name: &str) -> Option<&Arc<Command>> {
        self.commands.iter().find(|cmd| cmd.matches_name(name))
    }
}

/// Builder for [`SubCommandPart`].
#[derive(Debug)]
pub struct SubCommandPartBuilder {
    name: String,
    description: String,
    required: bool,
    commands: Vec<Arc<Command>>,
}

impl SubCommandPartBuilder {
    /// Slots are required unless marked optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn command(mut self, command: impl Into<Arc<Command>>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands<I, C>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Arc<Command>>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> SubCommandPart {
        SubCommandPart {
            name: self.name,
            description: self.description,
            required: self.required,
            commands: self.commands,
        }
    }
}

impl From<CommandArgument> for CommandPart {
    fn from(arg: CommandArgument) -> Self {
        Self::Argument(arg)
    }
}

impl From<NoArgCommandFlag> for CommandPart {
    fn from(flag: NoArgCommandFlag) -> Self {
        Self::Flag(flag)
    }
}

impl From<ArgAcceptingCommandFlag> for CommandPart {
    fn from(flag: ArgAcceptingCommandFlag) -> Self {
        Self::ArgFlag(flag)
    }
}

impl From<SubCommandPart> for CommandPart {
    fn from(sub: SubCommandPart) -> Self {
        Self::SubCommand(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_requiredness_follows_defaults() {
        let required = CommandArgument::builder("target", "Build target").build();
        let optional = CommandArgument::builder("profile", "Build profile")
            .defaults(["debug"])
            .build();

        assert!(required.is_required());
        assert!(!optional.is_required());
        assert_eq!(required.types(), &[AnyKey::from(Key::<String>::of())]);
    }

    #[test]
    fn test_text_representations() {
        let target: CommandPart = CommandArgument::builder("target", "").build().into();
        let extra: CommandPart = CommandArgument::builder("extra", "")
            .defaults(Vec::<String>::new())
            .variable(true)
            .build()
            .into();
        let rest: CommandPart = CommandArgument::builder("rest", "")
            .defaults([""])
            .variable(true)
            .build()
            .into();
        let verbose: CommandPart = NoArgCommandFlag::new('v', "Verbose").into();
        let output: CommandPart = ArgAcceptingCommandFlag::builder('o', "Output")
            .argument_name("file")
            .build()
            .into();
        let sub: CommandPart = SubCommandPart::builder("action", "")
            .command(Command::builder("add").build())
            .command(Command::builder("remove").build())
            .optional()
            .build()
            .into();

        assert_eq!(target.text_representation(), "<target>");
        assert_eq!(extra.text_representation(), "<extra...>");
        assert_eq!(rest.text_representation(), "[rest...]");
        assert_eq!(verbose.text_representation(), "[-v]");
        assert_eq!(output.text_representation(), "[-o <file>]");
        assert_eq!(sub.text_representation(), "[add|remove]");
    }

    #[test]
    fn test_flags_are_never_required() {
        let flag: CommandPart = NoArgCommandFlag::new('f', "").into();
        let arg_flag: CommandPart = ArgAcceptingCommandFlag::builder('g', "").build().into();
        assert!(!flag.is_required());
        assert!(!arg_flag.is_required());
        assert_eq!(arg_flag.flag_char(), Some('g'));
    }

    #[test]
    fn test_sub_command_find_by_alias() {
        let part = SubCommandPart::builder("action", "")
            .command(Command::builder("remove").alias("rm").build())
            .build();
        assert_eq!(part.find("rm").map(|c| c.name()), Some("remove"));
        assert!(part.find("add").is_none());
    }
}
