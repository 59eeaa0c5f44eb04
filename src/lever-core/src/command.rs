//! Command definitions.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::condition::Condition;
use crate::parameters::CommandParameters;
use crate::part::{ArgAcceptingCommandFlag, CommandArgument, CommandPart, SubCommandPart};
use crate::suggestion::{DefaultSuggestionProvider, SuggestionProvider};

/// Action run with the parsed parameters; returns a count of affected items.
pub type Action = Arc<dyn Fn(&CommandParameters) -> anyhow::Result<usize> + Send + Sync>;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a command definition.
///
/// Assigned by [`Command::builder`] and kept by [`Command::to_builder`], so a
/// command rebuilt from another counts as the same command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An immutable command definition.
#[derive(Clone)]
pub struct Command {
    id: CommandId,
    name: String,
    aliases: Vec<String>,
    description: String,
    footer: Option<String>,
    parts: Vec<CommandPart>,
    condition: Condition,
    action: Action,
    suggester: Arc<dyn SuggestionProvider>,
}

impl Command {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            id: CommandId::next(),
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            footer: None,
            parts: Vec::new(),
            condition: Condition::Always,
            action: Arc::new(|_| Ok(0)),
            suggester: Arc::new(DefaultSuggestionProvider),
        }
    }

    /// Builder pre-filled with this command, keeping its identity.
    pub fn to_builder(&self) -> CommandBuilder {
        CommandBuilder {
            id: self.id,
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            description: self.description.clone(),
            footer: self.footer.clone(),
            parts: self.parts.clone(),
            condition: self.condition.clone(),
            action: Arc::clone(&self.action),
            suggester: Arc::clone(&self.suggester),
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name followed by aliases.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.all_names().any(|n| n == name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    pub fn parts(&self) -> &[CommandPart] {
        &self.parts
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn suggester(&self) -> &Arc<dyn SuggestionProvider> {
        &self.suggester
    }

    /// Run the action.
    pub fn run(&self, parameters: &CommandParameters) -> anyhow::Result<usize> {
        (self.action)(parameters)
    }

    /// Flag part for `flag`, of either kind.
    pub fn flag(&self, flag: char) -> Option<&CommandPart> {
        self.parts.iter().find(|part| part.flag_char() == Some(flag))
    }

    /// Argument-accepting flag for `flag`.
    pub fn arg_flag(&self, flag: char) -> Option<&ArgAcceptingCommandFlag> {
        self.parts.iter().find_map(|part| match part {
            CommandPart::ArgFlag(f) if f.name() == flag => Some(f),
            _ => None,
        })
    }

    /// Positional parts (arguments and sub-command slots) in declared order.
    pub fn positionals(&self) -> impl Iterator<Item = &CommandPart> {
        self.parts.iter().filter(|part| !part.is_flag())
    }

    pub fn arguments(&self) -> impl Iterator<Item = &CommandArgument> {
        self.parts.iter().filter_map(|part| match part {
            CommandPart::Argument(arg) => Some(arg),
            _ => None,
        })
    }

    pub fn sub_command_part(&self) -> Option<&SubCommandPart> {
        self.parts.iter().find_map(|part| match part {
            CommandPart::SubCommand(sub) => Some(sub),
            _ => None,
        })
    }

    /// One-line usage: name, presence flags folded into one group, then the
    /// remaining parts in order.
    pub fn usage(&self) -> String {
        let mut pieces = vec![self.name.clone()];
        let flags: String = self
            .parts
            .iter()
            .filter_map(|part| match part {
                CommandPart::Flag(flag) => Some(flag.name()),
                _ => None,
            })
            .collect();
        if !flags.is_empty() {
            pieces.push(format!("[-{flags}]"));
        }
        pieces.extend(
            self.parts
                .iter()
                .filter(|part| !matches!(part, CommandPart::Flag(_)))
                .map(CommandPart::text_representation),
        );
        pieces.join(" ")
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parts", &self.parts.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Command`].
pub struct CommandBuilder {
    id: CommandId,
    name: String,
    aliases: Vec<String>,
    description: String,
    footer: Option<String>,
    parts: Vec<CommandPart>,
    condition: Condition,
    action: Action,
    suggester: Arc<dyn SuggestionProvider>,
}

impl CommandBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn part(mut self, part: impl Into<CommandPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn parts<I, P>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<CommandPart>,
    {
        self.parts.extend(parts.into_iter().map(Into::into));
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&CommandParameters) -> anyhow::Result<usize> + Send + Sync + 'static,
    {
        self.action = Arc::new(action);
        self
    }

    pub fn suggester(mut self, suggester: impl SuggestionProvider + 'static) -> Self {
        self.suggester = Arc::new(suggester);
        self
    }

    pub fn build(self) -> Command {
        Command {
            id: self.id,
            name: self.name,
            aliases: self.aliases,
            description: self.description,
            footer: self.footer,
            parts: self.parts,
            condition: self.condition,
            action: self.action,
            suggester: self.suggester,
        }
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
