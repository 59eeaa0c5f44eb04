//! Per-command structure derived once at registration.
//!
//! [`CommandInfo`] indexes a command's parts for the parser (flags by
//! character, positionals in order, sub-commands by name) and checks the
//! shape rules that keep greedy parsing unambiguous.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lever_core::{Command, CommandId, CommandPart, RegistrationError, StructuralViolation};

/// Parser-facing index of one command's parts.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    flags: HashMap<char, CommandPart>,
    positionals: Vec<CommandPart>,
    defaults_provided: Vec<CommandPart>,
    sub_commands: HashMap<String, Arc<Command>>,
    required_parts: usize,
}

impl CommandInfo {
    /// Index `command` and check its shape.
    pub fn from_command(command: &Command) -> Result<Self, StructuralViolation> {
        let info = Self::index(command);
        validate(command)?;
        Ok(info)
    }

    /// Index `command` without checking its shape.
    pub(crate) fn index(command: &Command) -> Self {
        let mut flags = HashMap::new();
        let mut positionals = Vec::new();
        let mut defaults_provided = Vec::new();
        let mut sub_commands = HashMap::new();
        let mut required_parts = 0;

        for part in command.parts() {
            match part {
                CommandPart::Flag(_) | CommandPart::ArgFlag(_) => {
                    if let Some(c) = part.flag_char() {
                        flags.entry(c).or_insert_with(|| part.clone());
                    }
                }
                CommandPart::Argument(_) => positionals.push(part.clone()),
                CommandPart::SubCommand(sub) => {
                    for cmd in sub.commands() {
                        for name in cmd.all_names() {
                            sub_commands
                                .entry(name.to_string())
                                .or_insert_with(|| Arc::clone(cmd));
                        }
                    }
                    positionals.push(part.clone());
                }
            }
            if part.is_required() {
                required_parts += 1;
            }
            if !part.defaults().is_empty() {
                defaults_provided.push(part.clone());
            }
        }

        Self {
            flags,
            positionals,
            defaults_provided,
            sub_commands,
            required_parts,
        }
    }

    pub fn flag(&self, c: char) -> Option<&CommandPart> {
        self.flags.get(&c)
    }

    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Arguments and sub-command slots in declared order.
    pub fn positionals(&self) -> &[CommandPart] {
        &self.positionals
    }

    /// Parts whose defaults apply when nothing binds to them.
    pub fn defaults_provided(&self) -> &[CommandPart] {
        &self.defaults_provided
    }

    /// Nested command reachable as `name` from the sub-command slot.
    pub fn sub_command(&self, name: &str) -> Option<&Arc<Command>> {
        self.sub_commands.get(name)
    }

    pub fn has_sub_commands(&self) -> bool {
        !self.sub_commands.is_empty()
    }

    /// Number of required positional parts.
    pub fn required_parts(&self) -> usize {
        self.required_parts
    }
}

fn validate(command: &Command) -> Result<(), StructuralViolation> {
    let parts = command.parts();
    let mut seen_flags = HashSet::new();
    let mut first_optional: Option<&str> = None;
    let mut middle_optional: Option<(String, String)> = None;
    let mut variable: Option<&str> = None;
    let mut has_required_sub_command = false;
    let mut seen_sub_command = false;

    for (idx, part) in parts.iter().enumerate() {
        match part {
            CommandPart::Flag(_) | CommandPart::ArgFlag(_) => {
                if let Some(c) = part.flag_char() {
                    if !seen_flags.insert(c) {
                        return Err(StructuralViolation::DuplicateFlag { flag: c });
                    }
                }
            }
            CommandPart::Argument(arg) => {
                if let Some(variable) = variable {
                    if arg.is_variable() {
                        return Err(StructuralViolation::TooManyVariableArguments {
                            first: variable.to_string(),
                            second: arg.name().to_string(),
                        });
                    }
                    return Err(StructuralViolation::VariableArgumentNotLast {
                        variable: variable.to_string(),
                        following: arg.name().to_string(),
                    });
                }
                if arg.is_variable() {
                    variable = Some(arg.name());
                }
                if !arg.is_required() {
                    first_optional.get_or_insert(arg.name());
                } else if middle_optional.is_none() {
                    if let Some(optional) = first_optional {
                        middle_optional = Some((optional.to_string(), arg.name().to_string()));
                    }
                }
            }
            CommandPart::SubCommand(sub) => {
                if seen_sub_command {
                    return Err(StructuralViolation::MultipleSubCommandParts);
                }
                seen_sub_command = true;
                if sub.is_required() {
                    if idx + 1 < parts.len() {
                        return Err(StructuralViolation::RequiredSubCommandNotLast {
                            part: sub.name().to_string(),
                        });
                    }
                    has_required_sub_command = true;
                }
                let mut names: HashMap<&str, CommandId> = HashMap::new();
                for cmd in sub.commands() {
                    for name in cmd.all_names() {
                        match names.insert(name, cmd.id()) {
                            Some(other) if other != cmd.id() => {
                                return Err(StructuralViolation::DuplicateSubCommandName {
                                    name: name.to_string(),
                                });
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    if has_required_sub_command {
        if let Some((optional, required)) = middle_optional {
            return Err(StructuralViolation::AmbiguousOptionalArgument { optional, required });
        }
    }
    Ok(())
}

/// Memoized [`CommandInfo`]s, keyed by command allocation.
///
/// The cache holds on to every command it indexed, so an address is never
/// reused while its entry exists.
#[derive(Debug, Default, Clone)]
pub(crate) struct CommandInfoCache {
    infos: HashMap<usize, (Arc<Command>, Arc<CommandInfo>)>,
}

fn cache_key(command: &Arc<Command>) -> usize {
    Arc::as_ptr(command) as usize
}

impl CommandInfoCache {
    /// Cached info, or a fresh index for commands never registered.
    pub(crate) fn get(&self, command: &Arc<Command>) -> Arc<CommandInfo> {
        self.infos
            .get(&cache_key(command))
            .map(|(_, info)| Arc::clone(info))
            .unwrap_or_else(|| Arc::new(CommandInfo::index(command)))
    }

    pub(crate) fn extend(&mut self, other: CommandInfoCache) {
        self.infos.extend(other.infos);
    }

    pub(crate) fn contains(&self, command: &Arc<Command>) -> bool {
        self.infos.contains_key(&cache_key(command))
    }

    pub(crate) fn len(&self) -> usize {
        self.infos.len()
    }

    /// Drop entries for commands no longer reachable from `roots`.
    pub(crate) fn retain_reachable<'a, I>(&mut self, roots: I)
    where
        I: IntoIterator<Item = &'a Arc<Command>>,
    {
        let mut reachable = HashSet::new();
        let mut pending: Vec<&Arc<Command>> = roots.into_iter().collect();
        while let Some(command) = pending.pop() {
            if !reachable.insert(cache_key(command)) {
                continue;
            }
            if let Some(sub) = command.sub_command_part() {
                pending.extend(sub.commands());
            }
        }
        self.infos.retain(|key, _| reachable.contains(key));
    }

    /// Validate `root` and everything reachable through its sub-command
    /// parts, collecting infos for commands not already in `known`.
    pub(crate) fn validate_tree(
        root: &Arc<Command>,
        known: &CommandInfoCache,
    ) -> Result<CommandInfoCache, RegistrationError> {
        let mut fresh = CommandInfoCache::default();
        let mut stack = Vec::new();
        visit(root, known, &mut fresh, &mut stack)?;
        Ok(fresh)
    }
}

fn visit<'a>(
    command: &'a Arc<Command>,
    known: &CommandInfoCache,
    fresh: &mut CommandInfoCache,
    stack: &mut Vec<&'a Arc<Command>>,
) -> Result<(), RegistrationError> {
    if stack.iter().any(|c| c.id() == command.id()) {
        let mut path: Vec<String> = stack.iter().map(|c| c.name().to_string()).collect();
        path.push(command.name().to_string());
        return Err(RegistrationError::SelfReferential {
            command: command.name().to_string(),
            path,
        });
    }
    if known.contains(command) || fresh.contains(command) {
        return Ok(());
    }

    let info = CommandInfo::from_command(command).map_err(|violation| {
        RegistrationError::Structural {
            command: command.name().to_string(),
            violation,
        }
    })?;

    stack.push(command);
    if let Some(sub) = command.sub_command_part() {
        for child in sub.commands() {
            visit(child, known, fresh, stack)?;
        }
    }
    stack.pop();

    fresh
        .infos
        .insert(cache_key(command), (Arc::clone(command), Arc::new(info)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lever_core::{ArgAcceptingCommandFlag, CommandArgument, NoArgCommandFlag, SubCommandPart};

    fn required(name: &str) -> CommandArgument {
        CommandArgument::builder(name, "").build()
    }

    fn optional(name: &str) -> CommandArgument {
        CommandArgument::builder(name, "").defaults(["x"]).build()
    }

    fn variable(name: &str) -> CommandArgument {
        CommandArgument::builder(name, "").variable(true).build()
    }

    fn sub_part(required: bool) -> SubCommandPart {
        let builder = SubCommandPart::builder("action", "")
            .command(Command::builder("add").build())
            .command(Command::builder("remove").alias("rm").build());
        if required { builder.build() } else { builder.optional().build() }
    }

    #[test]
    fn test_index_partitions_parts() {
        let cmd = Command::builder("cmd")
            .part(NoArgCommandFlag::new('v', ""))
            .part(required("a"))
            .part(ArgAcceptingCommandFlag::builder('o', "").defaults(["out"]).build())
            .part(optional("b"))
            .build();
        let info = CommandInfo::from_command(&cmd).unwrap();

        assert!(info.flag('v').is_some());
        assert!(info.flag('o').is_some());
        assert_eq!(info.positionals().len(), 2);
        assert_eq!(info.defaults_provided().len(), 2);
        assert_eq!(info.required_parts(), 1);
    }

    #[test]
    fn test_sub_command_table_includes_aliases() {
        let cmd = Command::builder("cmd").part(sub_part(true)).build();
        let info = CommandInfo::from_command(&cmd).unwrap();
        assert_eq!(info.sub_command("rm").map(|c| c.name()), Some("remove"));
        assert_eq!(info.required_parts(), 1);
    }

    #[test]
    fn test_required_sub_command_must_be_last() {
        let cmd = Command::builder("cmd")
            .part(sub_part(true))
            .part(required("a"))
            .build();
        assert!(matches!(
            CommandInfo::from_command(&cmd),
            Err(StructuralViolation::RequiredSubCommandNotLast { .. })
        ));

        let flag_after = Command::builder("cmd")
            .part(sub_part(true))
            .part(NoArgCommandFlag::new('v', ""))
            .build();
        assert!(CommandInfo::from_command(&flag_after).is_err());
    }

    #[test]
    fn test_variable_argument_rules() {
        let two = Command::builder("cmd")
            .part(variable("a"))
            .part(variable("b"))
            .build();
        assert!(matches!(
            CommandInfo::from_command(&two),
            Err(StructuralViolation::TooManyVariableArguments { .. })
        ));

        let not_last = Command::builder("cmd")
            .part(variable("a"))
            .part(required("b"))
            .build();
        assert!(matches!(
            CommandInfo::from_command(&not_last),
            Err(StructuralViolation::VariableArgumentNotLast { .. })
        ));

        let before_sub = Command::builder("cmd")
            .part(variable("a"))
            .part(sub_part(false))
            .build();
        assert!(CommandInfo::from_command(&before_sub).is_ok());
    }

    #[test]
    fn test_middle_optional_with_required_sub_command() {
        let ambiguous = Command::builder("cmd")
            .part(optional("a"))
            .part(required("b"))
            .part(sub_part(true))
            .build();
        assert_eq!(
            CommandInfo::from_command(&ambiguous).unwrap_err(),
            StructuralViolation::AmbiguousOptionalArgument {
                optional: "a".to_string(),
                required: "b".to_string(),
            }
        );

        let no_sub = Command::builder("cmd")
            .part(optional("a"))
            .part(required("b"))
            .build();
        assert!(CommandInfo::from_command(&no_sub).is_ok());
    }

    #[test]
    fn test_duplicate_flags_and_names() {
        let flags = Command::builder("cmd")
            .part(NoArgCommandFlag::new('v', ""))
            .part(ArgAcceptingCommandFlag::builder('v', "").build())
            .build();
        assert_eq!(
            CommandInfo::from_command(&flags).unwrap_err(),
            StructuralViolation::DuplicateFlag { flag: 'v' }
        );

        let names = Command::builder("cmd")
            .part(
                SubCommandPart::builder("action", "")
                    .command(Command::builder("add").build())
                    .command(Command::builder("append").alias("add").build())
                    .build(),
            )
            .build();
        assert!(matches!(
            CommandInfo::from_command(&names),
            Err(StructuralViolation::DuplicateSubCommandName { .. })
        ));
    }

    #[test]
    fn test_self_reference_detected() {
        let inner = Command::builder("loop").build();
        let looped = Arc::new(
            inner
                .to_builder()
                .part(SubCommandPart::builder("next", "").optional().command(inner.clone()).build())
                .build(),
        );

        let err =
            CommandInfoCache::validate_tree(&looped, &CommandInfoCache::default()).unwrap_err();
        assert!(matches!(err, RegistrationError::SelfReferential { .. }), "{err}");
    }

    #[test]
    fn test_nested_violation_reported() {
        let broken = Command::builder("broken")
            .part(variable("a"))
            .part(variable("b"))
            .build();
        let root = Arc::new(
            Command::builder("root")
                .part(SubCommandPart::builder("sub", "").command(broken).build())
                .build(),
        );

        let err = CommandInfoCache::validate_tree(&root, &CommandInfoCache::default()).unwrap_err();
        assert!(
            matches!(&err, RegistrationError::Structural { command, .. } if command == "broken"),
            "{err}"
        );
    }
}
