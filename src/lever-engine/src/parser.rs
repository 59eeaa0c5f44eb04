//! Greedy, non-backtracking command line parser.
//!
//! Tokens are consumed left to right against the current command's parts.
//! A token naming a nested command in a sub-command slot switches the parser
//! to that command; its condition is checked before anything else is read.

use std::sync::Arc;

use lever_core::{
    ArgBinding, ArgumentConverterAccess, Command, CommandError, CommandMetadata,
    CommandParameters, CommandParseResult, CommandPart, ConversionFailure, InjectedValueAccess,
    PartMatch, SubCommandPart,
};
use tracing::{debug, trace};

use crate::info::{CommandInfo, CommandInfoCache};

/// Everything a parse needs besides the input.
pub(crate) struct CommandParser<'a> {
    infos: &'a CommandInfoCache,
    converters: Arc<dyn ArgumentConverterAccess>,
    injected: Arc<dyn InjectedValueAccess>,
    flag_terminator: bool,
}

impl<'a> CommandParser<'a> {
    pub(crate) fn new(
        infos: &'a CommandInfoCache,
        converters: Arc<dyn ArgumentConverterAccess>,
        injected: Arc<dyn InjectedValueAccess>,
        flag_terminator: bool,
    ) -> Self {
        Self {
            infos,
            converters,
            injected,
            flag_terminator,
        }
    }

    /// Parse `metadata.arguments` against `root`.
    pub(crate) fn parse(
        &self,
        root: Arc<Command>,
        metadata: &CommandMetadata,
    ) -> Result<CommandParseResult, CommandError> {
        let id = parse_id();
        let span = tracing::debug_span!("parse", %id, command = %metadata.called_name);
        let _enter = span.enter();

        let mut parameters =
            CommandParameters::new(Arc::clone(&self.injected), Arc::clone(&self.converters));
        parameters.set_metadata(metadata.clone());

        let state = ParseState {
            parser: self,
            tokens: &metadata.arguments,
            pos: 0,
            level: Level::new(&root, self.infos),
            path: vec![root],
            bindings: Vec::new(),
            parameters,
        };
        state.run()
    }
}

/// Random id tying together the events of one parse.
fn parse_id() -> String {
    use rand::Rng;

    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    (0..8)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Progress through the parts of the command being parsed.
struct Level {
    info: Arc<CommandInfo>,
    next_part: usize,
    remaining_required: usize,
    flags_enabled: bool,
    /// Variable argument bound last; it keeps taking values once the
    /// positionals run out, so a flag may sit inside its tail.
    open_variable: Option<CommandPart>,
}

impl Level {
    fn new(command: &Arc<Command>, infos: &CommandInfoCache) -> Self {
        let info = infos.get(command);
        Self {
            remaining_required: info.required_parts(),
            info,
            next_part: 0,
            flags_enabled: true,
            open_variable: None,
        }
    }
}

struct ParseState<'p> {
    parser: &'p CommandParser<'p>,
    tokens: &'p [String],
    pos: usize,
    level: Level,
    path: Vec<Arc<Command>>,
    bindings: Vec<ArgBinding>,
    parameters: CommandParameters,
}

impl<'p> ParseState<'p> {
    fn run(mut self) -> Result<CommandParseResult, CommandError> {
        self.check_condition()?;

        while let Some(token) = self.next_token() {
            if self.is_terminator(token) {
                trace!("flag terminator, remaining tokens are positional");
                self.level.flags_enabled = false;
                self.bindings.push(ArgBinding::new(token, Vec::new()));
                continue;
            }
            if self.is_flag_cluster(token)? {
                self.parse_flags(token)?;
            } else {
                self.parse_positional(token)?;
            }
        }

        self.finish()
    }

    fn next_token(&mut self) -> Option<&'p str> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos)?;
        self.pos += 1;
        Some(token.as_str())
    }

    fn is_terminator(&self, token: &str) -> bool {
        self.level.flags_enabled && self.parser.flag_terminator && token == "--"
    }

    /// `-abc` where every character is a flag of the current command.
    fn is_known_cluster(&self, token: &str) -> bool {
        self.level.flags_enabled
            && token.len() > 1
            && token.starts_with('-')
            && token[1..].chars().all(|c| self.level.info.flag(c).is_some())
    }

    /// Decide whether a dash-prefixed token is a flag cluster.
    ///
    /// A token with unknown flag characters is still a value when the next
    /// positional accepts it, so `-5` reaches an integer argument.
    fn is_flag_cluster(&self, token: &str) -> Result<bool, CommandError> {
        if !self.level.flags_enabled || token.len() < 2 || !token.starts_with('-') {
            return Ok(false);
        }
        let unknown = token[1..].chars().find(|&c| self.level.info.flag(c).is_none());
        match unknown {
            None => Ok(true),
            Some(_) if self.next_positional_accepts(token) => {
                trace!(token, "dash token taken as a value");
                Ok(false)
            }
            Some(flag) => {
                debug!(flag = %flag, "unknown flag");
                Err(CommandError::NoSuchFlag {
                    flag,
                    parse: self.snapshot(),
                })
            }
        }
    }

    fn next_positional_accepts(&self, token: &str) -> bool {
        for part in &self.level.info.positionals()[self.level.next_part..] {
            match part {
                CommandPart::Argument(_) if self.convert(part, token).is_ok() => return true,
                CommandPart::SubCommand(_) if self.level.info.sub_command(token).is_some() => {
                    return true;
                }
                _ => {}
            }
            if part.is_required() {
                return false;
            }
        }
        self.level
            .open_variable
            .as_ref()
            .is_some_and(|part| self.convert(part, token).is_ok())
    }

    /// Resume the variable argument after a flag interrupted its tail.
    fn resume_variable(&mut self, token: &'p str) -> bool {
        if self.level.next_part < self.level.info.positionals().len() {
            return false;
        }
        let Some(part) = self.level.open_variable.clone() else {
            return false;
        };
        match self.convert(&part, token) {
            Ok(exact) => {
                trace!(argument = %part.name(), token, "variable argument resumes");
                self.consume_argument(&part, token, exact);
                true
            }
            Err(_) => false,
        }
    }

    fn parse_flags(&mut self, token: &'p str) -> Result<(), CommandError> {
        let cluster = &token[1..];
        let mut matched = Vec::new();
        let mut chars = cluster.chars().peekable();

        while let Some(c) = chars.next() {
            let Some(part) = self.level.info.flag(c).cloned() else {
                return Err(CommandError::NoSuchFlag {
                    flag: c,
                    parse: self.snapshot(),
                });
            };
            self.parameters.mark_present(&part);

            if matches!(part, CommandPart::ArgFlag(_)) {
                if chars.peek().is_some() {
                    return Err(CommandError::ArgFlagNotLast {
                        flag: c,
                        group: cluster.to_string(),
                        parse: self.snapshot(),
                    });
                }
                matched.push(PartMatch {
                    part: part.clone(),
                    exact: true,
                });
                self.bindings.push(ArgBinding::new(token, matched));
                return self.parse_flag_value(&part);
            }

            matched.push(PartMatch { part, exact: true });
        }

        trace!(flags = cluster, "bound flags");
        self.bindings.push(ArgBinding::new(token, matched));
        Ok(())
    }

    fn parse_flag_value(&mut self, part: &CommandPart) -> Result<(), CommandError> {
        let Some(value) = self.next_token() else {
            trace!(flag = %part.name(), "no value follows flag, defaults apply");
            return Ok(());
        };
        match self.convert(part, value) {
            Ok(exact) => {
                self.bind(part, value, exact);
                Ok(())
            }
            Err(failure) => Err(self.conversion_failed(part, value, failure)),
        }
    }

    fn parse_positional(&mut self, token: &'p str) -> Result<(), CommandError> {
        if self.resume_variable(token) {
            return Ok(());
        }
        let mut failed_optional: Option<(CommandPart, ConversionFailure)> = None;

        while let Some(part) = self
            .level
            .info
            .positionals()
            .get(self.level.next_part)
            .cloned()
        {
            self.level.next_part += 1;
            match &part {
                CommandPart::SubCommand(sub) => {
                    if let Some(command) = self.level.info.sub_command(token).cloned() {
                        self.parameters.mark_present(&part);
                        self.bindings.push(ArgBinding::new(
                            token,
                            vec![PartMatch {
                                part: part.clone(),
                                exact: true,
                            }],
                        ));
                        return self.descend(command);
                    }
                    if sub.is_required() {
                        return Err(CommandError::InvalidSubCommand {
                            input: token.to_string(),
                            options: command_names(sub),
                            parse: self.snapshot(),
                        });
                    }
                    trace!(part = sub.name(), "skipping optional sub-command");
                }
                CommandPart::Argument(arg) => {
                    if !arg.is_required()
                        && !self.level.info.has_sub_commands()
                        && self.remaining_values() <= self.level.remaining_required
                    {
                        trace!(argument = arg.name(), "leaving optional argument to defaults");
                        continue;
                    }
                    match self.convert(&part, token) {
                        Ok(exact) => {
                            if arg.is_required() {
                                self.level.remaining_required =
                                    self.level.remaining_required.saturating_sub(1);
                            }
                            self.consume_argument(&part, token, exact);
                            return Ok(());
                        }
                        Err(failure) if arg.is_required() => {
                            return Err(self.conversion_failed(&part, token, failure));
                        }
                        Err(failure) => {
                            trace!(
                                argument = arg.name(),
                                token,
                                "optional argument rejected token"
                            );
                            failed_optional = Some((part.clone(), failure));
                        }
                    }
                }
                CommandPart::Flag(_) | CommandPart::ArgFlag(_) => {}
            }
        }

        match failed_optional {
            Some((part, failure)) => Err(self.conversion_failed(&part, token, failure)),
            None => Err(CommandError::TooManyArguments {
                extra: self.tokens[self.pos - 1..].to_vec(),
                parse: self.snapshot(),
            }),
        }
    }

    /// Tokens from the current one on that would bind to positionals.
    fn remaining_values(&self) -> usize {
        let mut flags_enabled = self.level.flags_enabled;
        let mut count = 0;
        let mut tokens = self.tokens[self.pos.saturating_sub(1)..].iter();

        while let Some(token) = tokens.next() {
            if flags_enabled && self.parser.flag_terminator && token == "--" {
                flags_enabled = false;
                continue;
            }
            if flags_enabled && self.is_known_cluster(token) {
                let takes_value = token
                    .chars()
                    .last()
                    .and_then(|c| self.level.info.flag(c))
                    .is_some_and(|part| matches!(part, CommandPart::ArgFlag(_)));
                if takes_value {
                    tokens.next();
                }
                continue;
            }
            count += 1;
        }
        count
    }

    /// Bind `first` and, for a variable argument, every following token it
    /// accepts.
    fn consume_argument(&mut self, part: &CommandPart, first: &'p str, exact: bool) {
        self.bind(part, first, exact);

        let CommandPart::Argument(arg) = part else {
            return;
        };
        if !arg.is_variable() {
            self.level.open_variable = None;
            return;
        }
        self.level.open_variable = Some(part.clone());

        let tokens = self.tokens;
        while let Some(next) = tokens.get(self.pos) {
            if self.is_terminator(next) || self.is_known_cluster(next) {
                break;
            }
            if self.level.info.sub_command(next).is_some() {
                break;
            }
            match self.convert(part, next) {
                Ok(exact) => {
                    self.pos += 1;
                    self.bind(part, next, exact);
                }
                Err(_) => {
                    trace!(argument = arg.name(), token = %next, "variable argument stops");
                    break;
                }
            }
        }
    }

    fn bind(&mut self, part: &CommandPart, token: &str, exact: bool) {
        self.parameters.bind(part, token);
        self.bindings.push(ArgBinding::new(
            token,
            vec![PartMatch {
                part: part.clone(),
                exact,
            }],
        ));
    }

    fn descend(&mut self, command: Arc<Command>) -> Result<(), CommandError> {
        self.fill_defaults();
        debug!(command = command.name(), "entering sub-command");
        self.level = Level::new(&command, self.parser.infos);
        self.path.push(command);
        self.check_condition()
    }

    fn check_condition(&self) -> Result<(), CommandError> {
        let Some(command) = self.path.last() else {
            return Ok(());
        };
        if command.condition().satisfied(&self.parameters) {
            return Ok(());
        }
        debug!(command = command.name(), "condition not satisfied");
        Err(CommandError::ConditionFailed {
            path: self.path.clone(),
        })
    }

    /// Try each candidate type in order; the first success wins.
    fn convert(&self, part: &CommandPart, input: &str) -> Result<bool, ConversionFailure> {
        let mut failure: Option<ConversionFailure> = None;
        for key in part.types() {
            let result = match self.parser.converters.converter_handle(key) {
                Some(converter) => converter.check(input, self.parser.injected.as_ref()),
                None => Err(ConversionFailure::new(format!(
                    "No converter registered for {key}"
                ))),
            };
            match result {
                Ok(exact) => return Ok(exact),
                Err(err) => {
                    failure = Some(match failure {
                        Some(previous) => previous.then(err),
                        None => err,
                    });
                }
            }
        }
        Err(failure.unwrap_or_else(|| {
            ConversionFailure::new(format!("No types declared for {}", part.name()))
        }))
    }

    fn conversion_failed(
        &self,
        part: &CommandPart,
        input: &str,
        failure: ConversionFailure,
    ) -> CommandError {
        let acceptable = part
            .types()
            .iter()
            .map(|key| match self.parser.converters.converter_handle(key) {
                Some(converter) => converter.describe_acceptable_arguments(),
                None => key.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" or ");
        debug!(part = %part.name(), input, %failure, "conversion failed");
        CommandError::ConversionFailed {
            part: part.text_representation(),
            input: input.to_string(),
            acceptable,
            failure,
            parse: self.snapshot(),
        }
    }

    fn fill_defaults(&mut self) {
        let info = Arc::clone(&self.level.info);
        for part in info.defaults_provided() {
            self.parameters.apply_defaults(part);
        }
    }

    /// The parse so far, with the current command's defaults filled in.
    fn snapshot(&self) -> Box<CommandParseResult> {
        let mut parameters = self.parameters.clone();
        for part in self.level.info.defaults_provided() {
            parameters.apply_defaults(part);
        }
        Box::new(CommandParseResult::new(
            self.path.clone(),
            self.bindings.clone(),
            parameters,
        ))
    }

    fn finish(mut self) -> Result<CommandParseResult, CommandError> {
        let info = Arc::clone(&self.level.info);
        let missing = info.positionals()[self.level.next_part..]
            .iter()
            .find(|part| part.is_required());

        match missing {
            Some(CommandPart::SubCommand(sub)) => {
                return Err(CommandError::MissingSubCommand {
                    options: command_names(sub),
                    parse: self.snapshot(),
                });
            }
            Some(part) => {
                return Err(CommandError::MissingRequiredArgument {
                    part: part.text_representation(),
                    parse: self.snapshot(),
                });
            }
            None => {}
        }

        self.fill_defaults();
        debug!(
            depth = self.path.len(),
            bound = self.bindings.len(),
            "parse complete"
        );
        Ok(CommandParseResult::new(
            self.path,
            self.bindings,
            self.parameters,
        ))
    }
}

fn command_names(sub: &SubCommandPart) -> Vec<String> {
    sub.commands()
        .iter()
        .map(|command| command.name().to_string())
        .collect()
}
