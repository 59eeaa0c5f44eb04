//! Command manager: registration, parsing, execution and suggestions.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use lever_core::converter::{ArgumentConverter, limit_by_prefix, register_default_converters};
use lever_core::inject::{MapBackedValueStore, MemoizingValueAccess, MergedValueAccess};
use lever_core::{
    ArgumentConverterAccess, ArgumentConverterAccessExt, ArgumentConverterStore, Command,
    CommandError, CommandMetadata, CommandParameters, CommandParseResult, InjectedValueAccess, Key,
    RegistrationError, Suggestion,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ManagerConfig;
use crate::info::CommandInfoCache;
use crate::parser::CommandParser;

/// Registry of root commands and the converters and values they parse with.
///
/// Registration takes the write lock; lookups take the read lock. Parsing
/// and suggestions only hold the read lock long enough to clone the shared
/// state, so conditions, converters, providers and actions may call back
/// into the manager, including registering further commands.
pub struct CommandManager {
    config: ManagerConfig,
    state: RwLock<ManagerState>,
}

#[derive(Default)]
struct ManagerState {
    /// Every name and alias mapped to its command.
    commands: HashMap<String, Arc<Command>>,
    converters: Arc<ArgumentConverterStore>,
    values: Arc<MapBackedValueStore>,
    infos: Arc<CommandInfoCache>,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager {
    /// Create a manager with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let mut state = ManagerState::default();
        if config.register_default_converters {
            register_default_converters(Arc::make_mut(&mut state.converters));
        }
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Validate `command` and everything nested in it, then register it
    /// under its name and aliases.
    ///
    /// Registering a command with the same id as a registered one replaces
    /// it. Any name held by a different command is a conflict, and nothing
    /// is registered.
    pub fn register(&self, command: Command) -> Result<Arc<Command>, RegistrationError> {
        let command = Arc::new(command);
        let mut guard = self.state.write();
        let state = &mut *guard;

        let fresh = CommandInfoCache::validate_tree(&command, &state.infos)?;

        for name in command.all_names() {
            if let Some(existing) = state.commands.get(name) {
                if existing.id() != command.id() {
                    warn!(
                        name,
                        existing = existing.name(),
                        rejected = command.name(),
                        "command name conflict"
                    );
                    return Err(RegistrationError::Conflict {
                        name: name.to_string(),
                        existing: existing.name().to_string(),
                        rejected: command.name().to_string(),
                    });
                }
            }
        }

        let registered = state.commands.len();
        state.commands.retain(|_, existing| existing.id() != command.id());
        let replaced = state.commands.len() != registered;
        for name in command.all_names() {
            state.commands.insert(name.to_string(), Arc::clone(&command));
        }

        let infos = Arc::make_mut(&mut state.infos);
        infos.extend(fresh);
        if replaced {
            infos.retain_reachable(state.commands.values());
            debug!(command = command.name(), cached = infos.len(), "replaced command");
        }

        debug!(
            command = command.name(),
            aliases = ?command.aliases(),
            "registered command"
        );
        Ok(command)
    }

    /// Register the converter for `key`, replacing any previous one.
    pub fn register_converter<T, C>(&self, key: Key<T>, converter: C)
    where
        T: 'static,
        C: ArgumentConverter<T> + 'static,
    {
        debug!(key = %key.erased(), "registered converter");
        let mut state = self.state.write();
        Arc::make_mut(&mut state.converters).register(key, converter);
    }

    pub fn converter<T: 'static>(&self, key: &Key<T>) -> Option<Arc<dyn ArgumentConverter<T>>> {
        self.state.read().converters.converter(key)
    }

    /// Make `value` available to every parse under `key`.
    pub fn inject_value<T: Any + Send + Sync>(&self, key: Key<T>, value: T) {
        let mut state = self.state.write();
        Arc::make_mut(&mut state.values).inject(key, value);
    }

    /// Make a computed value available to every parse under `key`.
    ///
    /// The provider sees the manager's other injected values.
    pub fn inject_provider<T, F>(&self, key: Key<T>, provider: F)
    where
        T: Any + Send + Sync,
        F: Fn(&dyn InjectedValueAccess) -> Option<T> + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        Arc::make_mut(&mut state.values).inject_with(key, provider);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Command registered under `name` or an alias.
    pub fn command(&self, name: &str) -> Option<Arc<Command>> {
        self.state.read().commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().commands.contains_key(name)
    }

    /// Every registered command once, sorted by name.
    pub fn all_commands(&self) -> Vec<Arc<Command>> {
        let state = self.state.read();
        let mut commands: Vec<Arc<Command>> = Vec::new();
        for command in state.commands.values() {
            if !commands.iter().any(|c| c.id() == command.id()) {
                commands.push(Arc::clone(command));
            }
        }
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    // ========================================================================
    // Parsing and execution
    // ========================================================================

    /// Parse `tokens`, the first of which names a root command.
    ///
    /// `context` is consulted before the manager's own injected values.
    pub fn parse<C, S>(&self, context: C, tokens: &[S]) -> Result<CommandParseResult, CommandError>
    where
        C: InjectedValueAccess + 'static,
        S: AsRef<str>,
    {
        let Some((name, rest)) = tokens.split_first() else {
            return Err(CommandError::NoSuchCommand {
                name: String::new(),
            });
        };
        let name: &str = name.as_ref();

        let (root, infos, converters, injected) = {
            let state = self.state.read();
            let root = state
                .commands
                .get(name)
                .cloned()
                .ok_or_else(|| CommandError::NoSuchCommand {
                    name: name.to_string(),
                })?;
            (
                root,
                Arc::clone(&state.infos),
                state.converter_access(),
                state.injected(Arc::new(context)),
            )
        };

        let metadata = CommandMetadata {
            called_name: name.to_string(),
            arguments: rest.iter().map(|token| token.as_ref().to_string()).collect(),
        };
        let parser =
            CommandParser::new(&infos, converters, injected, self.config.flag_terminator);
        parser.parse(root, &metadata)
    }

    /// Parse `tokens` and run the primary command's action.
    ///
    /// Returns the action's result code. An action error is wrapped in
    /// [`CommandError::Execution`] with the path that led to it.
    pub fn execute<C, S>(&self, context: C, tokens: &[S]) -> Result<usize, CommandError>
    where
        C: InjectedValueAccess + 'static,
        S: AsRef<str>,
    {
        let result = self.parse(context, tokens)?;
        let Some(command) = result.primary_command() else {
            return Err(CommandError::NoSuchCommand {
                name: String::new(),
            });
        };

        debug!(command = command.name(), "executing");
        command
            .run(result.parameters())
            .map_err(|source| CommandError::Execution {
                path: result.execution_path().to_vec(),
                source: source.into(),
            })
    }

    // ========================================================================
    // Suggestions
    // ========================================================================

    /// Completions for the last token of `tokens`.
    ///
    /// `replaced_index` is an index into `tokens`. A single token completes
    /// registered command names.
    pub fn suggestions<C, S>(&self, context: C, tokens: &[S]) -> BTreeSet<Suggestion>
    where
        C: InjectedValueAccess + 'static,
        S: AsRef<str>,
    {
        let suggestions = match tokens {
            [] => BTreeSet::new(),
            [only] => self.root_suggestions(context, only.as_ref()),
            [_, rest @ ..] => {
                let parse = match self.parse(context, tokens) {
                    Ok(parse) => parse,
                    Err(err) => match err.into_parse_result() {
                        Some(parse) => parse,
                        None => return BTreeSet::new(),
                    },
                };
                let Some(command) = parse.primary_command() else {
                    return BTreeSet::new();
                };
                let arguments: Vec<String> =
                    rest.iter().map(|token| token.as_ref().to_string()).collect();
                command
                    .suggester()
                    .provide_suggestions(&arguments, &parse)
                    .into_iter()
                    .map(|s| Suggestion::new(s.text, s.replaced_index + 1))
                    .collect()
            }
        };

        match self.config.max_suggestions {
            Some(max) => suggestions.into_iter().take(max).collect(),
            None => suggestions,
        }
    }

    fn root_suggestions<C>(&self, context: C, input: &str) -> BTreeSet<Suggestion>
    where
        C: InjectedValueAccess + 'static,
    {
        let parameters = {
            let state = self.state.read();
            CommandParameters::new(state.injected(Arc::new(context)), state.converter_access())
        };
        // Conditions run outside the lock.
        let names = self
            .all_commands()
            .into_iter()
            .filter(|command| command.condition().satisfied(&parameters))
            .map(|command| command.name().to_string());

        limit_by_prefix(names, input)
            .into_iter()
            .map(|name| Suggestion::new(name, 0))
            .collect()
    }
}

impl ManagerState {
    fn converter_access(&self) -> Arc<dyn ArgumentConverterAccess> {
        self.converters.clone()
    }

    /// Per-parse view: the caller's context, then the manager's values,
    /// resolved at most once per key.
    fn injected(&self, context: Arc<dyn InjectedValueAccess>) -> Arc<dyn InjectedValueAccess> {
        let values: Arc<dyn InjectedValueAccess> = self.values.clone();
        Arc::new(MemoizingValueAccess::new(Arc::new(MergedValueAccess::of(
            context, values,
        ))))
    }
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("CommandManager")
            .field("config", &self.config)
            .field("commands", &state.commands.keys().collect::<Vec<_>>())
            .field("converters", &state.converters.len())
            .finish_non_exhaustive()
    }
}
