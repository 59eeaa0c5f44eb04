//! Completion of partial command lines.
//!
//! Suggestions are computed from the (possibly partial) parse of the whole
//! input. The provider decides which slot the user is typing into by
//! comparing the tokens against what the parser managed to bind.

use std::collections::HashSet;

use crate::converter::{ArgumentConverterAccess, limit_by_prefix};
use crate::parse_result::{ArgBinding, CommandParseResult};
use crate::part::CommandPart;

/// A completion for one token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Suggestion {
    /// Replacement text for the token.
    pub text: String,
    /// Index of the token to replace.
    pub replaced_index: usize,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, replaced_index: usize) -> Self {
        Self {
            text: text.into(),
            replaced_index,
        }
    }
}

/// Produces suggestions for a command.
pub trait SuggestionProvider: Send + Sync {
    /// Suggest completions given the tokens after the root command name and
    /// the parse of those tokens.
    ///
    /// `replaced_index` values are relative to `arguments`.
    fn provide_suggestions(&self, arguments: &[String], parse: &CommandParseResult)
    -> Vec<Suggestion>;
}

/// Suggests from converters and sub-command names.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSuggestionProvider;

impl SuggestionProvider for DefaultSuggestionProvider {
    fn provide_suggestions(
        &self,
        arguments: &[String],
        parse: &CommandParseResult,
    ) -> Vec<Suggestion> {
        if parse.primary_command().is_none() {
            return Vec::new();
        }
        let bound = parse.bound_arguments().len();
        // Input already went off the rails before the last token.
        if arguments.len() > bound + 1 {
            tracing::trace!(
                tokens = arguments.len(),
                bound,
                "not suggesting past the last bound token"
            );
            return Vec::new();
        }

        let last = arguments.last().map(String::as_str).unwrap_or("");
        let last_index = arguments.len().saturating_sub(1);

        if last.starts_with('-') {
            if let Some(values) = arg_flag_values(last, "", parse) {
                return at(values, arguments.len());
            }
            if let Some(flags) = suggest_flags(last, parse).filter(|flags| !flags.is_empty()) {
                return at(flags, last_index);
            }
        }

        if arguments.len() == bound {
            let bindings = parse.bound_arguments();
            match bindings.last() {
                // A fallback match anywhere keeps completing the last slot.
                Some(binding) if !bindings.iter().all(ArgBinding::is_exact) => {
                    let parts: Vec<&CommandPart> = binding
                        .parts()
                        .iter()
                        .map(|m| &m.part)
                        .filter(|part| !matches!(part, CommandPart::Flag(_)))
                        .collect();
                    return at(suggest_from_parts(last, &parts, parse), last_index);
                }
                _ => return at(suggest_unmatched("", parse), arguments.len()),
            }
        }

        if arguments.len() > 1 {
            let second_to_last = &arguments[arguments.len() - 2];
            if second_to_last.starts_with('-') {
                if let Some(values) = arg_flag_values(second_to_last, last, parse) {
                    return at(values, last_index);
                }
            }
        }

        at(suggest_unmatched(last, parse), last_index)
    }
}

fn at(texts: Vec<String>, index: usize) -> Vec<Suggestion> {
    texts
        .into_iter()
        .map(|text| Suggestion::new(text, index))
        .collect()
}

/// Values for the arg-flag ending the `flags` token, if it ends with one.
fn arg_flag_values(flags: &str, input: &str, parse: &CommandParseResult) -> Option<Vec<String>> {
    if flags.chars().count() < 2 {
        return None;
    }
    let command = parse.primary_command()?;
    let last = flags.chars().last()?;
    let flag = command.arg_flag(last)?;
    let part = CommandPart::ArgFlag(flag.clone());
    Some(suggest_from_parts(input, &[&part], parse))
}

/// Extensions of a flag cluster with flags not used yet.
///
/// Returns `None` when `token` is not a cluster that can be extended: it
/// contains unknown characters or already ends with a value-taking flag.
fn suggest_flags(token: &str, parse: &CommandParseResult) -> Option<Vec<String>> {
    let command = parse.primary_command()?;
    let typed: Vec<char> = token.chars().skip(1).collect();
    for &c in &typed {
        match command.flag(c) {
            Some(CommandPart::Flag(_)) => {}
            _ => return None,
        }
    }

    let used = used_parts(parse);
    Some(
        command
            .parts()
            .iter()
            .filter(|part| part.is_flag() && !used.contains(part))
            .filter_map(CommandPart::flag_char)
            .filter(|c| !typed.contains(c))
            .map(|c| format!("{token}{c}"))
            .collect(),
    )
}

fn used_parts(parse: &CommandParseResult) -> HashSet<&CommandPart> {
    parse
        .bound_arguments()
        .iter()
        .flat_map(|binding| binding.parts())
        .map(|m| &m.part)
        .collect()
}

/// Suggest for the positional parts the next token could bind to: every
/// part after the last used one, up to and including the first required.
fn suggest_unmatched(input: &str, parse: &CommandParseResult) -> Vec<String> {
    let Some(command) = parse.primary_command() else {
        return Vec::new();
    };
    let used = used_parts(parse);
    let mut candidates: Vec<&CommandPart> = Vec::new();
    for part in command.positionals() {
        if used.contains(part) {
            candidates.clear();
            // A variable argument can keep taking tokens.
            if matches!(part, CommandPart::Argument(arg) if arg.is_variable()) {
                candidates.push(part);
            }
            continue;
        }
        candidates.push(part);
        if part.is_required() {
            break;
        }
    }
    suggest_from_parts(input, &candidates, parse)
}

fn suggest_from_parts(
    input: &str,
    parts: &[&CommandPart],
    parse: &CommandParseResult,
) -> Vec<String> {
    let parameters = parse.parameters();
    let mut out = Vec::new();
    for part in parts {
        match part {
            CommandPart::Argument(_) | CommandPart::ArgFlag(_) => {
                for key in part.types() {
                    match parameters.converters().converter_handle(key) {
                        Some(converter) => out.extend(converter.suggestions(input, parameters)),
                        None => tracing::debug!(%key, "no converter to suggest from"),
                    }
                }
            }
            CommandPart::SubCommand(sub) => {
                let names = sub
                    .commands()
                    .iter()
                    .filter(|cmd| cmd.condition().satisfied(parameters))
                    .map(|cmd| cmd.name());
                out.extend(limit_by_prefix(names, input));
            }
            CommandPart::Flag(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::command::Command;
    use crate::converter::{ArgumentConverterStore, MapArgumentConverter};
    use crate::inject::EmptyValueAccess;
    use crate::key::{Key, Qualifier};
    use crate::parameters::CommandParameters;
    use crate::parse_result::PartMatch;
    use crate::part::{CommandArgument, NoArgCommandFlag};
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Direction;
    impl crate::key::InjectQualifier for Direction {}

    fn direction_key() -> Key<String> {
        Key::qualified(Qualifier::tag::<Direction>())
    }

    fn direction() -> CommandArgument {
        CommandArgument::builder("direction", "Where to go")
            .of_type(direction_key())
            .build()
    }

    fn parse_of(command: Command, bindings: Vec<ArgBinding>) -> CommandParseResult {
        let mut converters = ArgumentConverterStore::new();
        converters.register(direction_key(), MapArgumentConverter::for_choices(["north", "south"]));
        let parameters = CommandParameters::new(Arc::new(EmptyValueAccess), Arc::new(converters));
        CommandParseResult::new(vec![Arc::new(command)], bindings, parameters)
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_partial_token_completes_slot() {
        let cmd = Command::builder("move").part(direction()).build();
        let parse = parse_of(cmd, Vec::new());

        let suggestions = DefaultSuggestionProvider.provide_suggestions(&args(&["no"]), &parse);
        assert_eq!(suggestions, vec![Suggestion::new("north", 0)]);
    }

    #[test]
    fn test_exact_match_moves_to_next_part() {
        let cmd = Command::builder("move").part(direction()).build();
        let binding = ArgBinding::new(
            "north",
            vec![PartMatch {
                part: direction().into(),
                exact: true,
            }],
        );
        let parse = parse_of(cmd, vec![binding]);

        let suggestions = DefaultSuggestionProvider.provide_suggestions(&args(&["north"]), &parse);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_inexact_match_stays_on_slot() {
        let cmd = Command::builder("move").part(direction()).build();
        let binding = ArgBinding::new(
            "n",
            vec![PartMatch {
                part: direction().into(),
                exact: false,
            }],
        );
        let parse = parse_of(cmd, vec![binding]);

        let suggestions = DefaultSuggestionProvider.provide_suggestions(&args(&["n"]), &parse);
        assert_eq!(suggestions, vec![Suggestion::new("north", 0)]);
    }

    #[test]
    fn test_earlier_inexact_match_keeps_last_slot() {
        let destination = CommandArgument::builder("destination", "Where to end up")
            .of_type(direction_key())
            .build();
        let cmd = Command::builder("move")
            .part(direction())
            .part(destination.clone())
            .build();
        let bindings = vec![
            ArgBinding::new(
                "n",
                vec![PartMatch {
                    part: direction().into(),
                    exact: false,
                }],
            ),
            ArgBinding::new(
                "south",
                vec![PartMatch {
                    part: destination.into(),
                    exact: true,
                }],
            ),
        ];
        let parse = parse_of(cmd, bindings);

        let suggestions =
            DefaultSuggestionProvider.provide_suggestions(&args(&["n", "south"]), &parse);
        assert_eq!(suggestions, vec![Suggestion::new("south", 1)]);
    }

    #[test]
    fn test_no_suggestions_far_past_bound_tokens() {
        let cmd = Command::builder("move").part(direction()).build();
        let parse = parse_of(cmd, Vec::new());

        let suggestions =
            DefaultSuggestionProvider.provide_suggestions(&args(&["xx", "no"]), &parse);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_dash_suggests_unused_flags() {
        let cmd = Command::builder("move")
            .part(NoArgCommandFlag::new('f', "Fast"))
            .part(NoArgCommandFlag::new('q', "Quiet"))
            .part(direction())
            .build();
        let parse = parse_of(cmd, Vec::new());

        let suggestions = DefaultSuggestionProvider.provide_suggestions(&args(&["-"]), &parse);
        assert_eq!(
            suggestions,
            vec![Suggestion::new("-f", 0), Suggestion::new("-q", 0)]
        );
    }
}
