//! Fixed-choice converters.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;

use super::{ArgumentConverter, ConversionResult, Converted, limit_by_prefix};
use crate::error::ConverterError;
use crate::inject::InjectedValueAccess;

fn describe_choices<'a>(choices: impl Iterator<Item = &'a String>) -> String {
    choices.map(String::as_str).collect::<Vec<_>>().join("|")
}

/// Maps exact tokens to values.
#[derive(Debug, Clone)]
pub struct MapArgumentConverter<T> {
    map: IndexMap<String, T>,
}

impl<T: Clone> MapArgumentConverter<T> {
    pub fn new(map: impl IntoIterator<Item = (String, T)>) -> Self {
        Self {
            map: map.into_iter().collect(),
        }
    }
}

impl MapArgumentConverter<String> {
    /// Converter accepting each of `choices` as itself.
    pub fn for_choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(choices.into_iter().map(|choice| {
            let choice = choice.into();
            (choice.clone(), choice)
        }))
    }
}

impl<T> ArgumentConverter<T> for MapArgumentConverter<T>
where
    T: Clone + Send + Sync,
{
    fn convert(&self, argument: &str, _context: &dyn InjectedValueAccess) -> ConversionResult<T> {
        self.map
            .get(argument)
            .cloned()
            .map(Converted::single)
            .ok_or_else(|| {
                ConverterError::Invalid {
                    input: argument.to_string(),
                    expected: self.describe_acceptable_arguments(),
                }
                .into()
            })
    }

    fn describe_acceptable_arguments(&self) -> String {
        describe_choices(self.map.keys())
    }

    fn suggestions(&self, input: &str, _context: &dyn InjectedValueAccess) -> Vec<String> {
        limit_by_prefix(self.map.keys(), input)
    }
}

/// Two-way mapping between tokens and values.
///
/// Converts like [`MapArgumentConverter`] and also answers which token
/// stands for a value, for echoing values back to the user.
#[derive(Debug, Clone)]
pub struct BiMapArgumentConverter<T: Eq + Hash> {
    forward: MapArgumentConverter<T>,
    reverse: HashMap<T, String>,
}

impl<T> BiMapArgumentConverter<T>
where
    T: Clone + Eq + Hash,
{
    /// Build from pairs. A value listed twice keeps its first token.
    pub fn new(pairs: impl IntoIterator<Item = (String, T)>) -> Self {
        let forward = MapArgumentConverter::new(pairs);
        let mut reverse = HashMap::new();
        for (token, value) in &forward.map {
            reverse
                .entry(value.clone())
                .or_insert_with(|| token.clone());
        }
        Self { forward, reverse }
    }

    /// Token for `value`.
    pub fn key_for(&self, value: &T) -> Option<&str> {
        self.reverse.get(value).map(String::as_str)
    }
}

impl<T> ArgumentConverter<T> for BiMapArgumentConverter<T>
where
    T: Clone + Eq + Hash + Send + Sync,
{
    fn convert(&self, argument: &str, context: &dyn InjectedValueAccess) -> ConversionResult<T> {
        self.forward.convert(argument, context)
    }

    fn describe_acceptable_arguments(&self) -> String {
        self.forward.describe_acceptable_arguments()
    }

    fn suggestions(&self, input: &str, context: &dyn InjectedValueAccess) -> Vec<String> {
        self.forward.suggestions(input, context)
    }
}

/// Several case-insensitive keys per value.
///
/// The first key of each item is its primary key; only primary keys are
/// described and suggested. An optional fallback value turns unknown tokens
/// into an inexact success.
#[derive(Debug, Clone)]
pub struct MultiKeyConverter<T> {
    primary_keys: Vec<String>,
    by_key: HashMap<String, T>,
    unknown: Option<T>,
}

impl<T: Clone> MultiKeyConverter<T> {
    /// Build from items and their keys. Items without keys are skipped.
    pub fn new<I, K, S>(items: I) -> Self
    where
        I: IntoIterator<Item = (T, K)>,
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut primary_keys = Vec::new();
        let mut by_key = HashMap::new();
        for (item, keys) in items {
            let mut keys = keys.into_iter().map(Into::into).peekable();
            let Some(primary) = keys.peek() else {
                tracing::warn!("Skipping choice without lookup keys");
                continue;
            };
            primary_keys.push(primary.clone());
            for key in keys {
                by_key.insert(key.to_lowercase(), item.clone());
            }
        }
        Self {
            primary_keys,
            by_key,
            unknown: None,
        }
    }

    /// Value used for tokens matching no key.
    pub fn with_unknown(mut self, unknown: T) -> Self {
        self.unknown = Some(unknown);
        self
    }
}

impl<T> ArgumentConverter<T> for MultiKeyConverter<T>
where
    T: Clone + Send + Sync,
{
    fn convert(&self, argument: &str, _context: &dyn InjectedValueAccess) -> ConversionResult<T> {
        if let Some(item) = self.by_key.get(&argument.to_lowercase()) {
            return Ok(Converted::single(item.clone()));
        }
        match &self.unknown {
            Some(unknown) => Ok(Converted::single(unknown.clone()).inexact()),
            None => Err(ConverterError::Invalid {
                input: argument.to_string(),
                expected: self.describe_acceptable_arguments(),
            }
            .into()),
        }
    }

    fn describe_acceptable_arguments(&self) -> String {
        describe_choices(self.primary_keys.iter())
    }

    fn suggestions(&self, input: &str, _context: &dyn InjectedValueAccess) -> Vec<String> {
        limit_by_prefix(&self.primary_keys, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::EmptyValueAccess;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Direction {
        North,
        South,
        Unknown,
    }

    fn directions() -> MultiKeyConverter<Direction> {
        MultiKeyConverter::new([
            (Direction::North, vec!["north", "n", "up"]),
            (Direction::South, vec!["south", "s", "down"]),
        ])
    }

    #[test]
    fn test_map_converter_choices() {
        let converter = MapArgumentConverter::for_choices(["north", "south"]);
        assert_eq!(converter.describe_acceptable_arguments(), "north|south");
        assert_eq!(
            converter.suggestions("no", &EmptyValueAccess),
            vec!["north".to_string()]
        );
        assert!(converter.convert("east", &EmptyValueAccess).is_err());
        assert_eq!(
            converter.convert("south", &EmptyValueAccess).unwrap().values(),
            &["south".to_string()]
        );
    }

    #[test]
    fn test_bimap_reverse_lookup() {
        let converter = BiMapArgumentConverter::new([
            ("on".to_string(), true),
            ("yes".to_string(), true),
            ("off".to_string(), false),
        ]);
        assert_eq!(converter.key_for(&true), Some("on"));
        assert_eq!(converter.key_for(&false), Some("off"));
        assert_eq!(
            converter.convert("yes", &EmptyValueAccess).unwrap().values(),
            &[true]
        );
    }

    #[test]
    fn test_multi_key_is_case_insensitive() {
        let converter = directions();
        let converted = converter.convert("UP", &EmptyValueAccess).unwrap();
        assert_eq!(converted.values(), &[Direction::North]);
        assert!(converted.is_exact());
    }

    #[test]
    fn test_multi_key_suggests_primary_keys_only() {
        let converter = directions();
        assert_eq!(converter.describe_acceptable_arguments(), "north|south");
        assert_eq!(
            converter.suggestions("", &EmptyValueAccess),
            vec!["north".to_string(), "south".to_string()]
        );
        assert!(converter.suggestions("d", &EmptyValueAccess).is_empty());
    }

    #[test]
    fn test_multi_key_unknown_is_inexact() {
        let converter = directions().with_unknown(Direction::Unknown);
        let converted = converter.convert("sideways", &EmptyValueAccess).unwrap();
        assert_eq!(converted.values(), &[Direction::Unknown]);
        assert!(!converted.is_exact());

        assert!(directions().convert("sideways", &EmptyValueAccess).is_err());
    }
}
