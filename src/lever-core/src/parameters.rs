//! Parsed parameter values and typed access to them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::converter::{ArgumentConverterAccess, ArgumentConverterAccessExt, ArgumentConverterStore};
use crate::error::ValueError;
use crate::inject::{EmptyValueAccess, InjectedValue, InjectedValueAccess};
use crate::key::{AnyKey, Key};
use crate::part::CommandPart;

/// How the primary command was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Name or alias used for the root command.
    pub called_name: String,
    /// Tokens after the root command name.
    pub arguments: Vec<String>,
}

/// Values bound by a parse, plus the context it ran in.
#[derive(Clone)]
pub struct CommandParameters {
    values: HashMap<CommandPart, Vec<String>>,
    present: HashSet<CommandPart>,
    metadata: Option<CommandMetadata>,
    injected: Arc<dyn InjectedValueAccess>,
    converters: Arc<dyn ArgumentConverterAccess>,
}

impl CommandParameters {
    pub fn new(
        injected: Arc<dyn InjectedValueAccess>,
        converters: Arc<dyn ArgumentConverterAccess>,
    ) -> Self {
        Self {
            values: HashMap::new(),
            present: HashSet::new(),
            metadata: None,
            injected,
            converters,
        }
    }

    /// Parameters with no values, injected values or converters.
    pub fn empty() -> Self {
        Self::new(
            Arc::new(EmptyValueAccess),
            Arc::new(ArgumentConverterStore::new()),
        )
    }

    /// Append a bound token to `part` and mark it present.
    pub fn bind(&mut self, part: &CommandPart, value: impl Into<String>) {
        self.values
            .entry(part.clone())
            .or_default()
            .push(value.into());
        self.present.insert(part.clone());
    }

    /// Mark `part` present without a value (flags).
    pub fn mark_present(&mut self, part: &CommandPart) {
        self.present.insert(part.clone());
    }

    /// Fill in `part`'s defaults unless a token was bound to it.
    pub fn apply_defaults(&mut self, part: &CommandPart) {
        if self.values.contains_key(part) || part.defaults().is_empty() {
            return;
        }
        self.values.insert(part.clone(), part.defaults().to_vec());
        self.present.insert(part.clone());
    }

    pub fn set_metadata(&mut self, metadata: CommandMetadata) {
        self.metadata = Some(metadata);
    }

    pub fn metadata(&self) -> Option<&CommandMetadata> {
        self.metadata.as_ref()
    }

    /// Whether `part` was given, or has defaults.
    pub fn has<P>(&self, part: &P) -> bool
    where
        P: Clone + Into<CommandPart>,
    {
        self.present.contains(&part.clone().into())
    }

    /// Values bound to `part`.
    pub fn value_of<P>(&self, part: &P) -> CommandValue<'_>
    where
        P: Clone + Into<CommandPart>,
    {
        let part = part.clone().into();
        let values = self.values.get(&part).map(Vec::as_slice).unwrap_or(&[]);
        CommandValue {
            part,
            values,
            parameters: self,
        }
    }

    /// Every part that was given or defaulted.
    pub fn present_parts(&self) -> impl Iterator<Item = &CommandPart> {
        self.present.iter()
    }

    pub fn injected(&self) -> &Arc<dyn InjectedValueAccess> {
        &self.injected
    }

    pub fn converters(&self) -> &Arc<dyn ArgumentConverterAccess> {
        &self.converters
    }
}

impl InjectedValueAccess for CommandParameters {
    fn injected_value_any(&self, key: &AnyKey) -> Option<InjectedValue> {
        self.injected.injected_value_any(key)
    }
}

impl fmt::Debug for CommandParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: HashMap<String, &Vec<String>> = self
            .values
            .iter()
            .map(|(part, values)| (part.name(), values))
            .collect();
        f.debug_struct("CommandParameters")
            .field("values", &values)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// The values bound to one part, convertible on demand.
#[derive(Debug, Clone)]
pub struct CommandValue<'a> {
    part: CommandPart,
    values: &'a [String],
    parameters: &'a CommandParameters,
}

impl<'a> CommandValue<'a> {
    pub fn part(&self) -> &CommandPart {
        &self.part
    }

    /// The raw tokens.
    pub fn as_strings(&self) -> &'a [String] {
        self.values
    }

    /// The single raw token.
    pub fn as_string(&self) -> Result<&'a str, ValueError> {
        match self.values {
            [value] => Ok(value.as_str()),
            [] => Err(ValueError::NoValue {
                part: self.part.name(),
            }),
            many => Err(ValueError::TooManyValues {
                part: self.part.name(),
                count: many.len(),
            }),
        }
    }

    /// Every token converted through the converter registered for `key`.
    pub fn as_multiple<T: 'static>(&self, key: &Key<T>) -> Result<Vec<T>, ValueError> {
        let converter = self
            .parameters
            .converters
            .converter(key)
            .ok_or_else(|| ValueError::NoConverter {
                key: key.erased().to_string(),
            })?;

        let mut out = Vec::with_capacity(self.values.len());
        for value in self.values {
            let converted = converter
                .convert(value, self.parameters)
                .map_err(|failure| ValueError::Conversion {
                    part: self.part.name(),
                    input: value.clone(),
                    failure,
                })?;
            out.extend(converted.into_values());
        }
        Ok(out)
    }

    /// The single converted value.
    pub fn as_single<T: 'static>(&self, key: &Key<T>) -> Result<T, ValueError> {
        let mut values = self.as_multiple(key)?;
        match values.len() {
            1 => Ok(values.remove(0)),
            0 => Err(ValueError::NoValue {
                part: self.part.name(),
            }),
            count => Err(ValueError::TooManyValues {
                part: self.part.name(),
                count,
            }),
        }
    }

    /// [`as_single`](Self::as_single) with the unqualified key for `T`.
    pub fn as_single_of<T: 'static>(&self) -> Result<T, ValueError> {
        self.as_single(&Key::<T>::of())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::register_default_converters;
    use crate::part::{CommandArgument, NoArgCommandFlag};
    use pretty_assertions::assert_eq;

    fn parameters() -> CommandParameters {
        let mut converters = ArgumentConverterStore::new();
        register_default_converters(&mut converters);
        CommandParameters::new(Arc::new(EmptyValueAccess), Arc::new(converters))
    }

    #[test]
    fn test_bound_values_convert() {
        let count = CommandArgument::builder("count", "").of_type(Key::<i32>::of()).build();
        let part: CommandPart = count.clone().into();
        let mut params = parameters();
        params.bind(&part, "3");

        assert!(params.has(&count));
        assert_eq!(params.value_of(&count).as_string().unwrap(), "3");
        assert_eq!(params.value_of(&count).as_single_of::<i32>().unwrap(), 3);
    }

    #[test]
    fn test_missing_and_multiple_values() {
        let items = CommandArgument::builder("items", "").variable(true).build();
        let part: CommandPart = items.clone().into();
        let mut params = parameters();

        assert!(matches!(
            params.value_of(&items).as_string(),
            Err(ValueError::NoValue { .. })
        ));

        params.bind(&part, "a");
        params.bind(&part, "b");
        assert_eq!(
            params.value_of(&items).as_multiple(&Key::<String>::of()).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(matches!(
            params.value_of(&items).as_single_of::<String>(),
            Err(ValueError::TooManyValues { count: 2, .. })
        ));
    }

    #[test]
    fn test_conversion_error_names_part() {
        let count = CommandArgument::builder("count", "").build();
        let mut params = parameters();
        params.bind(&count.clone().into(), "many");

        let err = params.value_of(&count).as_single_of::<u8>().unwrap_err();
        assert!(err.to_string().contains("count"), "{err}");
        assert!(matches!(
            params.value_of(&count).as_single_of::<Vec<u8>>(),
            Err(ValueError::NoConverter { .. })
        ));
    }

    #[test]
    fn test_defaults_apply_only_when_unbound() {
        let profile = CommandArgument::builder("profile", "").defaults(["debug"]).build();
        let part: CommandPart = profile.clone().into();

        let mut params = parameters();
        params.apply_defaults(&part);
        assert_eq!(params.value_of(&profile).as_string().unwrap(), "debug");

        let mut params = parameters();
        params.bind(&part, "release");
        params.apply_defaults(&part);
        assert_eq!(params.value_of(&profile).as_strings(), &["release".to_string()]);
    }

    #[test]
    fn test_flag_presence() {
        let verbose = NoArgCommandFlag::new('v', "");
        let mut params = parameters();
        assert!(!params.has(&verbose));
        params.mark_present(&verbose.clone().into());
        assert!(params.has(&verbose));
        assert!(params.value_of(&verbose).as_strings().is_empty());
    }
}
