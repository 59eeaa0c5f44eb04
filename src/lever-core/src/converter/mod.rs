//! Argument conversion.
//!
//! An [`ArgumentConverter<T>`] turns one raw token into one or more values of
//! `T`. Results are plain [`Result`]s: [`Converted`] on success, and a
//! [`ConversionFailure`] that accumulates the failures of earlier attempts
//! when several converters are tried for the same slot.

mod builtin;
mod choice;
mod erased;

pub use builtin::{
    FromStrConverter, SimpleArgumentConverter, StringConverter, register_default_converters,
};
pub use choice::{BiMapArgumentConverter, MapArgumentConverter, MultiKeyConverter};
pub use erased::{
    ArgumentConverterAccess, ArgumentConverterAccessExt, ArgumentConverterStore, ConverterHandle,
};

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::inject::InjectedValueAccess;

/// Result of a single conversion.
pub type ConversionResult<T> = Result<Converted<T>, ConversionFailure>;

/// Converts raw tokens into values of `T`.
///
/// Implementations must be pure and must not block on I/O.
pub trait ArgumentConverter<T>: Send + Sync {
    /// Convert `argument` into one or more values.
    fn convert(&self, argument: &str, context: &dyn InjectedValueAccess) -> ConversionResult<T>;

    /// Short description of what this converter accepts, e.g. `any integer`.
    fn describe_acceptable_arguments(&self) -> String;

    /// Completions for a partially typed `input`.
    fn suggestions(&self, input: &str, context: &dyn InjectedValueAccess) -> Vec<String> {
        let _ = (input, context);
        Vec::new()
    }
}

/// Successful conversion output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted<T> {
    values: Vec<T>,
    exact: bool,
}

impl<T> Converted<T> {
    /// Exact match producing one value.
    pub fn single(value: T) -> Self {
        Self::many(vec![value])
    }

    /// Exact match producing several values.
    pub fn many(values: Vec<T>) -> Self {
        Self {
            values,
            exact: true,
        }
    }

    /// Mark as a fallback match. Suggestions keep completing an inexact slot
    /// instead of moving on to the next part.
    pub fn inexact(mut self) -> Self {
        self.exact = false;
        self
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// A failed conversion together with failures of earlier attempts.
#[derive(Clone)]
pub struct ConversionFailure {
    error: Arc<dyn Error + Send + Sync>,
    others: Vec<ConversionFailure>,
}

impl ConversionFailure {
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            error: Arc::from(error.into()),
            others: Vec::new(),
        }
    }

    /// The primary error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Failures of attempts made before the primary one.
    pub fn others(&self) -> &[ConversionFailure] {
        &self.others
    }

    /// Combine with a failure that happened after this one.
    ///
    /// `later` becomes the primary error; this failure and everything it had
    /// accumulated become siblings, keeping the list flat.
    pub fn then(self, later: ConversionFailure) -> ConversionFailure {
        let ConversionFailure { error, others } = self;
        let mut siblings = others;
        siblings.push(ConversionFailure {
            error,
            others: Vec::new(),
        });
        siblings.extend(later.others);
        ConversionFailure {
            error: later.error,
            others: siblings,
        }
    }
}

impl fmt::Debug for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionFailure")
            .field("error", &self.error.to_string())
            .field("others", &self.others)
            .finish()
    }
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl Error for ConversionFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

impl PartialEq for ConversionFailure {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string() && self.others == other.others
    }
}

impl From<crate::error::ConverterError> for ConversionFailure {
    fn from(error: crate::error::ConverterError) -> Self {
        Self::new(error)
    }
}

/// Chaining for conversion results.
pub trait ConversionResultExt<T> {
    /// Try `next` when this result failed, accumulating the failures.
    fn or_try<F>(self, next: F) -> ConversionResult<T>
    where
        F: FnOnce() -> ConversionResult<T>;
}

impl<T> ConversionResultExt<T> for ConversionResult<T> {
    fn or_try<F>(self, next: F) -> ConversionResult<T>
    where
        F: FnOnce() -> ConversionResult<T>,
    {
        match self {
            Ok(converted) => Ok(converted),
            Err(first) => next().map_err(|later| first.then(later)),
        }
    }
}

/// Keep the choices that complete `input`: strictly longer and starting
/// with it, ignoring ASCII case.
pub fn limit_by_prefix<I, S>(choices: I, input: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    choices
        .into_iter()
        .filter(|choice| by_prefix(choice.as_ref(), input))
        .map(|choice| choice.as_ref().to_string())
        .collect()
}

/// Whether `candidate` completes `input`.
pub fn by_prefix(candidate: &str, input: &str) -> bool {
    candidate.len() > input.len()
        && candidate
            .get(..input.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConverterError;
    use pretty_assertions::assert_eq;

    fn failure(msg: &str) -> ConversionFailure {
        ConversionFailure::new(msg.to_string())
    }

    #[test]
    fn test_then_keeps_later_error_as_primary() {
        let combined = failure("not a number").then(failure("not a boolean"));
        assert_eq!(combined.to_string(), "not a boolean");
        assert_eq!(combined.others().len(), 1);
        assert_eq!(combined.others()[0].to_string(), "not a number");
    }

    #[test]
    fn test_then_flattens_siblings() {
        let combined = failure("a").then(failure("b")).then(failure("c"));
        let others: Vec<String> = combined.others().iter().map(|f| f.to_string()).collect();
        assert_eq!(combined.to_string(), "c");
        assert_eq!(others, vec!["a".to_string(), "b".to_string()]);
        assert!(combined.others().iter().all(|f| f.others().is_empty()));
    }

    #[test]
    fn test_or_try_short_circuits_on_success() {
        let result: ConversionResult<i32> = Ok(Converted::single(1));
        let chained = result.or_try(|| panic!("second converter must not run"));
        assert_eq!(chained.unwrap().values(), &[1]);
    }

    #[test]
    fn test_or_try_accumulates() {
        let result: ConversionResult<i32> = Err(ConverterError::Invalid {
            input: "x".into(),
            expected: "any integer".into(),
        }
        .into());
        let chained = result.or_try(|| Err(failure("second")));
        let err = chained.unwrap_err();
        assert_eq!(err.to_string(), "second");
        assert_eq!(err.others().len(), 1);
    }

    #[test]
    fn test_by_prefix() {
        assert!(by_prefix("north", "no"));
        assert!(by_prefix("North", "no"));
        assert!(!by_prefix("north", "north"));
        assert!(!by_prefix("south", "no"));
        assert_eq!(
            limit_by_prefix(["north", "south", "northeast"], "nor"),
            vec!["north".to_string(), "northeast".to_string()]
        );
        assert_eq!(limit_by_prefix(["a", "b"], "").len(), 2);
    }
}
