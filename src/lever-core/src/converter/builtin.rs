//! Built-in converters.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use super::{ArgumentConverter, ArgumentConverterStore, ConversionResult, Converted};
use crate::error::ConverterError;
use crate::inject::InjectedValueAccess;
use crate::key::Key;

/// Identity converter accepting any token.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl ArgumentConverter<String> for StringConverter {
    fn convert(
        &self,
        argument: &str,
        _context: &dyn InjectedValueAccess,
    ) -> ConversionResult<String> {
        Ok(Converted::single(argument.to_string()))
    }

    fn describe_acceptable_arguments(&self) -> String {
        "any text".to_string()
    }
}

/// Converter backed by the type's [`FromStr`] implementation.
pub struct FromStrConverter<T> {
    description: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T> {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> ArgumentConverter<T> for FromStrConverter<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn convert(&self, argument: &str, _context: &dyn InjectedValueAccess) -> ConversionResult<T> {
        argument
            .parse::<T>()
            .map(Converted::single)
            .map_err(|e| {
                ConverterError::Parse {
                    input: argument.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    fn describe_acceptable_arguments(&self) -> String {
        self.description.clone()
    }
}

type ConvertFn<T> = Arc<dyn Fn(&str, &dyn InjectedValueAccess) -> Option<T> + Send + Sync>;
type SuggestFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Converter built from closures.
pub struct SimpleArgumentConverter<T> {
    description: String,
    convert: ConvertFn<T>,
    suggest: Option<SuggestFn>,
}

impl<T> SimpleArgumentConverter<T> {
    /// Converter producing one value per token; `None` is a failure.
    pub fn from_single<F>(description: impl Into<String>, convert: F) -> Self
    where
        F: Fn(&str, &dyn InjectedValueAccess) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            convert: Arc::new(convert),
            suggest: None,
        }
    }

    pub fn with_suggestions<F>(mut self, suggest: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        self.suggest = Some(Arc::new(suggest));
        self
    }
}

impl<T> ArgumentConverter<T> for SimpleArgumentConverter<T> {
    fn convert(&self, argument: &str, context: &dyn InjectedValueAccess) -> ConversionResult<T> {
        match (self.convert)(argument, context) {
            Some(value) => Ok(Converted::single(value)),
            None => Err(ConverterError::Invalid {
                input: argument.to_string(),
                expected: self.description.clone(),
            }
            .into()),
        }
    }

    fn describe_acceptable_arguments(&self) -> String {
        self.description.clone()
    }

    fn suggestions(&self, input: &str, _context: &dyn InjectedValueAccess) -> Vec<String> {
        self.suggest
            .as_ref()
            .map(|suggest| suggest(input))
            .unwrap_or_default()
    }
}

/// Register converters for `String`, the primitive numeric types, `bool`
/// and `char`.
pub fn register_default_converters(store: &mut ArgumentConverterStore) {
    store.register(Key::<String>::of(), StringConverter);

    macro_rules! from_str {
        ($($ty:ty => $desc:literal),* $(,)?) => {
            $(store.register(Key::<$ty>::of(), FromStrConverter::<$ty>::new($desc));)*
        };
    }
    from_str! {
        i8 => "any byte",
        i16 => "any short",
        i32 => "any integer",
        i64 => "any long",
        u8 => "any unsigned byte",
        u16 => "any unsigned short",
        u32 => "any unsigned integer",
        u64 => "any unsigned long",
        usize => "any index",
        f32 => "any float",
        f64 => "any double",
        bool => "any boolean",
    }

    store.register(
        Key::<char>::of(),
        SimpleArgumentConverter::from_single("any character", |s, _| s.chars().next()),
    );
}
