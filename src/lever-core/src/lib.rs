//! Command model for Lever.
//!
//! This crate holds everything a command definition is made of and
//! everything a parse produces:
//!
//! - [`Command`] and its [`CommandPart`]s (arguments, flags, sub-command
//!   slots), built with builders
//! - [`ArgumentConverter`]s turning tokens into typed values, looked up by
//!   [`Key`]
//! - injected values ([`InjectedValueAccess`]) passed alongside a parse
//! - [`CommandParameters`] and [`CommandParseResult`], the output of a parse
//! - [`SuggestionProvider`], completing partial input
//!
//! Registration, parsing and dispatch live in `lever-engine`.
//!
//! # Defining a command
//!
//! ```rust,ignore
//! use lever_core::{Command, CommandArgument, Key, NoArgCommandFlag};
//!
//! let count = CommandArgument::builder("count", "How many").of_type(Key::<u32>::of()).build();
//! let cmd = Command::builder("repeat")
//!     .description("Repeat something")
//!     .part(NoArgCommandFlag::new('q', "Quietly"))
//!     .part(count.clone())
//!     .action(move |params| {
//!         let n: u32 = params.value_of(&count).as_single_of()?;
//!         Ok(n as usize)
//!     })
//!     .build();
//! ```

mod command;
mod condition;
pub mod converter;
mod error;
pub mod inject;
mod key;
mod parameters;
mod parse_result;
mod part;
mod suggestion;

pub use command::{Action, Command, CommandBuilder, CommandId};
pub use condition::Condition;
pub use converter::{
    ArgumentConverter, ArgumentConverterAccess, ArgumentConverterAccessExt, ArgumentConverterStore,
    ConversionFailure, ConversionResult, ConversionResultExt, Converted,
};
pub use error::{CommandError, ConverterError, RegistrationError, StructuralViolation, ValueError};
pub use inject::{InjectedValueAccess, InjectedValueAccessExt};
pub use key::{AnyKey, InjectQualifier, Key, Qualifier};
pub use parameters::{CommandMetadata, CommandParameters, CommandValue};
pub use parse_result::{ArgBinding, CommandParseResult, PartMatch};
pub use part::{
    ArgAcceptingCommandFlag, ArgAcceptingCommandFlagBuilder, CommandArgument,
    CommandArgumentBuilder, CommandPart, NoArgCommandFlag, SubCommandPart, SubCommandPartBuilder,
};
pub use suggestion::{DefaultSuggestionProvider, Suggestion, SuggestionProvider};

/// Re-export common types for convenience.
pub mod prelude {
    pub use crate::converter::{MapArgumentConverter, MultiKeyConverter, SimpleArgumentConverter};
    pub use crate::{
        ArgAcceptingCommandFlag, Command, CommandArgument, CommandError, CommandParameters,
        CommandPart, Condition, InjectedValueAccessExt, Key, NoArgCommandFlag, SubCommandPart,
    };
}
