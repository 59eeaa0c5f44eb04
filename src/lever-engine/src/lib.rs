//! Registration, parsing and dispatch for Lever commands.
//!
//! [`CommandManager`] holds root commands, the converters their arguments
//! parse with and values injected into every parse. Commands are validated
//! once when registered; parsing is greedy and never backtracks.
//!
//! ```rust,ignore
//! use lever_core::inject::EmptyValueAccess;
//! use lever_core::prelude::*;
//! use lever_engine::CommandManager;
//!
//! let manager = CommandManager::new();
//! let name = CommandArgument::builder("name", "Who to greet").build();
//! manager.register(
//!     Command::builder("greet")
//!         .part(name.clone())
//!         .action(move |params| {
//!             println!("Hello, {}!", params.value_of(&name).as_string()?);
//!             Ok(0)
//!         })
//!         .build(),
//! )?;
//!
//! manager.execute(EmptyValueAccess, &["greet", "world"])?;
//! ```

mod config;
mod info;
mod manager;
mod parser;

pub use config::{ConfigError, ConfigResult, ManagerConfig};
pub use info::CommandInfo;
pub use manager::CommandManager;

pub use lever_core;
