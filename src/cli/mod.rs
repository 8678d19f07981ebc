//! Command-line surface: arguments, command grammar, and dispatch.

pub mod args;
pub mod command;
pub mod session;

pub use args::Cli;
pub use command::Command;
pub use session::{Options, Session, execute};
