//! State directory files and the store over them.

pub mod paths;
pub mod settings;
pub mod state;

pub use paths::StatePaths;
pub use settings::{Credentials, Endpoint, Prompts, Target};
pub use state::{FileStore, StateStore};
