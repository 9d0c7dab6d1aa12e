//! Command handlers for the snapback CLI.

pub mod config;
pub mod create;
pub mod list;
pub mod logging;
pub mod maintenance;
pub mod prompt;
pub mod restore;

pub use config::*;
pub use create::*;
pub use list::*;
pub use logging::*;
pub use maintenance::*;
pub use prompt::*;
pub use restore::*;
