pub mod config;
pub mod error;
pub mod event;
pub mod insight;

pub use config::Config;
pub use error::{Result, SignalError};
pub use event::*;
pub use insight::*;
