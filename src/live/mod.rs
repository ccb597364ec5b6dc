//! Live log mirroring
//!
//! When live logs are on, a logger also writes the raw arguments of every
//! call to a console, before any formatting. The switch is either set at
//! construction or persisted in a [`FlagStore`] so it survives restarts.

pub mod console;
pub mod store;

pub use console::{ConsoleSink, StdConsole};
pub use store::{FileFlagStore, FlagStore, MemoryFlagStore};

/// Default key under which the live logs switch is persisted
pub const DEFAULT_LIVE_LOGS_KEY: &str = "sm.live_logs";

/// Value of the persisted switch meaning "enabled"
pub const LIVE_LOGS_ON: &str = "1";
