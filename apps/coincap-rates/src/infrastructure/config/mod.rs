//! Configuration
//!
//! Settings for the feed client, loaded from environment variables.

mod settings;

pub use settings::{ConfigError, FeedSettings};
