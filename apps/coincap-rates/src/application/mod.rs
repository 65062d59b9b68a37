//! Application Layer
//!
//! Use cases and port definitions tying the domain cache to the transports.

/// Port interfaces for the REST source and the push transport.
pub mod ports;

/// Services orchestrating polling, subscriptions, and the public facade.
pub mod services;
