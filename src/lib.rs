// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Core: wire protocol, observable store, session lifecycle
pub mod protocol;
pub mod session;
pub mod store;
pub mod streams;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod tasks;
