mod settings;

pub use settings::{ApiConfig, LogFormat, LoggingConfig, SessionConfig, Settings, StatsConfig};
