mod stats_sampler;

pub use stats_sampler::{messages_per_second, StatsSampler};
