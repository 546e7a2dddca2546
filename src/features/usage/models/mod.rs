mod usage_counter;

pub use usage_counter::{UsageCounter, UsageDelta};
