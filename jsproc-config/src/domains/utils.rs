//! Serde helpers shared by the configuration domains

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Durations written as seconds; fractions are accepted (`0.25` is 250 ms)
pub mod serde_duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(serde::de::Error::custom)
    }
}

pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}
