//! Shared serde helpers for configuration

/// Serialize a `Duration` as whole seconds
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Settings {
///     #[serde(with = "ferry_core::config::serde_utils::duration_secs")]
///     connect_timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a Duration as seconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    /// Deserialize a Duration from seconds (u64)
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "duration_secs")]
        connect: Duration,
    }

    #[test]
    fn test_duration_secs_deserialize() {
        let parsed: Timeouts = serde_json::from_str(r#"{"connect":45}"#).unwrap();
        assert_eq!(parsed.connect, Duration::from_secs(45));
    }

    #[test]
    fn test_duration_secs_serialize_truncates() {
        let timeouts = Timeouts {
            connect: Duration::from_millis(2500),
        };
        assert_eq!(serde_json::to_string(&timeouts).unwrap(), r#"{"connect":2}"#);
    }
}
