//! Engine API version negotiation

use std::fmt;

use ferry_core::EngineError;

/// An engine API version such as `1.43`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    major: u32,
    minor: u32,
}

impl ApiVersion {
    /// Newest version this client speaks
    pub const MAX_SUPPORTED: ApiVersion = ApiVersion::new(1, 43);

    /// Oldest version this client speaks, also assumed when a daemon
    /// does not report one
    pub const MIN_SUPPORTED: ApiVersion = ApiVersion::new(1, 24);

    /// Create a version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `major.minor`
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }

    /// Pick the version to use against a daemon
    ///
    /// `server` is the daemon's current API version and `server_min` the
    /// oldest one it still accepts.
    pub fn negotiate(server: Option<&str>, server_min: Option<&str>) -> Result<Self, EngineError> {
        let Some(server_version) = server.and_then(Self::parse) else {
            return Ok(Self::MIN_SUPPORTED);
        };

        if server_version < Self::MIN_SUPPORTED {
            return Err(EngineError::UnsupportedVersion {
                server: server_version.to_string(),
                minimum: Self::MIN_SUPPORTED.to_string(),
            });
        }

        if let Some(min) = server_min.and_then(Self::parse) {
            if min > Self::MAX_SUPPORTED {
                return Err(EngineError::UnsupportedVersion {
                    server: format!("{} (accepts >= {})", server_version, min),
                    minimum: Self::MIN_SUPPORTED.to_string(),
                });
            }
        }

        Ok(std::cmp::min(server_version, Self::MAX_SUPPORTED))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
