//! Connection descriptor resolution

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ssh_config::{HostLookup, SshConfig};
use crate::error::ConfigError;
use crate::types::ConnectionOverrides;

/// Connection parameters for one target host
///
/// `host` is always non-empty. `user`, `port` and `private_key_path` may
/// be empty: the transport uses its defaults for the first two and refuses
/// to connect without a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Host alias as given by the caller
    pub host: String,
    /// Real hostname from ssh config, empty to dial `host` itself
    pub hostname: String,
    /// Login user
    pub user: String,
    /// SSH port
    pub port: String,
    /// Private key path
    pub private_key_path: PathBuf,
}

impl ConnectionDescriptor {
    /// Canonical tunnel address, `ssh://user@host:port`
    pub fn remote_url(&self) -> String {
        format!("ssh://{}@{}:{}", self.user, self.host, self.port)
    }

    /// Host to open the TCP connection to
    pub fn dial_host(&self) -> &str {
        if self.hostname.is_empty() {
            &self.host
        } else {
            &self.hostname
        }
    }
}

/// Builds a [`ConnectionDescriptor`] from an alias, filling gaps from ssh config
///
/// Pure resolution: no network I/O happens here.
#[derive(Clone)]
pub struct ConfigResolver {
    lookup: Arc<dyn HostLookup>,
    home: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver over an explicit lookup and home directory
    pub fn new(lookup: Arc<dyn HostLookup>, home: Option<PathBuf>) -> Self {
        Self { lookup, home }
    }

    /// Create a resolver reading the invoking user's ssh config
    ///
    /// Uses `path` when given, otherwise `~/.ssh/config`.
    pub fn from_user_config(path: Option<&Path>) -> Result<Self, ConfigError> {
        let home = dirs::home_dir();
        let config = match path {
            Some(path) => SshConfig::load_with_home(path, home.as_deref())?,
            None => match super::default_ssh_config_path() {
                Some(default_path) => SshConfig::load_with_home(&default_path, home.as_deref())?,
                None => SshConfig::default(),
            },
        };
        Ok(Self::new(Arc::new(config), home))
    }

    /// Resolve `alias` into a full connection descriptor
    pub fn resolve(
        &self,
        alias: &str,
        overrides: &ConnectionOverrides,
    ) -> Result<ConnectionDescriptor, ConfigError> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(ConfigError::MissingHost);
        }

        let user = match &overrides.user {
            Some(user) if !user.is_empty() => user.clone(),
            _ => self.lookup.lookup(alias, "User"),
        };

        let port = match overrides.port {
            Some(port) => port.to_string(),
            None => self.lookup.lookup(alias, "Port"),
        };

        let key_path = match &overrides.identity_file {
            Some(path) if !path.as_os_str().is_empty() => path.to_string_lossy().into_owned(),
            _ => self.lookup.lookup(alias, "IdentityFile"),
        };
        let private_key_path = expand_home(&key_path, self.home.as_deref())?;

        let hostname = self.lookup.lookup(alias, "HostName").replace("%h", alias);

        let descriptor = ConnectionDescriptor {
            host: alias.to_string(),
            hostname,
            user,
            port,
            private_key_path,
        };
        tracing::debug!(
            "Resolved {} -> {} (key {:?})",
            alias,
            descriptor.remote_url(),
            descriptor.private_key_path
        );

        Ok(descriptor)
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str, home: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let rest = match path.strip_prefix("~/") {
        Some(rest) => rest,
        None if path == "~" => "",
        None => return Ok(PathBuf::from(path)),
    };

    let home = home.ok_or_else(|| ConfigError::HomeDirUnavailable(path.to_string()))?;
    Ok(home.join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapLookup(HashMap<(String, String), String>);

    impl MapLookup {
        fn with(mut self, alias: &str, key: &str, value: &str) -> Self {
            self.0
                .insert((alias.to_string(), key.to_string()), value.to_string());
            self
        }
    }

    impl HostLookup for MapLookup {
        fn lookup(&self, alias: &str, key: &str) -> String {
            self.0
                .get(&(alias.to_string(), key.to_string()))
                .cloned()
                .unwrap_or_default()
        }
    }

    fn resolver(lookup: MapLookup) -> ConfigResolver {
        ConfigResolver::new(Arc::new(lookup), Some(PathBuf::from("/home/deploy")))
    }

    #[test]
    fn test_empty_alias_is_rejected() {
        let resolver = resolver(MapLookup::default());
        let err = resolver
            .resolve("", &ConnectionOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingHost));
        assert!(resolver
            .resolve("   ", &ConnectionOverrides::default())
            .is_err());
    }

    #[test]
    fn test_fills_from_lookup() {
        let lookup = MapLookup::default()
            .with("host1", "User", "deploy")
            .with("host1", "Port", "2222")
            .with("host1", "IdentityFile", "~/.ssh/id_ed25519");
        let descriptor = resolver(lookup)
            .resolve("host1", &ConnectionOverrides::default())
            .unwrap();

        assert_eq!(descriptor.host, "host1");
        assert_eq!(descriptor.user, "deploy");
        assert_eq!(descriptor.port, "2222");
        assert_eq!(
            descriptor.private_key_path,
            PathBuf::from("/home/deploy/.ssh/id_ed25519")
        );
        assert_eq!(descriptor.remote_url(), "ssh://deploy@host1:2222");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let lookup = MapLookup::default()
            .with("host1", "User", "deploy")
            .with("host1", "Port", "2222");
        let overrides = ConnectionOverrides {
            user: Some("root".into()),
            port: Some(22),
            identity_file: Some(PathBuf::from("/keys/root")),
        };
        let descriptor = resolver(lookup).resolve("host1", &overrides).unwrap();

        assert_eq!(descriptor.user, "root");
        assert_eq!(descriptor.port, "22");
        assert_eq!(descriptor.private_key_path, PathBuf::from("/keys/root"));
    }

    #[test]
    fn test_unset_fields_stay_empty() {
        let descriptor = resolver(MapLookup::default())
            .resolve("bare", &ConnectionOverrides::default())
            .unwrap();
        assert_eq!(descriptor.user, "");
        assert_eq!(descriptor.port, "");
        assert!(descriptor.private_key_path.as_os_str().is_empty());
        assert_eq!(descriptor.dial_host(), "bare");
    }

    #[test]
    fn test_hostname_substitution() {
        let lookup = MapLookup::default().with("web", "HostName", "%h.example.com");
        let descriptor = resolver(lookup)
            .resolve("web", &ConnectionOverrides::default())
            .unwrap();
        assert_eq!(descriptor.dial_host(), "web.example.com");
    }

    #[test]
    fn test_tilde_override_is_expanded() {
        let overrides = ConnectionOverrides {
            identity_file: Some(PathBuf::from("~/.ssh/other")),
            ..Default::default()
        };
        let descriptor = resolver(MapLookup::default())
            .resolve("host1", &overrides)
            .unwrap();
        assert_eq!(
            descriptor.private_key_path,
            PathBuf::from("/home/deploy/.ssh/other")
        );
    }

    #[test]
    fn test_expand_home_never_leaves_tilde() {
        let home = Path::new("/home/deploy");
        for input in ["~/a", "~/.ssh/id_rsa", "~/x/y/z", "~/"] {
            let expanded = expand_home(input, Some(home)).unwrap();
            assert!(!expanded.to_string_lossy().starts_with('~'), "{input}");
            assert!(expanded.is_absolute());
            assert!(expanded.starts_with(home));
        }
    }

    #[test]
    fn test_expand_home_leaves_other_paths() {
        assert_eq!(
            expand_home("/etc/key", None).unwrap(),
            PathBuf::from("/etc/key")
        );
        assert_eq!(
            expand_home("~other/key", None).unwrap(),
            PathBuf::from("~other/key")
        );
    }

    #[test]
    fn test_expand_home_without_home_fails() {
        let err = expand_home("~/.ssh/id_rsa", None).unwrap_err();
        assert!(matches!(err, ConfigError::HomeDirUnavailable(_)));
    }
}
