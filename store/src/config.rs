use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable selecting the base directory for owner repositories.
pub const ROOT_ENV_VAR: &str = "VELLUM_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base directory; each owner gets `{root_dir}/{owner}/`.
    pub root_dir: PathBuf,
    /// Committer name recorded on every revision. This is a system
    /// identity; the acting user travels in the commit message trailer.
    pub identity_name: String,
    /// Committer email recorded on every revision. Synthetic address.
    pub identity_email: String,
    /// Deadline applied by the async service to each store operation.
    pub operation_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("content_repos"),
            identity_name: "Vellum Content Store".to_string(),
            identity_email: "content-store@vellum.invalid".to_string(),
            operation_timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Default configuration with the root directory taken from
    /// `VELLUM_ROOT` when set and non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
            if !root.is_empty() {
                config.root_dir = PathBuf::from(root);
            }
        }
        config
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn with_identity(
        mut self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.identity_name = name.into();
        self.identity_email = email.into();
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.root_dir.as_os_str().is_empty() {
            return Err("Root directory cannot be empty".to_string());
        }

        if self.identity_name.is_empty() {
            return Err("Identity name cannot be empty".to_string());
        }

        if self.identity_email.is_empty() || !self.identity_email.contains('@') {
            return Err("Identity email must contain @".to_string());
        }

        if self.operation_timeout.is_zero() {
            return Err("Operation timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.root_dir, PathBuf::from("content_repos"));
        assert_eq!(config.identity_name, "Vellum Content Store");
        assert!(config.identity_email.contains('@'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/srv/vellum")
            .with_identity("Course Store", "courses@example.invalid")
            .with_operation_timeout(Duration::from_secs(5));

        assert_eq!(config.root_dir, PathBuf::from("/srv/vellum"));
        assert_eq!(config.identity_name, "Course Store");
        assert_eq!(config.identity_email, "courses@example.invalid");
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::default();

        config.root_dir = PathBuf::new();
        assert!(config.validate().is_err());

        config.root_dir = PathBuf::from("content_repos");
        config.identity_name = "".to_string();
        assert!(config.validate().is_err());

        config.identity_name = "Vellum Content Store".to_string();
        config.identity_email = "not-an-email".to_string();
        assert!(config.validate().is_err());

        config.identity_email = "content-store@vellum.invalid".to_string();
        config.operation_timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_honors_root_override() {
        std::env::set_var(ROOT_ENV_VAR, "/tmp/vellum-roots");
        let config = StoreConfig::from_env();
        std::env::remove_var(ROOT_ENV_VAR);
        assert_eq!(config.root_dir, PathBuf::from("/tmp/vellum-roots"));
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_empty_value() {
        std::env::set_var(ROOT_ENV_VAR, "");
        let config = StoreConfig::from_env();
        std::env::remove_var(ROOT_ENV_VAR);
        assert_eq!(config.root_dir, PathBuf::from("content_repos"));
    }

    #[test]
    fn test_serialization() {
        let config = StoreConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.root_dir, deserialized.root_dir);
        assert_eq!(config.identity_email, deserialized.identity_email);
    }
}
