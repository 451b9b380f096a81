use std::env;

use crate::models::Credentials;

/// Which inventory the reconciler writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryBackend {
    Sqlite,
    NetBox,
}

/// Config holds all application configuration
#[derive(Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub jwt_secret: String,
    /// Operator account for the API
    pub api_username: String,
    pub api_password: String,
    /// Used when a request carries no (or partial) credentials
    pub device_username: String,
    pub device_password: String,
    pub device_secret: String,
    pub inventory_backend: InventoryBackend,
    pub netbox_url: String,
    pub netbox_token: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/onboarding.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:8080"),
            jwt_secret: get_env("JWT_SECRET", ""),
            api_username: get_env("API_USERNAME", "admin"),
            api_password: get_env("API_PASSWORD", ""),
            device_username: get_env("DEVICE_USERNAME", ""),
            device_password: get_env("DEVICE_PASSWORD", ""),
            device_secret: get_env("DEVICE_SECRET", ""),
            inventory_backend: parse_backend(&get_env("INVENTORY_BACKEND", "sqlite")),
            netbox_url: get_env("NETBOX_URL", ""),
            netbox_token: get_env("NETBOX_TOKEN", ""),
        }
    }

    pub fn default_credentials(&self) -> Credentials {
        Credentials {
            username: Some(self.device_username.clone()).filter(|s| !s.is_empty()),
            password: Some(self.device_password.clone()).filter(|s| !s.is_empty()),
            secret: Some(self.device_secret.clone()).filter(|s| !s.is_empty()),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("listen_addr", &self.listen_addr)
            .field("api_username", &self.api_username)
            .field("device_username", &self.device_username)
            .field("inventory_backend", &self.inventory_backend)
            .field("netbox_url", &self.netbox_url)
            .finish_non_exhaustive()
    }
}

fn parse_backend(value: &str) -> InventoryBackend {
    match value.trim().to_ascii_lowercase().as_str() {
        "netbox" => InventoryBackend::NetBox,
        "sqlite" | "" => InventoryBackend::Sqlite,
        other => {
            tracing::warn!("Unknown INVENTORY_BACKEND '{}', using sqlite", other);
            InventoryBackend::Sqlite
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("NetBox"), InventoryBackend::NetBox);
        assert_eq!(parse_backend("sqlite"), InventoryBackend::Sqlite);
        assert_eq!(parse_backend("ldap"), InventoryBackend::Sqlite);
    }

    #[test]
    fn test_default_credentials_treat_empty_as_missing() {
        let mut cfg = Config::load();
        cfg.device_username = "netops".into();
        cfg.device_password = String::new();
        cfg.device_secret = "enable-me".into();
        let creds = cfg.default_credentials();
        assert_eq!(creds.username.as_deref(), Some("netops"));
        assert!(creds.password.is_none());
        assert_eq!(creds.secret.as_deref(), Some("enable-me"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut cfg = Config::load();
        cfg.device_password = "hunter2".into();
        cfg.device_secret = "enable-secret".into();
        cfg.jwt_secret = "jwt-secret".into();
        cfg.netbox_token = "nb-token".into();
        cfg.api_password = "op-pass".into();
        let out = format!("{:?}", cfg);
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("enable-secret"));
        assert!(!out.contains("jwt-secret"));
        assert!(!out.contains("nb-token"));
        assert!(!out.contains("op-pass"));
    }
}
