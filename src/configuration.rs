use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::authentication::REALM_CACHE_TTL;
use crate::realm::RealmName;

/// Global configuration, loaded from configuration/*.yaml. See
/// `get_configuration`.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub authorization: AuthorizationSettings,
}

/// Server configuration
#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    /// Port for the server; 0 lets the OS pick one (tests)
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

/// Basic authentication configuration
#[derive(Deserialize, Clone, Debug)]
pub struct AuthorizationSettings {
    /// How long a parsed password file is reused before being read again.
    /// Defaults to 60 s.
    #[serde(
        default = "default_cache_ttl_secs",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub realms: Vec<RealmSettings>,
}

fn default_cache_ttl_secs() -> u64 { REALM_CACHE_TTL.as_secs() }

impl AuthorizationSettings {
    pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }
}

/// A scope protected by a password file
#[derive(Deserialize, Clone, Debug)]
pub struct RealmSettings {
    /// Path prefix of the protected scope, e.g. `/admin`
    pub path: String,

    /// Sent back to clients in the `WWW-Authenticate` challenge
    pub realm: RealmName,

    /// File of `username = password` lines; also the cache key
    pub password_file: String,
}

impl RealmSettings {
    /// Whether `path` falls within this realm's scope (`/admin` covers
    /// `/admin` and `/admin/...`, but not `/administrator`)
    pub fn covers(
        &self,
        path: &str,
    ) -> bool {
        let prefix = self.path.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )?;
        Ok(())
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!("Invalid: {e}")),
        }
    }
}

/// Load yaml configuration files at `<project_root>/configuration`.
///
/// `base.yaml` is always read, then `{APP_ENVIRONMENT}.yaml` (`local` by
/// default), then env vars, e.g. `APP_AUTHORIZATION__CACHE_TTL_SECS=30` ->
/// `Settings.authorization.cache_ttl_secs`. Invalid realm names fail here,
/// before the server starts.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Foreign(Box::new(e)))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or("local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    tracing::info!("loading config for {env} env");

    let settings = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        .add_source(
            // env vars are -always- parsed as String, `serde-aux` is required to parse other
            // types
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realm(path: &str) -> RealmSettings {
        RealmSettings {
            path: path.to_string(),
            realm: RealmName::parse("Secure Area".to_string()).unwrap(),
            password_file: "passwd".to_string(),
        }
    }

    #[test]
    fn realm_covers_its_scope_only() {
        let admin = realm("/admin");
        assert!(admin.covers("/admin"));
        assert!(admin.covers("/admin/"));
        assert!(admin.covers("/admin/users"));
        assert!(!admin.covers("/administrator"));
        assert!(!admin.covers("/"));

        assert!(realm("/admin/").covers("/admin/users"));
    }

    #[test]
    fn environment() {
        assert!(matches!(
            Environment::try_from("PRODUCTION".to_string()),
            Ok(Environment::Production)
        ));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
