//! Service configuration.

use std::path::PathBuf;

use osmtrees::ClientConfig;

/// Port used when neither `OSMTREES_PORT` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 8000;

/// Directory searched for `robots.txt` by default.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port to listen on.
    pub port: u16,
    /// Directory holding `robots.txt`.
    pub static_dir: PathBuf,
    /// Overpass client settings.
    pub client: ClientConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            client: ClientConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// See the binary's module documentation for the variables read.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = ["OSMTREES_PORT", "PORT"]
            .into_iter()
            .find_map(|key| {
                let raw = lookup(key)?;
                match raw.trim().parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        tracing::warn!(variable = key, value = %raw, "Ignoring invalid port");
                        None
                    }
                }
            })
            .unwrap_or(DEFAULT_PORT);

        let static_dir = lookup("OSMTREES_STATIC_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Self {
            port,
            static_dir,
            client: ClientConfig::from_lookup(&lookup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.port, 8000);
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.client.endpoint, osmtrees::config::DEFAULT_OVERPASS_URL);
    }

    #[test]
    fn test_port_precedence() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("OSMTREES_PORT", "9000"),
            ("PORT", "7000"),
        ]));
        assert_eq!(config.port, 9000);

        let config = ServiceConfig::from_lookup(lookup_from(&[("PORT", "7000")]));
        assert_eq!(config.port, 7000);

        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("OSMTREES_PORT", "not-a-port"),
            ("PORT", "7000"),
        ]));
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_static_dir_and_client() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("OSMTREES_STATIC_DIR", "/srv/www"),
            ("OSMTREES_OVERPASS_URL", "http://127.0.0.1:9/api/interpreter"),
        ]));
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.client.endpoint, "http://127.0.0.1:9/api/interpreter");
    }
}
