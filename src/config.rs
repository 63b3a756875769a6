use std::env;

use tracing::warn;

use crate::services::FaviconStrategy;

pub const DEFAULT_DATABASE_URL: &str = "startpage.sqlite3";
pub const DEFAULT_FAVICON_SIZE: u32 = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub favicon_strategy: FaviconStrategy,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let server_port = var("SERVER_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let favicon_size = var("FAVICON_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FAVICON_SIZE);
        let favicon_strategy = match var("FAVICON_STRATEGY") {
            Some(name) => name.parse::<FaviconStrategy>().unwrap_or_else(|e| {
                warn!("{}, using the origin favicon", e);
                FaviconStrategy::default()
            }),
            None => FaviconStrategy::default(),
        };
        let favicon_strategy = match favicon_strategy {
            FaviconStrategy::Google { .. } => FaviconStrategy::Google { size: favicon_size },
            other => other,
        };

        Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            server_port,
            favicon_strategy,
        }
    }

    /// In-memory configuration for tests and throwaway instances.
    pub fn in_memory() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            server_port: 0,
            favicon_strategy: FaviconStrategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.favicon_strategy, FaviconStrategy::Origin);
    }

    #[test]
    fn test_reads_values() {
        let config = config_from(&[
            ("DATABASE_URL", ":memory:"),
            ("SERVER_PORT", "8080"),
            ("FAVICON_STRATEGY", "google"),
            ("FAVICON_SIZE", "32"),
        ]);
        assert_eq!(config.database_url, ":memory:");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.favicon_strategy, FaviconStrategy::Google { size: 32 });
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = config_from(&[
            ("SERVER_PORT", "not-a-port"),
            ("FAVICON_STRATEGY", "bing"),
            ("FAVICON_SIZE", "huge"),
        ]);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.favicon_strategy, FaviconStrategy::Origin);

        let config = config_from(&[("FAVICON_STRATEGY", "google"), ("FAVICON_SIZE", "huge")]);
        assert_eq!(
            config.favicon_strategy,
            FaviconStrategy::Google {
                size: DEFAULT_FAVICON_SIZE
            }
        );
    }

    #[test]
    fn test_size_ignored_for_other_strategies() {
        let config = config_from(&[("FAVICON_STRATEGY", "ddg"), ("FAVICON_SIZE", "128")]);
        assert_eq!(config.favicon_strategy, FaviconStrategy::DuckDuckGo);
    }
}
