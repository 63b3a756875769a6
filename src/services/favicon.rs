use std::fmt;
use std::str::FromStr;

use url::Url;

/// Icon shown when a link's URL cannot produce a favicon address.
pub const DEFAULT_FAVICON: &str = "/favicon.png";

/// How a link's favicon address is derived from its URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaviconStrategy {
    /// `{origin}/favicon.ico` on the linked site itself.
    #[default]
    Origin,
    /// Google's favicon service, keyed by hostname.
    Google { size: u32 },
    /// DuckDuckGo's icon service, keyed by hostname.
    DuckDuckGo,
}

impl FaviconStrategy {
    pub fn favicon_url(&self, url: &str) -> String {
        let Some(parsed) = Url::parse(url).ok().filter(|u| u.host_str().is_some()) else {
            return DEFAULT_FAVICON.to_string();
        };
        let host = parsed.host_str().unwrap_or_default();

        match self {
            FaviconStrategy::Origin => {
                format!("{}/favicon.ico", parsed.origin().ascii_serialization())
            }
            FaviconStrategy::Google { size } => {
                format!("https://www.google.com/s2/favicons?domain={}&sz={}", host, size)
            }
            FaviconStrategy::DuckDuckGo => {
                format!("https://icons.duckduckgo.com/ip3/{}.ico", host)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown favicon strategy '{}'", self.0)
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for FaviconStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "origin" => Ok(FaviconStrategy::Origin),
            "google" => Ok(FaviconStrategy::Google { size: 64 }),
            "duckduckgo" | "ddg" => Ok(FaviconStrategy::DuckDuckGo),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_strategy() {
        let strategy = FaviconStrategy::Origin;
        assert_eq!(
            strategy.favicon_url("https://www.example.com/some/page?q=1"),
            "https://www.example.com/favicon.ico"
        );
        assert_eq!(
            strategy.favicon_url("http://localhost:8080/"),
            "http://localhost:8080/favicon.ico"
        );
    }

    #[test]
    fn test_service_strategies_use_hostname() {
        assert_eq!(
            FaviconStrategy::Google { size: 32 }.favicon_url("https://rust-lang.org/learn"),
            "https://www.google.com/s2/favicons?domain=rust-lang.org&sz=32"
        );
        assert_eq!(
            FaviconStrategy::DuckDuckGo.favicon_url("https://rust-lang.org/learn"),
            "https://icons.duckduckgo.com/ip3/rust-lang.org.ico"
        );
    }

    #[test]
    fn test_unparsable_url_falls_back() {
        for strategy in [
            FaviconStrategy::Origin,
            FaviconStrategy::Google { size: 64 },
            FaviconStrategy::DuckDuckGo,
        ] {
            assert_eq!(strategy.favicon_url("not a url"), DEFAULT_FAVICON);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("origin".parse::<FaviconStrategy>(), Ok(FaviconStrategy::Origin));
        assert_eq!(" Google ".parse::<FaviconStrategy>(), Ok(FaviconStrategy::Google { size: 64 }));
        assert_eq!("ddg".parse::<FaviconStrategy>(), Ok(FaviconStrategy::DuckDuckGo));
        assert!("bing".parse::<FaviconStrategy>().is_err());
    }
}
