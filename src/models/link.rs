use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const UNKNOWN_DOMAIN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A link that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewLinkRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields to merge over an existing link. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_favorite: Option<bool>,
}

impl LinkPatch {
    pub fn favorite(is_favorite: bool) -> Self {
        LinkPatch {
            is_favorite: Some(is_favorite),
            ..Default::default()
        }
    }
}

/// Prepends `https://` unless the input already carries an http(s) scheme.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Normalizes `raw` and returns it only if it parses as a URL with a host.
pub fn validate_url(raw: &str) -> Option<String> {
    let normalized = normalize_url(raw);
    match Url::parse(&normalized) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Some(normalized),
        _ => None,
    }
}

/// Hostname without a leading `www.`, or [`UNKNOWN_DOMAIN`].
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h).to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string())
}

/// Current time at the precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A timestamp strictly later than `previous`.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| {
            tracing::warn!("Unparsable timestamp in store: {:?}", s);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com/a"), "https://example.com/a");
        assert_eq!(normalize_url("  example.com  "), "https://example.com");
        // Other schemes are not recognized as already schemed.
        assert_eq!(normalize_url("ftp://example.com"), "https://ftp://example.com");
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(validate_url("not a url"), None);
        assert_eq!(validate_url(""), None);
        assert_eq!(validate_url("https://"), None);
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.example.com/path"), "example.com");
        assert_eq!(extract_domain("https://docs.rs"), "docs.rs");
        assert_eq!(extract_domain("not a url"), UNKNOWN_DOMAIN);
    }

    #[test]
    fn test_next_timestamp_strictly_increases() {
        let future = now() + Duration::seconds(60);
        let next = next_timestamp(future);
        assert!(next > future);
        assert_eq!(next - future, Duration::milliseconds(1));

        let past = now() - Duration::seconds(60);
        assert!(next_timestamp(past) > past);
    }

    #[test]
    fn test_timestamp_roundtrip_keeps_millis() {
        let ts = now();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), ts);
    }

    #[test]
    fn test_parse_sqlite_datetime() {
        let ts = parse_timestamp("2024-03-01 12:30:00");
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:00.000Z");
    }
}
