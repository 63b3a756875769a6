/// `git describe` output at build time, or `dev` outside a checkout.
pub const GIT_VERSION: &str = env!("GIT_VERSION");

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Human-readable version, e.g. `0.1.0 (v0.1.0-3-g1234567)`.
pub fn display() -> String {
    format!("{} ({})", PKG_VERSION, GIT_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_both_versions() {
        let version = display();
        assert!(version.starts_with(PKG_VERSION));
        assert!(version.contains(GIT_VERSION));
    }
}
