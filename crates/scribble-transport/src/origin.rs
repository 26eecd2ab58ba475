//! Origin allow-list for browser WebSocket upgrades.

/// Decides which `Origin` header values may open a connection.
///
/// An empty allow-list accepts every origin. Requests that carry no
/// `Origin` header at all (native clients, tests, curl) are always
/// accepted; browsers always send one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// A policy that accepts every origin.
    pub fn allow_any() -> Self {
        Self::default()
    }

    /// A policy that accepts only the listed origins.
    ///
    /// Trailing slashes are ignored, so `https://example.com/` and
    /// `https://example.com` are the same entry.
    pub fn allow_only<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = origins
            .into_iter()
            .map(Into::into)
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { allowed }
    }

    /// Returns `true` if this policy accepts every origin.
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Returns `true` if a request with the given `Origin` may connect.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        if self.is_open() {
            return true;
        }
        let origin = origin.trim_end_matches('/');
        self.allowed.iter().any(|a| a == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_policy_accepts_everything() {
        let policy = OriginPolicy::allow_any();
        assert!(policy.is_open());
        assert!(policy.allows(Some("https://anywhere.example")));
        assert!(policy.allows(None));
    }

    #[test]
    fn test_restricted_policy() {
        let policy = OriginPolicy::allow_only([
            "http://localhost:3000",
            "https://scribble.example.com/",
        ]);
        assert!(!policy.is_open());
        assert!(policy.allows(Some("http://localhost:3000")));
        assert!(policy.allows(Some("https://scribble.example.com")));
        assert!(!policy.allows(Some("https://evil.example.com")));
    }

    #[test]
    fn test_missing_origin_is_always_allowed() {
        let policy = OriginPolicy::allow_only(["http://localhost:3000"]);
        assert!(policy.allows(None));
    }

    #[test]
    fn test_blank_entries_are_dropped() {
        let policy = OriginPolicy::allow_only(["", "  "]);
        assert!(policy.is_open());
    }
}
