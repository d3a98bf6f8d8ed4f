//! `Origin` header allowlist.
//!
//! Gates WebSocket upgrades and decides whether the reset endpoint echoes
//! permissive CORS headers. An origin is accepted when it is `http://` or
//! `https://` followed by an allowed host, optionally followed by `:port`.
//! Anything after the host other than a port (for example
//! `https://jarv.org.example.com`) is rejected.

/// Fixed set of hosts whose origins are trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginAllowlist {
    hosts: Vec<String>,
}

impl OriginAllowlist {
    /// Build an allowlist from bare host names (`jarv.org`, `localhost`).
    ///
    /// Empty entries are ignored.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_owned())
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts }
    }

    /// Whether `origin` (an `Origin` header value) is allowed.
    pub fn is_allowed(&self, origin: &str) -> bool {
        let Some(rest) = origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
        else {
            return false;
        };

        self.hosts.iter().any(|host| host_matches(rest, host))
    }

    /// The configured hosts.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

/// `rest` is `host` or `host:port`.
fn host_matches(rest: &str, host: &str) -> bool {
    rest.strip_prefix(host).is_some_and(|tail| {
        tail.is_empty()
            || tail
                .strip_prefix(':')
                .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
    })
}
