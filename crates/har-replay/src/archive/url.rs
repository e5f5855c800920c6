//! Minimal absolute-URL splitter for archived request URLs.

/// The pieces of an archived URL the matcher and alias manager need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Lower-cased scheme, e.g. `https`.
    pub scheme: String,
    /// Hostname plus explicit port, e.g. `api.example.com:8443`. Compared
    /// against the live `Host` header.
    pub host: String,
    /// Lower-cased hostname without port (IPv6 literals without brackets).
    pub hostname: String,
    /// Port only when the URL spelled one out.
    pub port: Option<u16>,
    /// Path and query exactly as captured; `/` when empty. Never has a fragment.
    pub path: String,
}

impl ParsedUrl {
    /// Split an absolute `scheme://authority/path?query#fragment` URL.
    ///
    /// Returns `None` for anything without a `://` separator.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, remainder) = url.split_once("://")?;
        if scheme.is_empty() {
            return None;
        }

        let remainder = match remainder.find('#') {
            Some(pos) => &remainder[..pos],
            None => remainder,
        };

        let (authority, rest) = match remainder.find(['/', '?']) {
            Some(pos) => (&remainder[..pos], &remainder[pos..]),
            None => (remainder, ""),
        };

        let path = if rest.is_empty() {
            "/".to_string()
        } else if rest.starts_with('?') {
            format!("/{rest}")
        } else {
            rest.to_string()
        };

        // Drop userinfo
        let authority = match authority.rfind('@') {
            Some(pos) => &authority[pos + 1..],
            None => authority,
        };

        let (hostname, port, bracketed) = split_host_port(authority);
        let hostname = hostname.to_ascii_lowercase();
        let mut host = if bracketed {
            format!("[{hostname}]")
        } else {
            hostname.clone()
        };
        if let Some(port) = port {
            host.push(':');
            host.push_str(&port.to_string());
        }

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host,
            hostname,
            port,
            path,
        })
    }
}

fn split_host_port(authority: &str) -> (&str, Option<u16>, bool) {
    if let Some(inner) = authority.strip_prefix('[') {
        if let Some(end) = inner.find(']') {
            let port = inner[end + 1..]
                .strip_prefix(':')
                .and_then(|p| p.parse::<u16>().ok());
            return (&inner[..end], port, true);
        }
    }

    if let Some(pos) = authority.rfind(':') {
        let digits = &authority[pos + 1..];
        if digits.chars().all(|c| c.is_ascii_digit()) {
            return (&authority[..pos], digits.parse::<u16>().ok(), false);
        }
    }

    (authority, None, false)
}
