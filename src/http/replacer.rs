//! Request-scoped template substitution for extra-header values.
//!
//! Placeholders: `{method}`, `{scheme}`, `{host}`, `{path}`, `{query}`,
//! `{uri}`, `{proto}`, `{remote}`, `{port}`, and `{>Name}` for any inbound
//! request header. Unknown placeholders pass through verbatim.

use std::net::SocketAddr;

use axum::http::{header, request::Parts, HeaderMap, Version};

/// The Host exactly as the caller sent it.
pub fn request_host(parts: &Parts) -> String {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Substitution context captured from one inbound request.
///
/// Construction is deferred until an attempt actually needs it.
#[derive(Debug)]
pub struct Replacer {
    replacements: Vec<(&'static str, String)>,
    headers: HeaderMap,
}

impl Replacer {
    /// Capture the substitution values. `host` must be the original inbound
    /// Host, taken before any rewriting.
    pub fn new(parts: &Parts, host: &str, remote: Option<SocketAddr>) -> Self {
        let uri = &parts.uri;
        let proto = match parts.version {
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2.0",
            _ => "HTTP/1.1",
        };
        let mut replacements = vec![
            ("method", parts.method.to_string()),
            ("scheme", uri.scheme_str().unwrap_or("http").to_string()),
            ("host", host.to_string()),
            ("path", uri.path().to_string()),
            ("query", uri.query().unwrap_or("").to_string()),
            (
                "uri",
                uri.path_and_query()
                    .map(|pq| pq.to_string())
                    .unwrap_or_else(|| "/".to_string()),
            ),
            ("proto", proto.to_string()),
        ];
        if let Some(addr) = remote {
            replacements.push(("remote", addr.ip().to_string()));
            replacements.push(("port", addr.port().to_string()));
        }
        Self {
            replacements,
            headers: parts.headers.clone(),
        }
    }

    /// Substitute every known placeholder in `template`.
    pub fn replace(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match tail.find('}') {
                Some(end) => {
                    let key = &tail[1..end];
                    match self.lookup(key) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&tail[..=end]),
                    }
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    return out;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(name) = key.strip_prefix('>') {
            // Absent headers substitute as empty, like any other known key.
            let value = self
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            return Some(value.to_string());
        }
        self.replacements
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn parts() -> Parts {
        let (parts, _) = Request::builder()
            .method("POST")
            .uri("http://ignored.example/search?q=rust")
            .header("Host", "caller.example:8080")
            .header("X-Tenant", "acme")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_basic_placeholders() {
        let parts = parts();
        let host = request_host(&parts);
        let remote: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        let r = Replacer::new(&parts, &host, Some(remote));

        assert_eq!(r.replace("{method}"), "POST");
        assert_eq!(r.replace("{host}"), "caller.example:8080");
        assert_eq!(r.replace("{path}"), "/search");
        assert_eq!(r.replace("{query}"), "q=rust");
        assert_eq!(r.replace("{uri}"), "/search?q=rust");
        assert_eq!(r.replace("{remote}"), "10.1.2.3");
        assert_eq!(r.replace("{port}"), "5555");
        assert_eq!(r.replace("{method} {uri}"), "POST /search?q=rust");
    }

    #[test]
    fn test_header_placeholders() {
        let parts = parts();
        let host = request_host(&parts);
        let r = Replacer::new(&parts, &host, None);

        assert_eq!(r.replace("{>X-Tenant}"), "acme");
        assert_eq!(r.replace("{>X-Missing}"), "");
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let parts = parts();
        let host = request_host(&parts);
        let r = Replacer::new(&parts, &host, None);

        assert_eq!(r.replace("{nope}"), "{nope}");
        assert_eq!(r.replace("{unterminated"), "{unterminated");
        assert_eq!(r.replace("plain text"), "plain text");
    }

    #[test]
    fn test_host_prefers_header_over_uri_authority() {
        let parts = parts();
        assert_eq!(request_host(&parts), "caller.example:8080");
    }
}
