//! Request and response header handling

use std::collections::{BTreeMap, HashMap};

/// Headers the transport sets itself; never forwarded from caller options.
/// Matching is case-sensitive.
pub const UNSAFE_HEADERS: [&str; 3] = ["User-Agent", "Accept-Encoding", "Content-Length"];

/// Header key used for `RequestOptions::proxy_authorization`
pub const PROXY_AUTHORIZATION: &str = "Proxy-Authorization";

/// Build the header list handed to the transport
///
/// Works on a copy of the caller's headers: the proxy token is merged in
/// and reserved names are dropped. Values are passed through unmodified.
pub fn outgoing_headers(
    headers: Option<&BTreeMap<String, String>>,
    proxy_authorization: Option<&str>,
) -> Vec<(String, String)> {
    let mut merged = headers.cloned().unwrap_or_default();

    if let Some(token) = proxy_authorization {
        merged.insert(PROXY_AUTHORIZATION.to_string(), token.to_string());
    }

    merged
        .into_iter()
        .filter(|(name, _)| !UNSAFE_HEADERS.contains(&name.as_str()))
        .collect()
}

/// Normalize response header pairs: names trimmed and lowercased, values
/// trimmed, last occurrence of a name wins
pub fn normalize_headers<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HashMap::new();
    for (name, value) in pairs {
        headers.insert(
            name.as_ref().trim().to_lowercase(),
            value.as_ref().trim().to_string(),
        );
    }
    headers
}

/// Parse a raw header block (`Name: value` lines separated by CRLF, LF or CR)
///
/// Empty lines are skipped. A line without a colon becomes a name with an
/// empty value.
pub fn parse_header_block(raw: &str) -> HashMap<String, String> {
    let pairs = raw
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(':') {
            Some((name, value)) => (name, value),
            None => (line, ""),
        });

    normalize_headers(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unsafe_headers_are_stripped() {
        let input = headers(&[
            ("User-Agent", "evil"),
            ("Accept-Encoding", "br"),
            ("Content-Length", "999"),
            ("X-Trace", "abc"),
            ("Accept", " text/plain "),
        ]);

        let out = outgoing_headers(Some(&input), None);

        assert_eq!(
            out,
            vec![
                ("Accept".to_string(), " text/plain ".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_stripping_is_case_sensitive() {
        let input = headers(&[("user-agent", "kept")]);
        let out = outgoing_headers(Some(&input), None);
        assert_eq!(out, vec![("user-agent".to_string(), "kept".to_string())]);
    }

    #[test]
    fn test_proxy_authorization_merged_into_copy() {
        let input = headers(&[("X-Trace", "abc")]);

        let out = outgoing_headers(Some(&input), Some("Basic dG9rZW4="));

        assert!(out.contains(&(PROXY_AUTHORIZATION.to_string(), "Basic dG9rZW4=".to_string())));
        // caller's map untouched
        assert_eq!(input.len(), 1);
        assert!(!input.contains_key(PROXY_AUTHORIZATION));
    }

    #[test]
    fn test_proxy_authorization_without_headers() {
        let out = outgoing_headers(None, Some("token"));
        assert_eq!(out, vec![(PROXY_AUTHORIZATION.to_string(), "token".to_string())]);
        assert!(outgoing_headers(None, None).is_empty());
    }

    #[test]
    fn test_parse_header_block() {
        let raw = "Content-Type: text/plain\r\nX-Custom:  spaced value  \nSet-Cookie: a=1\rSet-Cookie: b=2\r\n";

        let parsed = parse_header_block(raw);

        assert_eq!(parsed.get("content-type").map(String::as_str), Some("text/plain"));
        assert_eq!(parsed.get("x-custom").map(String::as_str), Some("spaced value"));
        // last write wins
        assert_eq!(parsed.get("set-cookie").map(String::as_str), Some("b=2"));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_value_keeps_inner_colons() {
        let parsed = parse_header_block("Location: https://example.test:8443/x");
        assert_eq!(
            parsed.get("location").map(String::as_str),
            Some("https://example.test:8443/x")
        );
    }

    #[test]
    fn test_reserialized_block_round_trips() {
        let parsed = parse_header_block(" ETag : \"v1\"\r\nCache-Control: no-cache\r\n");

        let mut lines: Vec<String> = parsed.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        lines.sort();
        let reparsed = parse_header_block(&lines.join("\r\n"));

        assert_eq!(parsed, reparsed);
        assert_eq!(parsed.get("etag").map(String::as_str), Some("\"v1\""));
    }
}
