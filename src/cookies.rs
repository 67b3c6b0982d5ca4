//! Cookie map derivation
//!
//! Builds the per-item cookie map exposed to assertion scripts from the
//! response's Set-Cookie headers. Only the leading name=value pair of each
//! cookie string matters here; attributes are discarded.

use cookie::Cookie;
use indexmap::IndexMap;

/// Derive a name-to-value map from Set-Cookie header values.
///
/// Later duplicate names overwrite earlier ones. Strings that do not parse
/// as a cookie are skipped.
pub fn cookie_map(set_cookie: &[String]) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for raw in set_cookie {
        if let Ok(parsed) = Cookie::parse(raw.as_str()) {
            map.insert(parsed.name().to_string(), parsed.value().to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_map_strips_attributes() {
        let headers = vec!["session=abc123; Path=/; HttpOnly; Secure".to_string()];
        let map = cookie_map(&headers);
        assert_eq!(map.get("session"), Some(&"abc123".to_string()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_cookie_map_duplicates_overwrite() {
        let headers = vec![
            "token=first".to_string(),
            "token=second; Max-Age=3600".to_string(),
        ];
        let map = cookie_map(&headers);
        assert_eq!(map.get("token"), Some(&"second".to_string()));
    }

    #[test]
    fn test_cookie_map_skips_garbage() {
        let headers = vec!["".to_string(), "noequals".to_string(), "a=b".to_string()];
        let map = cookie_map(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&"b".to_string()));
    }
}
