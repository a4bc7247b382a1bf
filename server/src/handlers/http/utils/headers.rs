use hyper::Request;
use hyper::header::HeaderMap;
use tracing::debug;

/// Extract a header value as a string
pub fn get_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| {
        debug!("Retrieved header: {}", name);
        s.to_string()
    })
}

/// Extract bearer token from Authorization header
/// Format: "Authorization: Bearer <token>"
pub fn get_bearer_token(req: &Request<hyper::body::Incoming>) -> Option<String> {
    get_header_value(req.headers(), "authorization").and_then(|auth| {
        if auth.starts_with("Bearer ") {
            debug!("Bearer token extracted");
            Some(auth[7..].to_string())
        } else {
            debug!("Authorization header present but not a Bearer scheme");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn header_value_roundtrip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-thing", HeaderValue::from_static("value"));
        assert_eq!(get_header_value(&headers, "x-thing").as_deref(), Some("value"));
        assert!(get_header_value(&headers, "missing").is_none());
    }
}
