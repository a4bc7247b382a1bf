use std::collections::HashMap;

use hyper::Request;

/// Parsed pagination query parameters with go-to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// All query parameters as an owned map.
pub fn query_params(req: &Request<hyper::body::Incoming>) -> HashMap<String, String> {
    form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}

/// A single query parameter.
pub fn query_param(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    let mut params = query_params(req);
    params.remove(name)
}

/// `page` / `page_size` query parameters: page ≥ 1, size clamped to 1..=100,
/// defaults page 1 / size 20.
pub fn parse_pagination(req: &Request<hyper::body::Incoming>) -> Pagination {
    let params = query_params(req);
    pagination_from(&params)
}

fn pagination_from(params: &HashMap<String, String>) -> Pagination {
    let page = params
        .get("page")
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);

    let page_size = params
        .get("page_size")
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|s| *s >= 1)
        .unwrap_or(20)
        .min(100);

    Pagination { page, page_size }
}

/// Parse the numeric id at a given segment of the request path.
///
/// `path_id("/api/posts/42", 3)` → `Some(42)`; anything non-numeric → `None`.
pub fn path_id(path: &str, segment: usize) -> Option<i64> {
    let clean = path.split('?').next().unwrap_or(path);
    clean.split('/').nth(segment)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn pagination_defaults() {
        let p = pagination_from(&params(&[]));
        assert_eq!(p, Pagination { page: 1, page_size: 20 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_clamped() {
        let p = pagination_from(&params(&[("page", "3"), ("page_size", "500")]));
        assert_eq!(p.page, 3);
        assert_eq!(p.page_size, 100);
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn pagination_rejects_garbage() {
        let p = pagination_from(&params(&[("page", "-2"), ("page_size", "zero")]));
        assert_eq!(p, Pagination { page: 1, page_size: 20 });
    }

    #[test]
    fn path_id_extraction() {
        assert_eq!(path_id("/api/posts/42", 3), Some(42));
        assert_eq!(path_id("/api/posts/42/comments", 3), Some(42));
        assert_eq!(path_id("/api/posts/42?page=2", 3), Some(42));
        assert_eq!(path_id("/api/posts/abc", 3), None);
        assert_eq!(path_id("/api/posts", 3), None);
    }
}
