use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::response::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

/// Identity injected by the upstream gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

pub fn extract_user_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(USER_ID_HEADER)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > MAX_USER_ID_LEN {
        return None;
    }
    Some(raw.to_string())
}

pub async fn require_user(mut req: Request<Body>, next: Next) -> Response {
    let Some(id) = extract_user_id(req.headers()) else {
        return AppError::unauthorized("未提供用户身份").into_response();
    };

    req.extensions_mut().insert(AuthUser { id });
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_user_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(extract_user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" user-1 "));
        assert_eq!(extract_user_id(&headers), Some("user-1".to_string()));
    }
}
