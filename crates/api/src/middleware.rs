use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use gasdesk_auth::JwtValidator;

use crate::app::errors::ApiError;
use crate::context::SessionContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_token(req.headers(), req.uri()) {
        Some(token) => token,
        None => return ApiError::Unauthorized("Missing bearer token".to_string()).into_response(),
    };

    let claims = match state.jwt.validate(&token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return ApiError::Unauthorized("Invalid or expired token".to_string()).into_response();
        }
    };

    req.extensions_mut().insert(SessionContext::new(claims));
    next.run(req).await
}

/// `Authorization: Bearer <token>`, or a `token` query parameter for
/// stream clients that cannot set headers.
fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        let uri: Uri = "/socket?token=xyz".parse().unwrap();
        assert_eq!(extract_token(&headers, &uri).as_deref(), Some("abc"));
    }

    #[test]
    fn query_token_is_accepted() {
        let uri: Uri = "/socket?x=1&token=xyz".parse().unwrap();
        assert_eq!(extract_token(&HeaderMap::new(), &uri).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_blank_token_is_none() {
        let uri: Uri = "/socket?token=".parse().unwrap();
        assert_eq!(extract_token(&HeaderMap::new(), &uri), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert_eq!(extract_token(&headers, &"/api".parse().unwrap()), None);
    }
}
