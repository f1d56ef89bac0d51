//! Authentication Middleware
//!
//! Bearer token authentication, role guards and per-client rate limiting
//! for API endpoints.

use crate::models::{Role, UserContext};
use crate::service::{JwtService, RateLimitStatus, RateLimiter};
use crate::utils::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Extension type for storing authenticated user context in request extensions
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserContext);

/// Authentication middleware that validates JWT tokens and extracts user context
///
/// This middleware:
/// 1. Extracts the Authorization header from the request
/// 2. Validates the Bearer token format
/// 3. Verifies the JWT token using the JWT service
/// 4. Adds the user context to request extensions for use in handlers
///
/// If authentication fails, returns a 401 Unauthorized response.
pub async fn auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing Authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("Invalid Authorization header format".into()))?;

    let user_context = jwt_service
        .validate_access_token(token)
        .map_err(|_| AppError::Authentication("Invalid or expired token".into()))?;

    request.extensions_mut().insert(AuthUser(user_context));

    Ok(next.run(request).await)
}

/// Admits only administrators. Must run after `auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    require(&request, Role::is_admin)?;
    Ok(next.run(request).await)
}

/// Admits administrators and instructors. Must run after `auth_middleware`.
pub async fn require_catalog_manager(request: Request, next: Next) -> Result<Response, AppError> {
    require(&request, Role::can_manage_catalog)?;
    Ok(next.run(request).await)
}

fn require(request: &Request, allowed: fn(&Role) -> bool) -> Result<(), AppError> {
    let caller = extract_auth_user(request)?;
    if allowed(&caller.role) {
        Ok(())
    } else {
        log::warn!(
            "user {} with role {} denied access to {}",
            caller.user_id,
            caller.role,
            request.uri().path()
        );
        Err(AppError::Forbidden("Insufficient permissions".into()))
    }
}

/// Counts the request against the caller's allowance and rejects it with
/// 429 and `Retry-After` once the allowance is spent
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_address(&request, limiter.trusts_forwarded_for());
    let status = limiter.check(&client).await;

    if status.exceeded {
        log::warn!("rate limit exceeded for {} on {}", client, request.uri().path());
        let mut response = AppError::RateLimit("rate limit exceeded".into()).into_response();
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from(status.retry_after_secs()),
        );
        set_rate_limit_headers(response.headers_mut(), &status);
        return response;
    }

    let mut response = next.run(request).await;
    set_rate_limit_headers(response.headers_mut(), &status);
    response
}

fn set_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(status.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(status.resets_in.as_secs()));
}

/// Peer address of the connection, or the first `X-Forwarded-For` hop when
/// the deployment sits behind a trusted proxy
fn client_address(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Helper function to extract authenticated user from request extensions
///
/// The auth_middleware must be applied to the route for this to work.
pub fn extract_auth_user(request: &Request) -> Result<&UserContext, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|auth_user| &auth_user.0)
        .ok_or_else(|| {
            AppError::Authentication("User context not found in request extensions".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLayer, MemoryCache};
    use crate::config::RateLimitConfig;
    use crate::models::UserWithPassword;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Router,
    };
    use chrono::{Duration, Utc};
    use tower::util::ServiceExt;
    use uuid::Uuid;

    fn create_test_jwt_service() -> Arc<JwtService> {
        Arc::new(JwtService::new("test_secret", "edu-core", Duration::hours(1)))
    }

    fn token_for(jwt: &JwtService, role: Role) -> String {
        let user = UserWithPassword {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Alice".to_string(),
            role,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        jwt.issue_access_token(&user).unwrap().token
    }

    async fn test_handler() -> &'static str {
        "OK"
    }

    fn protected_app(jwt_service: Arc<JwtService>) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .route(
                "/admin",
                get(test_handler).route_layer(from_fn(require_admin)),
            )
            .route(
                "/catalog",
                get(test_handler).route_layer(from_fn(require_catalog_manager)),
            )
            .layer(from_fn_with_state(jwt_service, auth_middleware))
    }

    fn get_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_auth_middleware_missing_header() {
        let app = protected_app(create_test_jwt_service());

        let response = app.oneshot(get_request("/test", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_middleware_invalid_format() {
        let app = protected_app(create_test_jwt_service());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .header(AUTHORIZATION, "Invalid token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_middleware_accepts_valid_token() {
        let jwt = create_test_jwt_service();
        let token = token_for(&jwt, Role::User);

        let response = protected_app(jwt)
            .oneshot(get_request("/test", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_rejected() {
        let other = JwtService::new("other_secret", "edu-core", Duration::hours(1));
        let token = token_for(&other, Role::Admin);

        let response = protected_app(create_test_jwt_service())
            .oneshot(get_request("/test", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_guards() {
        let jwt = create_test_jwt_service();
        let cases = [
            (Role::User, "/admin", StatusCode::FORBIDDEN),
            (Role::User, "/catalog", StatusCode::FORBIDDEN),
            (Role::Instructor, "/admin", StatusCode::FORBIDDEN),
            (Role::Instructor, "/catalog", StatusCode::OK),
            (Role::Admin, "/admin", StatusCode::OK),
            (Role::Admin, "/catalog", StatusCode::OK),
        ];

        for (role, uri, expected) in cases {
            let token = token_for(&jwt, role);
            let response = protected_app(jwt.clone())
                .oneshot(get_request(uri, Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{} on {}", role, uri);
        }
    }

    fn rate_limited_app(requests: u64, trust_forwarded_for: bool) -> Router {
        let limiter = RateLimiter::new(
            CacheLayer::new(Arc::new(MemoryCache::new())),
            RateLimitConfig {
                enabled: true,
                requests,
                window_seconds: 60,
                trust_forwarded_for,
            },
        );
        Router::new()
            .route("/login", get(test_handler))
            .layer(from_fn_with_state(Arc::new(limiter), rate_limit_middleware))
    }

    fn request_from(peer: [u8; 4], forwarded_for: Option<&str>) -> Request<Body> {
        let mut request = get_request("/login", None);
        if let Some(hop) = forwarded_for {
            request
                .headers_mut()
                .insert(X_FORWARDED_FOR, HeaderValue::from_str(hop).unwrap());
        }
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
        request
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_requests_over_allowance() {
        let app = rate_limited_app(2, false);

        for remaining in ["1", "0"] {
            let response = app
                .clone()
                .oneshot(request_from([10, 0, 0, 1], None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "2");
            assert_eq!(response.headers()[X_RATELIMIT_REMAINING], remaining);
        }

        let response = app
            .clone()
            .oneshot(request_from([10, 0, 0, 1], None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        let response = app
            .oneshot(request_from([10, 0, 0, 2], None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forwarded_for_is_ignored_unless_trusted() {
        let untrusted = rate_limited_app(1, false);
        let response = untrusted
            .clone()
            .oneshot(request_from([10, 0, 0, 1], Some("203.0.113.1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = untrusted
            .oneshot(request_from([10, 0, 0, 1], Some("203.0.113.2")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let trusted = rate_limited_app(1, true);
        for hop in ["203.0.113.1, 10.0.0.9", "203.0.113.2"] {
            let response = trusted
                .clone()
                .oneshot(request_from([10, 0, 0, 1], Some(hop)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[test]
    fn test_client_address_without_peer() {
        let request = get_request("/login", None);
        assert_eq!(client_address(&request, false), "unknown");
    }

    #[test]
    fn test_extract_auth_user_missing() {
        let request = get_request("/test", None);
        assert!(extract_auth_user(&request).is_err());
    }

    #[test]
    fn test_extract_auth_user_present() {
        let user_context = UserContext {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            role: Role::User,
            token_id: "test_token_id".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };

        let mut request = get_request("/test", None);
        request
            .extensions_mut()
            .insert(AuthUser(user_context.clone()));

        let result = extract_auth_user(&request).unwrap();
        assert_eq!(result.user_id, user_context.user_id);
        assert_eq!(result.token_id, user_context.token_id);
    }
}
