//! API Route Definitions
//!
//! This module defines all HTTP routes and their corresponding handlers using a flexible
//! builder pattern. The RouterBuilder allows selective enabling of route groups, so a
//! deployment can for example expose only the public catalog.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::{
    auth_handlers, catalog_handlers,
    handlers::{health_check, AppState},
    learning_handlers,
    middleware::{auth_middleware, rate_limit_middleware, require_admin, require_catalog_manager},
    user_handlers,
};
use crate::config::ServerConfig;
use crate::service::{JwtService, RateLimiter};

/// Prefix every route is nested under
pub const API_PREFIX: &str = "/api/v1";

/// Builder for creating API routes with configurable route groups
#[derive(Default)]
pub struct RouterBuilder {
    /// GET /health
    health_check: bool,
    /// /auth/* (register, login, refresh, logout, password reset)
    auth: bool,
    /// /users/me and the admin user endpoints
    users: bool,
    /// Public category and course reads
    catalog: bool,
    /// /admin/categories, /admin/courses, /admin/lessons
    catalog_admin: bool,
    /// Enrollment, enrollments listing and progress tracking
    learning: bool,
    /// Per-client limit applied to the /auth group
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl RouterBuilder {
    /// Creates a new router builder with all routes disabled by default
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router builder with every route group enabled
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            auth: true,
            users: true,
            catalog: true,
            catalog_admin: true,
            learning: true,
            rate_limiter: None,
        }
    }

    /// Health check and anonymous catalog reads only
    pub fn with_readonly_routes() -> Self {
        Self {
            health_check: true,
            catalog: true,
            ..Self::default()
        }
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    pub fn auth(mut self, enabled: bool) -> Self {
        self.auth = enabled;
        self
    }

    pub fn users(mut self, enabled: bool) -> Self {
        self.users = enabled;
        self
    }

    pub fn catalog(mut self, enabled: bool) -> Self {
        self.catalog = enabled;
        self
    }

    pub fn catalog_admin(mut self, enabled: bool) -> Self {
        self.catalog_admin = enabled;
        self
    }

    pub fn learning(mut self, enabled: bool) -> Self {
        self.learning = enabled;
        self
    }

    /// Limits requests to the /auth group per client
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Builds the enabled routes. Authenticated groups validate bearer
    /// tokens with `jwt_service`.
    pub fn build(self, jwt_service: Arc<JwtService>) -> Router<AppState> {
        let authenticated = from_fn_with_state(jwt_service, auth_middleware);
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        if self.auth {
            let mut auth = Router::new()
                .route("/auth/register", post(auth_handlers::register))
                .route("/auth/login", post(auth_handlers::login))
                .route("/auth/refresh-token", post(auth_handlers::refresh_token))
                .route("/auth/logout", post(auth_handlers::logout))
                .route("/auth/forgot-password", post(auth_handlers::forgot_password))
                .route("/auth/reset-password", post(auth_handlers::reset_password));

            if let Some(limiter) = self.rate_limiter.clone() {
                auth = auth.route_layer(from_fn_with_state(limiter, rate_limit_middleware));
            }

            router = router.merge(auth);
        }

        if self.catalog {
            router = router
                .route("/categories", get(catalog_handlers::list_categories))
                .route("/categories/{id}", get(catalog_handlers::get_category))
                .route(
                    "/categories/slug/{slug}",
                    get(catalog_handlers::get_category_by_slug),
                )
                .route("/courses", get(catalog_handlers::list_courses))
                .route("/courses/featured", get(catalog_handlers::featured_courses))
                .route("/courses/{id}", get(catalog_handlers::get_course))
                .route("/courses/{id}/lessons", get(catalog_handlers::course_lessons));
        }

        if self.users {
            let me = Router::new()
                .route(
                    "/users/me",
                    get(user_handlers::get_profile).put(user_handlers::update_profile),
                )
                .route_layer(authenticated.clone());

            let admin = Router::new()
                .route("/users", get(user_handlers::list_users))
                .route(
                    "/users/{id}",
                    get(user_handlers::get_user)
                        .put(user_handlers::update_user)
                        .delete(user_handlers::delete_user),
                )
                .route_layer(from_fn(require_admin))
                .route_layer(authenticated.clone());

            router = router.merge(me).merge(admin);
        }

        if self.catalog_admin {
            let categories = Router::new()
                .route("/admin/categories", post(catalog_handlers::create_category))
                .route(
                    "/admin/categories/{id}",
                    put(catalog_handlers::update_category).delete(catalog_handlers::delete_category),
                )
                .route_layer(from_fn(require_admin))
                .route_layer(authenticated.clone());

            let courses = Router::new()
                .route("/admin/courses", post(catalog_handlers::create_course))
                .route(
                    "/admin/courses/{id}",
                    put(catalog_handlers::update_course).delete(catalog_handlers::delete_course),
                )
                .route("/admin/lessons", post(catalog_handlers::create_lesson))
                .route(
                    "/admin/lessons/{id}",
                    put(catalog_handlers::update_lesson).delete(catalog_handlers::delete_lesson),
                )
                .route_layer(from_fn(require_catalog_manager))
                .route_layer(authenticated.clone());

            router = router.merge(categories).merge(courses);
        }

        if self.learning {
            let learning = Router::new()
                .route("/courses/{id}/enroll", post(catalog_handlers::enroll))
                .route("/courses/{id}/progress", get(learning_handlers::course_progress))
                .route("/enrollments", get(learning_handlers::my_enrollments))
                .route(
                    "/lessons/{id}/progress",
                    get(learning_handlers::lesson_progress).put(learning_handlers::update_progress),
                )
                .route("/lessons/{id}/complete", post(learning_handlers::complete_lesson))
                .route_layer(authenticated);

            router = router.merge(learning);
        }

        router
    }
}

/// Complete application: every route group under `/api/v1` with request
/// tracing and CORS applied
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    let routes = create_routes(&state);

    Router::new()
        .nest(API_PREFIX, routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.cors_origins))
                .into_inner(),
        )
}

/// Permissive when the origin list is empty or contains `*`
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Every route group, with the state's rate limiter on /auth
pub fn create_routes(state: &AppState) -> Router<AppState> {
    RouterBuilder::with_all_routes()
        .rate_limiter(state.rate_limiter.clone())
        .build(state.jwt_service.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLayer, MemoryCache};
    use crate::config::{CacheTtlConfig, RateLimitConfig};
    use crate::models::Role;
    use crate::repository::memory::MemoryStores;
    use crate::service::{AuthService, CategoryService, CourseService, LearningService, UserService};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    #[test]
    fn test_router_builder_new() {
        let builder = RouterBuilder::new();

        assert!(!builder.health_check);
        assert!(!builder.auth);
        assert!(!builder.users);
        assert!(!builder.catalog);
        assert!(!builder.catalog_admin);
        assert!(!builder.learning);
    }

    #[test]
    fn test_router_builder_presets() {
        let all = RouterBuilder::with_all_routes();
        assert!(all.auth && all.users && all.catalog && all.catalog_admin && all.learning);

        let readonly = RouterBuilder::with_readonly_routes();
        assert!(readonly.health_check && readonly.catalog);
        assert!(!readonly.auth && !readonly.users && !readonly.catalog_admin);

        let custom = RouterBuilder::new().auth(true).learning(true);
        assert!(custom.auth && custom.learning && !custom.catalog);
    }

    fn test_state() -> AppState {
        test_state_with_auth_limit(100)
    }

    fn test_state_with_auth_limit(requests: u64) -> AppState {
        let stores = MemoryStores::new().into_stores();
        let cache = CacheLayer::new(Arc::new(MemoryCache::new()));
        let ttl = CacheTtlConfig::default();
        let jwt = JwtService::new("test_secret", "edu-core", Duration::hours(1));

        let courses = CourseService::new(
            stores.courses.clone(),
            stores.lessons.clone(),
            stores.users.clone(),
            stores.enrollments.clone(),
            cache.clone(),
            ttl.clone(),
        );

        AppState {
            auth_service: Arc::new(
                AuthService::new(
                    stores.users.clone(),
                    stores.refresh_tokens.clone(),
                    cache.clone(),
                    jwt.clone(),
                    Duration::hours(168),
                    ttl.reset_grant(),
                )
                .with_bcrypt_cost(4),
            ),
            user_service: Arc::new(
                UserService::new(stores.users.clone(), stores.refresh_tokens.clone())
                    .with_bcrypt_cost(4),
            ),
            category_service: Arc::new(CategoryService::new(
                stores.categories.clone(),
                cache.clone(),
                ttl.categories(),
            )),
            rate_limiter: Arc::new(RateLimiter::new(
                cache,
                RateLimitConfig {
                    enabled: true,
                    requests,
                    window_seconds: 60,
                    trust_forwarded_for: false,
                },
            )),
            learning_service: Arc::new(LearningService::new(
                stores.enrollments.clone(),
                stores.progress.clone(),
                courses.clone(),
            )),
            course_service: Arc::new(courses),
            jwt_service: Arc::new(jwt),
        }
    }

    fn app() -> Router {
        create_app(test_state(), &ServerConfig::default())
    }

    fn json_request(method: Method, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, role: Role) -> Value {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "secret1",
                    "full_name": "Test User",
                    "role": role,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_register_validation_and_profile() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({"email": "a@x.com", "password": "123", "full_name": "A"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let tokens = register(&app, "a@x.com", Role::User).await;
        let access = tokens["data"]["access_token"].as_str().unwrap().to_string();
        assert!(tokens["data"]["user"].get("password_hash").is_none());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", access))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["email"], "a@x.com");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use_over_http() {
        let app = app();
        let tokens = register(&app, "b@x.com", Role::User).await;
        let refresh = tokens["data"]["refresh_token"].as_str().unwrap().to_string();

        let first = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/refresh-token",
                None,
                json!({ "refresh_token": refresh }),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let replay = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/refresh-token",
                None,
                json!({ "refresh_token": refresh }),
            ))
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    }

    async fn login(app: &Router, email: &str) -> Response {
        app.clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                json!({"email": email, "password": "secret1"}),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_role_cannot_be_self_registered() {
        let app = app();

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({
                    "email": "root@x.com",
                    "password": "secret1",
                    "full_name": "Root",
                    "role": "admin",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_admin_requires_role() {
        let state = test_state();
        let app = create_app(state.clone(), &ServerConfig::default());
        let learner = register(&app, "learner@x.com", Role::User).await;
        let learner_token = learner["data"]["access_token"].as_str().unwrap().to_string();

        let admin = register(&app, "admin@x.com", Role::User).await;
        let admin_id = admin["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
        state
            .user_service
            .set_role(admin_id, Role::Admin)
            .await
            .unwrap();
        let response = login(&app, "admin@x.com").await;
        assert_eq!(response.status(), StatusCode::OK);
        let admin_token = body_json(response).await["data"]["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let body = json!({"name": "Blockchain Basics"});

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/admin/categories",
                Some(&learner_token),
                body.clone(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/admin/categories",
                Some(&admin_token),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["data"]["slug"], "blockchain-basics");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/categories/slug/blockchain-basics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited() {
        let app = create_app(test_state_with_auth_limit(3), &ServerConfig::default());
        register(&app, "a@x.com", Role::User).await;

        for _ in 0..2 {
            assert_eq!(login(&app, "a@x.com").await.status(), StatusCode::OK);
        }

        let response = login(&app, "a@x.com").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(body_json(response).await["error"], "RATE_LIMIT_EXCEEDED");

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/api/v1/categories")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_enroll_and_track_progress() {
        let app = app();
        let instructor = register(&app, "teach@x.com", Role::Instructor).await;
        let instructor_token = instructor["data"]["access_token"].as_str().unwrap().to_string();
        let instructor_id = instructor["data"]["user"]["id"].as_str().unwrap().to_string();
        let learner = register(&app, "learn@x.com", Role::User).await;
        let learner_token = learner["data"]["access_token"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/admin/courses",
                Some(&instructor_token),
                json!({"title": "Intro to Solidity", "instructor_id": instructor_id, "price": 0.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let course_id = body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/admin/lessons",
                Some(&instructor_token),
                json!({
                    "course_id": course_id,
                    "title": "Hello world",
                    "video_url": "https://video.example.com/1",
                    "video_id": "v1",
                    "order_number": 1
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let lesson_id = body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let progress_uri = format!("/api/v1/lessons/{}/progress", lesson_id);
        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &progress_uri,
                Some(&learner_token),
                json!({"position_seconds": 42}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/v1/courses/{}/enroll", course_id),
                Some(&learner_token),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &progress_uri,
                Some(&learner_token),
                json!({"position_seconds": 42}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["position_seconds"], 42);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/courses/{}", course_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let course = body_json(response).await;
        assert_eq!(course["data"]["lessons"].as_array().unwrap().len(), 1);
        assert_eq!(course["data"]["instructor"]["email"], "teach@x.com");
    }
}
