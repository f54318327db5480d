//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use axum::http::header;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// `tls` adds `Strict-Transport-Security` to every response.
pub fn build(state: AppState, cors: CorsLayer, tls: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/orders",
            post(handlers::create_order).get(handlers::list_orders),
        )
        .route(
            "/orders/:id",
            get(handlers::get_order).patch(handlers::update_order),
        )
        .route("/orders/user/:user", get(handlers::orders_by_user))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(middleware::BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state);

    for (name, value) in middleware::security_headers() {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }
    if tls {
        router = router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            middleware::HSTS,
        ));
    }
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        build(AppState::default(), CorsLayer::new(), false)
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let body = format!(
            r#"{{"user":"u","paymentDetails":"{}","address":"a","total":1}}"#,
            "x".repeat(middleware::BODY_LIMIT + 1)
        );
        let req = Request::builder()
            .method(Method::POST)
            .uri("/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error(), "{}", resp.status());
    }

    #[tokio::test]
    async fn cors_exposes_total_count() {
        let cors = middleware::cors(Some("http://localhost:3000")).unwrap();
        let app = build(AppState::default(), cors, false);
        let req = Request::builder()
            .uri("/orders")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        let exposed = resp.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(exposed.contains("x-total-count"));
    }

    #[tokio::test]
    async fn security_headers_on_every_response() {
        for uri in ["/health", "/unknown"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = app().oneshot(req).await.unwrap();
            let headers = resp.headers();
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
            assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
            assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
        }
    }

    #[tokio::test]
    async fn hsts_only_with_tls() {
        let app = build(AppState::default(), CorsLayer::new(), true);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[header::STRICT_TRANSPORT_SECURITY],
            "max-age=31536000; includeSubDomains"
        );
    }
}
