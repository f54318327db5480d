//! Axum request handlers for all service endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    CreateOrderRequest, ErrorResponse, HealthResponse, ListOrdersQuery, MessageResponse,
    UpdateOrderRequest,
};
use common::ServiceError;
use tracing::debug;
use uuid::Uuid;

use super::middleware::TOTAL_COUNT_HEADER;
use super::state::AppState;

/// `POST /orders`: encrypt the sensitive fields and store a new order.
///
/// Responds `201 Created` with the stored order decrypted: the assigned id,
/// initial status, and timestamps alongside the submitted fields.
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.orders.create(req) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /orders`: list orders, optionally paginated with `page` and `limit`.
///
/// `X-Total-Count` always carries the unpaginated total.
pub async fn list_orders(
    State(state): State<AppState>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.orders.list(query) {
        Ok((views, total)) => {
            ([(TOTAL_COUNT_HEADER, total.to_string())], Json(views)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /orders/:id`: a single order with decrypted fields.
pub async fn get_order(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.orders.get(id) {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /orders/user/:user`: every order owned by a user.
pub async fn orders_by_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Response {
    match state.orders.by_user(&user) {
        Ok(views) => Json(views).into_response(),
        Err(e) => error_response(e),
    }
}

/// `PATCH /orders/:id`: partial update; supplied sensitive fields are re-encrypted.
pub async fn update_order(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.orders.update(id, req) {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /`: simple liveness message.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "running".into(),
    })
}

/// `GET /health`: readiness check.
///
/// The key is validated before the listener binds, so a serving process is
/// always ready.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        scheme: state.orders.cipher().scheme().as_str().into(),
        orders_stored: state.orders.count(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn bad_request(message: String) -> Response {
    error_response(ServiceError::BadRequest(message))
}

/// Render a [`ServiceError`] as a status code plus [`ErrorResponse`] body.
fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    debug!(status = status.as_u16(), code = err.code(), "request failed");
    (status, Json(ErrorResponse::from(&err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{body::Body, http::Request, Router};
    use axum_test::TestServer;
    use common::protocol::{OrderStatus, OrderView};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::crypto::{FieldCipher, FieldKey, Scheme, KEY_LEN};
    use crate::orders::{MemoryOrderStore, OrderRepository, ReplaceOutcome};

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/orders", post(create_order).get(list_orders))
            .route("/orders/:id", get(get_order).patch(update_order))
            .route("/orders/user/:user", get(orders_by_user))
            .with_state(state)
    }

    fn order_body(user: &str) -> Value {
        json!({
            "user": user,
            "items": [{ "product": "p-1", "quantity": 1 }],
            "paymentDetails": "4111 1111 1111 1111",
            "address": "123 Main St, Springfield",
            "paymentMode": "CARD",
            "total": 25.0
        })
    }

    fn cipher() -> FieldCipher {
        FieldCipher::new(FieldKey::from_bytes(&[0x24; KEY_LEN]).unwrap(), Scheme::Cbc)
    }

    #[tokio::test]
    async fn health_reports_scheme() {
        let app = test_router(AppState::default());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn root_says_running() {
        let server = TestServer::new(test_router(AppState::default())).unwrap();
        let body: Value = server.get("/").await.json();
        assert_eq!(body["message"], "running");
    }

    #[tokio::test]
    async fn create_stores_ciphertext_and_returns_plaintext() {
        let store = MemoryOrderStore::new();
        let state = AppState::new(cipher(), std::sync::Arc::new(store.clone()));
        let server = TestServer::new(test_router(state)).unwrap();

        let resp = server.post("/orders").json(&order_body("alice")).await;
        assert_eq!(resp.status_code(), StatusCode::CREATED);
        let view: OrderView = resp.json();
        assert_eq!(view.address, "123 Main St, Springfield");
        assert_eq!(view.payment_details, "4111 1111 1111 1111");
        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.created_at, view.updated_at);

        let stored = store.get(view.id).unwrap();
        assert_eq!(stored.id, view.id);
        assert_eq!(stored.created_at, view.created_at);
        let (iv, ct) = stored.address.split_once(':').unwrap();
        assert_eq!(iv.len(), 32);
        assert!(!ct.is_empty());
        assert!(!stored.payment_details.contains("4111"));
    }

    #[tokio::test]
    async fn read_paths_decrypt() {
        let server = TestServer::new(test_router(AppState::default())).unwrap();
        let created: OrderView = server.post("/orders").json(&order_body("bob")).await.json();

        let single: OrderView = server.get(&format!("/orders/{}", created.id)).await.json();
        assert_eq!(single, created);

        let mine: Vec<OrderView> = server.get("/orders/user/bob").await.json();
        assert_eq!(mine, vec![created]);

        let none: Vec<OrderView> = server.get("/orders/user/carol").await.json();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn list_sets_total_count_and_paginates() {
        let server = TestServer::new(test_router(AppState::default())).unwrap();
        let mut ids = Vec::new();
        for user in ["a", "b", "c"] {
            let v: OrderView = server.post("/orders").json(&order_body(user)).await.json();
            ids.push(v.id);
        }

        let resp = server
            .get("/orders")
            .add_query_param("page", 2)
            .add_query_param("limit", 1)
            .await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.header("x-total-count"), "3");
        let page: Vec<OrderView> = resp.json();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, ids[1]);

        let all = server.get("/orders").await;
        assert_eq!(all.header("x-total-count"), "3");
        assert_eq!(all.json::<Vec<OrderView>>().len(), 3);
    }

    #[tokio::test]
    async fn patch_updates_and_reencrypts() {
        let store = MemoryOrderStore::new();
        let state = AppState::new(cipher(), std::sync::Arc::new(store.clone()));
        let server = TestServer::new(test_router(state)).unwrap();
        let created: OrderView = server.post("/orders").json(&order_body("alice")).await.json();
        let before = store.get(created.id).unwrap();

        let resp = server
            .patch(&format!("/orders/{}", created.id))
            .json(&json!({ "address": "9 Elm St", "status": "Dispatched" }))
            .await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        let updated: Value = resp.json();
        assert_eq!(updated["address"], "9 Elm St");
        assert_eq!(updated["status"], "Dispatched");
        assert_eq!(updated["paymentDetails"], "4111 1111 1111 1111");

        let after = store.get(created.id).unwrap();
        assert_ne!(after.address, before.address);
        assert_eq!(after.payment_details, before.payment_details);
    }

    #[tokio::test]
    async fn patch_unknown_is_404() {
        let server = TestServer::new(test_router(AppState::default())).unwrap();
        let resp = server
            .patch(&format!("/orders/{}", Uuid::new_v4()))
            .json(&json!({ "status": "Cancelled" }))
            .await;
        assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = resp.json();
        assert_eq!(body.code, "not_found");
    }

    #[tokio::test]
    async fn bad_inputs_are_400() {
        let server = TestServer::new(test_router(AppState::default())).unwrap();

        let resp = server
            .post("/orders")
            .json(&json!({ "user": "alice" }))
            .await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<ErrorResponse>().code, "bad_request");

        let resp = server.get("/orders/not-a-uuid").await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

        let resp = server
            .get("/orders")
            .add_query_param("page", 0)
            .add_query_param("limit", 5)
            .await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreadable_record_is_generic_500() {
        let store = MemoryOrderStore::new();
        let state = AppState::new(cipher(), std::sync::Arc::new(store.clone()));
        let server = TestServer::new(test_router(state)).unwrap();
        let created: OrderView = server.post("/orders").json(&order_body("alice")).await.json();

        let mut record = store.get(created.id).unwrap();
        record.payment_details = "not-a-valid-format".into();
        assert_eq!(store.replace(record), ReplaceOutcome::Replaced);

        let resp = server.get(&format!("/orders/{}", created.id)).await;
        assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = resp.json();
        assert_eq!(body.code, "internal_error");
        assert_eq!(body.message, crate::orders::FETCH_FAILED);
        assert!(!body.message.contains("delimiter"));

        let resp = server.get("/orders").await;
        assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
