use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::extract::{BearerToken, CurrentUser, ValidForm, ValidJson};
use crate::application::access::AccessGate;
use crate::application::auth_service::AuthService;
use crate::application::order_service::OrderService;
use crate::errors::AppError;
use crate::security::{PasswordHasher, TokenService};
use pizzeria_types::domain::order::{NewOrderItem, Order};
use pizzeria_types::domain::user::UserSummary;
use pizzeria_types::ports::Storage;

const TOKEN_TYPE: &str = "Bearer";

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

/// Shared, read-only handles given to every handler.
#[derive(Clone)]
pub struct AppState<R: Storage> {
    pub auth: Arc<AuthService<R>>,
    pub orders: Arc<OrderService<R>>,
    pub gate: Arc<AccessGate<R>>,
}

impl<R: Storage> AppState<R> {
    pub fn new(repo: R, tokens: Arc<TokenService>, hasher: Arc<PasswordHasher>) -> Self {
        let gate = Arc::new(AccessGate::new(repo.clone(), tokens.clone()));
        let auth = AuthService::new(repo.clone(), gate.clone(), hasher, tokens);
        Self {
            auth: Arc::new(auth),
            orders: Arc::new(OrderService::new(repo)),
            gate,
        }
    }
}

#[derive(Clone)]
pub struct HttpServer<R: Storage> {
    pub state: AppState<R>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub admin: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub owner_user_id: i64,
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub quantity: i64,
    pub flavor: String,
    pub size: String,
    pub unit_price: f64,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
}

#[derive(Serialize)]
struct AccessTokenResponse {
    access_token: String,
    token_type: &'static str,
}

#[derive(Serialize)]
struct UsersResponse {
    users: Vec<UserSummary>,
}

#[derive(Serialize)]
struct CreateOrderResponse {
    message: String,
    id: i64,
}

#[derive(Serialize)]
struct OrderResponse {
    message: String,
    order: Order,
}

#[derive(Serialize)]
struct OrdersResponse {
    orders: Vec<Order>,
}

#[derive(Serialize)]
struct RemoveItemResponse {
    message: String,
    order: Order,
    item_count: usize,
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

impl<R: Storage> HttpServer<R> {
    pub async fn new(state: AppState<R>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self { state, config })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri,
                    user_id = tracing::field::Empty,
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/auth/", get(auth_home))
            .route("/auth/criar_conta", post(register::<R>))
            .route("/auth/login", post(login::<R>))
            .route("/auth/login-form", post(login_form::<R>))
            .route("/auth/refresh", get(refresh::<R>))
            .route("/auth/deletar_usuario/{id}", delete(delete_user::<R>))
            .route("/auth/listar_usuarios", get(list_users::<R>))
            .route("/pedidos/", get(orders_home).post(create_order::<R>))
            .route("/pedidos/listar", get(list_orders::<R>))
            .route("/pedidos/{id}/adicionar-item", post(add_item::<R>))
            .route("/pedidos/{id}/cancelar", put(cancel_order::<R>))
            .route("/pedidos/item/{id}", delete(remove_item::<R>))
            .layer(trace_layer)
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn auth_home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "default authentication route",
        "authenticated": false
    }))
}

async fn register<R: Storage>(
    State(state): State<AppState<R>>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = state
        .auth
        .register(
            payload.name,
            payload.email,
            payload.password,
            payload.active,
            payload.admin,
        )
        .await?;
    Ok(message(format!("user registered successfully: {}", user.email)))
}

async fn login<R: Storage>(
    State(state): State<AppState<R>>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let pair = state.auth.login(&payload.email, payload.password).await?;
    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: TOKEN_TYPE,
    }))
}

async fn login_form<R: Storage>(
    State(state): State<AppState<R>>,
    ValidForm(form): ValidForm<LoginForm>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let access_token = state.auth.login_form(&form.username, form.password).await?;
    Ok(Json(AccessTokenResponse {
        access_token,
        token_type: TOKEN_TYPE,
    }))
}

async fn refresh<R: Storage>(
    State(state): State<AppState<R>>,
    BearerToken(token): BearerToken,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let access_token = state.auth.refresh(&token).await?;
    Ok(Json(AccessTokenResponse {
        access_token,
        token_type: TOKEN_TYPE,
    }))
}

async fn delete_user<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state.auth.delete_user(id, &caller).await?;
    Ok(message(format!("user {} deleted successfully", deleted.email)))
}

async fn list_users<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.auth.list_users(&caller).await?;
    Ok(Json(UsersResponse { users }))
}

async fn orders_home(_caller: CurrentUser) -> Json<MessageResponse> {
    message("orders route, authentication required")
}

async fn create_order<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    ValidJson(payload): ValidJson<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let order = state
        .orders
        .create_order(payload.owner_user_id, &caller)
        .await?;
    Ok(Json(CreateOrderResponse {
        message: "order created successfully".into(),
        id: order.id,
    }))
}

async fn add_item<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    ValidJson(payload): ValidJson<AddItemRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let item = NewOrderItem::new(
        payload.quantity,
        payload.flavor,
        payload.size,
        payload.unit_price,
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let order = state.orders.add_item(id, item, &caller).await?;
    Ok(Json(OrderResponse {
        message: "item added successfully".into(),
        order,
    }))
}

async fn cancel_order<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.orders.cancel_order(id, &caller).await?;
    Ok(Json(OrderResponse {
        message: "order cancelled successfully".into(),
        order,
    }))
}

async fn list_orders<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<OrdersResponse>, AppError> {
    let orders = state.orders.list_orders(&caller).await?;
    Ok(Json(OrdersResponse { orders }))
}

async fn remove_item<R: Storage>(
    State(state): State<AppState<R>>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<RemoveItemResponse>, AppError> {
    let order = state.orders.remove_item(id, &caller).await?;
    Ok(Json(RemoveItemResponse {
        message: "item removed successfully".into(),
        item_count: order.items.len(),
        order,
    }))
}
