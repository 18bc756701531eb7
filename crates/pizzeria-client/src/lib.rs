use std::time::Duration;

use anyhow::Context;
use pizzeria_types::domain::order::{NewOrderItem, Order};
use pizzeria_types::domain::user::UserSummary;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct PizzeriaClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
    token: Option<String>,
}

/// Thin HTTP client for the pizzeria API. Protected calls send the
/// access token set through [`PizzeriaClient::with_token`].
#[derive(Clone)]
pub struct PizzeriaClient {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl PizzeriaClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<PizzeriaClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(PizzeriaClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
            token: None,
        })
    }

    /// Returns a copy of this client that authenticates with `token`.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            base: self.base.clone(),
            client: self.client.clone(),
            token: Some(token.into()),
        }
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    fn authed(&self, req: RequestBuilder) -> anyhow::Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .context("no access token set on client")?;
        Ok(req.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> anyhow::Result<T> {
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let detail = res
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_default();
            tracing::debug!(%status, %detail, "request failed");
            anyhow::bail!("request failed with {}: {}", status, detail);
        }
        Ok(res.json().await?)
    }

    pub async fn register(&self, req: &RegisterRequest) -> anyhow::Result<MessageResponse> {
        Self::send(self.client.post(self.url("auth/criar_conta")?).json(req)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        Self::send(self.client.post(self.url("auth/login")?).json(&body)).await
    }

    pub async fn login_form(
        &self,
        username: &str,
        password: &str,
    ) -> anyhow::Result<AccessTokenResponse> {
        let form = [("username", username), ("password", password)];
        Self::send(self.client.post(self.url("auth/login-form")?).form(&form)).await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> anyhow::Result<AccessTokenResponse> {
        let req = self
            .client
            .get(self.url("auth/refresh")?)
            .bearer_auth(refresh_token);
        Self::send(req).await
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<UserSummary>> {
        let req = self.authed(self.client.get(self.url("auth/listar_usuarios")?))?;
        let res: UsersResponse = Self::send(req).await?;
        Ok(res.users)
    }

    pub async fn delete_user(&self, id: i64) -> anyhow::Result<MessageResponse> {
        let url = self.url(&format!("auth/deletar_usuario/{id}"))?;
        Self::send(self.authed(self.client.delete(url))?).await
    }

    pub async fn create_order(&self, owner_user_id: i64) -> anyhow::Result<CreateOrderResponse> {
        let req = self
            .authed(self.client.post(self.url("pedidos/")?))?
            .json(&CreateOrderRequest { owner_user_id });
        Self::send(req).await
    }

    pub async fn add_item(&self, order_id: i64, item: &NewOrderItem) -> anyhow::Result<Order> {
        let url = self.url(&format!("pedidos/{order_id}/adicionar-item"))?;
        let res: OrderResponse = Self::send(self.authed(self.client.post(url))?.json(item)).await?;
        Ok(res.order)
    }

    pub async fn cancel_order(&self, order_id: i64) -> anyhow::Result<Order> {
        let url = self.url(&format!("pedidos/{order_id}/cancelar"))?;
        let res: OrderResponse = Self::send(self.authed(self.client.put(url))?).await?;
        Ok(res.order)
    }

    pub async fn remove_item(&self, item_id: i64) -> anyhow::Result<RemoveItemResponse> {
        let url = self.url(&format!("pedidos/item/{item_id}"))?;
        Self::send(self.authed(self.client.delete(url))?).await
    }

    pub async fn list_orders(&self) -> anyhow::Result<Vec<Order>> {
        let req = self.authed(self.client.get(self.url("pedidos/listar")?))?;
        let res: OrdersResponse = Self::send(req).await?;
        Ok(res.orders)
    }
}

impl PizzeriaClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn build(self) -> anyhow::Result<PizzeriaClient> {
        if let Some(client) = self.client {
            return Ok(PizzeriaClient {
                base: self.base,
                client,
                token: self.token,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(PizzeriaClient {
            base: self.base,
            client,
            token: self.token,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub active: bool,
    pub admin: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct CreateOrderRequest {
    owner_user_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OrderResponse {
    message: String,
    order: Order,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OrdersResponse {
    orders: Vec<Order>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UsersResponse {
    users: Vec<UserSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoveItemResponse {
    pub message: String,
    pub order: Order,
    pub item_count: usize,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pizzeria_types::domain::order::{OrderItem, OrderStatus};
    use serde_json::json;

    fn sample_order() -> Order {
        let mut order = Order::new(1, 5);
        order.items.push(OrderItem {
            id: 10,
            quantity: 2,
            flavor: "margherita".into(),
            size: "large".into(),
            unit_price: 10.0,
            order_id: 1,
        });
        order.recalculate_total();
        order
    }

    #[tokio::test]
    async fn register_and_login() {
        let server = MockServer::start();
        let req = RegisterRequest {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "pw1".into(),
            active: true,
            admin: false,
        };

        let register_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/criar_conta")
                .json_body_obj(&req);
            then.status(200)
                .json_body(json!({ "message": "user registered successfully: alice@example.com" }));
        });

        let login_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body(json!({ "email": "alice@example.com", "password": "pw1" }));
            then.status(200).json_body(json!({
                "access_token": "a.b.c",
                "refresh_token": "d.e.f",
                "token_type": "Bearer"
            }));
        });

        let client = PizzeriaClient::new(&server.base_url()).unwrap();
        let registered = client.register(&req).await.unwrap();
        assert!(registered.message.contains("alice@example.com"));

        let tokens = client.login("alice@example.com", "pw1").await.unwrap();
        assert_eq!(tokens.access_token, "a.b.c");
        assert_eq!(tokens.refresh_token, "d.e.f");
        assert_eq!(tokens.token_type, "Bearer");

        register_mock.assert();
        login_mock.assert();
    }

    #[tokio::test]
    async fn form_login_and_refresh() {
        let server = MockServer::start();

        let form_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login-form")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("username=form%40example.com");
            then.status(200)
                .json_body(json!({ "access_token": "form.token", "token_type": "Bearer" }));
        });

        let refresh_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/auth/refresh")
                .header("authorization", "Bearer refresh.token");
            then.status(200)
                .json_body(json!({ "access_token": "fresh.token", "token_type": "Bearer" }));
        });

        let client = PizzeriaClient::new(&server.base_url()).unwrap();
        let form = client.login_form("form@example.com", "pw1").await.unwrap();
        assert_eq!(form.access_token, "form.token");

        let fresh = client.refresh("refresh.token").await.unwrap();
        assert_eq!(fresh.access_token, "fresh.token");

        form_mock.assert();
        refresh_mock.assert();
    }

    #[tokio::test]
    async fn order_calls_carry_bearer_token() {
        let server = MockServer::start();
        let order = sample_order();
        let item = NewOrderItem::new(2, "margherita".into(), "large".into(), 10.0).unwrap();

        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/pedidos/")
                .header("authorization", "Bearer tok")
                .json_body(json!({ "owner_user_id": 5 }));
            then.status(200)
                .json_body(json!({ "message": "order created successfully", "id": 1 }));
        });

        let add_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/pedidos/1/adicionar-item")
                .header("authorization", "Bearer tok")
                .json_body_obj(&item);
            then.status(200)
                .json_body(json!({ "message": "item added successfully", "order": order }));
        });

        let mut cancelled = order.clone();
        cancelled.status = OrderStatus::Cancelled;
        let cancel_mock = server.mock(|when, then| {
            when.method(httpmock::Method::PUT).path("/pedidos/1/cancelar");
            then.status(200)
                .json_body(json!({ "message": "order cancelled successfully", "order": cancelled }));
        });

        let client = PizzeriaClient::new(&server.base_url())
            .unwrap()
            .with_token("tok");
        let created = client.create_order(5).await.unwrap();
        assert_eq!(created.id, 1);

        let updated = client.add_item(1, &item).await.unwrap();
        assert_eq!(updated.total_price, 20.0);

        let cancelled = client.cancel_order(1).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        create_mock.assert();
        add_mock.assert();
        cancel_mock.assert();
    }

    #[tokio::test]
    async fn remove_item_and_listings() {
        let server = MockServer::start();
        let mut emptied = sample_order();
        emptied.items.clear();
        emptied.recalculate_total();

        let remove_mock = server.mock(|when, then| {
            when.method(DELETE).path("/pedidos/item/10");
            then.status(200).json_body(json!({
                "message": "item removed successfully",
                "order": emptied,
                "item_count": 0
            }));
        });

        let orders_mock = server.mock(|when, then| {
            when.method(GET).path("/pedidos/listar");
            then.status(200)
                .json_body(json!({ "orders": [sample_order()] }));
        });

        let users_mock = server.mock(|when, then| {
            when.method(GET).path("/auth/listar_usuarios");
            then.status(200).json_body(json!({ "users": [{
                "id": 1, "name": "Root", "email": "root@example.com",
                "active": true, "admin": true
            }] }));
        });

        let client = PizzeriaClient::builder(&server.base_url())
            .unwrap()
            .with_token("admin")
            .build()
            .unwrap();

        let removed = client.remove_item(10).await.unwrap();
        assert_eq!(removed.item_count, 0);
        assert_eq!(removed.order.total_price, 0.0);

        assert_eq!(client.list_orders().await.unwrap().len(), 1);
        let users = client.list_users().await.unwrap();
        assert!(users[0].admin);

        remove_mock.assert();
        orders_mock.assert();
        users_mock.assert();
    }

    #[tokio::test]
    async fn error_body_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/auth/deletar_usuario/9");
            then.status(401)
                .json_body(json!({ "error": "not enough permissions" }));
        });

        let client = PizzeriaClient::new(&server.base_url())
            .unwrap()
            .with_token("plain");
        let err = client.delete_user(9).await.unwrap_err().to_string();
        assert!(err.contains("401"));
        assert!(err.contains("not enough permissions"));
    }

    #[tokio::test]
    async fn protected_call_without_token_fails_locally() {
        let client = PizzeriaClient::new("http://127.0.0.1:9").unwrap();
        assert!(client.list_orders().await.is_err());
    }
}
