///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use pizzeria_client::{PizzeriaClient, RegisterRequest};
use pizzeria_hex::config::{parse_algorithm, Config};
use pizzeria_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use pizzeria_hex::security::{HashCost, PasswordHasher, TokenService};
use pizzeria_repo::build_repo;
use pizzeria_types::domain::order::{NewOrderItem, OrderStatus};
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("pizzeria.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let config = Config {
        server_port: port.to_string(),
        database_url: Some(db_url),
        secret_key: "example-secret-change-me".into(),
        algorithm: parse_algorithm("HS256")?,
        access_token_expire_minutes: 60,
        refresh_token_expire_days: 7,
        password_hash_memory_kib: HashCost::default().memory_kib,
        password_hash_iterations: HashCost::default().iterations,
    };

    let repo = build_repo(config.database_url.as_deref()).await?;
    let tokens = Arc::new(TokenService::from_config(&config)?);
    let hasher = Arc::new(PasswordHasher::new(config.hash_cost())?);
    let server = HttpServer::new(
        AppState::new(repo, tokens, hasher),
        HttpServerConfig {
            port: config.server_port.clone(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = PizzeriaClient::new(&addr)?;
    for (name, email, admin) in [
        ("Root", "root@example.com", true),
        ("Maria", "maria@example.com", false),
    ] {
        let res = client
            .register(&RegisterRequest {
                name: name.into(),
                email: email.into(),
                password: "secret".into(),
                active: true,
                admin,
            })
            .await?;
        println!("{}", res.message);
    }

    let admin_tokens = client.login("root@example.com", "secret").await?;
    let admin = client.with_token(admin_tokens.access_token);
    let users = admin.list_users().await?;
    let maria_id = users
        .iter()
        .find(|u| u.email == "maria@example.com")
        .map(|u| u.id)
        .ok_or_else(|| anyhow::anyhow!("maria not listed"))?;

    let maria_tokens = client.login("maria@example.com", "secret").await?;
    let maria = client.with_token(maria_tokens.access_token);

    let created = maria.create_order(maria_id).await?;
    println!("Created order id={}", created.id);

    maria
        .add_item(
            created.id,
            &NewOrderItem::new(2, "margherita".into(), "large".into(), 10.0)?,
        )
        .await?;
    let order = maria
        .add_item(
            created.id,
            &NewOrderItem::new(1, "pepperoni".into(), "small".into(), 5.0)?,
        )
        .await?;
    println!("Order total={}", order.total_price);
    assert_eq!(order.total_price, 25.0);

    let removed = maria.remove_item(order.items[1].id).await?;
    println!(
        "Removed item, total={} items={}",
        removed.order.total_price, removed.item_count
    );
    assert_eq!(removed.order.total_price, 20.0);

    // trade the refresh token for a new access token
    let fresh = client.refresh(&maria_tokens.refresh_token).await?;
    let maria = client.with_token(fresh.access_token);

    let cancelled = maria.cancel_order(created.id).await?;
    println!("Cancelled status={}", cancelled.status);
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    match maria.list_orders().await {
        Ok(_) => anyhow::bail!("non-admin listed every order"),
        Err(err) => println!("Listing as non-admin rejected: {err}"),
    }
    println!("Admin sees {} order(s)", admin.list_orders().await?.len());

    handle.abort();
    Ok(())
}
