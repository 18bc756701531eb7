mod common;

use pizzeria_hex::errors::AppError;
use pizzeria_hex::security::TokenKind;
use pizzeria_types::domain::order::{NewOrderItem, OrderStatus};

fn pizza(quantity: i64, unit_price: f64) -> NewOrderItem {
    NewOrderItem::new(quantity, "portuguesa".into(), "large".into(), unit_price).unwrap()
}

// End-to-end use-case flow against the in-memory adapter.
#[tokio::test]
async fn register_login_and_duplicate_email() {
    let (state, _repo, tokens) = common::state();

    let alice = state
        .auth
        .register("Alice".into(), "alice@example.com".into(), "pw1".into(), true, false)
        .await
        .unwrap();
    let pair = state.auth.login("alice@example.com", "pw1".into()).await.unwrap();
    assert_eq!(tokens.verify(&pair.access_token, TokenKind::Access).unwrap(), alice.id);
    assert_eq!(tokens.verify(&pair.refresh_token, TokenKind::Refresh).unwrap(), alice.id);

    let caller = state.gate.authenticate(&pair.access_token).await.unwrap();
    assert_eq!(caller.id, alice.id);

    let again = state
        .auth
        .register("Alice 2".into(), "alice@example.com".into(), "pw2".into(), true, false)
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn order_total_after_item_removal() {
    let (state, _repo, _tokens) = common::state();
    let mut last = None;
    for n in 1..=5 {
        let user = state
            .auth
            .register(format!("User {n}"), format!("user{n}@example.com"), "pw".into(), true, false)
            .await
            .unwrap();
        last = Some(user);
    }
    let owner = last.unwrap();
    assert_eq!(owner.id, 5);

    let order = state.orders.create_order(5, &owner).await.unwrap();
    state.orders.add_item(order.id, pizza(2, 10.0), &owner).await.unwrap();
    let order = state.orders.add_item(order.id, pizza(1, 5.0), &owner).await.unwrap();
    assert_eq!(order.total_price, 25.0);

    let second = order.items[1].id;
    let order = state.orders.remove_item(second, &owner).await.unwrap();
    assert_eq!(order.total_price, 20.0);
    assert_eq!(order.items.len(), 1);
}

#[tokio::test]
async fn only_owner_or_admin_can_cancel() {
    let (state, _repo, _tokens) = common::state();
    let a = state
        .auth
        .register("A".into(), "a@example.com".into(), "pw".into(), true, false)
        .await
        .unwrap();
    let b = state
        .auth
        .register("B".into(), "b@example.com".into(), "pw".into(), true, false)
        .await
        .unwrap();

    let order = state.orders.create_order(b.id, &b).await.unwrap();
    let denied = state.orders.cancel_order(order.id, &a).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let cancelled = state.orders.cancel_order(order.id, &b).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn deleting_a_user_revokes_their_access_and_orders() {
    let (state, _repo, _tokens) = common::state();
    let admin = state
        .auth
        .register("Root".into(), "root@example.com".into(), "pw".into(), true, true)
        .await
        .unwrap();
    let victim = state
        .auth
        .register("V".into(), "v@example.com".into(), "pw".into(), true, false)
        .await
        .unwrap();
    let pair = state.auth.login("v@example.com", "pw".into()).await.unwrap();
    state.orders.create_order(victim.id, &victim).await.unwrap();

    state.auth.delete_user(victim.id, &admin).await.unwrap();

    assert!(matches!(
        state.gate.authenticate(&pair.access_token).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(state.orders.list_orders(&admin).await.unwrap().is_empty());
}
