#![allow(dead_code)]

use chrono::Duration;
use jsonwebtoken::Algorithm;
use pizzeria_hex::inbound::http::AppState;
use pizzeria_hex::security::{HashCost, PasswordHasher, TokenService};
use pizzeria_repo::memory::InMemoryRepo;
use std::sync::Arc;

pub const SECRET: &[u8] = b"integration-test-secret";

pub fn tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(
        SECRET,
        Algorithm::HS256,
        Duration::minutes(60),
        Duration::days(7),
    ))
}

pub fn cheap_hasher() -> Arc<PasswordHasher> {
    Arc::new(
        PasswordHasher::new(HashCost {
            memory_kib: 64,
            iterations: 1,
        })
        .expect("hasher"),
    )
}

pub fn state() -> (AppState<InMemoryRepo>, InMemoryRepo, Arc<TokenService>) {
    let repo = InMemoryRepo::new();
    let tokens = tokens();
    let state = AppState::new(repo.clone(), tokens.clone(), cheap_hasher());
    (state, repo, tokens)
}
