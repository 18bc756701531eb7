//! pizzeria-hex: hexagonal pizzeria API library (auth core, order use cases,
//! inbound HTTP)

pub mod config;
pub mod errors;
pub mod security;

pub mod application;

pub use pizzeria_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
