//! pizzeria-types: domain model and storage ports shared by every adapter.

pub mod domain;
pub mod ports;
