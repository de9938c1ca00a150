//! Unit tests for the executor, gateway and configuration

#[path = "../common/mod.rs"]
mod common;
