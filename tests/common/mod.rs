//! Shared test infrastructure for end-to-end tests
//!
//! Each test spawns an isolated server on a random port with its own
//! temporary database, then drives it over HTTP with a TestClient.

#![allow(dead_code)] // Not every test file uses every helper

pub mod client;
pub mod constants;
pub mod fixtures;
pub mod server;

pub use client::TestClient;
pub use constants::*;
pub use server::TestServer;
