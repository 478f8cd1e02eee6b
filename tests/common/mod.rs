//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer, ALL_BACKENDS};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_register() {
//!     for backend in ALL_BACKENDS {
//!         let server = TestServer::spawn(backend).await;
//!         let client = TestClient::new(server.base_url.clone());
//!
//!         let response = client.register("Ann", "ann@example.com").await;
//!         assert_eq!(response.status(), StatusCode::CREATED);
//!     }
//! }
//! ```

mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::TestServer;
