//! # kopi-server
//!
//! REST API for Kopi POS.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         kopi-server                                     │
//! │                                                                         │
//! │  React SPA ───► axum Router (/api) ───► repositories ───► SQLite       │
//! │                      │                                                  │
//! │                      ├── /health            liveness + db check        │
//! │                      ├── /products          inventory CRUD + stock     │
//! │                      ├── /vouchers          admin CRUD + validate      │
//! │                      └── /transactions      checkout, refunds, stats   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The library surface exists so router-level tests can build the full
//! application against an in-memory database.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use routes::{build_app, build_router};
pub use state::AppState;
