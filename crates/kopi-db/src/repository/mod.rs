//! # Repository Module
//!
//! Database repository implementations for Kopi POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  HTTP Handler                                                          │
//! │       │                                                                 │
//! │       │  db.orders().commit(request)                                   │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── commit(&self, request)        ← one atomic transaction            │
//! │  ├── transition_status(&self, ...)                                     │
//! │  └── list / get / stats                                                │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • The commit workflow's invariants live in exactly one function       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, stock adjustment, popularity
//! - [`voucher::VoucherRepository`] - Voucher CRUD and advisory validation
//! - [`order::OrderRepository`] - Atomic order commit, status transitions, reporting

pub mod order;
pub mod product;
pub mod voucher;
