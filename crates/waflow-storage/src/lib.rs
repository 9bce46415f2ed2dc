// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Waflow platform.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query operations for
//! tenants, credentials, configuration rows, dedup records, cards, and the
//! conversion audit log.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
