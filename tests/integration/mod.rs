//! Integration test suite for buildpack-notify
//!
//! End-to-end tests that exercise the public API and the binary without a
//! real Cloud Foundry or SMTP server.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **binary**: exit status and error rendering of the executable
//! - **client**: the HTTP client against an in-process fake API (auth, paging)
//! - **pipeline**: full notification runs with fakes and a SQLite store
//! - **store**: SQLite freshness records on disk

#[path = "../common/mod.rs"]
mod common;

mod binary;
mod client;
mod pipeline;
