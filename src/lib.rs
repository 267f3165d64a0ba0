//! # Web QA Harness
//!
//! Turn web pages into a bounded, clean, queryable context and answer
//! questions about it with source citations.
//!
//! ## Architecture
//!
//! ```text
//! text ──▶ urls ──▶ fetch ──▶ extract ──▶ corpus ──▶ prompt ──▶ answer
//!          (find,    (HTTP,    (prune,     (Session,  (payload,   (model
//!           cap 5)   timeout)  strategy,   batch      summaries)   call)
//!                              word cap)   swap)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wqa run "https://en.wikipedia.org/wiki/Rust_(programming_language)" \
//!     --ask "Who designed it?"
//! wqa chat                      # paste URLs, then ask questions
//! wqa serve                     # JSON API on 127.0.0.1:7341
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`urls`] | URL discovery and validation |
//! | [`fetch`] | Page retrieval over HTTP |
//! | [`extract`] | HTML normalization and site strategies |
//! | [`prompt`] | Summaries and model prompt construction |
//! | [`answer`] | Answering model abstraction |
//! | [`corpus`] | Session state, ingestion batches, answering |
//! | [`progress`] | Batch progress reporting |
//! | [`server`] | JSON HTTP API |

pub mod answer;
pub mod config;
pub mod corpus;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod server;
pub mod urls;
