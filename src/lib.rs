//! tasklink - Shared Task Board Library
//!
//! This library provides the core functionality for the tasklink CLI tool:
//! private task dashboards, public task pages with comment threads, and
//! share links.
//!
//! # Core Concepts
//!
//! - **Tasks**: short, immutable text items, private by default
//! - **Public tasks**: visible to anyone through their detail page and
//!   open to comments from any signed-in user
//! - **Live subscriptions**: the dashboard re-renders from a standing,
//!   owner-filtered query rather than patching local state
//! - **Optimistic comment threads**: posts append locally with the
//!   store-assigned id, one round trip, no re-fetch
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `tasklink.toml`
//! - `error`: Error types and result aliases
//! - `identity`: Identity context (sign-in file, flags, config defaults)
//! - `store`: Document store primitive (JSONL collections, live queries)
//! - `tasks`: Task store adapter over the `tasks` collection
//! - `comments`: Comment store adapter over the `comments` collection
//! - `dashboard`: Dashboard sync engine (live owner-filtered task list)
//! - `detail`: Task detail resolver (public-visibility gate)
//! - `thread`: Comment thread engine (optimistic append/delete, merge)
//! - `share`: Share link generation and the clipboard seam
//! - `events`: Integration event emission (JSONL)
//! - `output`: CLI output formatting (human and JSON envelopes)
//! - `lock`: File locking and atomic writes for store safety

pub mod cli;
pub mod comments;
pub mod config;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod events;
pub mod identity;
pub mod lock;
pub mod output;
pub mod share;
pub mod store;
pub mod tasks;
pub mod thread;

pub use error::{Error, Result};
