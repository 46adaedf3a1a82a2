//! HTTP Basic authentication for actix-web, backed by per-realm password
//! files.
//!
//! A realm is a path prefix, a name (sent back in the `WWW-Authenticate`
//! challenge) and a file of `username = password` lines. Password files are
//! parsed on first use and shared by every request through a TTL cache (see
//! `cache`), then erased from memory once the last request referencing them
//! is done.

pub mod authentication;
pub mod cache;
pub mod configuration;
pub mod realm;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utils;
