//! Core library for opencode-limits.
//!
//! Normalizes Codex and GitHub Copilot usage payloads into [`usage::UsageWindow`]
//! values, persists snapshots of them, and decides when a persisted snapshot
//! can be served instead of hitting the network.

pub mod auth;
pub mod cache;
pub mod config;
pub mod providers;
pub mod service;
pub mod usage;
