// Copyright 2025 Cowboy AI, LLC.

//! Composition: merge attribute records from source composites into a
//! destination, optionally recursing into payloads and rewriting records
//! through property handlers

pub mod config;
pub mod engine;
pub mod visited;

pub use config::ComposeConfig;
pub use engine::{compose_into, deep_copy, shallow_copy, Composer};
pub use visited::VisitedSet;
