// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for heapscope crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake
//! - [`fixtures`] - Hand-shaped and generated heap graphs
//! - [`rng`] - Deterministic xorshift generator
//! - [`source`] - In-memory snapshot source with call counting and fault injection
//! - [`trace`] - Test tracing subscriber
#![allow(clippy::panic)]

pub mod config;
pub mod fixtures;
pub mod rng;
pub mod source;
pub mod trace;

pub use config::InMemoryConfigStore;
pub use fixtures::{
    analyse, chain_graph, cycle_graph, diamond_graph, random_graph, Diamond, RandomGraphParams,
    NODE_CLASS,
};
pub use rng::XorShift64;
pub use source::InMemorySnapshotSource;
pub use trace::init_test_tracing;
