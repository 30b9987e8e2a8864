// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Configuration for heapscope engines.
//!
//! [`EngineConfig`] is the persisted shape; it converts into
//! [`AnalysisOptions`](heapscope_core::AnalysisOptions),
//! [`CacheOptions`](heapscope_cache::CacheOptions), a query
//! [`Deadline`](heapscope_core::Deadline) and a
//! [`PrefixCategorizer`](heapscope_classify::PrefixCategorizer).
//! Storage goes through the [`ConfigStore`] port; [`FsConfigStore`] keeps one
//! JSON file per key under the platform config directory.
//!
//! ```
//! use heapscope_config::EngineConfig;
//!
//! let cfg: EngineConfig = serde_json::from_str(r#"{"max_resident_graphs":4}"#).unwrap();
//! assert_eq!(cfg.cache_options().max_resident_graphs, 4);
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

mod engine;
mod fs;
mod store;

pub use engine::{EngineConfig, QueryLimits, ENGINE_CONFIG_KEY};
pub use fs::FsConfigStore;
pub use store::{ConfigError, ConfigService, ConfigStore};
