// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Default class categorization for heapscope.
//!
//! [`PrefixCategorizer`] implements
//! [`ClassCategorizer`](heapscope_core::ClassCategorizer) with built-in
//! runtime and framework package tables plus caller-supplied business
//! prefixes. It is an ordinary value: construct one per engine and inject
//! it as an `Arc<dyn ClassCategorizer>`.
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

mod prefix;
/// Built-in rule tables.
pub mod rules;

pub use prefix::PrefixCategorizer;
pub use rules::{categorize_name, element_type};
