// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph traversals over the compact store.
//!
//! - [`paths_to_root`]: breadth-first search over incoming edges.
//! - [`direct_retainers`]: one hop of the incoming-edge index.
//! - [`RetainedSizes`]: dominators from a synthetic super-root and the
//!   retained size of every object.

mod paths;
mod retained;
mod retainers;

pub use paths::{paths_to_root, PathLimits, RootPath};
pub use retained::{Dominator, RetainedSizes};
pub use retainers::direct_retainers;
