// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Class categorization seam.
//!
//! The engine does not decide what counts as "application" code; it asks an
//! injected [`ClassCategorizer`]. The default rule set lives in the
//! `heapscope-classify` crate.

use serde::Serialize;

/// Coarse origin of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassCategory {
    /// Primitive arrays and primitive type descriptors.
    Primitive,
    /// Language runtime and standard library.
    RuntimeInternal,
    /// Third-party frameworks and libraries.
    FrameworkInternal,
    /// Everything not recognised as runtime or framework code.
    Application,
    /// Application classes under a configured business prefix.
    Business,
}

impl ClassCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Primitive,
        Self::RuntimeInternal,
        Self::FrameworkInternal,
        Self::Application,
        Self::Business,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Maps class names to categories.
pub trait ClassCategorizer: Send + Sync {
    /// Category of the class called `class_name`.
    fn categorize(&self, class_name: &str) -> ClassCategory;
}

/// Categorizer that puts every class in one category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedCategory(pub ClassCategory);

impl Default for FixedCategory {
    fn default() -> Self {
        Self(ClassCategory::Application)
    }
}

impl ClassCategorizer for FixedCategory {
    fn categorize(&self, _class_name: &str) -> ClassCategory {
        self.0
    }
}

/// Set of categories to keep in class rankings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CategoryFilter(u8);

impl Default for CategoryFilter {
    /// Application and Business classes.
    fn default() -> Self {
        Self::only(&[ClassCategory::Application, ClassCategory::Business])
    }
}

impl CategoryFilter {
    /// Keeps every category.
    #[must_use]
    pub fn all() -> Self {
        Self::only(&ClassCategory::ALL)
    }

    /// Keeps exactly `categories`.
    #[must_use]
    pub fn only(categories: &[ClassCategory]) -> Self {
        Self(categories.iter().fold(0, |acc, c| acc | c.bit()))
    }

    /// Returns `true` if `category` passes.
    #[must_use]
    pub fn allows(&self, category: ClassCategory) -> bool {
        self.0 & category.bit() != 0
    }
}
