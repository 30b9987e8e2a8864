// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Prefix categorizer with a generation-stamped memo.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use heapscope_core::{ClassCategorizer, ClassCategory};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::rules::categorize_name;

#[derive(Clone, Copy, Debug)]
struct Stamped {
    category: ClassCategory,
    generation: u64,
}

/// Categorizer driven by package prefixes.
///
/// Results are memoized per class name and stamped with the generation they
/// were computed under. Changing the business prefixes bumps the generation;
/// stale entries are recomputed on their next lookup instead of the memo
/// being cleared, so concurrent readers never observe an empty cache.
#[derive(Debug, Default)]
pub struct PrefixCategorizer {
    /// Business prefixes; the lock also orders prefix changes with generation bumps.
    business: RwLock<Vec<String>>,
    generation: AtomicU64,
    memo: RwLock<FxHashMap<Box<str>, Stamped>>,
}

impl PrefixCategorizer {
    /// Creates a categorizer with no business prefixes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a categorizer with the given business prefixes.
    pub fn with_business_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let this = Self::new();
        this.set_business_prefixes(prefixes);
        this
    }

    /// Current generation. Starts at zero; every prefix change adds one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Business prefixes in insertion order.
    pub fn business_prefixes(&self) -> Vec<String> {
        self.business
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds a business prefix. Returns `false` if it was already present.
    pub fn add_business_prefix(&self, prefix: impl Into<String>) -> bool {
        let prefix = prefix.into();
        let mut business = self.business.write().unwrap_or_else(PoisonError::into_inner);
        if business.contains(&prefix) {
            return false;
        }
        business.push(prefix);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, prefixes = business.len(), "business prefix added");
        true
    }

    /// Removes a business prefix. Returns `false` if it was absent.
    pub fn remove_business_prefix(&self, prefix: &str) -> bool {
        let mut business = self.business.write().unwrap_or_else(PoisonError::into_inner);
        let before = business.len();
        business.retain(|p| p != prefix);
        if business.len() == before {
            return false;
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, prefixes = business.len(), "business prefix removed");
        true
    }

    /// Replaces all business prefixes.
    pub fn set_business_prefixes<I, S>(&self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut business = self.business.write().unwrap_or_else(PoisonError::into_inner);
        *business = prefixes.into_iter().map(Into::into).collect();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, prefixes = business.len(), "business prefixes replaced");
    }

    /// Number of memoized names (current or stale).
    pub fn memo_len(&self) -> usize {
        self.memo.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of memoized names stamped with the current generation.
    pub fn fresh_len(&self) -> usize {
        let generation = self.generation();
        self.memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.generation == generation)
            .count()
    }
}

impl ClassCategorizer for PrefixCategorizer {
    fn categorize(&self, class_name: &str) -> ClassCategory {
        let current = self.generation();
        if let Some(hit) = self
            .memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(class_name)
        {
            if hit.generation == current {
                return hit.category;
            }
        }
        // Compute under the prefix read lock so the stamp matches the rules used.
        let (category, generation) = {
            let business = self.business.read().unwrap_or_else(PoisonError::into_inner);
            (categorize_name(class_name, business.as_slice()), self.generation())
        };
        let mut memo = self.memo.write().unwrap_or_else(PoisonError::into_inner);
        match memo.get_mut(class_name) {
            Some(existing) if existing.generation > generation => {}
            Some(existing) => {
                *existing = Stamped {
                    category,
                    generation,
                };
            }
            None => {
                memo.insert(
                    class_name.into(),
                    Stamped {
                        category,
                        generation,
                    },
                );
            }
        }
        category
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memoizes_per_generation() {
        let c = PrefixCategorizer::new();
        assert_eq!(c.categorize("com.acme.Order"), ClassCategory::Application);
        assert_eq!(c.categorize("com.acme.Order"), ClassCategory::Application);
        assert_eq!(c.memo_len(), 1);
        assert_eq!(c.fresh_len(), 1);
    }

    #[test]
    fn prefix_change_bumps_generation_without_clearing() {
        let c = PrefixCategorizer::new();
        c.categorize("com.acme.Order");
        c.categorize("java.util.HashMap");
        assert_eq!(c.generation(), 0);

        assert!(c.add_business_prefix("com.acme."));
        assert!(!c.add_business_prefix("com.acme."));
        assert_eq!(c.generation(), 1);
        assert_eq!(c.memo_len(), 2);
        assert_eq!(c.fresh_len(), 0);

        assert_eq!(c.categorize("com.acme.Order"), ClassCategory::Business);
        assert_eq!(c.fresh_len(), 1);

        assert!(c.remove_business_prefix("com.acme."));
        assert!(!c.remove_business_prefix("com.acme."));
        assert_eq!(c.categorize("com.acme.Order"), ClassCategory::Application);
        assert_eq!(c.generation(), 2);
    }

    #[test]
    fn usable_as_shared_trait_object() {
        let c: std::sync::Arc<dyn ClassCategorizer> =
            std::sync::Arc::new(PrefixCategorizer::with_business_prefixes(["org.shop."]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = std::sync::Arc::clone(&c);
                std::thread::spawn(move || c.categorize("org.shop.Cart"))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), ClassCategory::Business);
        }
    }
}
