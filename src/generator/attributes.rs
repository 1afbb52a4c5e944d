//! Expansion of attribute definitions into every value combination.
//!
//! Combinations are produced in odometer order: the first definition is the
//! most significant digit and the last one cycles fastest.

use crate::core::{AttributeCombination, AttributeDefinition, AttributePair};
use std::iter::FusedIterator;

/// Enumerate every combination of `definitions`.
///
/// Yields exactly the product of all cardinalities, or nothing when
/// `definitions` is empty. Cardinalities must already be at least 1.
pub fn combinations(definitions: &[AttributeDefinition]) -> Combinations<'_> {
    Combinations::new(definitions)
}

/// Product of all cardinalities, saturating at `usize::MAX`.
///
/// Empty input yields 1: one untagged series per metric.
pub fn total_cardinality(definitions: &[AttributeDefinition]) -> usize {
    definitions
        .iter()
        .fold(1usize, |acc, def| acc.saturating_mul(def.cardinality))
}

/// Lazy mixed-radix counter over attribute values.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    definitions: &'a [AttributeDefinition],
    digits: Vec<usize>,
    remaining: usize,
}

impl<'a> Combinations<'a> {
    fn new(definitions: &'a [AttributeDefinition]) -> Self {
        let remaining = if definitions.is_empty() {
            0
        } else {
            total_cardinality(definitions)
        };

        Self {
            definitions,
            digits: vec![0; definitions.len()],
            remaining,
        }
    }

    fn current(&self) -> AttributeCombination {
        let pairs = self
            .definitions
            .iter()
            .zip(&self.digits)
            .map(|(def, &digit)| AttributePair::new(def.name.as_str(), digit))
            .collect();
        AttributeCombination::new(pairs)
    }

    /// Advance the least significant digit, carrying leftwards.
    fn advance(&mut self) {
        for (digit, def) in self.digits.iter_mut().zip(self.definitions).rev() {
            *digit += 1;
            if *digit < def.cardinality {
                return;
            }
            *digit = 0;
        }
    }
}

impl Iterator for Combinations<'_> {
    type Item = AttributeCombination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let combination = self.current();
        self.remaining -= 1;
        self.advance();
        Some(combination)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}

impl FusedIterator for Combinations<'_> {}
