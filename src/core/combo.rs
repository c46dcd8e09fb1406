// src/core/combo.rs
//! Attribute combos: one subset per filter dimension.
//!
//! Used to cut an oversized single-value range orthogonally to the numeric
//! axis. Generation is exponential in vocabulary size (`2^n - 1` subsets per
//! dimension, multiplied across dimensions), so vocabularies are bounded in
//! [`CrawlOptions::validate`](crate::config::CrawlOptions::validate).

use std::fmt;

use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AttributeCombo {
    subsets: Vec<Vec<String>>,
}

impl AttributeCombo {
    pub fn new(subsets: Vec<Vec<String>>) -> Self {
        Self { subsets }
    }

    /// The "no extra filter" combo over `dims` dimensions.
    pub fn empty(dims: usize) -> Self {
        Self { subsets: vec![Vec::new(); dims] }
    }

    /// True when no dimension carries a filter value.
    pub fn is_empty(&self) -> bool {
        self.subsets.iter().all(Vec::is_empty)
    }

    pub fn subsets(&self) -> &[Vec<String>] {
        &self.subsets
    }
}

impl fmt::Display for AttributeCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.subsets.iter()
            .map(|s| format!("{{{}}}", s.join(",")))
            .collect();
        f.write_str(&parts.join("|"))
    }
}

/// All non-empty subsets of `vocab`, smallest first, then by position.
pub fn non_empty_subsets(vocab: &[String]) -> Vec<Vec<String>> {
    let n = vocab.len();
    debug_assert!(n < usize::BITS as usize, "vocabulary too large to enumerate");

    let mut masks: Vec<usize> = (1..(1usize << n)).collect();
    masks.sort_by_key(|&mask| {
        let picked: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        (picked.len(), picked)
    });

    masks.into_iter()
        .map(|mask| {
            (0..n).filter(|i| mask & (1 << i) != 0)
                .map(|i| vocab[i].clone())
                .collect()
        })
        .collect()
}

/// Cartesian product of every dimension's non-empty subsets, then the
/// all-empty combo last. With no dimensions only the all-empty combo remains.
pub fn enumerate(dimensions: &[Vec<String>]) -> Vec<AttributeCombo> {
    let k = dimensions.len();
    if k == 0 {
        return vec![AttributeCombo::empty(0)];
    }

    let per_dim: Vec<Vec<Vec<String>>> = dimensions.iter()
        .map(|vocab| non_empty_subsets(vocab))
        .collect();

    let mut product: Vec<Vec<Vec<String>>> = vec![Vec::with_capacity(k)];
    for options in &per_dim {
        let mut next = Vec::with_capacity(product.len() * options.len());
        for prefix in &product {
            for subset in options {
                let mut row = prefix.clone();
                row.push(subset.clone());
                next.push(row);
            }
        }
        product = next;
    }

    let mut combos: Vec<AttributeCombo> = product.into_iter().map(AttributeCombo::new).collect();
    combos.push(AttributeCombo::empty(k));
    combos
}

/// Number of combos [`enumerate`] yields, without building them.
/// Saturates at `u128::MAX` instead of overflowing.
pub fn count(dimensions: &[Vec<String>]) -> u128 {
    if dimensions.is_empty() {
        return 1;
    }
    dimensions.iter()
        .map(|d| match u32::try_from(d.len()) {
            Ok(n) if n < u128::BITS => (1u128 << n) - 1,
            _ => u128::MAX,
        })
        .fold(1u128, u128::saturating_mul)
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn subsets_of_three() {
        let subsets = non_empty_subsets(&v(&["a", "b", "c"]));
        assert_eq!(subsets, vec![
            v(&["a"]), v(&["b"]), v(&["c"]),
            v(&["a", "b"]), v(&["a", "c"]), v(&["b", "c"]),
            v(&["a", "b", "c"]),
        ]);
    }

    #[test]
    fn subsets_of_empty_vocab() {
        assert!(non_empty_subsets(&[]).is_empty());
    }

    #[test]
    fn two_by_one_dimensions_give_four_combos() {
        let dims = vec![v(&["cooking", "cleaning"]), v(&["cpr"])];
        let combos = enumerate(&dims);
        assert_eq!(combos.len(), 4);
        assert_eq!(count(&dims), 4);
        assert_eq!(combos[0].subsets(), &[v(&["cooking"]), v(&["cpr"])]);
        assert_eq!(combos[2].subsets(), &[v(&["cooking", "cleaning"]), v(&["cpr"])]);
        assert!(combos[3].is_empty());
        assert_eq!(combos[3], AttributeCombo::empty(2));
    }

    #[test]
    fn no_dimensions_only_empty_combo() {
        let combos = enumerate(&[]);
        assert_eq!(combos, vec![AttributeCombo::empty(0)]);
        assert_eq!(count(&[]), 1);
    }

    #[test]
    fn combos_are_unique() {
        let dims = vec![v(&["a", "b", "c"]), v(&["x", "y"])];
        let combos = enumerate(&dims);
        let unique: std::collections::HashSet<_> = combos.iter().collect();
        assert_eq!(unique.len(), combos.len());
        assert_eq!(combos.len() as u128, count(&dims));
        assert_eq!(combos.len(), 7 * 3 + 1);
    }

    #[test]
    fn count_saturates() {
        let huge: Vec<Vec<String>> = (0..5).map(|_| (0..40).map(|i| i.to_string()).collect()).collect();
        assert_eq!(count(&huge), u128::MAX);
        let wide = vec![(0..200).map(|i| i.to_string()).collect::<Vec<_>>()];
        assert_eq!(count(&wide), u128::MAX);
    }

    #[test]
    fn display_lists_subsets() {
        let combo = AttributeCombo::new(vec![v(&["a", "b"]), vec![]]);
        assert_eq!(combo.to_string(), "{a,b}|{}");
    }
}
