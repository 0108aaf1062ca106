//! A thin multiset over `ExprId`, the representation a classified
//! commutative operand bag is kept in between classification and
//! partitioning.

use std::collections::HashMap;

use expr_core::ExprId;

#[derive(Clone, Debug, Default)]
pub struct Multiset<T = ExprId> {
    counts: HashMap<T, usize>,
}

impl<T: std::hash::Hash + Eq> PartialEq for Multiset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}

impl<T: std::hash::Hash + Eq> Eq for Multiset<T> {}

impl<T: std::hash::Hash + Eq + Clone> Multiset<T> {
    pub fn new() -> Self {
        Self { counts: HashMap::new() }
    }

    pub fn from_iter_counted(items: impl IntoIterator<Item = T>) -> Self {
        let mut m = Self::new();
        for item in items {
            m.insert(item, 1);
        }
        m
    }

    pub fn insert(&mut self, item: T, count: usize) {
        if count == 0 {
            return;
        }
        *self.counts.entry(item).or_insert(0) += count;
    }

    pub fn count(&self, item: &T) -> usize {
        self.counts.get(item).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&c| c == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, usize)> {
        self.counts.iter().filter(|(_, &c)| c > 0).map(|(k, &c)| (k, c))
    }

    pub fn distinct_len(&self) -> usize {
        self.counts.values().filter(|&&c| c > 0).count()
    }

    /// `true` iff every element's multiplicity in `self` is `<=` the
    /// corresponding multiplicity in `other`.
    pub fn is_subset_of(&self, other: &Multiset<T>) -> bool {
        self.iter().all(|(k, c)| other.count(k) >= c)
    }

    /// `self - other`, clamped at zero per element (never panics on
    /// underflow, matching a defensive multiset difference).
    pub fn difference(&self, other: &Multiset<T>) -> Multiset<T> {
        let mut result = Multiset::new();
        for (k, c) in self.iter() {
            let remaining = c.saturating_sub(other.count(k));
            result.insert(k.clone(), remaining);
        }
        result
    }

    pub fn union(&self, other: &Multiset<T>) -> Multiset<T> {
        let mut result = self.clone();
        for (k, c) in other.iter() {
            result.insert(k.clone(), c);
        }
        result
    }

    pub fn scalar_mul(&self, factor: usize) -> Multiset<T> {
        let mut result = Multiset::new();
        for (k, c) in self.iter() {
            result.insert(k.clone(), c * factor);
        }
        result
    }

    /// Expand back into a flat `Vec`, one entry per multiplicity. Order
    /// across distinct elements is HashMap-arbitrary; callers that need a
    /// canonical order must sort the result themselves (by expression
    /// digest, typically).
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.total());
        for (k, c) in self.iter() {
            for _ in 0..c {
                out.push(k.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_respects_multiplicity() {
        let mut a = Multiset::new();
        a.insert("x", 2);
        let mut b = Multiset::new();
        b.insert("x", 1);
        assert!(!a.is_subset_of(&b));
        assert!(b.is_subset_of(&a));
    }

    #[test]
    fn difference_clamps_at_zero() {
        let mut a = Multiset::new();
        a.insert("x", 1);
        let mut b = Multiset::new();
        b.insert("x", 3);
        let d = a.difference(&b);
        assert_eq!(d.count(&"x"), 0);
    }

    #[test]
    fn union_adds_multiplicities() {
        let mut a = Multiset::new();
        a.insert("x", 1);
        let mut b = Multiset::new();
        b.insert("x", 2);
        b.insert("y", 1);
        let u = a.union(&b);
        assert_eq!(u.count(&"x"), 3);
        assert_eq!(u.count(&"y"), 1);
    }

    #[test]
    fn scalar_mul_scales_every_element() {
        let mut a = Multiset::new();
        a.insert("x", 2);
        a.insert("y", 1);
        let scaled = a.scalar_mul(3);
        assert_eq!(scaled.count(&"x"), 6);
        assert_eq!(scaled.count(&"y"), 3);
    }

    #[test]
    fn total_counts_all_multiplicities() {
        let mut a = Multiset::new();
        a.insert("x", 2);
        a.insert("y", 3);
        assert_eq!(a.total(), 5);
    }
}
