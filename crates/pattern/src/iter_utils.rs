//! Enumeration helpers shared by the associative/commutative matchers:
//! weak-composition iteration for distributing a surplus of operands among
//! wildcard slots, multiset-partition iteration for distributing a
//! commutative operand bag among named sequence variables, and a small
//! state-chaining combinator for composing independent match sub-problems
//! left to right.

use expr_core::{ExprId, Substitution};
use std::rc::Rc;

use crate::multiset::Multiset;

/// All vectors of `parts` non-negative integers summing to `n`, i.e. the
/// weak compositions of `n` into `parts` parts. Eagerly collected.
pub fn integer_partition_vector_iter(n: usize, parts: usize) -> Vec<Vec<usize>> {
    if parts == 0 {
        return if n == 0 { vec![vec![]] } else { vec![] };
    }
    if parts == 1 {
        return vec![vec![n]];
    }
    let mut out = Vec::new();
    for first in 0..=n {
        for mut rest in integer_partition_vector_iter(n - first, parts - 1) {
            let mut v = Vec::with_capacity(parts);
            v.push(first);
            v.append(&mut rest);
            out.push(v);
        }
    }
    out
}

/// Like [`integer_partition_vector_iter`] but each slot `i` must be at
/// least `minimums[i]`. Used when each wildcard slot carries its own
/// `min_count`.
pub fn fixed_integer_vector_iter(minimums: &[usize], total: usize) -> Vec<Vec<usize>> {
    let floor: usize = minimums.iter().sum();
    if total < floor {
        return Vec::new();
    }
    integer_partition_vector_iter(total - floor, minimums.len())
        .into_iter()
        .map(|surplus| surplus.iter().zip(minimums).map(|(&s, &m)| s + m).collect())
        .collect()
}

/// All non-negative integer vectors of length `caps.len()` with `v[i] <=
/// caps[i]` summing to `total`. Used for choosing a bounded sub-multiset of
/// a fixed variable's `ℓ > 1` binding (§4.4.3.b): each distinct candidate
/// expression can contribute at most `E[expr] / count` copies.
pub fn capped_integer_vector_iter(caps: &[usize], total: usize) -> Vec<Vec<usize>> {
    if caps.is_empty() {
        return if total == 0 { vec![vec![]] } else { vec![] };
    }
    let mut out = Vec::new();
    for k in 0..=caps[0].min(total) {
        for mut rest in capped_integer_vector_iter(&caps[1..], total - k) {
            let mut v = Vec::with_capacity(caps.len());
            v.push(k);
            v.append(&mut rest);
            out.push(v);
        }
    }
    out
}

/// All non-negative integer vectors `k` of length `weights.len()` with
/// `sum(weights[i] * k[i]) == total`. Generalizes a weak composition to
/// slots that each consume a multiple of their own weight — used to
/// distribute one element's multiplicity among sequence-variable slots that
/// occur more than once in the pattern (§3 `sequence_vars: multiset<name>`),
/// where a slot occurring `count` times consumes `count` copies of whatever
/// value it's bound to.
fn weighted_integer_vector_iter(total: usize, weights: &[usize]) -> Vec<Vec<usize>> {
    if weights.is_empty() {
        return if total == 0 { vec![vec![]] } else { vec![] };
    }
    let w = weights[0];
    let mut out = Vec::new();
    let max_k = if w == 0 { 0 } else { total / w };
    for k in 0..=max_k {
        for mut rest in weighted_integer_vector_iter(total - k * w, &weights[1..]) {
            let mut v = Vec::with_capacity(weights.len());
            v.push(k);
            v.append(&mut rest);
            out.push(v);
        }
    }
    out
}

/// One slot in a commutative sequence-variable partition: the variable's
/// name, how many times it occurs in the pattern (`count` — each occurrence
/// must bind the same value, so the slot consumes `count` copies of it),
/// and the minimum length a single occurrence's bound value must have.
pub struct VariableSlot {
    pub name: Rc<str>,
    pub count: usize,
    pub min_count: usize,
}

/// All ways to partition `multiset` among `slots`, respecting each slot's
/// `min_count`. Each result is a `Vec` parallel to `slots`, giving the
/// multiset *a single occurrence* of that slot is bound to (already divided
/// by `count`, not the raw capacity the slot consumes from `multiset`).
///
/// Implemented by distributing each distinct element's multiplicity across
/// slots independently (a composition weighted by each slot's `count`) and
/// then taking the cartesian product across elements, filtering on the
/// per-slot minimum. This is worst-case exponential in the number of
/// distinct elements, which is acceptable for a reference matcher operating
/// on pattern-sized operand bags.
pub fn commutative_sequence_variable_partition_iter(
    multiset: &Multiset<ExprId>,
    slots: &[VariableSlot],
) -> Vec<Vec<Multiset<ExprId>>> {
    let n = slots.len();
    if n == 0 {
        return if multiset.is_empty() { vec![vec![]] } else { vec![] };
    }

    let elements: Vec<(ExprId, usize)> = multiset.iter().map(|(&e, c)| (e, c)).collect();
    let weights: Vec<usize> = slots.iter().map(|s| s.count).collect();

    // per_element[i] = all weighted compositions of elements[i].1 into n parts
    let per_element: Vec<Vec<Vec<usize>>> =
        elements.iter().map(|&(_, count)| weighted_integer_vector_iter(count, &weights)).collect();

    let mut combos: Vec<Vec<Vec<usize>>> = vec![vec![]];
    for options in &per_element {
        let mut next = Vec::with_capacity(combos.len() * options.len());
        for combo in &combos {
            for opt in options {
                let mut extended = combo.clone();
                extended.push(opt.clone());
                next.push(extended);
            }
        }
        combos = next;
    }

    let minimums: Vec<usize> = slots.iter().map(|s| s.min_count).collect();

    combos
        .into_iter()
        .filter_map(|combo| {
            let mut slot_multisets: Vec<Multiset<ExprId>> = (0..n).map(|_| Multiset::new()).collect();
            let mut slot_totals = vec![0usize; n];
            for (elem_idx, &(expr, _)) in elements.iter().enumerate() {
                for slot_idx in 0..n {
                    let c = combo[elem_idx][slot_idx];
                    if c > 0 {
                        slot_multisets[slot_idx].insert(expr, c);
                        slot_totals[slot_idx] += c;
                    }
                }
            }
            if slot_totals.iter().zip(&minimums).all(|(&t, &m)| t >= m) {
                Some(slot_multisets)
            } else {
                None
            }
        })
        .collect()
}

/// Left-to-right composition of independent match sub-problems. Each
/// factory consumes one substitution and produces zero or more extended
/// substitutions; `chain_factories` flat-maps the whole pipeline starting
/// from `initial`.
pub fn chain_factories(
    initial: Vec<Substitution>,
    factories: &[Box<dyn Fn(&Substitution) -> Vec<Substitution>>],
) -> Vec<Substitution> {
    let mut current = initial;
    for factory in factories {
        let mut next = Vec::new();
        for subst in &current {
            next.extend(factory(subst));
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_partition_counts_match_stars_and_bars() {
        // C(n + parts - 1, parts - 1)
        let parts = integer_partition_vector_iter(3, 2);
        assert_eq!(parts.len(), 4); // (0,3)(1,2)(2,1)(3,0)
        for p in &parts {
            assert_eq!(p.iter().sum::<usize>(), 3);
        }
    }

    #[test]
    fn integer_partition_zero_parts() {
        assert_eq!(integer_partition_vector_iter(0, 0), vec![Vec::<usize>::new()]);
        assert_eq!(integer_partition_vector_iter(1, 0), Vec::<Vec<usize>>::new());
    }

    #[test]
    fn fixed_integer_vector_respects_minimums() {
        let mins = vec![1, 2];
        let v = fixed_integer_vector_iter(&mins, 5);
        for combo in &v {
            assert!(combo[0] >= 1);
            assert!(combo[1] >= 2);
            assert_eq!(combo.iter().sum::<usize>(), 5);
        }
    }

    #[test]
    fn fixed_integer_vector_empty_when_below_floor() {
        let mins = vec![2, 2];
        assert!(fixed_integer_vector_iter(&mins, 3).is_empty());
    }

    #[test]
    fn chain_factories_short_circuits_on_empty() {
        let f1: Box<dyn Fn(&Substitution) -> Vec<Substitution>> =
            Box::new(|s: &Substitution| vec![s.clone()]);
        let f2: Box<dyn Fn(&Substitution) -> Vec<Substitution>> = Box::new(|_: &Substitution| vec![]);
        let result = chain_factories(vec![Substitution::new()], &[f1, f2]);
        assert!(result.is_empty());
    }

    #[test]
    fn capped_integer_vector_respects_caps_and_total() {
        let caps = vec![1, 2];
        let combos = capped_integer_vector_iter(&caps, 2);
        assert!(!combos.is_empty());
        for combo in &combos {
            assert!(combo[0] <= 1);
            assert!(combo[1] <= 2);
            assert_eq!(combo.iter().sum::<usize>(), 2);
        }
    }

    #[test]
    fn capped_integer_vector_empty_when_caps_too_small() {
        let caps = vec![1, 1];
        assert!(capped_integer_vector_iter(&caps, 5).is_empty());
    }

    #[test]
    fn partition_with_repeated_slot_requires_divisible_capacity() {
        // A single element with multiplicity 1 can't satisfy a slot that
        // occurs twice (each occurrence needs its own copy of the value).
        let mut m = Multiset::new();
        let fake = expr_core::ExprId(0);
        m.insert(fake, 1);
        let slots = vec![VariableSlot { name: Rc::from("x"), count: 2, min_count: 1 }];
        assert!(commutative_sequence_variable_partition_iter(&m, &slots).is_empty());
    }

    #[test]
    fn partition_with_repeated_slot_consumes_count_copies() {
        let mut m = Multiset::new();
        let a = expr_core::ExprId(0);
        m.insert(a, 2);
        let slots = vec![VariableSlot { name: Rc::from("x"), count: 2, min_count: 1 }];
        let results = commutative_sequence_variable_partition_iter(&m, &slots);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0][0].count(&a), 1);
    }
}
