//! C1: classification of a commutative operation's pattern operands into
//! the buckets the rest of the matcher dispatches on.

use std::collections::HashMap;
use std::rc::Rc;

use expr_core::{is_constant, is_syntactic, ExprId, Store, View};

use crate::multiset::Multiset;

/// Bookkeeping for a named variable that may occur more than once among a
/// commutative operation's operands. All occurrences of the same name must
/// declare the same `min_count` — see `CommutativeParts::new`'s assertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarInfo {
    pub count: usize,
    pub min_count: usize,
}

/// The classified operand bag of a commutative pattern operation.
///
/// - `constant`: ground subexpressions (no wildcard or variable anywhere).
/// - `syntactic`: non-constant but fully fixed-arity subexpressions (no
///   nested associative/commutative operation, no sequence wildcard) —
///   these can be grouped by structural equality and consumed in bulk.
/// - `rest`: everything else that isn't a wildcard or named variable
///   directly under this operation (nested operations with embedded
///   variables) — matched individually against the subject's own `rest`.
/// - `fixed_variables` / `sequence_variables`: named variables, keyed by
///   name, with occurrence count and declared `min_count`.
/// - `wildcard_fixed_count` / `wildcard_sequence_count` /
///   `wildcard_sequence_min`: anonymous (unnamed) wildcards, tallied since
///   they contribute capacity but bind nothing.
pub struct CommutativeParts {
    pub constant: Multiset<ExprId>,
    pub syntactic: Multiset<ExprId>,
    pub rest: Multiset<ExprId>,
    pub fixed_variables: HashMap<Rc<str>, VarInfo>,
    pub sequence_variables: HashMap<Rc<str>, VarInfo>,
    pub wildcard_fixed_count: usize,
    pub wildcard_sequence_count: usize,
    pub wildcard_sequence_min: usize,
}

impl CommutativeParts {
    pub fn new(store: &Store, operands: &[ExprId]) -> Self {
        let mut parts = CommutativeParts {
            constant: Multiset::new(),
            syntactic: Multiset::new(),
            rest: Multiset::new(),
            fixed_variables: HashMap::new(),
            sequence_variables: HashMap::new(),
            wildcard_fixed_count: 0,
            wildcard_sequence_count: 0,
            wildcard_sequence_min: 0,
        };

        for &operand in operands {
            parts.classify_one(store, operand);
        }

        parts
    }

    fn classify_one(&mut self, store: &Store, operand: ExprId) {
        match store.view(operand) {
            View::Variable { name, inner } => {
                let View::Wildcard { min_count, fixed_size, .. } = store.view(inner) else {
                    unreachable!("Variable must wrap a Wildcard")
                };
                let bucket = if fixed_size { &mut self.fixed_variables } else { &mut self.sequence_variables };
                let entry = bucket.entry(Rc::from(name)).or_insert_with(|| VarInfo { count: 0, min_count });
                assert_eq!(
                    entry.min_count, min_count,
                    "repeated variable `{name}` declared with inconsistent min_count"
                );
                entry.count += 1;
            }
            View::Wildcard { min_count, fixed_size, .. } => {
                if fixed_size {
                    self.wildcard_fixed_count += 1;
                } else {
                    self.wildcard_sequence_count += 1;
                    self.wildcard_sequence_min += min_count;
                }
            }
            View::Symbol { .. } | View::Operation { .. } => {
                if is_constant(store, operand) {
                    self.constant.insert(operand, 1);
                } else if is_syntactic(store, operand) {
                    self.syntactic.insert(operand, 1);
                } else {
                    self.rest.insert(operand, 1);
                }
            }
        }
    }

    /// Number of operand slots accounted for by fixed-arity wildcards and
    /// fixed variables (each consumes exactly one subject operand).
    pub fn fixed_capacity(&self) -> usize {
        self.wildcard_fixed_count + self.fixed_variables.values().map(|v| v.count).sum::<usize>()
    }

    /// Sum of the minimum lengths every sequence variable and anonymous
    /// sequence wildcard demands.
    pub fn sequence_min_capacity(&self) -> usize {
        self.wildcard_sequence_min
            + self
                .sequence_variables
                .values()
                .map(|v| v.min_count * v.count)
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_constants_and_syntactic_and_rest() {
        let mut st = Store::new();
        let x = st.symbol("x", "default", None);
        let y = st.symbol("y", "default", None);
        let constant = st.operation("f", vec![x, y], false, false, None);

        let w = st.wildcard(1, true, None, None);
        let syntactic = st.operation("f", vec![x, w], false, false, None);

        let comm_inner = st.operation("g", vec![x, y], false, true, None);
        let rest = st.operation("h", vec![comm_inner], false, false, None);

        let parts = CommutativeParts::new(&st, &[constant, syntactic, rest]);
        assert_eq!(parts.constant.count(&constant), 1);
        assert_eq!(parts.syntactic.count(&syntactic), 1);
        assert_eq!(parts.rest.count(&rest), 1);
    }

    #[test]
    fn tracks_named_variable_occurrence_count() {
        let mut st = Store::new();
        let w = st.wildcard(1, true, None, None);
        let var1 = st.variable("x", w, None);
        let w2 = st.wildcard(1, true, None, None);
        let var2 = st.variable("x", w2, None);

        let parts = CommutativeParts::new(&st, &[var1, var2]);
        let info = parts.fixed_variables.get("x").unwrap();
        assert_eq!(info.count, 2);
        assert_eq!(info.min_count, 1);
    }

    #[test]
    fn tallies_anonymous_wildcards_separately_from_named() {
        let mut st = Store::new();
        let anon_fixed = st.wildcard(1, true, None, None);
        let anon_seq = st.wildcard(2, false, None, None);

        let parts = CommutativeParts::new(&st, &[anon_fixed, anon_seq]);
        assert_eq!(parts.wildcard_fixed_count, 1);
        assert_eq!(parts.wildcard_sequence_count, 1);
        assert_eq!(parts.wildcard_sequence_min, 2);
    }

    #[test]
    fn fixed_capacity_sums_wildcards_and_variables() {
        let mut st = Store::new();
        let anon_fixed = st.wildcard(1, true, None, None);
        let named_w = st.wildcard(1, true, None, None);
        let named = st.variable("x", named_w, None);

        let parts = CommutativeParts::new(&st, &[anon_fixed, named]);
        assert_eq!(parts.fixed_capacity(), 2);
    }

    #[test]
    #[should_panic(expected = "inconsistent min_count")]
    fn repeated_variable_with_conflicting_min_count_panics() {
        let mut st = Store::new();
        let w1 = st.wildcard(1, false, None, None);
        let var1 = st.variable("xs", w1, None);
        let w2 = st.wildcard(2, false, None, None);
        let var2 = st.variable("xs", w2, None);
        CommutativeParts::new(&st, &[var1, var2]);
    }
}
