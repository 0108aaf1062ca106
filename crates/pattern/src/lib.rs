#![deny(warnings)]
//! pattern: many-to-one associative-commutative term matching.
//!
//! Given a pattern expression (built from symbols, fixed/sequence
//! wildcards, named variables and operations over an `expr_core::Store`)
//! and one or more concrete subject expressions, enumerate every
//! substitution that makes the pattern structurally equal to the subject.
//! Non-associative, non-commutative operations match operand lists in
//! order; associative operations additionally allow a fixed-size slot to
//! absorb a surplus by wrapping it in a fresh instance of the operator;
//! commutative operations classify their operand multiset and distribute
//! it among constants, individually-matched subexpressions, fixed
//! variables and sequence variables.

mod atomic;
mod classify;
mod commutative;
#[allow(dead_code)]
mod iter_utils;
mod multiset;
mod noncommutative;

pub use classify::{CommutativeParts, VarInfo};
pub use commutative::SyntacticMatcher;
pub use multiset::Multiset;

use std::fmt;
use std::rc::Rc;

use expr_core::{ExprId, Store, Substitution, View};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// A commutative match was attempted with a subject operand that isn't
    /// a ground expression. Matching only ever compares concrete subject
    /// trees against a pattern, so this indicates a caller bug rather than
    /// an ordinary failed match.
    NonConstantSubject,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NonConstantSubject => {
                write!(f, "commutative match subject must be a ground expression")
            }
        }
    }
}

impl std::error::Error for MatchError {}

enum Classified {
    Wildcard,
    Variable,
    Symbol,
    Operation { op_type: Rc<str>, pattern_operands: Vec<ExprId>, associative: bool, commutative: bool },
}

fn classify(store: &Store, pattern: ExprId) -> Classified {
    match store.view(pattern) {
        View::Wildcard { .. } => Classified::Wildcard,
        View::Variable { .. } => Classified::Variable,
        View::Symbol { .. } => Classified::Symbol,
        View::Operation { op_type, operands, associative, commutative } => Classified::Operation {
            op_type: Rc::from(op_type),
            pattern_operands: operands.to_vec(),
            associative,
            commutative,
        },
    }
}

/// Match `pattern` against the expressions in `subjects` taken together —
/// `subjects.len() == 1` for an ordinary single-expression match, or more
/// than one when the caller has already decided a specific run of subject
/// expressions should bind a single sequence wildcard or variable.
pub fn match_expr(store: &mut Store, pattern: ExprId, subjects: &[ExprId], subst: &Substitution) -> Vec<Substitution> {
    match classify(store, pattern) {
        Classified::Wildcard => match atomic::match_wildcard(store, subjects, pattern) {
            Some(_) => vec![subst.clone()],
            None => Vec::new(),
        },
        Classified::Variable => atomic::match_variable(store, subjects, pattern, subst).into_iter().collect(),
        Classified::Symbol => {
            if subjects.len() == 1 && atomic::match_symbol(pattern, subjects[0]) {
                vec![subst.clone()]
            } else {
                Vec::new()
            }
        }
        Classified::Operation { op_type, pattern_operands, associative, commutative } => {
            if subjects.len() != 1 {
                return Vec::new();
            }
            let subject = subjects[0];
            let subject_operands = match store.view(subject) {
                View::Operation { op_type: s_op, operands, associative: s_assoc, commutative: s_comm }
                    if op_type.as_ref() == s_op && associative == s_assoc && commutative == s_comm =>
                {
                    operands.to_vec()
                }
                _ => return Vec::new(),
            };

            if commutative {
                match match_commutative_operation(store, &op_type, associative, &pattern_operands, &subject_operands, subst) {
                    Ok(results) => results,
                    Err(e) => panic!("{e}"),
                }
            } else {
                match_operation(store, &pattern_operands, &subject_operands, subst, &op_type, associative)
            }
        }
    }
}

fn dispatch_single(store: &mut Store, pattern: ExprId, subject: ExprId, subst: &Substitution) -> Vec<Substitution> {
    match_expr(store, pattern, &[subject], subst)
}

/// Match a non-commutative operation's pattern operand list against a
/// subject's operand list, in order.
pub fn match_operation(
    store: &mut Store,
    pattern_operands: &[ExprId],
    subject_operands: &[ExprId],
    subst: &Substitution,
    op_type: &Rc<str>,
    associative: bool,
) -> Vec<Substitution> {
    noncommutative::match_sequence(store, pattern_operands, subject_operands, subst, op_type, associative, &dispatch_single)
}

/// Match a commutative operation's pattern operand multiset against a
/// subject's operand multiset. `op_type`/`associative` describe the
/// enclosing operation; `syntactic_matcher`, when supplied, is tried as a
/// fast path over the pattern's syntactic (fixed-arity, non-AC) operands
/// before falling back to individual assignment.
pub fn match_commutative_operation(
    store: &mut Store,
    op_type: &Rc<str>,
    associative: bool,
    pattern_operands: &[ExprId],
    subject_operands: &[ExprId],
    subst: &Substitution,
) -> Result<Vec<Substitution>, MatchError> {
    commutative::match_commutative_operation(
        store,
        op_type,
        associative,
        pattern_operands,
        subject_operands,
        subst,
        &dispatch_single,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_identical_symbol() {
        let mut st = Store::new();
        let x = st.symbol("x", "default", None);
        let result = match_expr(&mut st, x, &[x], &Substitution::new());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn rejects_different_symbols() {
        let mut st = Store::new();
        let x = st.symbol("x", "default", None);
        let y = st.symbol("y", "default", None);
        let result = match_expr(&mut st, x, &[y], &Substitution::new());
        assert!(result.is_empty());
    }

    #[test]
    fn variable_binds_any_single_subject() {
        let mut st = Store::new();
        let y = st.symbol("y", "default", None);
        let w = st.wildcard(1, true, None, None);
        let var = st.variable("x", w, None);
        let result = match_expr(&mut st, var, &[y], &Substitution::new());
        assert_eq!(result.len(), 1);
        assert_eq!(*result[0].get("x").unwrap(), expr_core::Value::Single(y));
    }

    #[test]
    fn non_commutative_operation_matches_in_order() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let b = st.symbol("b", "default", None);
        let pat = st.operation("f", vec![a, b], false, false, None);
        let subj = st.operation("f", vec![a, b], false, false, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn non_commutative_operation_order_matters() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let b = st.symbol("b", "default", None);
        let pat = st.operation("f", vec![a, b], false, false, None);
        let subj = st.operation("f", vec![b, a], false, false, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert!(result.is_empty());
    }

    #[test]
    fn commutative_operation_matches_regardless_of_order() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let b = st.symbol("b", "default", None);
        let pat = st.operation("f", vec![a, b], false, true, None);
        let subj = st.operation("f", vec![b, a], false, true, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn commutative_operation_binds_sequence_variable_to_leftovers() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let b = st.symbol("b", "default", None);
        let c = st.symbol("c", "default", None);
        let w = st.wildcard(0, false, None, None);
        let xs = st.variable("xs", w, None);
        let pat = st.operation("f", vec![a, xs], false, true, None);
        let subj = st.operation("f", vec![a, b, c], false, true, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert_eq!(result.len(), 1);
        match result[0].get("xs").unwrap() {
            expr_core::Value::Sequence(v) => {
                let mut v = v.clone();
                v.sort_by_key(|e| e.0);
                let mut expected = vec![b, c];
                expected.sort_by_key(|e| e.0);
                assert_eq!(v, expected);
            }
            other => panic!("expected sequence binding, got {other:?}"),
        }
    }

    #[test]
    fn commutative_operation_with_no_match_returns_empty() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let b = st.symbol("b", "default", None);
        let d = st.symbol("d", "default", None);
        let pat = st.operation("f", vec![a, b], false, true, None);
        let subj = st.operation("f", vec![a, d], false, true, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert!(result.is_empty());
    }

    #[test]
    fn associative_commutative_operation_rewraps_surplus_via_dispatch() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let b = st.symbol("b", "default", None);
        let c = st.symbol("c", "default", None);
        let w = st.wildcard(1, true, None, None);
        let x = st.variable("x", w, None);
        let pat = st.operation("f", vec![x, b], true, true, None);
        let subj = st.operation("f", vec![a, b, c], true, true, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert_eq!(result.len(), 1);
        match result[0].get("x").unwrap() {
            expr_core::Value::Single(id) => match st.view(*id) {
                expr_core::View::Operation { op_type, .. } => assert_eq!(op_type, "f"),
                _ => panic!("expected x bound to a wrapped operation"),
            },
            other => panic!("expected Value::Single, got {other:?}"),
        }
    }

    #[test]
    fn different_head_never_matches() {
        let mut st = Store::new();
        let a = st.symbol("a", "default", None);
        let pat = st.operation("f", vec![a], false, false, None);
        let subj = st.operation("g", vec![a], false, false, None);
        let result = match_expr(&mut st, pat, &[subj], &Substitution::new());
        assert!(result.is_empty());
    }
}
