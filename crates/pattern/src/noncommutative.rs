//! C2: order-preserving matching of a pattern operand list against a
//! subject operand list, for non-commutative operations (associative or
//! not). Sequence wildcards force backtracking over how many subjects they
//! consume; an associative operator additionally lets a fixed-size slot
//! absorb a surplus by wrapping it in a fresh instance of the same
//! operation (`Store::operation_from_args`).

use std::rc::Rc;

use expr_core::{ExprId, Store, Substitution, View};

use crate::atomic::{match_symbol, match_variable, match_wildcard};

/// One element of a pattern operand list, classified for sequence
/// matching purposes.
enum Slot {
    /// A bare `Wildcard`, not wrapped in a `Variable` — binds nothing.
    AnonWildcard { min_count: usize, fixed_size: bool },
    /// A `Variable` wrapping a `Wildcard` — binds `name`.
    NamedWildcard { min_count: usize, fixed_size: bool },
    /// Anything else: a literal symbol or a nested operation pattern,
    /// which always consumes exactly one subject.
    Single,
}

fn classify_slot(store: &Store, pattern_elem: ExprId) -> Slot {
    match store.view(pattern_elem) {
        View::Wildcard { min_count, fixed_size, .. } => Slot::AnonWildcard { min_count, fixed_size },
        View::Variable { inner, .. } => match store.view(inner) {
            View::Wildcard { min_count, fixed_size, .. } => Slot::NamedWildcard { min_count, fixed_size },
            _ => unreachable!("Variable must wrap a Wildcard"),
        },
        _ => Slot::Single,
    }
}

/// Minimum number of subjects the remaining pattern tail can possibly
/// consume, used to prune impossible splits before recursing.
fn min_remaining(store: &Store, pattern: &[ExprId]) -> usize {
    pattern
        .iter()
        .map(|&p| match classify_slot(store, p) {
            Slot::AnonWildcard { min_count, .. } | Slot::NamedWildcard { min_count, .. } => min_count,
            Slot::Single => 1,
        })
        .sum()
}

/// Match `pattern` operands against `subjects` operands, in order.
///
/// `op_type`/`associative` describe the enclosing operation, needed only to
/// re-wrap a surplus absorbed by a fixed-size slot when the operation is
/// associative. `dispatch` is called to match a non-wildcard pattern
/// element (a literal symbol or nested operation pattern) against exactly
/// one subject expression; it is how this module reaches back into the
/// general `match` entry point without a circular module dependency.
#[allow(clippy::too_many_arguments)]
pub fn match_sequence(
    store: &mut Store,
    pattern: &[ExprId],
    subjects: &[ExprId],
    subst: &Substitution,
    op_type: &Rc<str>,
    associative: bool,
    dispatch: &dyn Fn(&mut Store, ExprId, ExprId, &Substitution) -> Vec<Substitution>,
) -> Vec<Substitution> {
    if pattern.is_empty() {
        return if subjects.is_empty() { vec![subst.clone()] } else { vec![] };
    }
    if subjects.len() < min_remaining(store, pattern) {
        return Vec::new();
    }

    let head = pattern[0];
    let tail = &pattern[1..];

    match classify_slot(store, head) {
        Slot::Single => {
            let Some((&first, rest)) = subjects.split_first() else {
                return Vec::new();
            };
            if let View::Symbol { .. } = store.view(head) {
                if !match_symbol(head, first) {
                    return Vec::new();
                }
                match_sequence(store, tail, rest, subst, op_type, associative, dispatch)
            } else {
                let mut out = Vec::new();
                for extended in dispatch(store, head, first, subst) {
                    out.extend(match_sequence(store, tail, rest, &extended, op_type, associative, dispatch));
                }
                out
            }
        }
        Slot::AnonWildcard { min_count, fixed_size } => {
            match_wildcard_slot(store, head, None, min_count, fixed_size, tail, subjects, subst, op_type, associative, dispatch)
        }
        Slot::NamedWildcard { min_count, fixed_size } => {
            match_wildcard_slot(store, head, Some(head), min_count, fixed_size, tail, subjects, subst, op_type, associative, dispatch)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn match_wildcard_slot(
    store: &mut Store,
    wildcard_or_variable: ExprId,
    variable_if_named: Option<ExprId>,
    min_count: usize,
    fixed_size: bool,
    tail: &[ExprId],
    subjects: &[ExprId],
    subst: &Substitution,
    op_type: &Rc<str>,
    associative: bool,
    dispatch: &dyn Fn(&mut Store, ExprId, ExprId, &Substitution) -> Vec<Substitution>,
) -> Vec<Substitution> {
    let tail_floor = min_remaining(store, tail);
    let max_take = subjects.len().saturating_sub(tail_floor);
    if max_take < min_count {
        return Vec::new();
    }

    let mut out = Vec::new();

    if fixed_size {
        // Exact consumption of `min_count` raw subjects.
        if min_count <= max_take {
            out.extend(try_consume(
                store,
                wildcard_or_variable,
                variable_if_named,
                &subjects[..min_count],
                &subjects[min_count..],
                tail,
                subst,
                op_type,
                associative,
                dispatch,
            ));
        }
        // Associative re-wrap: a fixed slot of min_count m >= 1 may instead
        // absorb more than m raw subjects by keeping the first m-1 as-is and
        // wrapping the rest in a fresh instance of the enclosing operation,
        // matching the m-length result (m-1 raw subjects plus the wrapped
        // tail) as the bound value.
        if associative && min_count >= 1 {
            for take in (min_count + 1)..=max_take {
                let mut consumed = subjects[..min_count - 1].to_vec();
                let wrapped_operands = subjects[min_count - 1..take].to_vec();
                let wrapped = store.operation_from_args(op_type, associative, false, wrapped_operands);
                consumed.push(wrapped);
                out.extend(try_consume(
                    store,
                    wildcard_or_variable,
                    variable_if_named,
                    &consumed,
                    &subjects[take..],
                    tail,
                    subst,
                    op_type,
                    associative,
                    dispatch,
                ));
            }
        }
    } else {
        for take in min_count..=max_take {
            out.extend(try_consume(
                store,
                wildcard_or_variable,
                variable_if_named,
                &subjects[..take],
                &subjects[take..],
                tail,
                subst,
                op_type,
                associative,
                dispatch,
            ));
        }
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn try_consume(
    store: &mut Store,
    wildcard_or_variable: ExprId,
    variable_if_named: Option<ExprId>,
    consumed: &[ExprId],
    remaining_subjects: &[ExprId],
    tail: &[ExprId],
    subst: &Substitution,
    op_type: &Rc<str>,
    associative: bool,
    dispatch: &dyn Fn(&mut Store, ExprId, ExprId, &Substitution) -> Vec<Substitution>,
) -> Vec<Substitution> {
    let extended = match variable_if_named {
        Some(var) => match_variable(store, consumed, var, subst),
        None => match_wildcard(store, consumed, wildcard_or_variable).map(|_| subst.clone()),
    };
    match extended {
        Some(s) => match_sequence(store, tail, remaining_subjects, &s, op_type, associative, dispatch),
        None => Vec::new(),
    }
}
