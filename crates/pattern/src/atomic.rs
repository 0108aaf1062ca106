//! C5: leaf-level matching — binding a (possibly typed) wildcard or named
//! variable against an already-decided slice of subject expressions, and
//! literal symbol equality.

use std::rc::Rc;

use expr_core::{ExprId, Store, Substitution, Value, View};

/// Try to bind `subjects` (a slice whose boundaries some higher-level
/// partitioner has already decided) to `wildcard`. Returns `None` if the
/// length or symbol-type constraint isn't satisfied.
///
/// A fixed wildcard with `min_count == 1` binds `Value::Single`; any other
/// fixed or sequence wildcard binds `Value::Sequence`, including a fixed
/// wildcard whose `min_count > 1` (an exact-length grouping wildcard).
pub fn match_wildcard(store: &Store, subjects: &[ExprId], wildcard: ExprId) -> Option<Value> {
    let View::Wildcard { min_count, fixed_size, symbol_type } = store.view(wildcard) else {
        panic!("match_wildcard called with a non-Wildcard pattern node");
    };

    if fixed_size {
        if subjects.len() != min_count {
            return None;
        }
    } else if subjects.len() < min_count {
        return None;
    }

    if let Some(expected_type) = symbol_type {
        for &s in subjects {
            match store.view(s) {
                View::Symbol { symbol_type, .. } if symbol_type == expected_type => {}
                _ => return None,
            }
        }
    }

    Some(if fixed_size && min_count == 1 {
        Value::Single(subjects[0])
    } else {
        Value::Sequence(subjects.to_vec())
    })
}

/// Bind `subjects` to a named `variable` (a `Variable` node wrapping a
/// `Wildcard`), honoring any existing binding for that name and the
/// variable's own constraint, if any.
pub fn match_variable(
    store: &Store,
    subjects: &[ExprId],
    variable: ExprId,
    subst: &Substitution,
) -> Option<Substitution> {
    let View::Variable { name, inner } = store.view(variable) else {
        panic!("match_variable called with a non-Variable pattern node");
    };
    let value = match_wildcard(store, subjects, inner)?;
    let constraint = store.get(variable).constraint;

    let extended = subst.extended(Rc::from(name), value).ok()?;
    if store.check_constraint(constraint, &extended) {
        Some(extended)
    } else {
        None
    }
}

/// Literal equality for a non-wildcard, non-operation pattern leaf. Since
/// the store hash-conses, structural equality is `ExprId` equality.
pub fn match_symbol(pattern: ExprId, subject: ExprId) -> bool {
    pattern == subject
}
