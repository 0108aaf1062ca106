//! C3: matching a commutative (and possibly also associative) operation's
//! pattern operands against a subject's operand multiset. Peels exact
//! constants, optionally runs a pluggable syntactic fast-path matcher over
//! the fixed-arity portion, assigns the remaining nested/syntactic patterns
//! to distinct subjects individually, binds fixed variables by multiset
//! membership — or, under associativity, folds them into the
//! sequence-variable allocation so they can absorb surplus via re-wrap —
//! and finally partitions whatever multiset is left among the sequence
//! variables and anonymous sequence wildcards.

use std::collections::HashMap;
use std::rc::Rc;

use expr_core::{is_constant, is_syntactic, ExprId, Store, Substitution, Value, View};

use crate::classify::{CommutativeParts, VarInfo};
use crate::iter_utils::{capped_integer_vector_iter, commutative_sequence_variable_partition_iter, VariableSlot};
use crate::multiset::Multiset;
use crate::MatchError;

type Dispatch<'a> = dyn Fn(&mut Store, ExprId, ExprId, &Substitution) -> Vec<Substitution> + 'a;

/// A pluggable fast-path matcher for the syntactic (fixed-arity,
/// non-associative-commutative) portion of a commutative pattern's
/// operands. Given the candidate syntactic subjects and the pattern's
/// syntactic multiset, yields every partial assignment paired with the
/// syntactic subjects it left unconsumed.
pub type SyntacticMatcher<'a> =
    dyn Fn(&Multiset<ExprId>, &Multiset<ExprId>, &Store) -> Vec<(Substitution, Multiset<ExprId>)> + 'a;

#[allow(clippy::too_many_arguments)]
pub fn match_commutative_operation(
    store: &mut Store,
    op_type: &Rc<str>,
    associative: bool,
    pattern_operands: &[ExprId],
    subject_operands: &[ExprId],
    subst: &Substitution,
    dispatch: &Dispatch,
    syntactic_matcher: Option<&SyntacticMatcher>,
) -> Result<Vec<Substitution>, MatchError> {
    for &s in subject_operands {
        if !is_constant(store, s) {
            return Err(MatchError::NonConstantSubject);
        }
    }

    let parts = CommutativeParts::new(store, pattern_operands);
    let subjects = Multiset::from_iter_counted(subject_operands.iter().copied());

    let Some(after_constants) = peel_constants(&parts.constant, &subjects) else {
        return Ok(Vec::new());
    };

    if let Some(syn_matcher) = syntactic_matcher {
        if !parts.syntactic.is_empty() {
            let mut syntactic_subjects = Multiset::new();
            let mut rest_subjects = Multiset::new();
            for (&e, c) in after_constants.iter() {
                if is_syntactic_bucket_subject(store, e) {
                    syntactic_subjects.insert(e, c);
                } else {
                    rest_subjects.insert(e, c);
                }
            }
            if parts.syntactic.total() > syntactic_subjects.total() {
                return Ok(Vec::new());
            }
            let mut finished = Vec::new();
            for (sub_subst, leftover_syntactic) in syn_matcher(&syntactic_subjects, &parts.syntactic, store) {
                let Ok(unioned) = subst.union(&sub_subst) else { continue };
                let combined_remaining = leftover_syntactic.union(&rest_subjects);
                finished.extend(finish_matching(
                    store,
                    op_type,
                    associative,
                    &parts,
                    &combined_remaining,
                    &unioned,
                    dispatch,
                    false,
                )?);
            }
            return Ok(finished);
        }
    }

    finish_matching(store, op_type, associative, &parts, &after_constants, subst, dispatch, true)
}

/// Classification used by the syntactic fast path's subject split (§4.4
/// step 2): an expression is "syntactic" for this purpose iff it's
/// syntactic in the usual recursive sense, or — without recursing — it's a
/// bare symbol or a non-associative-commutative operation.
fn is_syntactic_bucket_subject(store: &Store, e: ExprId) -> bool {
    if is_syntactic(store, e) {
        return true;
    }
    match store.view(e) {
        View::Symbol { .. } => true,
        View::Operation { associative, commutative, .. } => !(associative || commutative),
        _ => false,
    }
}

fn peel_constants(constants: &Multiset<ExprId>, subjects: &Multiset<ExprId>) -> Option<Multiset<ExprId>> {
    if !constants.is_subset_of(subjects) {
        return None;
    }
    Some(subjects.difference(constants))
}

fn syntactic_and_rest(parts: &CommutativeParts) -> Vec<ExprId> {
    let mut out = parts.syntactic.to_vec();
    out.extend(parts.rest.to_vec());
    out
}

/// §4.4.3's shared finisher, reached either directly (no syntactic fast
/// path) or after it has consumed part of the syntactic bucket.
/// `include_syntactic` controls whether `P.syntactic` is folded into the
/// patterns handled by individual assignment (true) or was already fully
/// delegated to the syntactic matcher (false).
#[allow(clippy::too_many_arguments)]
fn finish_matching(
    store: &mut Store,
    op_type: &Rc<str>,
    associative: bool,
    parts: &CommutativeParts,
    remaining: &Multiset<ExprId>,
    subst: &Substitution,
    dispatch: &Dispatch,
    include_syntactic: bool,
) -> Result<Vec<Substitution>, MatchError> {
    let Some((after_prebind, unresolved_fixed)) = prebind_fixed_variables(store, op_type, associative, parts, remaining, subst)
    else {
        return Ok(Vec::new());
    };

    let rest_expr = if include_syntactic { syntactic_and_rest(parts) } else { parts.rest.to_vec() };
    let assigned = assign_individually(store, &rest_expr, &after_prebind, subst, dispatch);

    let bound: Vec<(Substitution, Multiset<ExprId>)> = if associative {
        // Fixed variables aren't bound here; they fold into the
        // sequence-variable allocation below so they can absorb surplus by
        // re-wrap (§4.4.3.d).
        assigned
    } else {
        let mut out = Vec::new();
        for (subst, remaining) in assigned {
            out.extend(bind_fixed_variables(store, &unresolved_fixed, parts.wildcard_fixed_count, &remaining, &subst));
        }
        out
    };

    let mut finished = Vec::new();
    for (subst, remaining) in bound {
        finished.extend(distribute_sequence_capacity(
            store,
            op_type,
            associative,
            parts,
            &unresolved_fixed,
            &remaining,
            &subst,
        )?);
    }

    Ok(finished)
}

/// §4.4.3.a pre-bind check: a fixed variable already bound by an outer
/// substitution must have its value's operand multiset consistent with
/// what's left of the subject, and is removed from the unresolved set so
/// later stages don't try to bind it again.
fn prebind_fixed_variables(
    store: &Store,
    op_type: &Rc<str>,
    associative: bool,
    parts: &CommutativeParts,
    remaining: &Multiset<ExprId>,
    subst: &Substitution,
) -> Option<(Multiset<ExprId>, HashMap<Rc<str>, VarInfo>)> {
    let mut unresolved = parts.fixed_variables.clone();
    let mut e = remaining.clone();

    let mut names: Vec<Rc<str>> = unresolved.keys().cloned().collect();
    names.sort();
    for name in names {
        let Some(value) = subst.get(&name) else { continue };
        let info = unresolved.get(&name).cloned().unwrap();
        let consumed = match value {
            Value::Single(id) => match (associative, store.view(*id)) {
                (true, View::Operation { op_type: vo, operands, .. }) if vo == op_type.as_ref() => {
                    Multiset::from_iter_counted(operands.to_vec())
                }
                _ => Multiset::from_iter_counted(std::iter::once(*id)),
            },
            Value::Sequence(ids) => Multiset::from_iter_counted(ids.iter().copied()),
        };
        let scaled = consumed.scalar_mul(info.count);
        if !scaled.is_subset_of(&e) {
            return None;
        }
        e = e.difference(&scaled);
        unresolved.remove(&name);
    }
    Some((e, unresolved))
}

fn assign_individually(
    store: &mut Store,
    patterns: &[ExprId],
    remaining: &Multiset<ExprId>,
    subst: &Substitution,
    dispatch: &Dispatch,
) -> Vec<(Substitution, Multiset<ExprId>)> {
    let Some((&pattern, rest)) = patterns.split_first() else {
        return vec![(subst.clone(), remaining.clone())];
    };

    let pattern_head = store.head(pattern).cloned();
    let mut out = Vec::new();
    for (&candidate, count) in remaining.iter() {
        if count == 0 {
            continue;
        }
        if let (Some(ph), Some(ch)) = (pattern_head.as_ref(), store.head(candidate)) {
            if ph != ch {
                continue;
            }
        }
        let mut rebuilt = Multiset::new();
        for (&k, c) in remaining.iter() {
            rebuilt.insert(k, if k == candidate { c - 1 } else { c });
        }
        for extended in dispatch(store, pattern, candidate, subst) {
            out.extend(assign_individually(store, rest, &rebuilt, &extended, dispatch));
        }
    }
    out
}

/// §4.4.3.b's fixed-variable factories, for the non-associative case only:
/// `ℓ == 1` picks a single candidate consumed `count` times, `ℓ > 1`
/// enumerates a bounded sub-multiset of total size `ℓ`. Also consumes
/// anonymous fixed-wildcard capacity once all named fixed variables are
/// resolved.
fn bind_fixed_variables(
    store: &Store,
    unresolved: &HashMap<Rc<str>, VarInfo>,
    wildcard_fixed_count: usize,
    remaining: &Multiset<ExprId>,
    subst: &Substitution,
) -> Vec<(Substitution, Multiset<ExprId>)> {
    let mut states = vec![(subst.clone(), remaining.clone())];

    let mut names: Vec<&Rc<str>> = unresolved.keys().collect();
    names.sort();
    for name in names {
        let info = &unresolved[name];
        let mut next_states = Vec::new();
        for (subst, remaining) in states {
            if info.min_count == 1 {
                let mut candidates: Vec<ExprId> =
                    remaining.iter().filter(|&(_, c)| c >= info.count).map(|(&e, _)| e).collect();
                candidates.sort_by_key(|&e| (store.get(e).digest, e.0));
                for candidate in candidates {
                    let Ok(extended) = subst.extended(name.clone(), Value::Single(candidate)) else { continue };
                    let scaled = Multiset::from_iter_counted(std::iter::once(candidate)).scalar_mul(info.count);
                    next_states.push((extended, remaining.difference(&scaled)));
                }
            } else {
                let elements: Vec<(ExprId, usize)> = remaining.iter().map(|(&e, c)| (e, c)).collect();
                let caps: Vec<usize> = elements.iter().map(|&(_, c)| c / info.count).collect();
                for combo in capped_integer_vector_iter(&caps, info.min_count) {
                    let mut chosen = Multiset::new();
                    for (&(e, _), &k) in elements.iter().zip(&combo) {
                        if k > 0 {
                            chosen.insert(e, k);
                        }
                    }
                    let mut bound_seq: Vec<ExprId> = chosen.to_vec();
                    bound_seq.sort_by_key(|&e| (store.get(e).digest, e.0));
                    let Ok(extended) = subst.extended(name.clone(), Value::Sequence(bound_seq)) else { continue };
                    let scaled = chosen.scalar_mul(info.count);
                    next_states.push((extended, remaining.difference(&scaled)));
                }
            }
        }
        states = next_states;
    }

    // Anonymous fixed wildcards consume capacity without binding: remove
    // any `wildcard_fixed_count` items from what remains, arbitrarily but
    // deterministically (lowest digest first).
    states
        .into_iter()
        .filter_map(|(subst, remaining)| {
            if remaining.total() < wildcard_fixed_count {
                return None;
            }
            let mut items: Vec<ExprId> = remaining.to_vec();
            items.sort_by_key(|&e| (store.get(e).digest, e.0));
            let keep = items.split_off(wildcard_fixed_count.min(items.len()));
            Some((subst, Multiset::from_iter_counted(keep)))
        })
        .collect()
}

/// §4.4.3.d: partitions whatever is left among the named sequence
/// variables and, under associativity, any still-unresolved fixed
/// variables (which may then be re-wrapped into a fresh operation instance
/// if their partitioned value exceeds their declared arity).
#[allow(clippy::too_many_arguments)]
fn distribute_sequence_capacity(
    store: &mut Store,
    op_type: &Rc<str>,
    associative: bool,
    parts: &CommutativeParts,
    unresolved_fixed: &HashMap<Rc<str>, VarInfo>,
    remaining: &Multiset<ExprId>,
    subst: &Substitution,
) -> Result<Vec<Substitution>, MatchError> {
    // Anonymous sequence wildcards always demand capacity only; under
    // associativity an anonymous fixed wildcard's capacity is folded into
    // the same anonymous floor instead of being bound in `bind_fixed_variables`.
    let anon_floor = parts.wildcard_sequence_min + if associative { parts.wildcard_fixed_count } else { 0 };
    if remaining.total() < anon_floor {
        return Ok(Vec::new());
    }
    let mut items: Vec<ExprId> = remaining.to_vec();
    items.sort_by_key(|&e| (store.get(e).digest, e.0));
    let after_anon = Multiset::from_iter_counted(items.split_off(anon_floor.min(items.len())));

    let mut seq_names: Vec<&Rc<str>> = parts.sequence_variables.keys().collect();
    seq_names.sort();
    let mut slots: Vec<VariableSlot> = seq_names
        .iter()
        .map(|&name| VariableSlot {
            name: name.clone(),
            count: parts.sequence_variables[name].count,
            min_count: parts.sequence_variables[name].min_count,
        })
        .collect();

    let mut fixed_slot_names: Vec<Rc<str>> = Vec::new();
    if associative {
        let mut names: Vec<&Rc<str>> = unresolved_fixed.keys().collect();
        names.sort();
        for &name in &names {
            let info = &unresolved_fixed[name];
            slots.push(VariableSlot { name: name.clone(), count: info.count, min_count: info.min_count });
            fixed_slot_names.push(name.clone());
        }
    }

    if slots.is_empty() {
        return Ok(if after_anon.is_empty() { vec![subst.clone()] } else { vec![] });
    }

    let mut out = Vec::new();
    for partition in commutative_sequence_variable_partition_iter(&after_anon, &slots) {
        let mut candidate = subst.clone();
        let mut ok = true;
        for (slot, multiset) in slots.iter().zip(partition) {
            let mut bound: Vec<ExprId> = multiset.to_vec();
            bound.sort_by_key(|&e| (store.get(e).digest, e.0));

            let value = if fixed_slot_names.contains(&slot.name) {
                let ell = slot.min_count;
                if bound.len() > ell {
                    let wrapped = store.operation_from_args(op_type, associative, true, bound);
                    Value::Single(wrapped)
                } else if ell == 1 && bound.len() == 1 {
                    Value::Single(bound[0])
                } else {
                    Value::Sequence(bound)
                }
            } else {
                Value::Sequence(bound)
            };

            match candidate.extended(slot.name.clone(), value) {
                Ok(extended) => candidate = extended,
                Err(_) => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            out.push(candidate);
        }
    }
    Ok(out)
}
