//! Arena + interner, generalized from a fixed CAS operator set to the four
//! generic node kinds an AC matcher needs: `Symbol`, `Wildcard`, `Variable`,
//! `Operation`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::substitution::Substitution;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Symbol,
    Wildcard,
    Variable,
    Operation,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Payload {
    Symbol { name: Rc<str>, symbol_type: Rc<str> },
    Wildcard { min_count: usize, fixed_size: bool, symbol_type: Option<Rc<str>> },
    Variable { name: Rc<str> },
    Operation { op_type: Rc<str>, associative: bool, commutative: bool },
}

/// A registered constraint: `Copy` handle into `Store::constraints`. Two
/// structurally identical nodes with different constraint ids intern to
/// distinct `ExprId`s, because `ConstraintId` participates in the
/// interning key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(usize);

#[derive(Clone, Debug)]
pub struct Node {
    pub op: Op,
    pub payload: Payload,
    pub constraint: Option<ConstraintId>,
    pub children: Vec<ExprId>,
    pub digest: u64,
}

#[derive(PartialEq, Eq, Hash)]
struct NodeKey {
    op: Op,
    payload: Payload,
    constraint: Option<ConstraintId>,
    children: Vec<ExprId>,
}

pub enum View<'a> {
    Symbol { name: &'a str, symbol_type: &'a str },
    Wildcard { min_count: usize, fixed_size: bool, symbol_type: Option<&'a str> },
    Variable { name: &'a str, inner: ExprId },
    Operation { op_type: &'a str, operands: &'a [ExprId], associative: bool, commutative: bool },
}

#[derive(Default)]
pub struct Store {
    nodes: Vec<Node>,
    interner: HashMap<NodeKey, ExprId>,
    constraints: Vec<Rc<dyn Fn(&Substitution) -> bool>>,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv_byte(h: u64, byte: u8) -> u64 {
    (h ^ byte as u64).wrapping_mul(FNV_PRIME)
}

fn fnv_bytes(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h = fnv_byte(h, b);
    }
    h
}

fn fnv_u64(h: u64, v: u64) -> u64 {
    fnv_bytes(h, &v.to_le_bytes())
}

fn fnv_str(h: u64, s: &str) -> u64 {
    fnv_bytes(h, s.as_bytes())
}

fn fnv_bool(h: u64, b: bool) -> u64 {
    fnv_byte(h, b as u8)
}

fn compute_digest(op: Op, payload: &Payload, constraint: Option<ConstraintId>, children: &[ExprId], nodes: &[Node]) -> u64 {
    let mut h = FNV_OFFSET;
    h = fnv_byte(
        h,
        match op {
            Op::Symbol => 0,
            Op::Wildcard => 1,
            Op::Variable => 2,
            Op::Operation => 3,
        },
    );
    match payload {
        Payload::Symbol { name, symbol_type } => {
            h = fnv_str(h, name);
            h = fnv_str(h, symbol_type);
        }
        Payload::Wildcard { min_count, fixed_size, symbol_type } => {
            h = fnv_u64(h, *min_count as u64);
            h = fnv_bool(h, *fixed_size);
            match symbol_type {
                Some(t) => {
                    h = fnv_byte(h, 1);
                    h = fnv_str(h, t);
                }
                None => h = fnv_byte(h, 0),
            }
        }
        Payload::Variable { name } => {
            h = fnv_str(h, name);
        }
        Payload::Operation { op_type, associative, commutative } => {
            h = fnv_str(h, op_type);
            h = fnv_bool(h, *associative);
            h = fnv_bool(h, *commutative);
        }
    }
    h = fnv_u64(h, constraint.map(|c| c.0 as u64 + 1).unwrap_or(0));
    for &child in children {
        h = fnv_u64(h, nodes[child.0].digest);
    }
    h
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ExprId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn view(&self, id: ExprId) -> View<'_> {
        let node = self.get(id);
        match (&node.op, &node.payload) {
            (Op::Symbol, Payload::Symbol { name, symbol_type }) => {
                View::Symbol { name, symbol_type }
            }
            (Op::Wildcard, Payload::Wildcard { min_count, fixed_size, symbol_type }) => {
                View::Wildcard {
                    min_count: *min_count,
                    fixed_size: *fixed_size,
                    symbol_type: symbol_type.as_deref(),
                }
            }
            (Op::Variable, Payload::Variable { name }) => {
                View::Variable { name, inner: node.children[0] }
            }
            (Op::Operation, Payload::Operation { op_type, associative, commutative }) => {
                View::Operation {
                    op_type,
                    operands: &node.children,
                    associative: *associative,
                    commutative: *commutative,
                }
            }
            _ => unreachable!("Node::op and Node::payload must agree"),
        }
    }

    fn intern(&mut self, op: Op, payload: Payload, constraint: Option<ConstraintId>, children: Vec<ExprId>) -> ExprId {
        let key = NodeKey { op, payload: payload.clone(), constraint, children: children.clone() };
        if let Some(&id) = self.interner.get(&key) {
            return id;
        }
        let digest = compute_digest(op, &payload, constraint, &children, &self.nodes);
        let id = ExprId(self.nodes.len());
        self.nodes.push(Node { op, payload, constraint, children, digest });
        self.interner.insert(key, id);
        id
    }

    pub fn symbol(&mut self, name: impl Into<Rc<str>>, symbol_type: impl Into<Rc<str>>, constraint: Option<ConstraintId>) -> ExprId {
        self.intern(Op::Symbol, Payload::Symbol { name: name.into(), symbol_type: symbol_type.into() }, constraint, vec![])
    }

    pub fn wildcard(&mut self, min_count: usize, fixed_size: bool, symbol_type: Option<Rc<str>>, constraint: Option<ConstraintId>) -> ExprId {
        self.intern(Op::Wildcard, Payload::Wildcard { min_count, fixed_size, symbol_type }, constraint, vec![])
    }

    /// `inner` must be a `Wildcard` node (the invariant from the data model: a
    /// `Variable` always wraps a `Wildcard`).
    pub fn variable(&mut self, name: impl Into<Rc<str>>, inner: ExprId, constraint: Option<ConstraintId>) -> ExprId {
        assert!(
            matches!(self.get(inner).op, Op::Wildcard),
            "Variable must wrap a Wildcard node"
        );
        self.intern(Op::Variable, Payload::Variable { name: name.into() }, constraint, vec![inner])
    }

    pub fn operation(
        &mut self,
        op_type: impl Into<Rc<str>>,
        operands: Vec<ExprId>,
        associative: bool,
        commutative: bool,
        constraint: Option<ConstraintId>,
    ) -> ExprId {
        self.intern(
            Op::Operation,
            Payload::Operation { op_type: op_type.into(), associative, commutative },
            constraint,
            operands,
        )
    }

    /// The "from-args" constructor §4.3 step 4 and §4.4.3.d need to re-wrap
    /// surplus operands under a fresh instance of the same operator, with no
    /// constraint of its own.
    pub fn operation_from_args(&mut self, op_type: &Rc<str>, associative: bool, commutative: bool, operands: Vec<ExprId>) -> ExprId {
        self.operation(op_type.clone(), operands, associative, commutative, None)
    }

    pub fn add_constraint<F: Fn(&Substitution) -> bool + 'static>(&mut self, f: F) -> ConstraintId {
        self.constraints.push(Rc::new(f));
        ConstraintId(self.constraints.len() - 1)
    }

    pub fn check_constraint(&self, id: Option<ConstraintId>, subst: &Substitution) -> bool {
        match id {
            None => true,
            Some(cid) => (self.constraints[cid.0])(subst),
        }
    }

    /// Null-safe conjunction: `None` if every input is `None`, the single
    /// non-null input if exactly one, else a freshly registered constraint
    /// that short-circuits on the first `false`.
    pub fn combine_constraints(&mut self, ids: &[Option<ConstraintId>]) -> Option<ConstraintId> {
        let present: Vec<ConstraintId> = ids.iter().filter_map(|c| *c).collect();
        match present.len() {
            0 => None,
            1 => Some(present[0]),
            _ => {
                let fns: Vec<Rc<dyn Fn(&Substitution) -> bool>> =
                    present.iter().map(|c| self.constraints[c.0].clone()).collect();
                Some(self.add_constraint(move |s| fns.iter().all(|f| f(s))))
            }
        }
    }

    /// The operator identity of an expression, used to group commutative
    /// sub-matcher candidates by head (§4.4.3.b). Leaves have no head.
    pub fn head(&self, id: ExprId) -> Option<&Rc<str>> {
        match &self.get(id).payload {
            Payload::Operation { op_type, .. } => Some(op_type),
            _ => None,
        }
    }
}

/// No variables or wildcards anywhere in the tree.
pub fn is_constant(store: &Store, id: ExprId) -> bool {
    match store.view(id) {
        View::Symbol { .. } => true,
        View::Wildcard { .. } | View::Variable { .. } => false,
        View::Operation { operands, .. } => operands.iter().all(|&o| is_constant(store, o)),
    }
}

/// No nested associative/commutative operation and no sequence
/// wildcards/variables anywhere in the tree.
pub fn is_syntactic(store: &Store, id: ExprId) -> bool {
    match store.view(id) {
        View::Symbol { .. } => true,
        View::Wildcard { fixed_size, .. } => fixed_size,
        View::Variable { inner, .. } => match store.view(inner) {
            View::Wildcard { fixed_size, .. } => fixed_size,
            _ => unreachable!("Variable must wrap a Wildcard"),
        },
        View::Operation { operands, associative, commutative, .. } => {
            if associative || commutative {
                return false;
            }
            operands.iter().all(|&o| is_syntactic(store, o))
        }
    }
}
