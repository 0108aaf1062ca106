#![deny(warnings)]
//! expr_core: minimal arena-backed, hash-consed expression kernel.
//!
//! This is the concrete realization of the "expression/symbol/operation"
//! collaborator that a many-to-one AC term matcher is built against: four
//! node kinds (`Symbol`, `Wildcard`, `Variable`, `Operation`), interned into
//! a `Store` so that structurally equal expressions share one `ExprId`, plus
//! a `Substitution` map and a small constraint registry.
//!
//! Nothing here knows about arithmetic, parsing, or printing — those belong
//! to a higher layer that isn't part of this crate.

mod store;
mod substitution;

pub use store::{
    is_constant, is_syntactic, ConstraintId, ExprId, Node, Op, Payload, Store, View,
};
pub use substitution::{Substitution, SubstitutionError, Value};
