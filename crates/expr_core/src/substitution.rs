//! Substitution map: variable name -> bound value, where a value is either
//! a single expression (fixed wildcard / plain variable) or a sequence of
//! expressions (sequence wildcard).

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::store::ExprId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Single(ExprId),
    Sequence(Vec<ExprId>),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Substitution {
    bindings: BTreeMap<Rc<str>, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubstitutionError {
    Conflict(Rc<str>),
}

impl fmt::Display for SubstitutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstitutionError::Conflict(name) => {
                write!(f, "conflicting bindings for variable `{name}`")
            }
        }
    }
}

impl std::error::Error for SubstitutionError {}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.bindings.iter()
    }

    /// Insert `name -> value`, or confirm the existing binding is identical.
    /// A differing existing binding is a conflict, not an overwrite.
    pub fn extend(&mut self, name: Rc<str>, value: Value) -> Result<(), SubstitutionError> {
        match self.bindings.get(&name) {
            None => {
                self.bindings.insert(name, value);
                Ok(())
            }
            Some(existing) if *existing == value => Ok(()),
            Some(_) => Err(SubstitutionError::Conflict(name)),
        }
    }

    /// `extend` on a clone, for the common backtracking pattern of trying a
    /// binding without mutating the substitution being branched from.
    pub fn extended(&self, name: Rc<str>, value: Value) -> Result<Self, SubstitutionError> {
        let mut next = self.clone();
        next.extend(name, value)?;
        Ok(next)
    }

    /// Merge `other` into a copy of `self`, failing on the first conflicting
    /// key between the two maps.
    pub fn union(&self, other: &Substitution) -> Result<Self, SubstitutionError> {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.extend(name.clone(), value.clone())?;
        }
        Ok(merged)
    }
}
