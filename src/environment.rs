//! Variable-to-value bindings used for evaluation and substitution.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;
use crate::scalar::Scalar;
use crate::variable::Variable;
use crate::variables::Variables;

/// A mapping from [`Variable`] to a numeric value.
///
/// An environment never binds the dummy variable and never binds a variable
/// to NaN; both insert paths enforce this. Iteration is in identifier order.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment<T> {
    map: BTreeMap<Variable, T>,
}

impl<T> Default for Environment<T> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<T: Scalar> Environment<T> {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment from `(variable, value)` pairs. Later pairs
    /// overwrite earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Variable, T)>) -> Result<Self, Error> {
        let mut env = Self::new();
        for (var, value) in pairs {
            env.insert_or_assign(var, value)?;
        }
        Ok(env)
    }

    /// Builds an environment binding every listed variable to zero.
    pub fn from_variables(vars: impl IntoIterator<Item = Variable>) -> Result<Self, Error> {
        let mut env = Self::new();
        for var in vars {
            env.insert(var, T::zero())?;
        }
        Ok(env)
    }

    fn check(key: &Variable, value: &T) -> Result<(), Error> {
        if key.is_dummy() {
            return Err(Error::DummyVariable);
        }
        if value.is_nan() {
            return Err(Error::NanValue(key.name().to_string()));
        }
        Ok(())
    }

    /// Binds `key` to `value` if `key` is not already bound; an existing
    /// binding is left untouched.
    pub fn insert(&mut self, key: Variable, value: T) -> Result<(), Error> {
        Self::check(&key, &value)?;
        self.map.entry(key).or_insert(value);
        Ok(())
    }

    /// Binds `key` to `value`, overwriting any existing binding.
    pub fn insert_or_assign(&mut self, key: Variable, value: T) -> Result<(), Error> {
        Self::check(&key, &value)?;
        self.map.insert(key, value);
        Ok(())
    }

    /// The value bound to `key`, if any.
    pub fn get(&self, key: &Variable) -> Option<&T> {
        self.map.get(key)
    }

    /// The value bound to `key`, or [`Error::UnboundVariable`].
    pub fn at(&self, key: &Variable) -> Result<&T, Error> {
        self.get(key)
            .ok_or_else(|| Error::UnboundVariable(key.name().to_string()))
    }

    /// Whether `key` is bound.
    pub fn contains(&self, key: &Variable) -> bool {
        self.map.contains_key(key)
    }

    /// The number of bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the environment holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The set of bound variables.
    pub fn domain(&self) -> Variables {
        self.map.keys().cloned().collect()
    }

    /// Iterates over the bindings in identifier order.
    pub fn iter(&self) -> btree_map::Iter<'_, Variable, T> {
        self.map.iter()
    }
}

impl<'a, T> IntoIterator for &'a Environment<T> {
    type Item = (&'a Variable, &'a T);
    type IntoIter = btree_map::Iter<'a, Variable, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

impl<T: Scalar> fmt::Display for Environment<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (var, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} -> {value}")?;
        }
        Ok(())
    }
}
