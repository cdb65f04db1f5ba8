//! An ordered, duplicate-free collection of variables with set algebra.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::variable::Variable;

/// An ordered set of [`Variable`]s.
///
/// The set is ordered by variable identifier. Besides the usual set
/// operations it offers union and difference through `+`/`-` operator sugar
/// and subset/superset predicates, which is what the free-variable queries on
/// expressions are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variables {
    vars: BTreeSet<Variable>,
}

impl Variables {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of variables in the set.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Inserts a variable. Returns whether the variable was newly inserted.
    pub fn insert(&mut self, var: Variable) -> bool {
        debug_assert!(!var.is_dummy(), "dummy variable in a variable set");
        self.vars.insert(var)
    }

    /// Inserts every variable of `other`.
    pub fn insert_all(&mut self, other: &Variables) {
        self.vars.extend(other.iter().cloned());
    }

    /// Removes a variable. Returns whether the variable was present.
    pub fn remove(&mut self, var: &Variable) -> bool {
        self.vars.remove(var)
    }

    /// Whether the set contains `var`.
    pub fn contains(&self, var: &Variable) -> bool {
        self.vars.contains(var)
    }

    /// Iterates over the variables in identifier order.
    pub fn iter(&self) -> btree_set::Iter<'_, Variable> {
        self.vars.iter()
    }

    /// Whether every variable of `self` is in `other`.
    pub fn is_subset_of(&self, other: &Variables) -> bool {
        self.vars.is_subset(&other.vars)
    }

    /// Whether every variable of `other` is in `self`.
    pub fn is_superset_of(&self, other: &Variables) -> bool {
        self.vars.is_superset(&other.vars)
    }

    /// Whether `self` is a subset of `other` and not equal to it.
    pub fn is_strict_subset_of(&self, other: &Variables) -> bool {
        self.is_subset_of(other) && self != other
    }

    /// Whether `self` is a superset of `other` and not equal to it.
    pub fn is_strict_superset_of(&self, other: &Variables) -> bool {
        self.is_superset_of(other) && self != other
    }

    /// The set of variables present in both `self` and `other`.
    pub fn intersect(&self, other: &Variables) -> Variables {
        Variables {
            vars: self.vars.intersection(&other.vars).cloned().collect(),
        }
    }
}

impl FromIterator<Variable> for Variables {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        Variables {
            vars: iter.into_iter().collect(),
        }
    }
}

impl Extend<Variable> for Variables {
    fn extend<I: IntoIterator<Item = Variable>>(&mut self, iter: I) {
        self.vars.extend(iter);
    }
}

impl IntoIterator for Variables {
    type Item = Variable;
    type IntoIter = btree_set::IntoIter<Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

impl<'a> IntoIterator for &'a Variables {
    type Item = &'a Variable;
    type IntoIter = btree_set::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl AddAssign<Variable> for Variables {
    fn add_assign(&mut self, var: Variable) {
        self.insert(var);
    }
}

impl AddAssign<&Variables> for Variables {
    fn add_assign(&mut self, other: &Variables) {
        self.insert_all(other);
    }
}

impl SubAssign<&Variable> for Variables {
    fn sub_assign(&mut self, var: &Variable) {
        self.remove(var);
    }
}

impl SubAssign<&Variables> for Variables {
    fn sub_assign(&mut self, other: &Variables) {
        for var in other {
            self.remove(var);
        }
    }
}

impl Add<Variable> for Variables {
    type Output = Variables;

    fn add(mut self, var: Variable) -> Variables {
        self += var;
        self
    }
}

impl Add<&Variables> for Variables {
    type Output = Variables;

    fn add(mut self, other: &Variables) -> Variables {
        self += other;
        self
    }
}

impl Sub<&Variable> for Variables {
    type Output = Variables;

    fn sub(mut self, var: &Variable) -> Variables {
        self -= var;
        self
    }
}

impl Sub<&Variables> for Variables {
    type Output = Variables;

    fn sub(mut self, other: &Variables) -> Variables {
        self -= other;
        self
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, var) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}")?;
        }
        write!(f, "}}")
    }
}
