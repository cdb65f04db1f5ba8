//! Typed symbolic variables with process-unique identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The domain a [`Variable`] ranges over.
///
/// The type is stamped into the high-order byte of the variable's identifier
/// at construction and recovered from there; it never participates in
/// equality or ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// Ranges over the reals.
    Continuous,
    /// Ranges over the integers.
    Integer,
    /// Ranges over `{0, 1}`.
    Binary,
    /// Ranges over `{true, false}`. Boolean variables belong to a formula
    /// layer and cannot appear inside an arithmetic expression.
    Boolean,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "Continuous"),
            Self::Integer => write!(f, "Integer"),
            Self::Binary => write!(f, "Binary"),
            Self::Boolean => write!(f, "Boolean"),
        }
    }
}

/// Returns the next unique variable identifier.
///
/// The counter is process-wide, starts at 1 and is never reset, so an
/// identifier is never reused within a process lifetime. The low 7 bytes
/// hold the counter value and the high byte holds the [`VariableType`] tag;
/// identifier 0 is reserved for the dummy variable.
fn next_id(var_type: VariableType) -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    let counter = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    counter | ((var_type as u64) << 56)
}

/// A named symbolic variable.
///
/// Equality, ordering and hashing are based solely on the identifier, never
/// on the name: two variables constructed with the same name are distinct,
/// and clones of one variable are equal. The name is shared, so cloning a
/// variable is cheap.
///
/// A default-constructed variable is the *dummy* variable: it has identifier
/// 0, prints as `dummy`, and is rejected anywhere a real variable is
/// required.
#[derive(Debug, Clone)]
pub struct Variable {
    id: u64,
    name: Option<Arc<str>>,
}

impl Variable {
    /// Creates a fresh [`VariableType::Continuous`] variable with the given
    /// name.
    pub fn new(name: &str) -> Self {
        Self::with_type(name, VariableType::Continuous)
    }

    /// Creates a fresh variable with the given name and type.
    pub fn with_type(name: &str, var_type: VariableType) -> Self {
        Self {
            id: next_id(var_type),
            name: Some(Arc::from(name)),
        }
    }

    /// Whether this is the dummy (default-constructed) variable.
    pub fn is_dummy(&self) -> bool {
        self.id == 0
    }

    /// The process-unique identifier of this variable.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The type of this variable, decoded from the identifier's high byte.
    pub fn var_type(&self) -> VariableType {
        match self.id >> 56 {
            0 => VariableType::Continuous,
            1 => VariableType::Integer,
            2 => VariableType::Binary,
            3 => VariableType::Boolean,
            tag => unreachable!("corrupt variable type tag {tag}"),
        }
    }

    /// The name of this variable; the dummy variable is named `dummy`.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("dummy")
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self { id: 0, name: None }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
