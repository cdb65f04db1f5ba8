//! The closed set of tree node kinds and the cell that carries them.
//!
//! A cell is one immutable node of an expression tree: the node payload plus
//! the derived state every node carries, namely whether the subtree is a
//! polynomial (computed at construction), whether it is already in expanded
//! form (a conservative, monotonic flag), and the free-variable set (computed
//! once on first demand). Cells are only ever created by the canonicalizing
//! builders and the crate-private constructors on
//! [`Expression`](crate::Expression), which is what upholds the canonical
//! form invariants: no nested sums inside a sum, no duplicate keys in a
//! canonical map, no degenerate node a builder would have collapsed.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::unsync::OnceCell;

use crate::scalar::Scalar;
use crate::variable::Variable;
use crate::variables::Variables;

use super::Expression;

/// The kind of an expression node.
///
/// The variant order is the major key of the total structural order over
/// expressions, so it is load-bearing: canonical maps inside sums and
/// products are keyed by that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpressionKind {
    /// A constant value.
    Constant,
    /// A variable.
    Var,
    /// A flattened sum: `constant + Σ coefficient * term`.
    Add,
    /// A flattened product: `constant * Π base^exponent`.
    Mul,
    /// A binary power.
    Pow,
    /// A binary division.
    Div,
    /// Not-a-number; poisons evaluation, substitution and expansion.
    NaN,
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant => write!(f, "Constant"),
            Self::Var => write!(f, "Var"),
            Self::Add => write!(f, "Add"),
            Self::Mul => write!(f, "Mul"),
            Self::Pow => write!(f, "Pow"),
            Self::Div => write!(f, "Div"),
            Self::NaN => write!(f, "NaN"),
        }
    }
}

/// The payload of one expression node.
#[derive(Debug)]
pub(crate) enum ExpressionNode<T> {
    /// A constant. The value is never numerically NaN; building an
    /// expression from a NaN value yields the [`ExpressionNode::NaN`] node
    /// instead.
    Constant(T),
    /// A variable occurrence. Never the dummy and never Boolean-typed.
    Var(Variable),
    /// `constant + Σ coefficient * term`, terms keyed in structural order.
    /// No key is itself an `Add` and no coefficient is zero.
    Add {
        constant: T,
        terms: BTreeMap<Expression<T>, T>,
    },
    /// `constant * Π base^exponent`, bases keyed in structural order. The
    /// constant is never zero and no exponent is the constant zero.
    Mul {
        constant: T,
        factors: BTreeMap<Expression<T>, Expression<T>>,
    },
    /// `base ^ exponent`. The exponent is never the constant zero or one.
    Pow {
        base: Expression<T>,
        exponent: Expression<T>,
    },
    /// `numerator / denominator`.
    Div {
        numerator: Expression<T>,
        denominator: Expression<T>,
    },
    /// Not-a-number.
    NaN,
}

impl<T: Scalar> ExpressionNode<T> {
    pub(crate) fn kind(&self) -> ExpressionKind {
        match self {
            Self::Constant(_) => ExpressionKind::Constant,
            Self::Var(_) => ExpressionKind::Var,
            Self::Add { .. } => ExpressionKind::Add,
            Self::Mul { .. } => ExpressionKind::Mul,
            Self::Pow { .. } => ExpressionKind::Pow,
            Self::Div { .. } => ExpressionKind::Div,
            Self::NaN => ExpressionKind::NaN,
        }
    }

    /// The total structural order: kind first, then payload. Two NaN nodes
    /// compare equal: this is tree-shape equality, not IEEE semantics, and
    /// it is what keeps the order total and usable as a map key.
    pub(crate) fn structural_cmp(&self, other: &Self) -> Ordering {
        let by_kind = self.kind().cmp(&other.kind());
        if by_kind != Ordering::Equal {
            return by_kind;
        }
        match (self, other) {
            (Self::Constant(a), Self::Constant(b)) => a.total_cmp(b),
            (Self::Var(a), Self::Var(b)) => a.cmp(b),
            (
                Self::Add {
                    constant: c1,
                    terms: t1,
                },
                Self::Add {
                    constant: c2,
                    terms: t2,
                },
            ) => c1.total_cmp(c2).then_with(|| cmp_term_maps(t1, t2)),
            (
                Self::Mul {
                    constant: c1,
                    factors: f1,
                },
                Self::Mul {
                    constant: c2,
                    factors: f2,
                },
            ) => c1.total_cmp(c2).then_with(|| cmp_factor_maps(f1, f2)),
            (
                Self::Pow {
                    base: b1,
                    exponent: e1,
                },
                Self::Pow {
                    base: b2,
                    exponent: e2,
                },
            ) => b1.cmp(b2).then_with(|| e1.cmp(e2)),
            (
                Self::Div {
                    numerator: n1,
                    denominator: d1,
                },
                Self::Div {
                    numerator: n2,
                    denominator: d2,
                },
            ) => n1.cmp(n2).then_with(|| d1.cmp(d2)),
            (Self::NaN, Self::NaN) => Ordering::Equal,
            _ => unreachable!("kinds already compared equal"),
        }
    }

    pub(crate) fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Constant(v) => v.hash(state),
            Self::Var(var) => var.hash(state),
            Self::Add { constant, terms } => {
                constant.hash(state);
                for (term, coeff) in terms {
                    term.hash(state);
                    coeff.hash(state);
                }
            }
            Self::Mul { constant, factors } => {
                constant.hash(state);
                for (base, exponent) in factors {
                    base.hash(state);
                    exponent.hash(state);
                }
            }
            Self::Pow { base, exponent } => {
                base.hash(state);
                exponent.hash(state);
            }
            Self::Div {
                numerator,
                denominator,
            } => {
                numerator.hash(state);
                denominator.hash(state);
            }
            Self::NaN => {}
        }
    }
}

fn cmp_term_maps<T: Scalar>(
    a: &BTreeMap<Expression<T>, T>,
    b: &BTreeMap<Expression<T>, T>,
) -> Ordering {
    for ((t1, c1), (t2, c2)) in a.iter().zip(b.iter()) {
        let by_term = t1.cmp(t2);
        if by_term != Ordering::Equal {
            return by_term;
        }
        let by_coeff = c1.total_cmp(c2);
        if by_coeff != Ordering::Equal {
            return by_coeff;
        }
    }
    a.len().cmp(&b.len())
}

fn cmp_factor_maps<T: Scalar>(
    a: &BTreeMap<Expression<T>, Expression<T>>,
    b: &BTreeMap<Expression<T>, Expression<T>>,
) -> Ordering {
    for ((b1, e1), (b2, e2)) in a.iter().zip(b.iter()) {
        let by_base = b1.cmp(b2);
        if by_base != Ordering::Equal {
            return by_base;
        }
        let by_exponent = e1.cmp(e2);
        if by_exponent != Ordering::Equal {
            return by_exponent;
        }
    }
    a.len().cmp(&b.len())
}

fn is_nonnegative_integer_constant<T: Scalar>(e: &Expression<T>) -> bool {
    e.value()
        .is_some_and(|v| v.is_integer() && !(*v < T::zero()))
}

fn is_positive_integer_constant<T: Scalar>(e: &Expression<T>) -> bool {
    e.value().is_some_and(|v| v.is_integer() && *v > T::zero())
}

/// One immutable tree node together with its derived state.
#[derive(Debug)]
pub(crate) struct ExpressionCell<T> {
    node: ExpressionNode<T>,
    polynomial: bool,
    expanded: Cell<bool>,
    variables: OnceCell<Variables>,
}

impl<T: Scalar> ExpressionCell<T> {
    pub(crate) fn new(node: ExpressionNode<T>) -> Self {
        let polynomial = Self::compute_polynomial(&node);
        let expanded = Self::compute_expanded(&node);
        Self {
            node,
            polynomial,
            expanded: Cell::new(expanded),
            variables: OnceCell::new(),
        }
    }

    pub(crate) fn node(&self) -> &ExpressionNode<T> {
        &self.node
    }

    /// The constant payload, mutably; used only for the sole-owner constant
    /// folding fast path. A constant's derived state does not depend on its
    /// value, so mutating it needs no invalidation.
    pub(crate) fn constant_value_mut(&mut self) -> Option<&mut T> {
        match &mut self.node {
            ExpressionNode::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn is_polynomial(&self) -> bool {
        self.polynomial
    }

    pub(crate) fn is_expanded(&self) -> bool {
        self.expanded.get()
    }

    /// Marks the cell as expanded. The flag is monotonic; it is only ever
    /// raised, by `expand` itself, once a canonical form has been reached.
    pub(crate) fn set_expanded(&self) {
        self.expanded.set(true);
    }

    pub(crate) fn variables(&self) -> &Variables {
        self.variables.get_or_init(|| match &self.node {
            ExpressionNode::Constant(_) | ExpressionNode::NaN => Variables::new(),
            ExpressionNode::Var(var) => [var.clone()].into_iter().collect(),
            ExpressionNode::Add { terms, .. } => {
                let mut vars = Variables::new();
                for term in terms.keys() {
                    vars.insert_all(term.variables());
                }
                vars
            }
            ExpressionNode::Mul { factors, .. } => {
                let mut vars = Variables::new();
                for (base, exponent) in factors {
                    vars.insert_all(base.variables());
                    vars.insert_all(exponent.variables());
                }
                vars
            }
            ExpressionNode::Pow { base, exponent } => {
                let mut vars = base.variables().clone();
                vars.insert_all(exponent.variables());
                vars
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => {
                let mut vars = numerator.variables().clone();
                vars.insert_all(denominator.variables());
                vars
            }
        })
    }

    fn compute_polynomial(node: &ExpressionNode<T>) -> bool {
        match node {
            ExpressionNode::Constant(_) | ExpressionNode::Var(_) => true,
            ExpressionNode::NaN => false,
            ExpressionNode::Add { terms, .. } => terms.keys().all(Expression::is_polynomial),
            ExpressionNode::Mul { factors, .. } => factors
                .iter()
                .all(|(base, exponent)| {
                    base.is_polynomial() && is_nonnegative_integer_constant(exponent)
                }),
            ExpressionNode::Pow { base, exponent } => {
                base.is_polynomial() && is_nonnegative_integer_constant(exponent)
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => numerator.is_polynomial() && denominator.is_constant(),
        }
    }

    /// Conservative: `false` never means "not expanded", only "expand must
    /// look at this node". `true` must be exact, because `expand` trusts it
    /// and returns the same handle.
    fn compute_expanded(node: &ExpressionNode<T>) -> bool {
        match node {
            ExpressionNode::Constant(_) | ExpressionNode::Var(_) => true,
            // born unexpanded so that expanding it reaches the NaN error
            ExpressionNode::NaN => false,
            // a sum is expanded unless a term still needs distributing: a
            // coefficient over an Add key (from the scaled-product merge)
            ExpressionNode::Add { terms, .. } => terms
                .keys()
                .all(|term| term.is_expanded() && !term.is_addition()),
            ExpressionNode::Mul { factors, .. } => factors.iter().all(|(base, exponent)| {
                base.is_expanded()
                    && exponent.is_expanded()
                    && !base.is_multiplication()
                    && !(base.is_addition() && is_positive_integer_constant(exponent))
            }),
            ExpressionNode::Pow { base, exponent } => {
                base.is_expanded()
                    && exponent.is_expanded()
                    && !base.is_addition()
                    && !base.is_multiplication()
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => {
                numerator.is_expanded()
                    && denominator.is_expanded()
                    && !(T::FRACTIONAL && denominator.is_constant())
            }
        }
    }
}
