//! Conditional content functions.
//!
//! Every content block whose visibility depends on preferences is compiled
//! to a [`ConditionalFunction`]: an expression tree over selection lookups,
//! a stable reference ID, and the cached boolean result. The client
//! re-resolves the functions after each selection change and toggles only
//! the blocks whose value flipped.
//!
//! Expressions use a call syntax:
//!
//! ```
//! use rw_prefs::{Condition, SelectionMap};
//!
//! let condition = Condition::parse(r#"and(equals($os, "linux"), not(equals($shell, "fish")))"#).unwrap();
//!
//! let mut selections = SelectionMap::new();
//! selections.insert("os".to_owned(), "linux".to_owned());
//! selections.insert("shell".to_owned(), "bash".to_owned());
//! assert!(condition.evaluate(&selections));
//! ```

mod parser;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::declaration::SelectionMap;

pub use parser::{ConditionParseError, MAX_NESTING_DEPTH};

/// Value produced while evaluating an expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// String literal or selected option identifier.
    Str(String),
    /// Boolean literal or comparison result.
    Bool(bool),
    /// Lookup of a preference with no selected value.
    Null,
}

impl Value {
    /// Truthiness used by `and`, `or`, `not` and the final result.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Bool(b) => *b,
            Self::Null => false,
        }
    }
}

/// Boolean expression tree over selection lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Constant value.
    Literal(Value),
    /// Current selection of a preference (`$identifier`).
    Variable(String),
    /// Strict equality of two operands.
    Equals(Box<Condition>, Box<Condition>),
    /// Strict inequality of two operands.
    NotEquals(Box<Condition>, Box<Condition>),
    /// True when every operand is truthy.
    And(Vec<Condition>),
    /// True when any operand is truthy.
    Or(Vec<Condition>),
    /// Negation.
    Not(Box<Condition>),
}

impl Condition {
    /// Parse an expression such as `equals($os, "linux")`.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionParseError`] describing the first syntax problem.
    pub fn parse(source: &str) -> Result<Self, ConditionParseError> {
        parser::parse(source)
    }

    /// Compute the expression's value for a selection.
    #[must_use]
    pub fn value(&self, selections: &SelectionMap) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Variable(name) => selections
                .get(name)
                .map_or(Value::Null, |v| Value::Str(v.clone())),
            Self::Equals(left, right) => {
                Value::Bool(left.value(selections) == right.value(selections))
            }
            Self::NotEquals(left, right) => {
                Value::Bool(left.value(selections) != right.value(selections))
            }
            Self::And(operands) => Value::Bool(operands.iter().all(|c| c.evaluate(selections))),
            Self::Or(operands) => Value::Bool(operands.iter().any(|c| c.evaluate(selections))),
            Self::Not(operand) => Value::Bool(!operand.evaluate(selections)),
        }
    }

    /// Evaluate to a boolean.
    #[must_use]
    pub fn evaluate(&self, selections: &SelectionMap) -> bool {
        self.value(selections).is_truthy()
    }

    /// Preference identifiers referenced anywhere in the expression.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Variable(name) => {
                names.insert(name);
            }
            Self::Equals(left, right) | Self::NotEquals(left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Self::And(operands) | Self::Or(operands) => {
                for operand in operands {
                    operand.collect_variables(names);
                }
            }
            Self::Not(operand) => operand.collect_variables(names),
        }
    }
}

/// A compiled condition with its reference ID and cached result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalFunction {
    /// Stable reference ID carried by the content block (`data-if`).
    pub reference: String,
    /// Expression tree.
    pub condition: Condition,
    /// Result for the selection it was last resolved against.
    pub value: bool,
}

impl ConditionalFunction {
    /// Compile a function and resolve it against a selection.
    #[must_use]
    pub fn new(reference: impl Into<String>, condition: Condition, selections: &SelectionMap) -> Self {
        let value = condition.evaluate(selections);
        Self {
            reference: reference.into(),
            condition,
            value,
        }
    }

    /// Recompute the cached value for a new selection.
    ///
    /// Pure: the caller compares `value` with the previous node's to find
    /// out whether visibility changed.
    #[must_use]
    pub fn reresolve(&self, selections: &SelectionMap) -> Self {
        Self {
            reference: self.reference.clone(),
            condition: self.condition.clone(),
            value: self.condition.evaluate(selections),
        }
    }
}
