//! Embedded client payload.
//!
//! Everything the client needs to rehydrate a page: the narrowed catalog,
//! the page's declarations, the selection the page was rendered with, and
//! the compiled conditional functions keyed by reference.
//!
//! The payload is embedded in every page, so it is serialized in a minified
//! form with single-letter keys. [`ClientPayload::compress`] and
//! [`MinifiedPayload::expand`] convert between the two without loss.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::condition::{Condition, ConditionalFunction, Value};
use crate::declaration::{PrefDeclaration, SelectionMap};
use crate::error::PrefsError;
use crate::option_set::{OptionSet, OptionSetCatalog, PrefOption};

/// In-memory client payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientPayload {
    /// Catalog narrowed to the sets reachable from the page.
    pub catalog: OptionSetCatalog,
    /// Ordered page preference declarations.
    pub declarations: Vec<PrefDeclaration>,
    /// Selection the page was rendered with.
    pub selections: SelectionMap,
    /// Conditional functions keyed by reference ID.
    pub functions: BTreeMap<String, ConditionalFunction>,
}

impl ClientPayload {
    /// Convert to the minified wire form.
    #[must_use]
    pub fn compress(&self) -> MinifiedPayload {
        MinifiedPayload {
            catalog: self
                .catalog
                .iter()
                .map(|(id, options)| (id.to_owned(), options.iter().map(MinifiedOption::from).collect()))
                .collect(),
            declarations: self
                .declarations
                .iter()
                .map(MinifiedDeclaration::from)
                .collect(),
            selections: self.selections.clone(),
            functions: self.functions.values().map(MinifiedFunction::from).collect(),
        }
    }

    /// Serialize as minified JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Payload`] if serialization fails.
    pub fn to_json(&self) -> Result<String, PrefsError> {
        Ok(serde_json::to_string(&self.compress())?)
    }

    /// Decode minified JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Payload`] for malformed JSON and
    /// [`PrefsError::Validation`] for inconsistent content.
    pub fn from_json(json: &str) -> Result<Self, PrefsError> {
        let minified: MinifiedPayload = serde_json::from_str(json)?;
        minified.expand()
    }
}

/// Minified wire form of [`ClientPayload`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifiedPayload {
    #[serde(rename = "c", default)]
    catalog: BTreeMap<String, Vec<MinifiedOption>>,
    #[serde(rename = "p", default)]
    declarations: Vec<MinifiedDeclaration>,
    #[serde(rename = "s", default)]
    selections: SelectionMap,
    #[serde(rename = "f", default)]
    functions: Vec<MinifiedFunction>,
}

impl MinifiedPayload {
    /// Expand back into the in-memory form.
    ///
    /// Option sets are re-validated and function references must be unique.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Validation`] if the payload is inconsistent.
    pub fn expand(self) -> Result<ClientPayload, PrefsError> {
        let mut catalog = OptionSetCatalog::new();
        for (id, options) in self.catalog {
            let options: OptionSet = options.into_iter().map(PrefOption::from).collect();
            catalog.insert(id, options)?;
        }

        let mut functions = BTreeMap::new();
        for function in self.functions {
            let function = ConditionalFunction::from(function);
            if functions.contains_key(&function.reference) {
                return Err(PrefsError::Validation(format!(
                    "conditional function '{}' appears more than once in the payload",
                    function.reference
                )));
            }
            functions.insert(function.reference.clone(), function);
        }

        Ok(ClientPayload {
            catalog,
            declarations: self
                .declarations
                .into_iter()
                .map(PrefDeclaration::from)
                .collect(),
            selections: self.selections,
            functions,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct MinifiedOption {
    i: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    d: bool,
}

impl From<&PrefOption> for MinifiedOption {
    fn from(option: &PrefOption) -> Self {
        Self {
            i: option.identifier.clone(),
            n: option.display_name.clone(),
            d: option.default,
        }
    }
}

impl From<MinifiedOption> for PrefOption {
    fn from(option: MinifiedOption) -> Self {
        Self {
            identifier: option.i,
            display_name: option.n,
            default: option.d,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct MinifiedDeclaration {
    i: String,
    s: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
}

impl From<&PrefDeclaration> for MinifiedDeclaration {
    fn from(declaration: &PrefDeclaration) -> Self {
        Self {
            i: declaration.identifier.clone(),
            s: declaration.options_source.clone(),
            n: declaration.display_name.clone(),
            d: declaration.default_value.clone(),
        }
    }
}

impl From<MinifiedDeclaration> for PrefDeclaration {
    fn from(declaration: MinifiedDeclaration) -> Self {
        Self {
            identifier: declaration.i,
            options_source: declaration.s,
            display_name: declaration.n,
            default_value: declaration.d,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct MinifiedFunction {
    r: String,
    v: bool,
    e: MinifiedExpr,
}

impl From<&ConditionalFunction> for MinifiedFunction {
    fn from(function: &ConditionalFunction) -> Self {
        Self {
            r: function.reference.clone(),
            v: function.value,
            e: MinifiedExpr::from(&function.condition),
        }
    }
}

impl From<MinifiedFunction> for ConditionalFunction {
    fn from(function: MinifiedFunction) -> Self {
        Self {
            reference: function.r,
            condition: Condition::from(function.e),
            value: function.v,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum MinifiedExpr {
    #[serde(rename = "s")]
    Str(String),
    #[serde(rename = "b")]
    Bool(bool),
    #[serde(rename = "n")]
    Null,
    #[serde(rename = "v")]
    Var(String),
    #[serde(rename = "eq")]
    Eq(Box<MinifiedExpr>, Box<MinifiedExpr>),
    #[serde(rename = "ne")]
    Ne(Box<MinifiedExpr>, Box<MinifiedExpr>),
    #[serde(rename = "and")]
    And(Vec<MinifiedExpr>),
    #[serde(rename = "or")]
    Or(Vec<MinifiedExpr>),
    #[serde(rename = "not")]
    Not(Box<MinifiedExpr>),
}

impl From<&Condition> for MinifiedExpr {
    fn from(condition: &Condition) -> Self {
        let pair = |l: &Condition, r: &Condition| (Box::new(Self::from(l)), Box::new(Self::from(r)));
        match condition {
            Condition::Literal(Value::Str(s)) => Self::Str(s.clone()),
            Condition::Literal(Value::Bool(b)) => Self::Bool(*b),
            Condition::Literal(Value::Null) => Self::Null,
            Condition::Variable(name) => Self::Var(name.clone()),
            Condition::Equals(l, r) => {
                let (l, r) = pair(l, r);
                Self::Eq(l, r)
            }
            Condition::NotEquals(l, r) => {
                let (l, r) = pair(l, r);
                Self::Ne(l, r)
            }
            Condition::And(operands) => Self::And(operands.iter().map(Self::from).collect()),
            Condition::Or(operands) => Self::Or(operands.iter().map(Self::from).collect()),
            Condition::Not(operand) => Self::Not(Box::new(Self::from(operand.as_ref()))),
        }
    }
}

impl From<MinifiedExpr> for Condition {
    fn from(expr: MinifiedExpr) -> Self {
        let boxed = |e: Box<MinifiedExpr>| Box::new(Self::from(*e));
        match expr {
            MinifiedExpr::Str(s) => Self::Literal(Value::Str(s)),
            MinifiedExpr::Bool(b) => Self::Literal(Value::Bool(b)),
            MinifiedExpr::Null => Self::Literal(Value::Null),
            MinifiedExpr::Var(name) => Self::Variable(name),
            MinifiedExpr::Eq(l, r) => Self::Equals(boxed(l), boxed(r)),
            MinifiedExpr::Ne(l, r) => Self::NotEquals(boxed(l), boxed(r)),
            MinifiedExpr::And(operands) => Self::And(operands.into_iter().map(Self::from).collect()),
            MinifiedExpr::Or(operands) => Self::Or(operands.into_iter().map(Self::from).collect()),
            MinifiedExpr::Not(operand) => Self::Not(boxed(operand)),
        }
    }
}
