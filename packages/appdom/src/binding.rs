//! Bindable values: the tagged unions stored in node property bags.
//!
//! A bindable is either a literal constant, a script expression evaluated
//! later by the (external) runtime, a secret, or an action. The wire shape
//! is `{ "type": "...", "value": ... }` and must stay stable -- it is the
//! contract with persistence and with connector plugins, whose query
//! payloads round-trip through `Const` untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum BindableValue {
    /// Literal JSON value, used as-is.
    Const(Value),
    /// Script expression, evaluated against the page scope.
    JsExpression(String),
    /// Script expression run for its side effects (event handlers).
    JsExpressionAction(String),
    /// Secret payload. Never crosses the render-tree trust boundary.
    Secret(Value),
    /// Declarative navigation to another page.
    NavigationAction(Value),
}

impl BindableValue {
    /// Shorthand for a constant binding.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Const(value.into())
    }

    /// Shorthand for an expression binding.
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::JsExpression(expr.into())
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// The constant payload, if this is a `Const` binding.
    pub fn as_const(&self) -> Option<&Value> {
        match self {
            Self::Const(value) => Some(value),
            _ => None,
        }
    }
}
