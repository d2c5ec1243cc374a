//! Expression graph nodes and their wire encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A node of a remote computation graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Literal JSON value.
    Constant(serde_json::Value),
    /// Call of a named server-side algorithm.
    Invocation {
        function: String,
        arguments: BTreeMap<String, Value>,
    },
    Array(Vec<Value>),
    Dictionary(BTreeMap<String, Value>),
    /// Reference to a parameter of the enclosing [`Value::Function`].
    Argument(String),
    /// Anonymous function, e.g. the body of a collection `map`.
    Function {
        parameters: Vec<String>,
        body: Box<Value>,
    },
}

impl Value {
    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Value::Constant(value.into())
    }

    /// Invoke `function` with named arguments.
    pub fn invoke<I, K>(function: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Invocation {
            function: function.to_string(),
            arguments: arguments.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Array of string constants.
    pub fn strings(items: &[&str]) -> Self {
        Value::Array(items.iter().map(|s| Value::constant(*s)).collect())
    }

    /// Name of the invoked function, if this node is an invocation.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Value::Invocation { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Argument of an invocation node.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Invocation { arguments, .. } => arguments.get(name),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::constant(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::constant(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::constant(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::constant(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::constant(v)
    }
}

/// Serialized graph: a table of value nodes plus the id of the result node.
///
/// Function bodies are hoisted into `values` and referenced by id, every
/// other node is nested inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, serde_json::Value>,
}

impl Expression {
    pub fn new(root: &Value) -> Self {
        let mut encoder = Encoder {
            values: BTreeMap::new(),
            next_id: 1,
        };
        let node = encoder.encode(root);
        encoder.values.insert("0".to_string(), node);
        Self {
            result: "0".to_string(),
            values: encoder.values,
        }
    }
}

impl From<&Value> for Expression {
    fn from(value: &Value) -> Self {
        Expression::new(value)
    }
}

struct Encoder {
    values: BTreeMap<String, serde_json::Value>,
    next_id: usize,
}

impl Encoder {
    fn encode(&mut self, value: &Value) -> serde_json::Value {
        match value {
            Value::Constant(c) => json!({ "constantValue": c }),
            Value::Invocation {
                function,
                arguments,
            } => {
                let args: serde_json::Map<String, serde_json::Value> = arguments
                    .iter()
                    .map(|(k, v)| (k.clone(), self.encode(v)))
                    .collect();
                json!({
                    "functionInvocationValue": {
                        "functionName": function,
                        "arguments": args,
                    }
                })
            }
            Value::Array(items) => {
                let values: Vec<serde_json::Value> =
                    items.iter().map(|v| self.encode(v)).collect();
                json!({ "arrayValue": { "values": values } })
            }
            Value::Dictionary(entries) => {
                let values: serde_json::Map<String, serde_json::Value> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.encode(v)))
                    .collect();
                json!({ "dictionaryValue": { "values": values } })
            }
            Value::Argument(name) => json!({ "argumentReference": name }),
            Value::Function { parameters, body } => {
                let id = self.next_id.to_string();
                self.next_id += 1;
                let node = self.encode(body);
                self.values.insert(id.clone(), node);
                json!({
                    "functionDefinitionValue": {
                        "argumentNames": parameters,
                        "body": id,
                    }
                })
            }
        }
    }
}
