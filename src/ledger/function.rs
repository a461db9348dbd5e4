//! Typed function requests and ABI-driven argument encoding.
//!
//! A request names its target as `address::module::function` and carries an
//! ordered argument list. Entry requests are checked against the function's
//! ABI before anything is signed: the function has to exist, generic
//! functions need type arguments, and each argument is converted according
//! to its declared Move type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::{AccountAddress, MoveFunction};
use crate::error::{AgentError, AgentResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// Answered from the read-only query path.
    View,
    /// Requires a signed transaction.
    Entry,
}

impl FunctionKind {
    pub fn is_mutating(&self) -> bool {
        matches!(self, FunctionKind::Entry)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FunctionId {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
}

impl FunctionId {
    pub fn new(address: AccountAddress, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address,
            module: module.into(),
            name: name.into(),
        }
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl FromStr for FunctionId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        let [address, module, name] = parts.as_slice() else {
            return Err(AgentError::validation(format!(
                "function id '{}' must look like address::module::function",
                s
            )));
        };

        for part in [module, name] {
            if !is_identifier(part) {
                return Err(AgentError::validation(format!(
                    "'{}' in function id '{}' is not a valid identifier",
                    part, s
                )));
            }
        }

        Ok(Self::new(AccountAddress::from_hex(address)?, *module, *name))
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)
    }
}

impl fmt::Debug for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionId({})", self)
    }
}

impl Serialize for FunctionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FunctionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Function target plus its type arguments and JSON-encoded arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub function: FunctionId,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl FunctionCall {
    pub fn new(function: FunctionId) -> Self {
        Self {
            function,
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn with_type_argument(mut self, type_argument: impl Into<String>) -> Self {
        self.type_arguments.push(type_argument.into());
        self
    }

    pub fn with_argument(mut self, argument: ArgValue) -> Self {
        self.arguments.push(argument.to_json());
        self
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = ArgValue>) -> Self {
        self.arguments.extend(arguments.into_iter().map(|a| a.to_json()));
        self
    }

    /// Body for `POST /view`.
    pub fn view_body(&self) -> Value {
        json!({
            "function": self.function.to_string(),
            "type_arguments": self.type_arguments,
            "arguments": self.arguments,
        })
    }

    /// Payload of a transaction that invokes this call.
    pub fn entry_payload(&self) -> Value {
        json!({
            "type": "entry_function_payload",
            "function": self.function.to_string(),
            "type_arguments": self.type_arguments,
            "arguments": self.arguments,
        })
    }
}

/// A call tagged with the path it must take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionRequest {
    View(FunctionCall),
    Entry(FunctionCall),
}

impl FunctionRequest {
    pub fn new(kind: FunctionKind, call: FunctionCall) -> Self {
        match kind {
            FunctionKind::View => FunctionRequest::View(call),
            FunctionKind::Entry => FunctionRequest::Entry(call),
        }
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            FunctionRequest::View(_) => FunctionKind::View,
            FunctionRequest::Entry(_) => FunctionKind::Entry,
        }
    }

    pub fn call(&self) -> &FunctionCall {
        match self {
            FunctionRequest::View(call) | FunctionRequest::Entry(call) => call,
        }
    }

    pub fn into_call(self) -> FunctionCall {
        match self {
            FunctionRequest::View(call) | FunctionRequest::Entry(call) => call,
        }
    }
}

/// An argument converted to its declared Move type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    U8(u8),
    U64(u64),
    U128(u128),
    Bool(bool),
    Address(AccountAddress),
    String(String),
    VecU64(Vec<u64>),
    VecBool(Vec<bool>),
}

impl ArgValue {
    /// JSON form accepted by the REST API: 64 and 128-bit integers travel as
    /// strings, `u8` as a number.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::U8(v) => json!(v),
            ArgValue::U64(v) => json!(v.to_string()),
            ArgValue::U128(v) => json!(v.to_string()),
            ArgValue::Bool(v) => json!(v),
            ArgValue::Address(v) => json!(v.to_string()),
            ArgValue::String(v) => json!(v),
            ArgValue::VecU64(v) => json!(v.iter().map(|n| n.to_string()).collect::<Vec<_>>()),
            ArgValue::VecBool(v) => json!(v),
        }
    }

    /// Converts a loosely typed argument to the Move type `param_type`.
    pub fn from_json(param_type: &str, value: &Value) -> AgentResult<Self> {
        match param_type {
            "u8" => {
                let n = parse_unsigned(param_type, value)?;
                u8::try_from(n)
                    .map(ArgValue::U8)
                    .map_err(|_| AgentError::validation(format!("{} does not fit in u8", n)))
            }
            "u64" => {
                let n = parse_unsigned(param_type, value)?;
                u64::try_from(n)
                    .map(ArgValue::U64)
                    .map_err(|_| AgentError::validation(format!("{} does not fit in u64", n)))
            }
            "u128" => parse_unsigned(param_type, value).map(ArgValue::U128),
            "bool" => parse_bool(value).map(ArgValue::Bool),
            "address" => AccountAddress::from_hex(&value_text(value)).map(ArgValue::Address),
            _ if param_type.starts_with("vector<") => {
                let items = value.as_array().ok_or_else(|| {
                    AgentError::validation(format!(
                        "Expected a list for `{}` but got {}",
                        param_type,
                        json_kind(value)
                    ))
                })?;
                // One level only: `vector<vector<u64>>` leaves `vector<u64>` here.
                let inner = param_type
                    .strip_prefix("vector<")
                    .and_then(|rest| rest.strip_suffix('>'))
                    .unwrap_or(param_type);
                match inner {
                    "u64" => items
                        .iter()
                        .map(|item| {
                            let n = parse_unsigned(inner, item)?;
                            u64::try_from(n).map_err(|_| {
                                AgentError::validation(format!("{} does not fit in u64", n))
                            })
                        })
                        .collect::<AgentResult<Vec<_>>>()
                        .map(ArgValue::VecU64),
                    "bool" => items
                        .iter()
                        .map(parse_bool)
                        .collect::<AgentResult<Vec<_>>>()
                        .map(ArgValue::VecBool),
                    _ => Err(AgentError::validation(format!(
                        "Unsupported vector type `{}`",
                        inner
                    ))),
                }
            }
            // Struct types such as 0x1::string::String travel as text.
            _ => Ok(ArgValue::String(value_text(value))),
        }
    }
}

/// Checks `type_arguments`/`arguments` against `abi` and returns the call
/// with its arguments converted to their declared types.
///
/// A leading `&signer` parameter is supplied by the transaction sender and
/// must not be passed. Arguments beyond the declared parameters are dropped.
pub fn encode_entry_call(
    function: FunctionId,
    abi: &MoveFunction,
    type_arguments: Vec<String>,
    arguments: &[Value],
) -> AgentResult<FunctionCall> {
    if !abi.is_entry {
        return Err(AgentError::validation(format!(
            "`{}` is not an entry function",
            function
        )));
    }
    if !abi.generic_type_params.is_empty() && type_arguments.is_empty() {
        return Err(AgentError::validation(format!(
            "Missing required type arguments for `{}`",
            function
        )));
    }

    let params: &[String] = match abi.params.split_first() {
        Some((first, rest)) if first == "&signer" || first == "signer" => rest,
        _ => &abi.params,
    };

    let encoded = arguments
        .iter()
        .zip(params)
        .map(|(value, param_type)| ArgValue::from_json(param_type, value))
        .collect::<AgentResult<Vec<_>>>()?;

    Ok(FunctionCall {
        function,
        type_arguments,
        arguments: encoded.iter().map(ArgValue::to_json).collect(),
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn parse_unsigned(param_type: &str, value: &Value) -> AgentResult<u128> {
    let parsed = match value {
        Value::Number(number) => number.as_u64().map(u128::from),
        Value::String(text) => text.trim().parse::<u128>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        AgentError::validation(format!("Expected {} but got {}", param_type, value))
    })
}

fn parse_bool(value: &Value) -> AgentResult<bool> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(AgentError::validation(format!("Expected bool but got {}", value))),
    }
}
