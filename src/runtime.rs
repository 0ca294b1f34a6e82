//! Declarative runtime bindings.
//!
//! Binders can consume bindings described as JSON, e.g. loaded from a config file:
//! ```json
//! [
//!     {"Bind": "app::Repo", "To": "app::PostgresRepo", "Options": ["ToSingleton", "Weak"]},
//!     {"Bind": ["app::Config", "app::Settings"], "To": "app::FileConfig", "ToName": "main"},
//!     {"Bind": "app::Clock", "Options": [{"SupplyTo": ["app::Scheduler"]}]}
//! ]
//! ```
//! `Bind` is required, the other fields are optional.
//! See [`crate::Binder::consume_bindings`] and [`crate::InjectionBinder::consume_bindings`].

use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display, Formatter};
use serde::Deserialize;
use serde_json::Value;

use crate::{errors::BinderErrorKind, key::Key};

/// Leaf identifier of a runtime binding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuntimeValue {
    Str(String),
    Int(i64),
}

impl RuntimeValue {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            Self::Int(_) => None,
        }
    }
}

impl Display for RuntimeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "\"{value}\""),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for RuntimeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<RuntimeValue> for Key {
    fn from(value: RuntimeValue) -> Self {
        match value {
            RuntimeValue::Str(value) => Key::from(value),
            RuntimeValue::Int(value) => Key::Int(value),
        }
    }
}

impl From<RuntimeValue> for String {
    fn from(value: RuntimeValue) -> Self {
        match value {
            RuntimeValue::Str(value) => value,
            RuntimeValue::Int(value) => alloc::format!("{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOption {
    ToSingleton,
    Weak,
    CrossContext,
    SupplyTo(Vec<RuntimeValue>),
}

/// Parsed runtime binding record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBinding {
    pub bind: Vec<RuntimeValue>,
    pub to: Vec<RuntimeValue>,
    pub to_name: Option<RuntimeValue>,
    pub options: Vec<RuntimeOption>,
}

impl RuntimeBinding {
    #[inline]
    #[must_use]
    pub fn has_option(&self, option: &RuntimeOption) -> bool {
        self.options.contains(option)
    }

    pub fn supply_to(&self) -> impl Iterator<Item = &RuntimeValue> {
        self.options.iter().flat_map(|option| match option {
            RuntimeOption::SupplyTo(values) => values.as_slice(),
            _ => &[],
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => alloc::vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Record fields are kept as raw JSON, so an explicit `null` stays apart from a missing field
#[derive(Deserialize)]
struct RawBinding {
    #[serde(rename = "Bind", default, deserialize_with = "present")]
    bind: Option<Value>,
    #[serde(rename = "To", default, deserialize_with = "present")]
    to: Option<Value>,
    #[serde(rename = "ToName", default, deserialize_with = "present")]
    to_name: Option<Value>,
    #[serde(rename = "Options", default, deserialize_with = "present")]
    options: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single value or the items of an array
fn one_or_many(value: Option<Value>) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(values)) => values,
        Some(value) => alloc::vec![value],
    }
}

fn convert_value(value: Value) -> Result<RuntimeValue, BinderErrorKind> {
    match value {
        Value::String(value) => Ok(RuntimeValue::Str(value)),
        Value::Number(ref number) => number
            .as_i64()
            .map(RuntimeValue::Int)
            .ok_or(BinderErrorKind::RuntimeTypeUnknown { found: "non-integer number" }),
        other => Err(BinderErrorKind::RuntimeTypeUnknown {
            found: value_kind(&other),
        }),
    }
}

fn convert_values(value: Option<Value>) -> Result<Vec<RuntimeValue>, BinderErrorKind> {
    one_or_many(value).into_iter().map(convert_value).collect()
}

fn convert_option(option: Value) -> Result<RuntimeOption, BinderErrorKind> {
    match option {
        Value::String(flag) => match flag.as_str() {
            "ToSingleton" => Ok(RuntimeOption::ToSingleton),
            "Weak" => Ok(RuntimeOption::Weak),
            "CrossContext" => Ok(RuntimeOption::CrossContext),
            _ => Err(BinderErrorKind::RuntimeUnknownOption { option: flag }),
        },
        Value::Object(mut entries) if entries.len() == 1 => match entries.remove("SupplyTo") {
            Some(supply_to) => convert_values(Some(supply_to)).map(RuntimeOption::SupplyTo),
            None => Err(BinderErrorKind::RuntimeTypeUnknown { found: "object" }),
        },
        other => Err(BinderErrorKind::RuntimeTypeUnknown {
            found: value_kind(&other),
        }),
    }
}

impl TryFrom<RawBinding> for RuntimeBinding {
    type Error = BinderErrorKind;

    fn try_from(raw: RawBinding) -> Result<Self, Self::Error> {
        let bind = convert_values(raw.bind)?;
        if bind.is_empty() {
            return Err(BinderErrorKind::RuntimeNoBind);
        }
        let to = convert_values(raw.to)?;
        let to_name = raw.to_name.map(convert_value).transpose()?;
        let options = one_or_many(raw.options)
            .into_iter()
            .map(convert_option)
            .collect::<Result<_, _>>()?;

        Ok(Self { bind, to, to_name, options })
    }
}

/// Parses runtime binding records.
/// Accepts either an array of records or a single record.
///
/// # Errors
/// - Returns [`BinderErrorKind::RuntimeJson`] if the input isn't a record or a list of records
/// - Returns [`BinderErrorKind::RuntimeNoBind`] if a record has no `Bind` entry
/// - Returns [`BinderErrorKind::RuntimeTypeUnknown`] if an identifier isn't a string or an integer (`null` included),
///   or an option is neither a flag nor a `SupplyTo` entry
/// - Returns [`BinderErrorKind::RuntimeUnknownOption`] if an option flag is unknown
pub fn parse(json: &str) -> Result<Vec<RuntimeBinding>, BinderErrorKind> {
    let raw: OneOrMany<RawBinding> = serde_json::from_str(json)?;
    raw.into_vec().into_iter().map(RuntimeBinding::try_from).collect()
}

/// Checks every `To` value of the records against the whitelist
///
/// # Errors
/// Returns [`BinderErrorKind::RuntimeFailedWhitelistCheck`] with the first value missing from the whitelist
pub fn check_whitelist(bindings: &[RuntimeBinding], whitelist: &[RuntimeValue]) -> Result<(), BinderErrorKind> {
    for value in bindings.iter().flat_map(|binding| &binding.to) {
        if !whitelist.contains(value) {
            return Err(BinderErrorKind::RuntimeFailedWhitelistCheck { value: value.clone() });
        }
    }
    Ok(())
}
