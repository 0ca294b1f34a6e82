use alloc::string::String;

use crate::{key::Key, runtime::RuntimeValue};

#[derive(thiserror::Error, Debug)]
pub enum BinderErrorKind {
    #[error(
        "\
        Binder conflict for key {key} (name: {name:?}). \
        The existing binding isn't weak, so it can't be overridden. \
        Mark it as weak or unbind it first\
        "
    )]
    Conflict { key: Key, name: Option<Key> },
    #[error("Runtime binding has no `Bind` entry")]
    RuntimeNoBind,
    #[error("Runtime binding has {count} `Bind` keys, but this binder allows only one")]
    RuntimeTooManyKeys { count: usize },
    #[error("Runtime binding has {count} `To` values, but this binder allows only one")]
    RuntimeTooManyValues { count: usize },
    #[error("Runtime binding value {value} resolves to nothing. Type names must be fully qualified and registered")]
    RuntimeNullValue { value: RuntimeValue },
    #[error("Runtime binding contains unsupported {found} value")]
    RuntimeTypeUnknown { found: &'static str },
    #[error("Runtime binding value {value} isn't whitelisted")]
    RuntimeFailedWhitelistCheck { value: RuntimeValue },
    #[error("Runtime binding option {option:?} is unknown")]
    RuntimeUnknownOption { option: String },
    #[error("Runtime bindings aren't valid JSON: {0}")]
    RuntimeJson(#[from] serde_json::Error),
}
