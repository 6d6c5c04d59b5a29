use thiserror::Error;

use crate::datatype::TypeTag;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    #[error("Member not found: {type_name}.{member}")]
    MemberNotFound { type_name: String, member: String },
    #[error("Argument {index} ({text:?}) cannot be coerced to {target}")]
    ArgumentCoercionFailed { index: usize, text: String, target: TypeTag },
    #[error("No overload of {member} accepts the given arguments ({candidates} candidates tried)")]
    AmbiguousOverloadUnresolved { member: String, candidates: usize },
    #[error("Callee fault in {member}: {message}")]
    CalleeFault { member: String, message: String },
    #[error("Invalid command line: {0}")]
    InvalidCommandLine(String),
    #[error("Parse error: {message}")]
    Parse { message: String, col: Option<usize> },
    #[error("Registration error: {0}")]
    Registration(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Trace error: {0}")]
    Trace(String),
}

pub type Result<T> = std::result::Result<T, InvokeError>;

impl InvokeError {
    /// Short, stable name of the error kind as written to the trace.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypeNotFound(_) => "TypeNotFound",
            Self::MemberNotFound { .. } => "MemberNotFound",
            Self::ArgumentCoercionFailed { .. } => "ArgumentCoercionFailed",
            Self::AmbiguousOverloadUnresolved { .. } => "AmbiguousOverloadUnresolved",
            Self::CalleeFault { .. } => "CalleeFault",
            Self::InvalidCommandLine(_) => "InvalidCommandLine",
            Self::Parse { .. } => "Parse",
            Self::Registration(_) => "Registration",
            Self::Config(_) => "Config",
            Self::Trace(_) => "Trace",
        }
    }
}

// Helper conversions
impl From<config::ConfigError> for InvokeError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for InvokeError {
    fn from(e: std::io::Error) -> Self { Self::Trace(e.to_string()) }
}
impl From<serde_json::Error> for InvokeError {
    fn from(e: serde_json::Error) -> Self { Self::Trace(e.to_string()) }
}
