//! In-memory model of the Lua literal-table documents stored inside a mission
//! archive (`mission`, `l10n/DEFAULT/dictionary`), a reader that executes the
//! assignment statements they are made of, and the serializer that writes the
//! tree back out.

use std::path::Path;
use thiserror::Error;

mod interpreter;
mod parser;
mod serialize;
mod value;

pub use interpreter::Interpreter;
pub use serialize::serialize_global;
pub use value::{Table, Value};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("evaluation error: {0}")]
    Eval(String),

    #[error("cannot serialize table key of type {0}")]
    UnsupportedKey(&'static str),

    #[error("cannot serialize non-finite number {0}")]
    NonFiniteNumber(f64),

    #[error("global '{0}' is not a table")]
    MissingGlobal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The narrow surface the mission pipeline needs from a table-literal
/// scripting engine. One engine instance is reused for every document of a
/// run and is only ever driven from one thread.
pub trait ScriptEngine {
    /// Executes the document at `path`, defining its globals.
    fn load_document(&mut self, path: &Path) -> Result<(), DocumentError>;

    /// Assigns `value` to a path expression such as
    /// `mission.weather.wind.at2000.speed` or `dictionary["DictKey_x"]`.
    /// Assigning [`Value::Nil`] removes the field.
    fn assign(&mut self, path: &str, value: Value) -> Result<(), DocumentError>;

    /// Returns the named global, or [`Value::Nil`] when it is undefined.
    fn get_global(&self, name: &str) -> &Value;
}
