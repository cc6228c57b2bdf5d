use thiserror::Error;

/// Problems with the `<delay>:<directive>` framing of a script line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("malformed vnc command: {0}")]
    Malformed(String),

    #[error("invalid delay `{0}`")]
    BadDelay(String),
}

/// Problems turning directive text into a [`crate::event::Directive`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("empty directive")]
    Empty,

    #[error("unknown directive `{0}`")]
    Unknown(String),

    #[error("{directive}: expected {expected}")]
    Arity {
        directive: &'static str,
        expected: &'static str,
    },

    #[error("{directive}: invalid {field} `{value}`")]
    InvalidArgument {
        directive: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("unknown keysym `{0}`")]
    UnknownKeysym(String),
}
