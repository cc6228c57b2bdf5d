#[allow(clippy::module_inception)]
pub mod error;
pub mod connection;
pub mod script;

pub use connection::ConnectionError;
pub use error::{CliError, ErrorKind, LastError, PlaybackError};
pub use script::{GrammarError, LineError};
