//! Line-oriented script format: `<delayNanoseconds>:<directive>`.

mod check;
mod grammar;
mod keysym;
mod line;

pub use check::{check_script, ScriptProblem, ScriptReport};
pub use grammar::{DirectiveParser, StandardGrammar};
pub use keysym::keysym;
pub use line::{classify, parse_delay, resolve_include, script_duration, ScriptLine};
