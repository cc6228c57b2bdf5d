use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LineError;

/// Framing of a single raw script line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLine<'a> {
    Blank,
    Comment(&'a str),
    Entry { delay: &'a str, text: &'a str },
}

pub fn classify(line: &str) -> Result<ScriptLine<'_>, LineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ScriptLine::Blank);
    }
    if trimmed.starts_with('#') {
        return Ok(ScriptLine::Comment(trimmed));
    }
    match line.split_once(':') {
        Some((delay, text)) => Ok(ScriptLine::Entry { delay, text }),
        None => Err(LineError::Malformed(line.to_string())),
    }
}

/// Delay prefixes are plain nanosecond counts.
pub fn parse_delay(raw: &str) -> Result<Duration, LineError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_nanos)
        .map_err(|_| LineError::BadDelay(raw.to_string()))
}

/// Sum of every well-formed delay in a script body.
pub fn script_duration(content: &str) -> Duration {
    content
        .lines()
        .filter_map(|l| match classify(l) {
            Ok(ScriptLine::Entry { delay, .. }) => parse_delay(delay).ok(),
            _ => None,
        })
        .sum()
}

/// Relative includes are resolved against the including script's directory.
pub fn resolve_include(parent: Option<&Path>, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match parent.and_then(Path::parent) {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
