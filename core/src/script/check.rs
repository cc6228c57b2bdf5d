use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::event::Directive;

use super::grammar::DirectiveParser;
use super::line::{classify, parse_delay, resolve_include, ScriptLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptProblem {
    pub file: PathBuf,
    /// 1-based; 0 when the problem concerns the file itself.
    pub line: usize,
    pub message: String,
}

/// Result of a dry run over a script tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub files: usize,
    pub directives: usize,
    pub total_delay: Duration,
    pub problems: Vec<ScriptProblem>,
}

impl ScriptReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, file: &Path, line: usize, message: impl Into<String>) {
        self.problems.push(ScriptProblem {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        });
    }
}

/// Walk a script and its includes without connecting anywhere.
///
/// Includes already on the current include stack are reported as cycles
/// instead of being expanded.
pub fn check_script(path: &Path, grammar: &dyn DirectiveParser, max_depth: usize) -> ScriptReport {
    let mut report = ScriptReport::default();
    let mut stack = Vec::new();
    visit(path, grammar, max_depth, &mut stack, &mut report);
    report
}

fn visit(
    path: &Path,
    grammar: &dyn DirectiveParser,
    max_depth: usize,
    stack: &mut Vec<PathBuf>,
    report: &mut ScriptReport,
) {
    if stack.len() + 1 > max_depth {
        report.problem(path, 0, format!("include depth exceeds {max_depth}"));
        return;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            report.problem(path, 0, format!("unable to read: {e}"));
            return;
        }
    };
    report.files += 1;
    stack.push(path.to_path_buf());

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let (delay, text) = match classify(raw) {
            Ok(ScriptLine::Entry { delay, text }) => (delay, text),
            Ok(_) => continue,
            Err(e) => {
                report.problem(path, line_no, e.to_string());
                continue;
            }
        };
        let directive = match grammar.parse(text) {
            Ok(d) => d,
            Err(e) => {
                report.problem(path, line_no, e.to_string());
                continue;
            }
        };
        match parse_delay(delay) {
            Ok(d) => report.total_delay += d,
            Err(e) => {
                report.problem(path, line_no, e.to_string());
                continue;
            }
        }
        report.directives += 1;

        if let Directive::LoadFile(load) = directive {
            let nested = resolve_include(Some(path), &load.path);
            if stack.iter().any(|p| p == &nested) {
                report.problem(
                    path,
                    line_no,
                    format!("recursive include of {}", nested.display()),
                );
                continue;
            }
            visit(&nested, grammar, max_depth, stack, report);
        }
    }

    stack.pop();
}
