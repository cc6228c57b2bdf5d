use std::path::PathBuf;
use std::time::Duration;

use crate::error::GrammarError;
use crate::event::{Directive, LoadFile, WaitForIt, WireEvent};

use super::keysym::keysym;

/// Turns the directive part of a script line into a [`Directive`].
pub trait DirectiveParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Directive, GrammarError>;
}

/// Accepts both the comma form (`KeyEvent,true,a`) and the word form (`key a`).
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardGrammar;

#[derive(Clone, Copy)]
enum Form {
    Comma,
    Words,
}

fn split_head(text: &str) -> (&str, &str, Form) {
    let comma = text.find(',');
    let space = text.find(char::is_whitespace);
    match (comma, space) {
        (Some(c), s) if s.map_or(true, |s| c < s) => (&text[..c], &text[c + 1..], Form::Comma),
        (_, Some(s)) => (&text[..s], text[s..].trim_start(), Form::Words),
        _ => (text, "", Form::Words),
    }
}

/// Split into at most `n` arguments; the last one keeps any remaining separators.
fn split_args(rest: &str, form: Form, n: usize) -> Vec<&str> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Vec::new();
    }
    match form {
        Form::Comma => rest.splitn(n, ',').map(str::trim).collect(),
        Form::Words => {
            let mut out = Vec::with_capacity(n);
            let mut rest = rest;
            while out.len() + 1 < n {
                match rest.find(char::is_whitespace) {
                    Some(i) => {
                        out.push(&rest[..i]);
                        rest = rest[i..].trim_start();
                    }
                    None => break,
                }
            }
            out.push(rest);
            out
        }
    }
}

fn expect<'a>(
    args: Vec<&'a str>,
    n: usize,
    directive: &'static str,
    expected: &'static str,
) -> Result<Vec<&'a str>, GrammarError> {
    if args.len() != n || args.iter().any(|a| a.is_empty()) {
        return Err(GrammarError::Arity {
            directive,
            expected,
        });
    }
    Ok(args)
}

fn parse_key(name: &str) -> Result<u32, GrammarError> {
    keysym(name).ok_or_else(|| GrammarError::UnknownKeysym(name.to_string()))
}

fn parse_bool(directive: &'static str, value: &str) -> Result<bool, GrammarError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "down" | "1" => Ok(true),
        "false" | "up" | "0" => Ok(false),
        _ => Err(GrammarError::InvalidArgument {
            directive,
            field: "down",
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(
    directive: &'static str,
    field: &'static str,
    value: &str,
) -> Result<T, GrammarError> {
    value.parse::<T>().map_err(|_| GrammarError::InvalidArgument {
        directive,
        field,
        value: value.to_string(),
    })
}

impl DirectiveParser for StandardGrammar {
    fn parse(&self, text: &str) -> Result<Directive, GrammarError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GrammarError::Empty);
        }

        let (head, rest, form) = split_head(text);
        match head.to_ascii_lowercase().as_str() {
            "keyevent" => {
                const D: &str = "KeyEvent";
                let a = expect(split_args(rest, form, 2), 2, D, "<down>,<keysym>")?;
                Ok(WireEvent::Key {
                    down: parse_bool(D, a[0])?,
                    keysym: parse_key(a[1])?,
                }
                .into())
            }
            "key" | "keydown" | "keyup" => {
                const D: &str = "key";
                let a = expect(split_args(rest, form, 1), 1, D, "<keysym>")?;
                let keysym = parse_key(a[0])?;
                let ev = match head.to_ascii_lowercase().as_str() {
                    "keydown" => WireEvent::Key { down: true, keysym },
                    "keyup" => WireEvent::Key {
                        down: false,
                        keysym,
                    },
                    _ => WireEvent::KeyTap { keysym },
                };
                Ok(ev.into())
            }
            "pointerevent" | "pointer" => {
                const D: &str = "PointerEvent";
                let a = expect(split_args(rest, form, 3), 3, D, "<mask> <x> <y>")?;
                Ok(WireEvent::Pointer {
                    mask: parse_num(D, "mask", a[0])?,
                    x: parse_num(D, "x", a[1])?,
                    y: parse_num(D, "y", a[2])?,
                }
                .into())
            }
            "loadfile" | "load" => {
                const D: &str = "LoadFile";
                let a = expect(split_args(rest, form, 1), 1, D, "<path>")?;
                Ok(Directive::LoadFile(LoadFile {
                    path: PathBuf::from(a[0]),
                }))
            }
            "waitforit" | "wait" => {
                const D: &str = "WaitForIt";
                let a = expect(split_args(rest, form, 2), 2, D, "<timeoutNanos> <reference>")?;
                let nanos: u64 = parse_num(D, "timeout", a[0])?;
                Ok(Directive::WaitForIt(WaitForIt {
                    timeout: Duration::from_nanos(nanos),
                    reference: a[1].to_string(),
                }))
            }
            _ => Err(GrammarError::Unknown(head.to_string())),
        }
    }
}
