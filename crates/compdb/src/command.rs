//! Compiler argument vector → includes / defines / compiler flags.

use crate::flags::FlagSet;

/// Tokens that only describe how the compiler is driven. They never reach the
/// flag model.
pub const STRUCTURAL_FLAGS: [&str; 5] = ["-c", "-o", "-MF", "-MT", "-MQ"];

/// Structural tokens whose following argument is swallowed with them.
const STRUCTURAL_WITH_ARGUMENT: [&str; 4] = ["-o", "-MF", "-MT", "-MQ"];

/// Flags whose following token is kept next to them in `compiler_flags`.
const PAIRED_FLAGS: [&str; 1] = ["-include"];

pub fn is_structural(token: &str) -> bool {
    STRUCTURAL_FLAGS.contains(&token)
}

/// Split a raw argument vector left to right.
///
/// Tokens that do not start with `-` and are not consumed as an argument (the
/// compiler executable, the source file) are ignored.
pub fn parse_arguments<S: AsRef<str>>(arguments: &[S]) -> FlagSet {
    let mut flags = FlagSet::default();
    let mut tokens = arguments.iter().map(AsRef::<str>::as_ref);

    while let Some(token) = tokens.next() {
        if let Some(rest) = token.strip_prefix("-I") {
            let include = take_inline_or_next(rest, &mut tokens);
            if !include.is_empty() {
                flags.includes.push(include.to_string());
            }
        } else if let Some(rest) = token.strip_prefix("-D") {
            let define = take_inline_or_next(rest, &mut tokens);
            if !define.is_empty() {
                flags.defines.push(define.to_string());
            }
        } else if token == "-isystem" {
            let include = tokens.next().unwrap_or_default();
            if !include.is_empty() {
                flags.includes.push(include.to_string());
            }
        } else if token.starts_with('-') {
            if is_structural(token) {
                if STRUCTURAL_WITH_ARGUMENT.contains(&token) {
                    tokens.next();
                }
                continue;
            }

            flags.compiler_flags.push(token.to_string());
            if PAIRED_FLAGS.contains(&token) {
                if let Some(argument) = tokens.next().filter(|arg| !arg.is_empty()) {
                    flags.compiler_flags.push(argument.to_string());
                }
            }
        }
    }

    flags
}

fn take_inline_or_next<'a>(inline: &'a str, tokens: &mut impl Iterator<Item = &'a str>) -> &'a str {
    if inline.is_empty() {
        tokens.next().unwrap_or_default()
    } else {
        inline
    }
}

/// Split a shell-quoted `command` string the way a POSIX shell would.
pub fn split_command(command: &str) -> Result<Vec<String>, shell_words::ParseError> {
    shell_words::split(command)
}
