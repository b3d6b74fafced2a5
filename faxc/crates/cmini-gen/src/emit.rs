//! Low-level text emission shared by [`crate::generator`] and
//! [`crate::program`].
//!
//! Everything generated here lands in an in-memory `String` buffer (never
//! partially flushed, never interleaved with anything else), so writing to
//! it cannot fail the way writing to a socket or a closed pipe can: these
//! helpers use `std::fmt::Write` and treat its `Result` as infallible,
//! matching how the original `fmt.Printf("  %s\n", ...)` call sites in
//! `codegen.go` never checked for a write error either. The one genuinely
//! fallible write, handing the finished buffer to the caller's
//! `io::Write` sink, happens once, in [`crate::program::generate`].

use std::fmt::Write as _;

pub(crate) fn instr(out: &mut String, args: std::fmt::Arguments<'_>) {
    out.write_str("  ").expect("writing to a String cannot fail");
    out.write_fmt(args).expect("writing to a String cannot fail");
    out.write_char('\n').expect("writing to a String cannot fail");
}

pub(crate) fn label(out: &mut String, args: std::fmt::Arguments<'_>) {
    out.write_fmt(args).expect("writing to a String cannot fail");
    out.write_str(":\n").expect("writing to a String cannot fail");
}

pub(crate) fn line(out: &mut String, args: std::fmt::Arguments<'_>) {
    out.write_fmt(args).expect("writing to a String cannot fail");
    out.write_char('\n').expect("writing to a String cannot fail");
}

/// Emits one indented instruction line: `instr!(out, "push {}", n)`.
macro_rules! instr {
    ($out:expr, $($arg:tt)*) => {
        $crate::emit::instr($out, format_args!($($arg)*))
    };
}

/// Emits an unindented label line: `label!(out, ".Lelse{}", n)`.
macro_rules! label {
    ($out:expr, $($arg:tt)*) => {
        $crate::emit::label($out, format_args!($($arg)*))
    };
}

/// Emits an unindented top-level line (a section/assembler directive or a
/// function name label for program framing).
macro_rules! line {
    ($out:expr, $($arg:tt)*) => {
        $crate::emit::line($out, format_args!($($arg)*))
    };
}

pub(crate) use instr;
pub(crate) use label;
pub(crate) use line;
