//! The fatal-diagnostic value type.
//!
//! This compiler reports at most one error per run and exits, so unlike a
//! `Handler` that accumulates a batch of diagnostics with notes, help text
//! and error codes, this is a single value with a fixed rendering.

use crate::Span;

/// A single fatal compile error, ready to be printed to standard error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    /// Renders the diagnostic against `source` in the required shape: the
    /// whole source on one line, a caret line positioning `^ ` under the
    /// offending byte, and the message.
    pub fn render(&self, source: &str) -> String {
        let pos = self.span.start as usize;
        let mut out = String::with_capacity(source.len() * 2 + self.message.len() + 4);
        out.push_str(source);
        out.push('\n');
        for _ in 0..pos {
            out.push(' ');
        }
        out.push_str("^ ");
        out.push_str(&self.message);
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_positions_caret_under_offset() {
        let diag = Diagnostic::new(Span::at(4), "undefined variable");
        let rendered = diag.render("a = bcd;");
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("a = bcd;"));
        assert_eq!(lines.next(), Some("    ^ undefined variable"));
    }

    #[test]
    fn render_at_start_of_line() {
        let diag = Diagnostic::new(Span::at(0), "unexpected token");
        let rendered = diag.render("+ 1");
        let mut lines = rendered.lines();
        lines.next();
        assert_eq!(lines.next(), Some("^ unexpected token"));
    }
}
