//! Colored terminal output utilities.

use std::fmt::Display;

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter writing to stderr.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        self.styled(&self.green, msg);
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.styled(&self.yellow, msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.styled(&self.red, msg);
    }

    /// Print a package part name as a section heading (cyan bold).
    pub(crate) fn part(&self, name: &str) {
        self.styled(&self.cyan_bold, name);
    }

    /// Print one merge-field directive of a part. Directives that failed to
    /// parse are shown in yellow with their error.
    pub(crate) fn directive(&self, text: &str, error: Option<&dyn Display>) {
        let line = directive_line(text, error);
        match error {
            None => self.info(&line),
            Some(_) => self.warning(&line),
        }
    }

    /// Print a path-like detail line (dim).
    pub(crate) fn detail(&self, msg: &str) {
        self.styled(&self.dim, msg);
    }

    fn styled(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}

fn directive_line(text: &str, error: Option<&dyn Display>) -> String {
    match error {
        None => format!("  {text}"),
        Some(err) => format!("  {text}  ({err})"),
    }
}
