//! Diagnostics collection for the CN compiler.
//!
//! Every phase of the pipeline (preprocessor, lexer, parser, semantic
//! analyzer) reports failures by pushing into a [`DiagnosticBag`] rather
//! than returning early or panicking. The driver checks
//! [`DiagnosticBag::error_count`] at each phase boundary and aborts the
//! pipeline once it is nonzero.

use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a single diagnostic. Warnings never block compilation;
/// errors do, once their owning phase has finished running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Chinese label used in the stderr rendering, per spec §6.
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "错误",
            Severity::Warning => "警告",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed set of error codes, per spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown,
    LexInvalidChar,
    LexUnterminatedString,
    ParseExpectedToken,
    ParseInvalidExpr,
    ParseInvalidFunctionName,
    SemDuplicateSymbol,
    SemUndefinedIdentifier,
    SemTypeMismatch,
    SemMissingReturn,
}

impl ErrorCode {
    /// Numeric tag used in the `(代码: N)` suffix of the stderr format.
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::Unknown => 0,
            ErrorCode::LexInvalidChar => 101,
            ErrorCode::LexUnterminatedString => 102,
            ErrorCode::ParseExpectedToken => 201,
            ErrorCode::ParseInvalidExpr => 202,
            ErrorCode::ParseInvalidFunctionName => 203,
            ErrorCode::SemDuplicateSymbol => 301,
            ErrorCode::SemUndefinedIdentifier => 302,
            ErrorCode::SemTypeMismatch => 303,
            ErrorCode::SemMissingReturn => 304,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single located diagnostic message.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub filename: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        code: ErrorCode,
        filename: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            filename: filename.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn warning(
        code: ErrorCode,
        filename: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code,
            filename: filename.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {} (代码: {})",
            self.filename.display(),
            self.line,
            self.column,
            self.severity,
            self.message,
            self.code
        )
    }
}

/// Append-only container of diagnostics for a single compilation run.
///
/// The container owns its vector; nothing else holds onto individual
/// diagnostics, so there is no lifecycle to manage beyond dropping the bag.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    items: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        DiagnosticBag { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            severity = %diagnostic.severity,
            code = diagnostic.code.code(),
            line = diagnostic.line,
            column = diagnostic.column,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
    }

    pub fn error(
        &mut self,
        code: ErrorCode,
        filename: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::error(code, filename, line, column, message));
    }

    pub fn warning(
        &mut self,
        code: ErrorCode,
        filename: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(code, filename, line, column, message));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Print every diagnostic to stderr in source order, one per line.
    pub fn print_to_stderr(&self) {
        for diagnostic in &self.items {
            eprintln!("{diagnostic}");
        }
    }

    /// Merge another bag's diagnostics into this one, preserving order.
    pub fn extend(&mut self, other: DiagnosticBag) {
        self.items.extend(other.items);
    }
}

/// Convenience for phases that want to format a path-relative diagnostic
/// without threading a `DiagnosticBag` through every helper.
pub fn format_message(filename: &Path, line: usize, column: usize, severity: Severity, code: ErrorCode, message: &str) -> String {
    format!(
        "{}:{}:{}: {}: {} (代码: {})",
        filename.display(),
        line,
        column,
        severity,
        message,
        code.code()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_error_per_spec() {
        let d = Diagnostic::error(
            ErrorCode::LexInvalidChar,
            PathBuf::from("main.cn"),
            3,
            5,
            "非法字符",
        );
        assert_eq!(
            d.to_string(),
            "main.cn:3:5: 错误: 非法字符 (代码: 101)"
        );
    }

    #[test]
    fn formats_warning_per_spec() {
        let d = Diagnostic::warning(ErrorCode::Unknown, PathBuf::from("a.cn"), 1, 1, "未知指令");
        assert_eq!(d.to_string(), "a.cn:1:1: 警告: 未知指令 (代码: 0)");
    }

    #[test]
    fn error_count_ignores_warnings() {
        let mut bag = DiagnosticBag::new();
        bag.warning(ErrorCode::Unknown, "f.cn", 1, 1, "w");
        bag.error(ErrorCode::SemTypeMismatch, "f.cn", 2, 1, "e");
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.warning_count(), 1);
        assert!(bag.has_errors());
    }

    #[test]
    fn empty_bag_has_no_errors() {
        let bag = DiagnosticBag::new();
        assert!(bag.is_empty());
        assert!(!bag.has_errors());
    }

    #[test]
    fn extend_preserves_order() {
        let mut a = DiagnosticBag::new();
        a.error(ErrorCode::Unknown, "a.cn", 1, 1, "first");
        let mut b = DiagnosticBag::new();
        b.error(ErrorCode::Unknown, "a.cn", 2, 1, "second");
        a.extend(b);
        let messages: Vec<_> = a.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
