//! Preprocessor: comment stripping, conditional compilation, and macro
//! expansion, with both ASCII and Chinese directive spellings (§4.2).
//!
//! The scanner is line-oriented only at the granularity of recognizing a
//! directive (`#` must be the first byte on its line); everything else —
//! comment stripping, macro expansion — runs as a single forward pass over
//! the byte stream so column/line bookkeeping stays in sync with the
//! lexer's own scanner.

use cn_diagnostics::{DiagnosticBag, ErrorCode};
use std::path::{Path, PathBuf};

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

fn is_ident_continue(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

/// A named textual replacement, object-like or function-like with
/// stringification (§3 Macro).
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub replacement: String,
    pub params: Vec<String>,
    pub function_like: bool,
    pub def_line: usize,
}

/// One frame of nested conditional compilation (§3 Condition frame).
#[derive(Debug, Clone, Copy, PartialEq)]
struct ConditionFrame {
    active: bool,
    has_executed: bool,
    #[allow(dead_code)]
    start_line: usize,
}

enum Directive {
    Define,
    Ifdef,
    Ifndef,
    Else,
    Endif,
    Undef,
    Unknown,
}

fn match_directive(name: &str) -> Directive {
    match name {
        "define" | "定义" => Directive::Define,
        "ifdef" | "如果定义" => Directive::Ifdef,
        "ifndef" | "如果未定义" => Directive::Ifndef,
        "else" | "否则" => Directive::Else,
        "endif" | "结束如果" => Directive::Endif,
        "undef" | "未定义" => Directive::Undef,
        _ => Directive::Unknown,
    }
}

/// Read one identifier-like token starting at `text[pos..]`, skipping no
/// leading whitespace. Returns the token and the index just past it.
fn read_ident(text: &str, pos: usize) -> (&str, usize) {
    let bytes = text.as_bytes();
    let mut i = pos;
    if i < bytes.len() && is_ident_start(bytes[i]) {
        i += 1;
        while i < bytes.len() && is_ident_continue(bytes[i]) {
            i += 1;
        }
    }
    (&text[pos..i], i)
}

fn skip_ws(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// Expanded-buffer preprocessor. Owns the macro table and condition stack
/// for a single translation unit; both are mutated only by this struct's
/// own driver loop (§5 shared-resource policy).
pub struct Preprocessor {
    macros: Vec<Macro>,
    conditions: Vec<ConditionFrame>,
    filename: PathBuf,
    last_output: String,
}

impl Preprocessor {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Preprocessor {
            macros: Vec::new(),
            conditions: Vec::new(),
            filename: filename.into(),
            last_output: String::new(),
        }
    }

    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    fn is_active(&self) -> bool {
        self.conditions.iter().all(|f| f.active)
    }

    fn find_macro(&self, name: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.name == name)
    }

    fn define_macro(&mut self, mac: Macro) {
        if let Some(existing) = self.macros.iter_mut().find(|m| m.name == mac.name) {
            *existing = mac;
        } else {
            self.macros.push(mac);
        }
    }

    fn undef_macro(&mut self, name: &str) {
        self.macros.retain(|m| m.name != name);
    }

    /// Expand `source` into a preprocessed buffer. Returns `None` if any
    /// error diagnostic was recorded while processing directives; the
    /// partial output remains available via [`Preprocessor::last_output`]
    /// for diagnostic display but must not be handed to the lexer (§4.2
    /// failure model).
    pub fn process(&mut self, source: &str, diagnostics: &mut DiagnosticBag) -> Option<String> {
        let errors_before = diagnostics.error_count();
        let output = self.run(source, diagnostics);
        self.last_output = output.clone();
        if diagnostics.error_count() > errors_before {
            None
        } else {
            Some(output)
        }
    }

    fn run(&mut self, source: &str, diagnostics: &mut DiagnosticBag) -> String {
        let bytes = source.as_bytes();
        let mut i = 0usize;
        let mut line = 1usize;
        let mut at_line_start = true;
        let mut output = String::with_capacity(source.len());

        while i < bytes.len() {
            if at_line_start && bytes[i] == b'#' {
                let line_end = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map(|off| i + off)
                    .unwrap_or(bytes.len());
                let directive_text = &source[i + 1..line_end];
                self.handle_directive(directive_text, line, diagnostics);
                i = line_end;
                if i < bytes.len() {
                    output.push('\n');
                    i += 1;
                    line += 1;
                }
                at_line_start = true;
                continue;
            }

            if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }

            if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    if bytes[i] == b'\n' {
                        output.push('\n');
                        line += 1;
                    }
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                at_line_start = false;
                continue;
            }

            if bytes[i] == b'\n' {
                output.push('\n');
                i += 1;
                line += 1;
                at_line_start = true;
                continue;
            }

            if !self.is_active() {
                i += 1;
                at_line_start = false;
                continue;
            }

            if is_ident_start(bytes[i]) {
                let (name, next) = read_ident(source, i);
                let name = name.to_string();
                i = next;
                at_line_start = false;

                let Some(mac) = self.find_macro(&name).cloned() else {
                    output.push_str(&name);
                    continue;
                };

                if !mac.function_like {
                    output.push_str(&mac.replacement);
                    continue;
                }

                let after_name = i;
                let call_start = skip_ws(source, after_name);
                if bytes.get(call_start) != Some(&b'(') {
                    // Named like a macro but not actually invoked.
                    output.push_str(&name);
                    continue;
                }

                let mut pos = call_start + 1;
                let (args, newlines_consumed) = collect_call_args(source, &mut pos);
                i = pos;

                if args.len() != mac.params.len() {
                    diagnostics.error(
                        ErrorCode::Unknown,
                        self.filename.clone(),
                        line,
                        1,
                        format!(
                            "宏'{}'期望 {} 个参数，实际得到 {} 个",
                            mac.name,
                            mac.params.len(),
                            args.len()
                        ),
                    );
                    output.push_str(&name);
                } else {
                    output.push_str(&expand_function_macro(&mac, &args));
                }
                for _ in 0..newlines_consumed {
                    output.push('\n');
                }
                line += newlines_consumed;
                continue;
            }

            output.push(bytes[i] as char);
            i += 1;
            at_line_start = false;
        }

        if !self.conditions.is_empty() {
            diagnostics.error(
                ErrorCode::Unknown,
                self.filename.clone(),
                line,
                1,
                "文件结束时条件编译块未闭合",
            );
        }

        output
    }

    fn handle_directive(&mut self, text: &str, line: usize, diagnostics: &mut DiagnosticBag) {
        let start = skip_ws(text, 0);
        let (keyword, after_kw) = read_ident(text, start);
        if keyword.is_empty() {
            diagnostics.error(
                ErrorCode::Unknown,
                self.filename.clone(),
                line,
                1,
                "未知的预处理指令",
            );
            return;
        }

        match match_directive(keyword) {
            Directive::Define => self.handle_define(text, after_kw, line),
            Directive::Ifdef => self.handle_if(text, after_kw, line, false),
            Directive::Ifndef => self.handle_if(text, after_kw, line, true),
            Directive::Else => self.handle_else(line, diagnostics),
            Directive::Endif => self.handle_endif(line, diagnostics),
            Directive::Undef => self.handle_undef(text, after_kw),
            Directive::Unknown => {
                diagnostics.error(
                    ErrorCode::Unknown,
                    self.filename.clone(),
                    line,
                    1,
                    format!("未知的预处理指令 '{keyword}'"),
                );
            }
        }
    }

    fn handle_define(&mut self, text: &str, pos: usize, line: usize) {
        let name_start = skip_ws(text, pos);
        let (name, after_name) = read_ident(text, name_start);
        if name.is_empty() {
            return;
        }

        let bytes = text.as_bytes();
        let (params, function_like, body_start) = if bytes.get(after_name) == Some(&b'(') {
            let mut j = after_name + 1;
            let mut params = Vec::new();
            loop {
                j = skip_ws(text, j);
                if bytes.get(j) == Some(&b')') {
                    j += 1;
                    break;
                }
                let (param, next) = read_ident(text, j);
                if param.is_empty() {
                    j += 1;
                    if j >= bytes.len() {
                        break;
                    }
                    continue;
                }
                params.push(param.to_string());
                j = skip_ws(text, next);
                if bytes.get(j) == Some(&b',') {
                    j += 1;
                } else if bytes.get(j) == Some(&b')') {
                    j += 1;
                    break;
                }
            }
            (params, true, j)
        } else {
            (Vec::new(), false, after_name)
        };

        let replacement = text[body_start.min(text.len())..].trim().to_string();

        if self.is_active() {
            self.define_macro(Macro {
                name: name.to_string(),
                replacement,
                params,
                function_like,
                def_line: line,
            });
        }
    }

    fn handle_if(&mut self, text: &str, pos: usize, line: usize, negate: bool) {
        let name_start = skip_ws(text, pos);
        let (name, _) = read_ident(text, name_start);
        let parent_active = self.is_active();
        let defined = self.find_macro(name).is_some();
        let active = (defined ^ negate) && parent_active;
        self.conditions.push(ConditionFrame {
            active,
            has_executed: active,
            start_line: line,
        });
    }

    fn handle_else(&mut self, line: usize, diagnostics: &mut DiagnosticBag) {
        let Some(frame) = self.conditions.last().copied() else {
            diagnostics.error(
                ErrorCode::Unknown,
                self.filename.clone(),
                line,
                1,
                "'#else'没有匹配的条件编译块",
            );
            return;
        };
        let parent_active = self.conditions[..self.conditions.len() - 1]
            .iter()
            .all(|f| f.active);
        let new_active = parent_active && !frame.has_executed;
        let top = self.conditions.last_mut().unwrap();
        top.active = new_active;
        if new_active {
            top.has_executed = true;
        }
    }

    fn handle_endif(&mut self, line: usize, diagnostics: &mut DiagnosticBag) {
        if self.conditions.pop().is_none() {
            diagnostics.error(
                ErrorCode::Unknown,
                self.filename.clone(),
                line,
                1,
                "'#endif'没有匹配的条件编译块",
            );
        }
    }

    fn handle_undef(&mut self, text: &str, pos: usize) {
        let name_start = skip_ws(text, pos);
        let (name, _) = read_ident(text, name_start);
        if !name.is_empty() && self.is_active() {
            self.undef_macro(name);
        }
    }
}

/// Collect a function-like macro's call arguments starting right after the
/// opening `(` (already consumed by the caller). Returns the trimmed
/// argument texts and the number of newlines spanned by the call, which
/// the caller re-emits to keep line counts in sync with the source (§8
/// line-preservation property).
fn collect_call_args(source: &str, pos: &mut usize) -> (Vec<String>, usize) {
    let bytes = source.as_bytes();
    let mut i = *pos;
    let mut depth = 0i32;
    let mut current = String::new();
    let mut args = Vec::new();
    let mut newlines = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b')' if depth == 0 => {
                i += 1;
                break;
            }
            b'(' => {
                depth += 1;
                current.push('(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                current.push(')');
                i += 1;
            }
            b',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                i += 1;
            }
            b'\n' => {
                newlines += 1;
                current.push(' ');
                i += 1;
            }
            _ => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] & 0xC0 == 0x80 {
                    i += 1;
                }
                current.push_str(&source[start..i]);
            }
        }
    }

    let trimmed_last = current.trim().to_string();
    if !(args.is_empty() && trimmed_last.is_empty()) {
        args.push(trimmed_last);
    }
    *pos = i;
    (args, newlines)
}

fn escape_for_string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

/// Substitute `args` into `mac.replacement`, stringifying any parameter
/// preceded by `#` (§4.2 function-like macro expansion). No token-pasting
/// (`##`) is implemented — the spec does not define its semantics.
fn expand_function_macro(mac: &Macro, args: &[String]) -> String {
    let bytes = mac.replacement.as_bytes();
    let mut out = String::with_capacity(mac.replacement.len());
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'#' {
            let after_hash = skip_ws(&mac.replacement, i + 1);
            let (ident, next) = read_ident(&mac.replacement, after_hash);
            if !ident.is_empty() {
                if let Some(idx) = mac.params.iter().position(|p| p == ident) {
                    out.push('"');
                    out.push_str(&escape_for_string_literal(&args[idx]));
                    out.push('"');
                    i = next;
                    continue;
                }
            }
            out.push('#');
            i += 1;
            continue;
        }

        if is_ident_start(bytes[i]) {
            let (ident, next) = read_ident(&mac.replacement, i);
            if let Some(idx) = mac.params.iter().position(|p| p == ident) {
                out.push_str(&args[idx]);
            } else {
                out.push_str(ident);
            }
            i = next;
            continue;
        }

        out.push(bytes[i] as char);
        i += 1;
    }

    out
}

/// Convenience entry point mirroring the other phase functions' shape.
pub fn preprocess(source: &str, filename: &Path, diagnostics: &mut DiagnosticBag) -> Option<String> {
    Preprocessor::new(filename).process(source, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (Option<String>, DiagnosticBag) {
        let mut diags = DiagnosticBag::new();
        let out = preprocess(source, Path::new("t.cn"), &mut diags);
        (out, diags)
    }

    #[test]
    fn line_count_is_preserved() {
        let source = "a\nb\n// comment\nc\n";
        let (out, _) = run(source);
        let out = out.unwrap();
        assert_eq!(out.matches('\n').count(), source.matches('\n').count());
    }

    #[test]
    fn no_directives_is_identity_modulo_comments() {
        let (out, _) = run("hello world\n");
        assert_eq!(out.unwrap(), "hello world\n");
    }

    #[test]
    fn object_macro_expands() {
        let (out, _) = run("#define GREETING 你好\nGREETING\n");
        assert_eq!(out.unwrap(), "\n你好\n");
    }

    #[test]
    fn function_macro_max_expands() {
        let source = "#define MAX(a,b) ((a)>(b)?(a):(b))\nMAX(10,20)\n";
        let (out, _) = run(source);
        assert_eq!(out.unwrap(), "\n((10)>(20)?(10):(20))\n");
    }

    #[test]
    fn stringification_quotes_argument() {
        let source = "#define STR(x) #x\nSTR(hello)\n";
        let (out, _) = run(source);
        assert_eq!(out.unwrap(), "\n\"hello\"\n");
    }

    #[test]
    fn chinese_conditional_selects_branch() {
        let source = "#定义 DEBUG\n#如果定义 DEBUG\n变量 x = 1;\n#否则\n变量 x = 0;\n#结束如果\n";
        let (out, _) = run(source);
        let out = out.unwrap();
        assert!(out.contains("x = 1"));
        assert!(!out.contains("x = 0"));
    }

    #[test]
    fn ascii_ifndef_else_selects_else_branch() {
        let source = "#ifndef DEBUG\n变量 x = 0;\n#else\n变量 x = 1;\n#endif\n";
        let (out, _) = run(source);
        let out = out.unwrap();
        assert!(out.contains("x = 0"));
        assert!(!out.contains("x = 1"));
    }

    #[test]
    fn undef_removes_macro() {
        let source = "#define X 1\n#undef X\nX\n";
        let (out, _) = run(source);
        assert_eq!(out.unwrap(), "\n\nX\n");
    }

    #[test]
    fn unclosed_conditional_fails() {
        let (out, diags) = run("#ifdef X\n变量 y = 1;\n");
        assert!(out.is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn unmatched_endif_is_an_error() {
        let (out, diags) = run("#endif\n");
        assert!(out.is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn unknown_directive_is_diagnosed() {
        let (out, diags) = run("#frobnicate\n");
        assert!(out.is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn nested_conditionals_track_independently() {
        let source =
            "#define OUTER\n#ifdef OUTER\n#ifdef INNER\nA\n#else\nB\n#endif\n#endif\n";
        let (out, _) = run(source);
        let out = out.unwrap();
        assert!(out.contains('B'));
        assert!(!out.contains('A'));
    }

    #[test]
    fn block_comment_preserves_interior_newlines() {
        let source = "a /* one\ntwo\nthree */ b\n";
        let (out, _) = run(source);
        let out = out.unwrap();
        assert_eq!(out.matches('\n').count(), source.matches('\n').count());
    }
}
