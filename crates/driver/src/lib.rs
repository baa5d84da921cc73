//! Compiler driver (§4.9): owns argument-independent pipeline orchestration
//! so `main.rs` stays a thin `clap` shell. Each phase boundary is checked
//! for errors before moving on, mirroring the frontend crates' own
//! "diagnostics bag, not early return" discipline but collapsing to a hard
//! abort here since the driver has nowhere further to report to.

mod cc;
mod config;

pub use cc::{check_cc_available, CcError};
pub use config::ProjectConfig;

use cn_ast::Program;
use cn_diagnostics::DiagnosticBag;
use cn_ir::Module;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptLevel {
    O0,
    O1,
    O2,
}

impl OptLevel {
    pub fn as_cc_flag(self) -> &'static str {
        match self {
            OptLevel::O0 => "-O0",
            OptLevel::O1 => "-O1",
            OptLevel::O2 => "-O2",
        }
    }
}

impl std::str::FromStr for OptLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "O0" | "0" => Ok(OptLevel::O0),
            "O1" | "1" => Ok(OptLevel::O1),
            "O2" | "2" => Ok(OptLevel::O2),
            other => Err(format!("unknown optimization level '{other}' (expected O0, O1, or O2)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub freestanding: bool,
    pub target: String,
    pub opt: OptLevel,
    pub keep_c: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            freestanding: false,
            target: default_target_triple(),
            opt: OptLevel::O0,
            keep_c: false,
        }
    }
}

impl BuildOptions {
    /// Fills in any field `cli` left at its default from `project`, so a
    /// `cn.toml` in the working directory supplies fallbacks without
    /// overriding anything the user actually passed on the command line.
    /// `explicit_*` flags report which fields the CLI layer actually set,
    /// since `BuildOptions` alone can't distinguish "explicitly O0" from
    /// "defaulted to O0".
    pub fn apply_project_config(mut self, project: &ProjectConfig, explicit: &ExplicitFlags) -> Self {
        if !explicit.freestanding {
            if let Some(freestanding) = project.freestanding {
                self.freestanding = freestanding;
            }
        }
        if !explicit.target {
            if let Some(target) = &project.target {
                self.target = target.clone();
            }
        }
        if !explicit.opt {
            if let Some(opt) = &project.opt {
                if let Ok(opt) = opt.parse::<OptLevel>() {
                    self.opt = opt;
                }
            }
        }
        if !explicit.keep_c {
            if let Some(keep_c) = project.keep_c {
                self.keep_c = keep_c;
            }
        }
        self
    }
}

/// Tracks which `BuildOptions` fields the CLI layer explicitly set, so
/// `apply_project_config` knows which ones a `cn.toml` default is still
/// allowed to fill in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitFlags {
    pub freestanding: bool,
    pub target: bool,
    pub opt: bool,
    pub keep_c: bool,
}

pub fn default_target_triple() -> String {
    // No target-detection crate is part of this stack; the host triple
    // naming convention below matches what `rustc -vV` reports on the
    // platforms this toolchain is exercised on.
    format!("{}-unknown-{}-gnu", std::env::consts::ARCH, std::env::consts::OS)
}

/// Runs every frontend phase (preprocessor, lexer, parser, semantic
/// analysis) over `source`, aborting at the first phase whose error count
/// is nonzero (§7). Returns the fully-resolved [`Program`] plus any
/// warnings collected along the way, or the diagnostics bag that holds the
/// blocking errors.
pub fn run_frontend(
    source: &str,
    filename: &Path,
    freestanding: bool,
) -> Result<(Program, DiagnosticBag), DiagnosticBag> {
    let mut diagnostics = DiagnosticBag::new();

    let expanded = match cn_preprocessor::preprocess(source, filename, &mut diagnostics) {
        Some(expanded) => expanded,
        None => return Err(diagnostics),
    };
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let tokens = cn_lexer::lex(&expanded, filename, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let mut program = cn_parser::parse(tokens, filename, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let (_, sema_diagnostics) = cn_sema::analyze(&mut program, filename, freestanding);
    diagnostics.extend(sema_diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    Ok((program, diagnostics))
}

/// `cnc check`: frontend only, no IR/codegen/cc.
pub fn check(source: &str, filename: &Path, freestanding: bool) -> Result<DiagnosticBag, DiagnosticBag> {
    run_frontend(source, filename, freestanding).map(|(_, diags)| diags)
}

/// `cnc emit-ir`: frontend, IR generation, default optimization pipeline,
/// rendered as plain text.
pub fn emit_ir(
    source: &str,
    filename: &Path,
    freestanding: bool,
    target: &str,
) -> Result<String, DiagnosticBag> {
    let (program, _) = run_frontend(source, filename, freestanding)?;
    let module = lower_to_ir(&program, target, freestanding);
    Ok(cn_ir::dump_module(&module))
}

/// `cnc emit-c`: frontend through C rendering, no compiler invocation.
pub fn emit_c(
    source: &str,
    filename: &Path,
    freestanding: bool,
    target: &str,
) -> Result<String, String> {
    let (program, _) = run_frontend(source, filename, freestanding).map_err(|d| format_diagnostics(&d))?;
    let module = lower_to_ir(&program, target, freestanding);
    cn_codegen::emit_c(&module, &program).map_err(|e| e.to_string())
}

fn lower_to_ir(program: &Program, target: &str, freestanding: bool) -> Module {
    let mut module = cn_ir::generate_module(program, target, freestanding);
    cn_ir_passes::run_default_pipeline(&mut module);
    module
}

/// `cnc build`: full pipeline through an external C compiler invocation.
/// Any failure from IR generation onward deletes the partial `.c` and
/// output artifacts it had already written (§7's "no `.c`/binary left
/// behind" rule).
pub fn build(input: &Path, output: &Path, options: &BuildOptions) -> Result<(), String> {
    let source = fs::read_to_string(input).map_err(|e| format!("failed to read {}: {e}", input.display()))?;

    let (program, diagnostics) =
        run_frontend(&source, input, options.freestanding).map_err(|d| format_diagnostics(&d))?;
    if diagnostics.warning_count() > 0 {
        diagnostics.print_to_stderr();
    }

    let module = lower_to_ir(&program, &options.target, options.freestanding);
    let c_source = cn_codegen::emit_c(&module, &program).map_err(|e| e.to_string())?;

    let c_path = output.with_extension("c");
    fs::write(&c_path, &c_source).map_err(|e| format!("failed to write {}: {e}", c_path.display()))?;

    check_cc_available().map_err(|e| {
        cleanup(&c_path, output, options.keep_c);
        e.to_string()
    })?;

    let result = invoke_cc(&c_path, output, options.opt);

    if !options.keep_c {
        fs::remove_file(&c_path).ok();
    }

    if let Err(e) = &result {
        fs::remove_file(output).ok();
        return Err(e.clone());
    }

    Ok(())
}

fn invoke_cc(c_path: &Path, output: &Path, opt: OptLevel) -> Result<(), String> {
    let status = std::process::Command::new("cc")
        .arg(opt.as_cc_flag())
        .arg(c_path)
        .arg("-o")
        .arg(output)
        .output()
        .map_err(|e| format!("failed to run cc: {e}"))?;

    if !status.status.success() {
        let stderr = String::from_utf8_lossy(&status.stderr);
        return Err(format!("cc compilation failed:\n{stderr}"));
    }
    Ok(())
}

fn cleanup(c_path: &Path, output: &Path, keep_c: bool) {
    if !keep_c {
        fs::remove_file(c_path).ok();
    }
    fs::remove_file(output).ok();
}

pub fn format_diagnostics(diagnostics: &DiagnosticBag) -> String {
    diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}

/// Resolves the default output path for `cnc build` when `-o` is omitted:
/// the input's file stem, in the current directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    PathBuf::from(input.file_stem().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn check_reports_undefined_identifier() {
        let filename = PathBuf::from("t.cn");
        let result = check("函数 主程序(): 整数 { 返回 未声明变量; }", &filename, false);
        assert!(result.is_err());
    }

    #[test]
    fn check_passes_hello_world() {
        let filename = PathBuf::from("t.cn");
        let source = r#"
        函数 主程序(): 整数 {
            打印行("你好，世界！");
            返回 0;
        }
        "#;
        let result = check(source, &filename, false);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn emit_ir_contains_entry_function() {
        let filename = PathBuf::from("t.cn");
        let source = "函数 主程序(): 整数 { 返回 0; }";
        let text = emit_ir(source, &filename, false, &default_target_triple()).expect("emits IR");
        assert!(text.contains("func 主程序"));
    }

    #[test]
    fn emit_c_contains_main_wrapper() {
        let filename = PathBuf::from("t.cn");
        let source = "函数 主程序(): 整数 { 返回 0; }";
        let text = emit_c(source, &filename, false, &default_target_triple()).expect("emits C");
        assert!(text.contains("int main(void)"));
    }

    #[test]
    fn default_output_path_strips_extension() {
        assert_eq!(default_output_path(Path::new("hello.cn")), PathBuf::from("hello"));
    }

    #[test]
    fn opt_level_parses_both_spellings() {
        assert_eq!("O2".parse::<OptLevel>().unwrap(), OptLevel::O2);
        assert_eq!("2".parse::<OptLevel>().unwrap(), OptLevel::O2);
        assert!("O9".parse::<OptLevel>().is_err());
    }
}
