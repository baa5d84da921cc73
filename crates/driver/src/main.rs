//! `cnc`: command-line entry point. Argument parsing, file I/O, and stdout
//! plumbing live here; every actual pipeline phase lives in `cn_driver`
//! (and the library crates it wires together) so it stays unit-testable
//! without spawning a process.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use cn_driver::{BuildOptions, ExplicitFlags, OptLevel, ProjectConfig};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

fn unwrap_or_exit<T>(result: Result<T, String>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(name = "cnc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CN compiler - compile .cn programs to executables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .cn file to an executable
    Build {
        /// Input .cn source file
        input: PathBuf,

        /// Output executable path (defaults to the input's file stem)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compile for freestanding (no hosted I/O, no libc main) mode
        #[arg(long)]
        freestanding: bool,

        /// Target triple passed through to the IR and C backend
        #[arg(long)]
        target: Option<String>,

        /// Optimization level forwarded to the C compiler (defaults to O0,
        /// or a `cn.toml` project default, if neither is set)
        #[arg(long)]
        opt: Option<String>,

        /// Keep the intermediate .c file instead of deleting it
        #[arg(long)]
        keep_c: bool,
    },

    /// Run semantic analysis only and print diagnostics
    Check {
        /// Input .cn source file
        input: PathBuf,

        /// Check as freestanding (no hosted I/O) mode
        #[arg(long)]
        freestanding: bool,
    },

    /// Emit the optimized IR as text
    EmitIr {
        /// Input .cn source file
        input: PathBuf,

        #[arg(long)]
        freestanding: bool,

        #[arg(long)]
        target: Option<String>,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Emit the generated C translation unit
    EmitC {
        /// Input .cn source file
        input: PathBuf,

        #[arg(long)]
        freestanding: bool,

        #[arg(long)]
        target: Option<String>,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, freestanding, target, opt, keep_c } => {
            run_build(&input, output.as_deref(), freestanding, target, opt, keep_c);
        }
        Commands::Check { input, freestanding } => run_check(&input, freestanding),
        Commands::EmitIr { input, freestanding, target, output } => {
            run_emit_ir(&input, freestanding, target, output.as_deref());
        }
        Commands::EmitC { input, freestanding, target, output } => {
            run_emit_c(&input, freestanding, target, output.as_deref());
        }
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn read_source_or_exit(input: &Path) -> String {
    match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read {}: {e}", input.display());
            process::exit(1);
        }
    }
}

fn run_build(
    input: &Path,
    output: Option<&Path>,
    freestanding: bool,
    target: Option<String>,
    opt: Option<String>,
    keep_c: bool,
) {
    let output = output.map(PathBuf::from).unwrap_or_else(|| cn_driver::default_output_path(input));

    let config_dir = input.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let project = unwrap_or_exit(ProjectConfig::load_from_dir(config_dir));

    let explicit = ExplicitFlags {
        freestanding,
        target: target.is_some(),
        opt: opt.is_some(),
        keep_c,
    };

    let mut options = BuildOptions { freestanding, keep_c, ..BuildOptions::default() };
    if let Some(target) = target {
        options.target = target;
    }
    if let Some(opt) = opt {
        options.opt = unwrap_or_exit(opt.parse::<OptLevel>());
    }
    let options = options.apply_project_config(&project, &explicit);

    tracing::info!(input = %input.display(), output = %output.display(), "starting build");

    match cn_driver::build(input, &output, &options) {
        Ok(()) => println!("Compiled {} -> {}", input.display(), output.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_check(input: &Path, freestanding: bool) {
    let source = read_source_or_exit(input);
    match cn_driver::check(&source, input, freestanding) {
        Ok(diagnostics) => {
            diagnostics.print_to_stderr();
            println!("No errors found in {}", input.display());
        }
        Err(diagnostics) => {
            diagnostics.print_to_stderr();
            process::exit(1);
        }
    }
}

fn run_emit_ir(input: &Path, freestanding: bool, target: Option<String>, output: Option<&Path>) {
    let source = read_source_or_exit(input);
    let target = target.unwrap_or_else(cn_driver::default_target_triple);
    match cn_driver::emit_ir(&source, input, freestanding, &target) {
        Ok(text) => write_artifact(&text, output),
        Err(diagnostics) => {
            diagnostics.print_to_stderr();
            process::exit(1);
        }
    }
}

fn run_emit_c(input: &Path, freestanding: bool, target: Option<String>, output: Option<&Path>) {
    let source = read_source_or_exit(input);
    let target = target.unwrap_or_else(cn_driver::default_target_triple);
    match cn_driver::emit_c(&source, input, freestanding, &target) {
        Ok(text) => write_artifact(&text, output),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn write_artifact(text: &str, output: Option<&Path>) {
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("Error: failed to write {}: {e}", path.display());
                process::exit(1);
            }
        }
        None => print!("{text}"),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cnc", &mut io::stdout());
}
