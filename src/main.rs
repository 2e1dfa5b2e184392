// ABOUTME: Thin CLI over Context: compile/run/macroexpand subcommands, or an interactive REPL

use clap::{Parser, Subcommand};
use lisp_core::config;
use lisp_core::context::Context;
use lisp_core::reader;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor, Editor};
use std::path::PathBuf;

/// A small embedded Lisp compiler and stack VM.
#[derive(Parser, Debug)]
#[command(name = "lisp-core")]
#[command(version = config::VERSION)]
#[command(about = "Compile and run s-expressions on a tiny bytecode VM")]
struct CliArgs {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a form (from a file or given inline) and print its result.
    Run {
        /// Script file to read and execute. If omitted, reads `expr`.
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Inline expression, used when `FILE` is omitted.
        #[arg(long)]
        expr: Option<String>,
    },
    /// Compile a form and print the assembled parameter count, without running it.
    Compile {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(long)]
        expr: Option<String>,
    },
    /// Fully macro-expand a form and print the result, without compiling it.
    Macroexpand {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(long)]
        expr: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    match args.command {
        Some(Command::Run { file, expr }) => run_cmd(file, expr),
        Some(Command::Compile { file, expr }) => compile_cmd(file, expr),
        Some(Command::Macroexpand { file, expr }) => macroexpand_cmd(file, expr),
        None => repl(),
    }
}

fn source_from(file: Option<PathBuf>, expr: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match (file, expr) {
        (Some(path), _) => Ok(std::fs::read_to_string(&path)?),
        (None, Some(e)) => Ok(e),
        (None, None) => Err("expected a FILE argument or --expr".into()),
    }
}

fn run_cmd(file: Option<PathBuf>, expr: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let source = source_from(file, expr)?;
    let ctx = Context::new();
    for form in reader::read_all(ctx.package(), &source)? {
        match ctx.eval(form) {
            Ok(v) => println!("=> {v}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return Err(e.to_string().into());
            }
        }
    }
    Ok(())
}

fn compile_cmd(file: Option<PathBuf>, expr: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let source = source_from(file, expr)?;
    let ctx = Context::new();
    for form in reader::read_all(ctx.package(), &source)? {
        let closure = ctx.compile(form)?;
        println!("compiled ok: {} named parameter(s)", closure.named_count());
    }
    Ok(())
}

fn macroexpand_cmd(file: Option<PathBuf>, expr: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let source = source_from(file, expr)?;
    let ctx = Context::new();
    for form in reader::read_all(ctx.package(), &source)? {
        let expanded = ctx.macro_expand_full(form)?;
        println!("{expanded}");
    }
    Ok(())
}

fn repl() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::new();
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let mut rl: Editor<(), _> = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(config::REPL_HISTORY_FILE);

    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);

    loop {
        match rl.readline("lisp> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if matches!(line.trim(), "(quit)" | "(exit)") {
                    println!("Goodbye!");
                    break;
                }
                match reader::read(ctx.package(), &line) {
                    Ok(form) => match ctx.eval(form) {
                        Ok(v) => println!("=> {v}"),
                        Err(e) => eprintln!("Error: {e}"),
                    },
                    Err(e) => eprintln!("Parse error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }
    let _ = rl.save_history(config::REPL_HISTORY_FILE);
    Ok(())
}
