//! `rawk`: a thin reference CLI front-end over the `rawk` library
//! crate (§6, §10.4). Parses `-F`/`-v`/`-f`/program-text/file-argument
//! syntax, builds an [`Environment`], populates ARGV/ARGC/ENVIRON, and
//! drives [`Interpreter::run`]. No interpreter logic lives here.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use rawk::environment::Environment;
use rawk::preprocessor::FsLoader;
use rawk::value::{looks_like_number, Value};
use rawk::Interpreter;

/// An AWK interpreter: reads records from files or standard input,
/// matches each against pattern/action rules, and runs the matching
/// actions.
#[derive(ClapParser)]
#[command(name = "rawk", version, about)]
struct Cli {
    /// Set the input field separator (FS) before BEGIN runs.
    #[arg(short = 'F', value_name = "fs")]
    fs: Option<String>,

    /// Assign `name=value` before BEGIN runs. May be repeated.
    #[arg(short = 'v', value_name = "assignment")]
    assignments: Vec<String>,

    /// Read program text from `path` instead of the first positional
    /// argument. May be repeated; fragments are concatenated in order.
    #[arg(short = 'f', value_name = "progfile")]
    prog_files: Vec<String>,

    /// Program text (when no `-f` is given) followed by input files
    /// and `name=value` delayed assignments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (program_src, input_args) = if !cli.prog_files.is_empty() {
        let mut fragments = Vec::with_capacity(cli.prog_files.len());
        for path in &cli.prog_files {
            match std::fs::read_to_string(path) {
                Ok(text) => fragments.push(text),
                Err(e) => {
                    eprintln!("rawk: can't open program file {path}: {e}");
                    return ExitCode::from(1);
                }
            }
        }
        (fragments.join("\n"), cli.rest.clone())
    } else {
        let mut rest = cli.rest.clone();
        if rest.is_empty() {
            eprintln!("rawk: no program text given (use -f or pass program text)");
            return ExitCode::from(1);
        }
        let src = rest.remove(0);
        (src, rest)
    };

    let base_dir = std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf());
    let loader = FsLoader;
    let program = match rawk::compile(&program_src, &base_dir, &loader) {
        Ok(p) => p,
        Err(errors) => {
            for e in &errors {
                eprintln!("rawk: {e}");
            }
            return ExitCode::from(1);
        }
    };

    let mut env = Environment::new();
    populate_environ(&mut env);
    populate_argv(&mut env, &input_args);

    let mut interp = Interpreter::new(program, env);

    if let Some(fs) = &cli.fs {
        if let Err(e) = interp.set_var("FS", Value::from_str(unescape_fs(fs))) {
            eprintln!("rawk: {e}");
            return ExitCode::from(1);
        }
    }

    for assignment in &cli.assignments {
        match parse_assignment(assignment) {
            Some((name, value)) => {
                let v = if looks_like_number(&value) {
                    Value::strnum(value)
                } else {
                    Value::from_str(value)
                };
                if let Err(e) = interp.set_var(&name, v) {
                    eprintln!("rawk: {e}");
                    return ExitCode::from(1);
                }
            }
            None => {
                eprintln!("rawk: invalid -v assignment `{assignment}`, expected name=value");
                return ExitCode::from(1);
            }
        }
    }

    match interp.run() {
        Ok(code) => ExitCode::from(code.rem_euclid(256) as u8),
        Err(e) => {
            eprintln!("rawk: {e}");
            ExitCode::from(1)
        }
    }
}

/// ARGV[0] is the program name; ARGV[1..] are the remaining
/// command-line arguments (input files and delayed assignments),
/// exactly as the interpreter driver expects to find them (§6, §4.8).
fn populate_argv(env: &mut Environment, input_args: &[String]) {
    let argv = env.get("ARGV");
    let arr = argv.as_array().expect("ARGV is always an array");
    arr.borrow_mut().insert("0".to_string(), Value::from_str("awk"));
    for (i, arg) in input_args.iter().enumerate() {
        arr.borrow_mut().insert((i + 1).to_string(), Value::strnum(arg.clone()));
    }
    env.set("ARGC", Value::Number((input_args.len() + 1) as f64));
}

/// ENVIRON is populated from the process environment at start-up (§6).
fn populate_environ(env: &mut Environment) {
    let environ = env.get("ENVIRON");
    let arr = environ.as_array().expect("ENVIRON is always an array");
    for (k, v) in std::env::vars() {
        arr.borrow_mut().insert(k, Value::strnum(v));
    }
}

fn parse_assignment(text: &str) -> Option<(String, String)> {
    let eq = text.find('=')?;
    let (name, rest) = text.split_at(eq);
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), rest[1..].to_string()))
}

/// `-F`'s argument goes through the same backslash-escape handling as
/// a string literal's escapes (§4.1) so `-F'\t'` works as shells
/// commonly pass it.
fn unescape_fs(raw: &str) -> String {
    if raw == "\\t" {
        return "\t".to_string();
    }
    raw.to_string()
}
