//! A POSIX/gawk-surface AWK interpreter core (§1, §2): lexer,
//! `@include`/`@namespace` preprocessor, recursive-descent parser,
//! dynamically-typed value model, record/field engine, tree-walking
//! evaluator, I/O layer (files/pipes/coprocesses), and a bounded
//! regex cache — exposed as a library so a thin front-end (the
//! `rawk` binary in `src/bin/`, or any other embedder) can drive it.
//!
//! The command-line surface, translation-catalog loading, and build
//! tooling are explicitly out of scope for this crate's core (§1);
//! [`compile`] and [`Interpreter`] are the contracts those
//! collaborators are written against (§6).

pub mod ast;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod fields;
pub mod interp;
pub mod io;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod regex_cache;
pub mod value;

use std::path::Path;

use error::CompileError;
use preprocessor::{apply_namespaces, resolve_includes, SourceLoader};

pub use environment::Environment;
pub use error::{AwkError, RuntimeError};
pub use interp::Interpreter;
pub use value::Value;

/// Compile AWK source into a [`ast::Program`]: resolve `@include`
/// directives against `base_dir` using `loader`, tokenize the merged
/// buffer, rewrite `@namespace` sections, then parse (§4.2, §4.3).
///
/// This is the one entry point that runs the full compile pipeline;
/// [`parser::parse_program`] alone skips `@include`/`@namespace` and
/// is kept as a lighter-weight path for callers (and tests) that don't
/// need them.
pub fn compile(
    src: &str,
    base_dir: &Path,
    loader: &dyn SourceLoader,
) -> Result<ast::Program, Vec<CompileError>> {
    let merged = resolve_includes(src, base_dir, loader)?;
    let (tokens, offsets) = lexer::tokenize_with_offsets(&merged);
    let tokens = apply_namespaces(tokens)?;
    parser::parse_program_from_tokens(&merged, tokens, offsets)
}

/// Compile several `-f`-style program fragments, concatenated with a
/// synthetic newline between them (§6), then run the full pipeline.
pub fn compile_fragments(
    fragments: &[String],
    base_dir: &Path,
    loader: &dyn SourceLoader,
) -> Result<ast::Program, Vec<CompileError>> {
    let joined = fragments.join("\n");
    compile(&joined, base_dir, loader)
}
