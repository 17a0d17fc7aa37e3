//! Error taxonomies for the interpreter core.
//!
//! Compile-time diagnostics (lexer/parser) and run-time diagnostics are
//! kept as separate enums, matching the two distinct phases they arise
//! from, and both are wrapped by [`AwkError`] for the embedding interface.

use thiserror::Error;

/// A single compile-time diagnostic with source position.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{line}:{column}: {kind}")]
pub struct CompileError {
    pub line: usize,
    pub column: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(line: usize, column: usize, kind: CompileErrorKind) -> Self {
        CompileError { line, column, kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileErrorKind {
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("mismatched bracket: {0}")]
    MismatchedBracket(String),
    #[error("invalid lvalue")]
    InvalidLvalue,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated regex literal")]
    UnterminatedRegex,
    #[error("duplicate function definition: {0}")]
    DuplicateFunction(String),
    #[error("bad @namespace argument: {0}")]
    BadNamespace(String),
    #[error("cannot resolve @include: {0}")]
    IncludeNotFound(String),
}

/// Run-time error kinds, raised while evaluating a parsed program.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("division by zero in %")]
    ModuloByZero,
    #[error("attempt to use array `{0}` as a scalar")]
    ArrayUsedAsScalar(String),
    #[error("attempt to use scalar `{0}` as an array")]
    ScalarUsedAsArray(String),
    #[error("can't open file `{0}`")]
    CannotOpenFile(String),
    #[error("write to `{0}` failed: broken pipe")]
    BrokenPipe(String),
    #[error("can't spawn process `{0}`")]
    CannotSpawn(String),
    #[error("invalid regular expression `{0}`: {1}")]
    BadRegex(String, String),
    #[error("calling undefined function `{0}`")]
    UndefinedFunction(String),
    #[error("wrong number of arguments to `{0}`")]
    WrongArgCount(String),
    #[error("{0}")]
    Other(String),
}

/// Top-level error type returned by the embedding interface.
#[derive(Error, Debug)]
pub enum AwkError {
    #[error("parse error")]
    Parse(Vec<CompileError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CompileResult<T> = Result<T, Vec<CompileError>>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
