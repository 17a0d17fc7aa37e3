//! The tree-walking evaluator and interpreter driver (§4.8, §2.6):
//! orchestrates BEGIN/main/END execution, owns the field engine, I/O
//! registries, regex cache and PRNG, and dispatches non-local control
//! flow (break/continue/next/nextfile/return/exit) without using the
//! host language's panic/exception machinery (§9).
//!
//! Grounded on the teacher's `commands/awk/interpreter.rs` orchestrator
//! (BEGIN/line/END phases, range-pattern state) and `context.rs`
//! (the single mutable struct everything else operates against),
//! generalized from gawk's POSIX single-pass line loop to ARGV/ARGC
//! multi-file iteration, BEGINFILE/ENDFILE, and getline's file cursor.

pub mod expr;
pub mod stmt;

use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::ast::{Pattern, Program};
use crate::builtins::i18n::{NullTranslator, TextDomainDirs, Translator};
use crate::builtins::math::Prng;
use crate::environment::{ArrayAlias, Environment, Scope};
use crate::error::RuntimeError;
use crate::fields::{resolve_split_mode, Record, SplitMode};
use crate::io::{IoRegistries, RecordReader};
use crate::regex_cache::RegexCache;
use crate::value::Value;

/// How a statement's execution escaped its immediate context (§4.8,
/// §9): a sum type threaded through `exec_stmt`/`exec_block` instead of
/// panics or `std::error::Error`-flavored control flow. Consumed at the
/// boundary it targets (loops eat `Break`/`Continue`, function calls
/// eat `Return`, the record loop eats `Next`/`NextFile`); `Exit`
/// bubbles all the way to the driver.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Next,
    NextFile,
    Return(Value),
    Exit,
}

impl Flow {
    fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }
}

/// The currently-open main input stream plus the bookkeeping needed to
/// advance across ARGV entries the same way for the per-record loop and
/// for plain `getline` (§4.7, §9).
struct MainInput {
    reader: RecordReader<Box<dyn Read>>,
}

pub struct Interpreter {
    pub env: Environment,
    program: Rc<Program>,
    record: Record,
    regex_cache: RegexCache,
    io: IoRegistries,
    prng: Prng,
    textdomains: TextDomainDirs,
    translator: Box<dyn Translator>,
    range_states: Vec<bool>,
    /// Which of FS/FPAT was assigned most recently (§10.6): FPAT mode
    /// stays in effect until the program assigns FS again.
    fpat_active: bool,
    flow: Flow,
    in_end: bool,
    exit_code: i32,
    argv_idx: i64,
    main_input: Option<MainInput>,
    any_file_opened: bool,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

impl Interpreter {
    pub fn new(program: Program, env: Environment) -> Self {
        let n_rules = program.rules.len();
        Interpreter {
            env,
            program: Rc::new(program),
            record: Record::new(),
            regex_cache: RegexCache::new(),
            io: IoRegistries::new(),
            prng: Prng::new(),
            textdomains: TextDomainDirs::new(),
            translator: Box::new(NullTranslator),
            range_states: vec![false; n_rules],
            fpat_active: false,
            flow: Flow::Normal,
            in_end: false,
            exit_code: 0,
            argv_idx: 1,
            main_input: None,
            any_file_opened: false,
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        }
    }

    /// Swap in the output stream `print`/`printf` write to when
    /// unredirected, and the stream diagnostics go to. The embedding
    /// interface (§6) uses this to capture output in memory.
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.stdout = out;
    }

    pub fn set_error_output(&mut self, err: Box<dyn Write>) {
        self.stderr = err;
    }

    pub fn set_translator(&mut self, translator: Box<dyn Translator>) {
        self.translator = translator;
    }

    /// Feed the main per-record loop from an in-memory (or otherwise
    /// already-open) byte source instead of opening an ARGV entry
    /// (§6's embedding interface: running a program string against
    /// input that did not come from a file path). Marks ARGV as
    /// exhausted so the driver doesn't additionally fall back to
    /// reading the process's real stdin once this source is drained.
    pub fn feed_input(&mut self, data: &str) {
        self.main_input = Some(MainInput {
            reader: RecordReader::new(Box::new(io::Cursor::new(data.as_bytes().to_vec()))),
        });
        self.any_file_opened = true;
        self.argv_idx = (self.env.get("ARGC").to_number() as i64).max(self.argv_idx);
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Run the whole program: BEGIN, the per-record main loop (only if
    /// the program has rules other than BEGIN), then END, then close
    /// every open I/O handle (§4.8, §4.11).
    pub fn run(&mut self) -> Result<i32, RuntimeError> {
        self.run_begin()?;
        if !matches!(self.flow, Flow::Exit) && self.needs_input() {
            self.run_main_loop()?;
        }
        self.run_end()?;
        self.io.close_all();
        let _ = self.stdout.flush();
        Ok(self.exit_code)
    }

    fn needs_input(&self) -> bool {
        self.program.rules.iter().any(|r| !matches!(r.pattern, Pattern::Begin))
    }

    fn run_begin(&mut self) -> Result<(), RuntimeError> {
        for i in 0..self.program.rules.len() {
            if matches!(self.program.rules[i].pattern, Pattern::Begin) {
                self.run_rule_action(i)?;
                if matches!(self.flow, Flow::Exit) {
                    break;
                }
                self.flow = Flow::Normal;
            }
        }
        Ok(())
    }

    /// END rules run once; `exit` from inside END stops further END
    /// rules without re-entering (§4.8, §5 Cancellation).
    fn run_end(&mut self) -> Result<(), RuntimeError> {
        if self.in_end {
            return Ok(());
        }
        self.in_end = true;
        self.flow = Flow::Normal;
        for i in 0..self.program.rules.len() {
            if matches!(self.program.rules[i].pattern, Pattern::End) {
                self.run_rule_action(i)?;
                if matches!(self.flow, Flow::Exit) {
                    break;
                }
                self.flow = Flow::Normal;
            }
        }
        self.flow = Flow::Normal;
        Ok(())
    }

    fn run_rule_action(&mut self, rule_idx: usize) -> Result<(), RuntimeError> {
        tracing::trace!(rule_idx, "dispatching rule");
        let action = self.program.rules[rule_idx].action.clone();
        match action {
            Some(stmts) => self.exec_block(&stmts),
            None => self.print_default_record(),
        }
    }

    fn print_default_record(&mut self) -> Result<(), RuntimeError> {
        let mode = self.split_mode()?;
        let ofs = self.env.get("OFS").to_awk_string(&self.env.convfmt());
        let rec = self.record.raw(&mode, &ofs).to_string();
        let ors = self.env.get("ORS").to_awk_string(&self.env.convfmt());
        self.stdout
            .write_all(rec.as_bytes())
            .and_then(|_| self.stdout.write_all(ors.as_bytes()))
            .map_err(|e| RuntimeError::Other(format!("write to stdout failed: {e}")))
    }

    fn main_rule_indices(&self) -> Vec<usize> {
        (0..self.program.rules.len())
            .filter(|&i| {
                !matches!(
                    self.program.rules[i].pattern,
                    Pattern::Begin | Pattern::End | Pattern::BeginFile | Pattern::EndFile
                )
            })
            .collect()
    }

    fn run_main_loop(&mut self) -> Result<(), RuntimeError> {
        let rule_indices = self.main_rule_indices();
        loop {
            if matches!(self.flow, Flow::Exit) {
                break;
            }
            match self.next_main_record()? {
                Some((raw, rt)) => {
                    self.env.set("RT", Value::from_str(rt));
                    self.record.set_raw(raw);
                    for &idx in &rule_indices {
                        if matches!(self.flow, Flow::Exit | Flow::Next | Flow::NextFile) {
                            break;
                        }
                        if self.matches_pattern_for_rule(idx)? {
                            self.run_rule_action(idx)?;
                        }
                    }
                    match self.flow {
                        Flow::Next => self.flow = Flow::Normal,
                        Flow::NextFile => {
                            self.flow = Flow::Normal;
                            if let Some(_prev) = self.main_input.take() {
                                self.run_endfile()?;
                            }
                        }
                        _ => {}
                    }
                }
                None => break,
            }
        }
        Ok(())
    }

    fn matches_pattern_for_rule(&mut self, idx: usize) -> Result<bool, RuntimeError> {
        let pattern = self.program.rules[idx].pattern.clone();
        self.matches_pattern(&pattern, Some(idx))
    }

    fn matches_pattern(&mut self, pattern: &Pattern, range_idx: Option<usize>) -> Result<bool, RuntimeError> {
        match pattern {
            Pattern::Always => Ok(true),
            Pattern::Begin | Pattern::End | Pattern::BeginFile | Pattern::EndFile => Ok(false),
            Pattern::Expr(e) => Ok(self.eval_expr(e)?.is_truthy()),
            Pattern::Regex(pat) => {
                let record = {
                    let mode = self.split_mode()?;
                    let ofs = self.env.get("OFS").to_awk_string(&self.env.convfmt());
                    self.record.raw(&mode, &ofs).to_string()
                };
                let ic = self.env.ignorecase();
                let re = self.regex_cache.get_or_compile(pat, ic)?;
                Ok(re.is_match(&record))
            }
            Pattern::Range(start, end) => {
                let idx = range_idx.expect("range pattern requires a rule index");
                self.match_range(start, end, idx)
            }
        }
    }

    fn match_range(&mut self, start: &Pattern, end: &Pattern, idx: usize) -> Result<bool, RuntimeError> {
        if !self.range_states[idx] {
            if self.matches_pattern(start, None)? {
                let end_matches = self.matches_pattern(end, None)?;
                self.range_states[idx] = !end_matches;
                Ok(true)
            } else {
                Ok(false)
            }
        } else {
            if self.matches_pattern(end, None)? {
                self.range_states[idx] = false;
            }
            Ok(true)
        }
    }

    /// Recompute the active field-splitting mode from the current
    /// FS/FPAT/IGNORECASE (§4.7); cheap enough to redo on each access
    /// rather than cache-invalidate, since splitting itself is lazy.
    fn split_mode(&mut self) -> Result<SplitMode, RuntimeError> {
        let fs = self.env.get("FS").to_awk_string(&self.env.convfmt());
        let fpat = self.env.get("FPAT").to_awk_string(&self.env.convfmt());
        let ic = self.env.ignorecase();
        let paragraph_mode = self.env.get("RS").to_awk_string(&self.env.convfmt()).is_empty();
        resolve_split_mode(&fs, &fpat, self.fpat_active, ic, paragraph_mode, &mut self.regex_cache)
    }

    /// Variable read with interception for the handful of special
    /// variables that are views onto the field engine rather than
    /// plain storage (§4.7, §10.6): currently just NF.
    fn get_var(&mut self, name: &str) -> Result<Value, RuntimeError> {
        if name == "NF" {
            let mode = self.split_mode()?;
            return Ok(Value::Number(self.record.nf(&mode) as f64));
        }
        Ok(self.env.get(name))
    }

    /// Programmatic variable assignment (§6, §10.3): routes through the
    /// same NF/FS/FPAT special-casing the evaluator uses for ordinary
    /// assignment statements, so the CLI's `-v`/`-F` flags and an
    /// embedder's pre-`run` setup can't drift from in-program semantics.
    pub fn set_var(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match name {
            "NF" => {
                let n = value.to_number();
                let new_nf = if n.is_sign_negative() || n < 0.0 { 0 } else { n as usize };
                let mode = self.split_mode()?;
                self.record.set_nf(new_nf, &mode);
                self.env.set("NF", Value::Number(new_nf as f64));
            }
            "FS" => {
                self.fpat_active = false;
                self.env.set("FS", value);
            }
            "FPAT" => {
                self.fpat_active = true;
                self.env.set("FPAT", value);
            }
            _ => self.env.set(name, value),
        }
        Ok(())
    }

    /// `$0`/`$i` read (§4.7, §8 boundary behavior: reading past NF
    /// never changes NF).
    fn get_field(&mut self, index: usize) -> Result<Value, RuntimeError> {
        let mode = self.split_mode()?;
        if index == 0 {
            let ofs = self.env.get("OFS").to_awk_string(&self.env.convfmt());
            Ok(Value::strnum(self.record.raw(&mode, &ofs).to_string()))
        } else {
            Ok(Value::strnum(self.record.get_field(index, &mode)))
        }
    }

    fn set_field(&mut self, index: usize, value: String) -> Result<(), RuntimeError> {
        let mode = self.split_mode()?;
        self.record.set_field(index, value, &mode);
        Ok(())
    }

    /// Resolve `name` to its array handle, promoting an uninitialized
    /// slot in place and, if `name` is a parameter aliased back to an
    /// uninitialized caller variable (§4.5), writing the newly-created
    /// array through to that caller slot too so both sides see the
    /// same handle from here on.
    fn resolve_array(&mut self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(top) = self.env.scopes.last() {
            if let Some(v) = top.vars.get(name).cloned() {
                if let Value::Array(_) = v {
                    return Ok(v);
                }
                if matches!(v, Value::Uninitialized) {
                    if let Some(alias) = top.array_aliases.get(name).cloned() {
                        let arr = self.resolve_array_at(alias.scope_index, &alias.name)?;
                        self.env.scopes.last_mut().unwrap().vars.insert(name.to_string(), arr.clone());
                        return Ok(arr);
                    }
                    let arr = Value::new_array();
                    self.env.scopes.last_mut().unwrap().vars.insert(name.to_string(), arr.clone());
                    return Ok(arr);
                }
                return Err(RuntimeError::ScalarUsedAsArray(name.to_string()));
            }
        }
        self.resolve_array_at(None, name)
    }

    fn resolve_array_at(&mut self, scope_index: Option<usize>, name: &str) -> Result<Value, RuntimeError> {
        match scope_index {
            None => match self.env.globals.get(name).cloned() {
                Some(Value::Array(a)) => Ok(Value::Array(a)),
                Some(Value::Uninitialized) | None => {
                    let arr = Value::new_array();
                    self.env.globals.insert(name.to_string(), arr.clone());
                    Ok(arr)
                }
                _ => Err(RuntimeError::ScalarUsedAsArray(name.to_string())),
            },
            Some(i) => {
                let existing = self.env.scopes[i].vars.get(name).cloned();
                match existing {
                    Some(Value::Array(a)) => Ok(Value::Array(a)),
                    Some(Value::Uninitialized) | None => {
                        if let Some(alias) = self.env.scopes[i].array_aliases.get(name).cloned() {
                            let arr = self.resolve_array_at(alias.scope_index, &alias.name)?;
                            self.env.scopes[i].vars.insert(name.to_string(), arr.clone());
                            return Ok(arr);
                        }
                        let arr = Value::new_array();
                        self.env.scopes[i].vars.insert(name.to_string(), arr.clone());
                        Ok(arr)
                    }
                    _ => Err(RuntimeError::ScalarUsedAsArray(name.to_string())),
                }
            }
        }
    }

    /// Current scope index for alias bookkeeping (§4.5): `None` means
    /// the name would currently resolve to a global.
    fn var_origin(&self, name: &str) -> Option<usize> {
        if let Some(top) = self.env.scopes.last() {
            if top.vars.contains_key(name) {
                return Some(self.env.scopes.len() - 1);
            }
        }
        None
    }

    /// Call a user-defined function (§4.5, §4.6): binds actual
    /// arguments to the callee's formal parameters (scalars by value,
    /// arrays and not-yet-typed bare variables by reference), executes
    /// the body, and returns its `return` value (or uninitialized).
    pub(crate) fn call_user_function(
        &mut self,
        name: &str,
        args: &[crate::ast::Expr],
    ) -> Result<Value, RuntimeError> {
        let func = self
            .program
            .functions
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;

        let mut scope = Scope::default();
        for (i, param) in func.params.iter().enumerate() {
            match args.get(i) {
                None => {
                    scope.vars.insert(param.clone(), Value::Uninitialized);
                }
                Some(crate::ast::Expr::Var(var_name)) => {
                    let current = self.get_var(var_name)?;
                    match current {
                        Value::Array(a) => {
                            scope.vars.insert(param.clone(), Value::Array(a));
                        }
                        Value::Uninitialized => {
                            let origin = self.var_origin(var_name);
                            scope.vars.insert(param.clone(), Value::Uninitialized);
                            scope.array_aliases.insert(
                                param.clone(),
                                ArrayAlias { scope_index: origin, name: var_name.clone() },
                            );
                        }
                        scalar => {
                            scope.vars.insert(param.clone(), scalar);
                        }
                    }
                }
                Some(expr) => {
                    let v = self.eval_expr(expr)?;
                    scope.vars.insert(param.clone(), v);
                }
            }
        }

        self.env.push_scope(scope);
        let result = self.exec_block(&func.body);
        let return_value = match result {
            Ok(()) => match std::mem::replace(&mut self.flow, Flow::Normal) {
                Flow::Return(v) => v,
                Flow::Exit => {
                    self.flow = Flow::Exit;
                    Value::Uninitialized
                }
                other => {
                    // Break/Continue/Next/NextFile escaping a function
                    // body: nothing meaningful to return locally, but
                    // keep propagating so the call site's statement
                    // sees it stop.
                    self.flow = other;
                    Value::Uninitialized
                }
            },
            Err(e) => {
                self.env.pop_scope();
                return Err(e);
            }
        };
        self.env.pop_scope();
        Ok(return_value)
    }

    // ---- input/getline plumbing --------------------------------------

    fn open_source(name: &str) -> Result<Box<dyn Read>, RuntimeError> {
        if name == "-" || name.is_empty() {
            Ok(Box::new(io::stdin()))
        } else {
            std::fs::File::open(name)
                .map(|f| Box::new(f) as Box<dyn Read>)
                .map_err(|_| RuntimeError::CannotOpenFile(name.to_string()))
        }
    }

    fn run_beginfile(&mut self) -> Result<(), RuntimeError> {
        for i in 0..self.program.rules.len() {
            if matches!(self.program.rules[i].pattern, Pattern::BeginFile) {
                self.run_rule_action(i)?;
            }
        }
        Ok(())
    }

    fn run_endfile(&mut self) -> Result<(), RuntimeError> {
        for i in 0..self.program.rules.len() {
            if matches!(self.program.rules[i].pattern, Pattern::EndFile) {
                self.run_rule_action(i)?;
            }
        }
        Ok(())
    }

    /// Open the next ARGV entry as the active main input, skipping
    /// over `var=value` delayed assignments (§6) and empty entries.
    /// Returns `false` once ARGV is exhausted.
    fn open_next_file(&mut self) -> Result<bool, RuntimeError> {
        if let Some(_prev) = self.main_input.take() {
            self.run_endfile()?;
        }
        loop {
            let argc = self.env.get("ARGC").to_number() as i64;
            if self.argv_idx >= argc {
                if !self.any_file_opened {
                    self.any_file_opened = true;
                    self.argv_idx += 1;
                    self.env.set("FILENAME", Value::from_str(""));
                    self.env.set("FNR", Value::Number(0.0));
                    let reader = RecordReader::new(Self::open_source("-")?);
                    self.main_input = Some(MainInput { reader });
                    self.run_beginfile()?;
                    return Ok(true);
                }
                return Ok(false);
            }
            let entry = {
                let arr = self.resolve_array_at(None, "ARGV")?;
                let key = self.argv_idx.to_string();
                arr.as_array().unwrap().borrow().get(&key).cloned().unwrap_or(Value::Uninitialized)
            };
            self.argv_idx += 1;
            let text = entry.to_awk_string(&self.env.convfmt());
            if text.is_empty() {
                continue;
            }
            if let Some((var, val)) = parse_delayed_assignment(&text) {
                let value = if crate::value::looks_like_number(&val) {
                    Value::strnum(val)
                } else {
                    Value::from_str(val)
                };
                self.set_var(&var, value)?;
                continue;
            }
            self.any_file_opened = true;
            tracing::debug!(file = %text, "opening next input file");
            let reader = RecordReader::new(Self::open_source(&text)?);
            self.env.set("FILENAME", Value::from_str(text));
            self.env.set("FNR", Value::Number(0.0));
            self.main_input = Some(MainInput { reader });
            self.run_beginfile()?;
            return Ok(true);
        }
    }

    /// Read the next record from the main input stream, advancing
    /// across ARGV files (running BEGINFILE/ENDFILE) as needed, and
    /// bump NR/FNR — shared by the per-record loop and plain `getline`
    /// (§4.7, §9).
    fn next_main_record(&mut self) -> Result<Option<(String, String)>, RuntimeError> {
        loop {
            if self.main_input.is_none() {
                if !self.open_next_file()? {
                    return Ok(None);
                }
            }
            let rs = self.env.get("RS").to_awk_string(&self.env.convfmt());
            let ic = self.env.ignorecase();
            let got = {
                let input = self.main_input.as_mut().unwrap();
                input.reader.next_record(&rs, &mut self.regex_cache, ic)?
            };
            match got {
                Some((rec, rt)) => {
                    let nr = self.env.get("NR").to_number() + 1.0;
                    let fnr = self.env.get("FNR").to_number() + 1.0;
                    self.env.set("NR", Value::Number(nr));
                    self.env.set("FNR", Value::Number(fnr));
                    return Ok(Some((rec, rt)));
                }
                None => {
                    self.main_input = None;
                    if matches!(self.flow, Flow::NextFile) {
                        self.flow = Flow::Normal;
                    }
                    continue;
                }
            }
        }
    }
}

/// `name=value` delayed assignment recognized among ARGV entries (§6):
/// `name` must look like an AWK identifier.
fn parse_delayed_assignment(text: &str) -> Option<(String, String)> {
    let eq = text.find('=')?;
    let (name, rest) = text.split_at(eq);
    if name.is_empty() {
        return None;
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_string(), rest[1..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn run_program(src: &str, input: &str) -> (String, i32) {
        let program = parse_program(src).expect("parse");
        let env = Environment::new();
        let mut interp = Interpreter::new(program, env);
        let buf: Rc<std::cell::RefCell<Vec<u8>>> = Rc::new(std::cell::RefCell::new(Vec::new()));
        struct Sink(Rc<std::cell::RefCell<Vec<u8>>>);
        impl Write for Sink {
            fn write(&mut self, data: &[u8]) -> io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(data);
                Ok(data.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        interp.set_output(Box::new(Sink(buf.clone())));
        if !input.is_empty() {
            interp.env.set("ARGC", Value::Number(1.0));
            interp.feed_input(input);
        }
        let code = interp.run().expect("run");
        let out = String::from_utf8(buf.borrow().clone()).unwrap();
        (out, code)
    }

    #[test]
    fn hello_world() {
        let (out, code) = run_program(r#"BEGIN { print "Hello, World!" }"#, "");
        assert_eq!(out, "Hello, World!\n");
        assert_eq!(code, 0);
    }

    #[test]
    fn sum_second_field() {
        let (out, _) = run_program("{ s += $2 } END { print s }", "a 1\nb 2\nc 3\n");
        assert_eq!(out, "6\n");
    }

    #[test]
    fn uniq_first_occurrence() {
        let (out, _) = run_program("!seen[$0]++", "x\ny\nx\nz\ny\n");
        assert_eq!(out, "x\ny\nz\n");
    }

    #[test]
    fn gsub_replaces_in_place() {
        let (out, _) = run_program("{ gsub(/o/, \"0\"); print }", "foo bar\nOoops\n");
        assert_eq!(out, "f00 bar\nO0ps\n");
    }

    #[test]
    fn recursive_function_factorial() {
        let (out, _) = run_program(
            "function f(n){ return n<=1 ? 1 : n*f(n-1) } BEGIN { print f(6) }",
            "",
        );
        assert_eq!(out, "720\n");
    }

    #[test]
    fn exit_in_begin_still_runs_end() {
        let (out, code) = run_program(
            r#"BEGIN { print "BEGIN"; exit 42 } END { print "END" }"#,
            "",
        );
        assert_eq!(out, "BEGIN\nEND\n");
        assert_eq!(code, 42);
    }

    #[test]
    fn next_skips_rest_of_rules_for_record() {
        let (out, _) = run_program(
            "/skip/ { next } { print }",
            "print this\nskip this\nprint this too\n",
        );
        assert_eq!(out, "print this\nprint this too\n");
    }

    #[test]
    fn range_pattern_start_end() {
        let (out, _) = run_program(
            "/START/,/END/ { print }",
            "before\nSTART\nmiddle\nEND\nafter\n",
        );
        assert_eq!(out, "START\nmiddle\nEND\n");
    }
}
