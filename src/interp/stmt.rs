//! Statement execution (§4.6, §4.8): control flow, `print`/`printf`
//! with redirection, `delete`, and `switch`'s non-fallthrough dispatch.
//!
//! Grounded on the teacher's `commands/awk/interpreter.rs` statement
//! dispatch, generalized from its ad hoc `should_break`/`should_continue`
//! booleans to the shared [`Flow`] enum (§9) so control flow composes
//! correctly across nested loops, switches, and function calls.

use std::io::Write;

use crate::ast::{CaseLabel, Expr, RedirectKind, Stmt};
use crate::ast::Redirect;
use crate::error::RuntimeError;
use crate::value::Value;

use super::{Flow, Interpreter};

impl Interpreter {
    pub(crate) fn exec_block(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
            if !matches!(self.flow, Flow::Normal) {
                break;
            }
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e)?;
                Ok(())
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
            Stmt::Print { args, redirect } => self.exec_print(args, redirect.as_ref(), false),
            Stmt::Printf { args, redirect } => self.exec_print(args, redirect.as_ref(), true),
            Stmt::If { cond, then, els } => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.exec_stmt(then)
                } else if let Some(els) = els {
                    self.exec_stmt(els)
                } else {
                    Ok(())
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_expr(cond)?.is_truthy() {
                    self.exec_stmt(body)?;
                    match self.flow {
                        Flow::Break => {
                            self.flow = Flow::Normal;
                            break;
                        }
                        Flow::Continue => self.flow = Flow::Normal,
                        Flow::Normal => {}
                        _ => break,
                    }
                }
                Ok(())
            }
            Stmt::DoWhile { body, cond } => {
                loop {
                    self.exec_stmt(body)?;
                    match self.flow {
                        Flow::Break => {
                            self.flow = Flow::Normal;
                            break;
                        }
                        Flow::Continue => self.flow = Flow::Normal,
                        Flow::Normal => {}
                        _ => break,
                    }
                    if !self.eval_expr(cond)?.is_truthy() {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::For { init, cond, update, body } => {
                if let Some(init) = init {
                    self.exec_stmt(init)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_expr(cond)?.is_truthy() {
                            break;
                        }
                    }
                    self.exec_stmt(body)?;
                    match self.flow {
                        Flow::Break => {
                            self.flow = Flow::Normal;
                            break;
                        }
                        Flow::Continue => self.flow = Flow::Normal,
                        Flow::Normal => {}
                        _ => break,
                    }
                    if let Some(update) = update {
                        self.exec_stmt(update)?;
                    }
                }
                Ok(())
            }
            Stmt::ForIn { var, array, body } => self.exec_for_in(var, array, body),
            Stmt::Switch { subject, cases, default } => self.exec_switch(subject, cases, default.as_deref()),
            Stmt::Break => {
                self.flow = Flow::Break;
                Ok(())
            }
            Stmt::Continue => {
                self.flow = Flow::Continue;
                Ok(())
            }
            Stmt::Next => {
                self.flow = Flow::Next;
                Ok(())
            }
            Stmt::NextFile => {
                self.flow = Flow::NextFile;
                Ok(())
            }
            Stmt::Exit(code_expr) => {
                if let Some(e) = code_expr {
                    let n = self.eval_expr(e)?.to_number();
                    self.exit_code = n as i32;
                }
                self.flow = Flow::Exit;
                Ok(())
            }
            Stmt::Return(value_expr) => {
                let v = match value_expr {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Uninitialized,
                };
                self.flow = Flow::Return(v);
                Ok(())
            }
            Stmt::Delete { array, indices } => {
                let arr = self.resolve_array(array)?;
                let handle = arr.as_array().unwrap().clone();
                if indices.is_empty() {
                    handle.borrow_mut().clear();
                } else {
                    let convfmt = self.env.convfmt();
                    let mut parts = Vec::with_capacity(indices.len());
                    for idx in indices {
                        parts.push(self.eval_expr(idx)?.to_awk_string(&convfmt));
                    }
                    let key = self.env.join_subscript(&parts);
                    handle.borrow_mut().shift_remove(&key);
                }
                Ok(())
            }
        }
    }

    /// For-in iterates a *snapshot* of the keys present when the loop
    /// starts (§9 Open Question: POSIX leaves concurrent mutation
    /// unspecified; a snapshot makes the behavior deterministic without
    /// forbidding mutation inside the body).
    fn exec_for_in(&mut self, var: &str, array: &str, body: &Stmt) -> Result<(), RuntimeError> {
        let arr = self.resolve_array(array)?;
        let handle = arr.as_array().unwrap().clone();
        let keys: Vec<String> = handle.borrow().keys().cloned().collect();
        for key in keys {
            self.set_var(var, Value::strnum(key))?;
            self.exec_stmt(body)?;
            match self.flow {
                Flow::Break => {
                    self.flow = Flow::Normal;
                    break;
                }
                Flow::Continue => self.flow = Flow::Normal,
                Flow::Normal => {}
                _ => break,
            }
        }
        Ok(())
    }

    /// Non-fallthrough switch (§4.3, §10.6): find the first matching case
    /// (or `default` if nothing matches and one is present) and run only
    /// that body, then stop. gawk does not fall through into the next
    /// case. `break` inside the body is otherwise optional; if present it
    /// just ends the body early like it does for any other statement list.
    fn exec_switch(
        &mut self,
        subject: &Expr,
        cases: &[(CaseLabel, Vec<Stmt>)],
        default: Option<&[Stmt]>,
    ) -> Result<(), RuntimeError> {
        let value = self.eval_expr(subject)?;
        let convfmt = self.env.convfmt();
        let ignorecase = self.env.ignorecase();

        let mut matched = None;
        for (label, body) in cases.iter() {
            if self.case_label_matches(label, &value, &convfmt, ignorecase)? {
                matched = Some(body.as_slice());
                break;
            }
        }
        let body = match matched.or(default) {
            Some(b) => b,
            None => return Ok(()),
        };

        for stmt in body {
            self.exec_stmt(stmt)?;
            if !matches!(self.flow, Flow::Normal) {
                break;
            }
        }
        if matches!(self.flow, Flow::Break) {
            self.flow = Flow::Normal;
        }
        Ok(())
    }

    fn case_label_matches(
        &mut self,
        label: &CaseLabel,
        value: &Value,
        convfmt: &str,
        ignorecase: bool,
    ) -> Result<bool, RuntimeError> {
        Ok(match label {
            CaseLabel::Number(n) => value.is_numeric_context() && value.to_number() == *n,
            CaseLabel::Str(s) => {
                let ordering = crate::value::compare_values(value, &Value::from_str(s.clone()), convfmt, ignorecase);
                ordering == std::cmp::Ordering::Equal
            }
            CaseLabel::Regex(pat) => {
                let s = value.to_awk_string(convfmt);
                let re = self.regex_cache.get_or_compile(pat, ignorecase)?;
                re.is_match(&s)
            }
        })
    }

    fn exec_print(&mut self, args: &[Expr], redirect: Option<&Redirect>, is_printf: bool) -> Result<(), RuntimeError> {
        let ofmt = self.env.ofmt();
        let convfmt = self.env.convfmt();
        let text = if is_printf {
            let vals: Result<Vec<Value>, RuntimeError> = args.iter().map(|a| self.eval_expr(a)).collect();
            let vals = vals?;
            if vals.is_empty() {
                return Err(RuntimeError::WrongArgCount("printf".to_string()));
            }
            let fmt = vals[0].to_awk_string(&convfmt);
            crate::builtins::printf_fmt::sprintf(&fmt, &vals[1..], &convfmt)
        } else if args.is_empty() {
            self.current_record_text()?
        } else {
            let ofs = self.env.get("OFS").to_awk_string(&convfmt);
            let mut parts = Vec::with_capacity(args.len());
            for a in args {
                let v = self.eval_expr(a)?;
                parts.push(v.to_output_string(&ofmt));
            }
            parts.join(&ofs)
        };

        match redirect {
            None => {
                let ors = self.env.get("ORS").to_awk_string(&convfmt);
                self.write_stdout(&text)?;
                self.write_stdout(&ors)?;
                Ok(())
            }
            Some(r) => {
                let ors = self.env.get("ORS").to_awk_string(&convfmt);
                let target = self.eval_expr(&r.target)?.to_awk_string(&convfmt);
                let full = format!("{text}{ors}");
                match r.kind {
                    RedirectKind::Write => {
                        self.io.ensure_output_file(&target, false)?;
                        self.io.write_to(&target, &full)
                    }
                    RedirectKind::Append => {
                        self.io.ensure_output_file(&target, true)?;
                        self.io.write_to(&target, &full)
                    }
                    RedirectKind::Pipe => {
                        let _ = self.stdout.flush();
                        self.io.ensure_output_pipe(&target)?;
                        self.io.write_to(&target, &full)
                    }
                    RedirectKind::PipeBoth => {
                        self.io.ensure_coprocess(&target)?;
                        self.io.write_to_coprocess(&target, &full)
                    }
                    RedirectKind::None => self.write_stdout(&full),
                }
            }
        }
    }

    fn write_stdout(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.stdout
            .write_all(text.as_bytes())
            .map_err(|e| RuntimeError::Other(format!("write to stdout failed: {e}")))
    }
}
