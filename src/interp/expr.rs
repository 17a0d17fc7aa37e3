//! Expression evaluation and built-in dispatch (§4.3, §4.4, §4.9).
//!
//! Grounded on the teacher's `commands/awk/expressions.rs`: one
//! `eval_expr` matching over every `Expr` variant, delegating scalar
//! coercions to [`crate::value`] and built-in bodies to
//! [`crate::builtins`].

use std::io::Write;

use crate::ast::{AssignOp, BinOp, CmpOp, Expr, GetlineSource};
use crate::builtins::i18n::Translator as _;
use crate::builtins::{array as b_array, bits, math, printf_fmt, string as b_string, time, types};
use crate::error::RuntimeError;
use crate::value::Value;

use super::Interpreter;

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::from_str(s.clone())),
            Expr::Regex(pat) => {
                let record = self.current_record_text()?;
                let ic = self.env.ignorecase();
                let re = self.regex_cache.get_or_compile(pat, ic)?;
                Ok(types::mkbool(re.is_match(&record)))
            }
            Expr::Var(name) => self.get_var(name),
            Expr::Field(idx_expr) => {
                let idx = self.eval_expr(idx_expr)?.to_number();
                self.get_field(idx.max(0.0) as usize)
            }
            Expr::Index { name, indices } => {
                let key = self.build_subscript(indices)?;
                let arr = self.resolve_array(name)?;
                let handle = arr.as_array().unwrap().clone();
                let existing = handle.borrow().get(&key).cloned();
                Ok(existing.unwrap_or(Value::Uninitialized))
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval_expr(lhs)?.to_number();
                let b = self.eval_expr(rhs)?.to_number();
                Ok(Value::Number(apply_binop(*op, a, b)?))
            }
            Expr::Compare { op, lhs, rhs } => {
                let a = self.eval_expr(lhs)?;
                let b = self.eval_expr(rhs)?;
                let ordering = crate::value::compare_values(&a, &b, &self.env.convfmt(), self.env.ignorecase());
                Ok(types::mkbool(apply_cmpop(*op, ordering)))
            }
            Expr::Concat(parts) => {
                let convfmt = self.env.convfmt();
                let mut out = String::new();
                for p in parts {
                    let v = self.eval_expr(p)?;
                    out.push_str(&v.to_awk_string(&convfmt));
                }
                Ok(Value::from_str(out))
            }
            Expr::Logical { and, lhs, rhs } => {
                let a = self.eval_expr(lhs)?.is_truthy();
                if *and && !a {
                    return Ok(types::mkbool(false));
                }
                if !*and && a {
                    return Ok(types::mkbool(true));
                }
                let b = self.eval_expr(rhs)?.is_truthy();
                Ok(types::mkbool(b))
            }
            Expr::Unary { op, expr } => {
                let v = self.eval_expr(expr)?;
                Ok(match op {
                    crate::ast::UnOp::Neg => Value::Number(-v.to_number()),
                    crate::ast::UnOp::Pos => Value::Number(v.to_number()),
                    crate::ast::UnOp::Not => types::mkbool(!v.is_truthy()),
                })
            }
            Expr::PreIncr(target) => self.incr_decr(target, 1.0, true),
            Expr::PreDecr(target) => self.incr_decr(target, -1.0, true),
            Expr::PostIncr(target) => self.incr_decr(target, 1.0, false),
            Expr::PostDecr(target) => self.incr_decr(target, -1.0, false),
            Expr::Ternary { cond, then, els } => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.eval_expr(then)
                } else {
                    self.eval_expr(els)
                }
            }
            Expr::Assign { op, target, value } => {
                let new_value = if matches!(op, AssignOp::Assign) {
                    self.eval_expr(value)?
                } else {
                    let current = self.eval_lvalue_read(target)?.to_number();
                    let rhs = self.eval_expr(value)?.to_number();
                    let n = match op {
                        AssignOp::Add => current + rhs,
                        AssignOp::Sub => current - rhs,
                        AssignOp::Mul => current * rhs,
                        AssignOp::Div => {
                            if rhs == 0.0 {
                                return Err(RuntimeError::DivisionByZero);
                            }
                            current / rhs
                        }
                        AssignOp::Mod => {
                            if rhs == 0.0 {
                                return Err(RuntimeError::ModuloByZero);
                            }
                            math::fmod(current, rhs)
                        }
                        AssignOp::Pow => current.powf(rhs),
                        AssignOp::Assign => unreachable!(),
                    };
                    Value::Number(n)
                };
                self.assign_to(target, new_value.clone())?;
                Ok(new_value)
            }
            Expr::Match { negate, lhs, rhs } => {
                let s = self.eval_expr(lhs)?.to_awk_string(&self.env.convfmt());
                let pat = self.regex_source(rhs)?;
                let ic = self.env.ignorecase();
                let re = self.regex_cache.get_or_compile(&pat, ic)?;
                let m = re.is_match(&s);
                Ok(types::mkbool(if *negate { !m } else { m }))
            }
            Expr::Call { name, args } => self.eval_call(name, args),
            Expr::IndirectCall { name_expr, args } => {
                let name = self.eval_expr(name_expr)?.to_awk_string(&self.env.convfmt());
                self.eval_call(&name, args)
            }
            Expr::In { indices, array } => {
                let key = self.build_subscript(indices)?;
                let arr = self.resolve_array(array)?;
                let present = arr.as_array().unwrap().borrow().contains_key(&key);
                Ok(types::mkbool(present))
            }
            Expr::Getline { target, source } => self.eval_getline(target.as_deref(), source),
            Expr::Grouping(inner) => self.eval_expr(inner),
        }
    }

    pub(super) fn current_record_text(&mut self) -> Result<String, RuntimeError> {
        let mode = self.split_mode()?;
        let ofs = self.env.get("OFS").to_awk_string(&self.env.convfmt());
        Ok(self.record.raw(&mode, &ofs).to_string())
    }

    /// A bare regex literal used where a string is expected (the right
    /// side of `~`/`!~`, or a dynamic regex built from a string) — both
    /// just need the pattern text.
    fn regex_source(&mut self, expr: &Expr) -> Result<String, RuntimeError> {
        match expr {
            Expr::Regex(pat) => Ok(pat.clone()),
            other => Ok(self.eval_expr(other)?.to_awk_string(&self.env.convfmt())),
        }
    }

    fn build_subscript(&mut self, indices: &[Expr]) -> Result<String, RuntimeError> {
        let convfmt = self.env.convfmt();
        let mut parts = Vec::with_capacity(indices.len());
        for idx in indices {
            parts.push(self.eval_expr(idx)?.to_awk_string(&convfmt));
        }
        Ok(self.env.join_subscript(&parts))
    }

    fn eval_lvalue_read(&mut self, target: &Expr) -> Result<Value, RuntimeError> {
        self.eval_expr(target)
    }

    fn incr_decr(&mut self, target: &Expr, delta: f64, pre: bool) -> Result<Value, RuntimeError> {
        let old = self.eval_lvalue_read(target)?.to_number();
        let new = old + delta;
        self.assign_to(target, Value::Number(new))?;
        Ok(Value::Number(if pre { new } else { old }))
    }

    /// Write `value` through an lvalue expression: a bare variable, a
    /// field, or an array element (§4.3).
    pub(crate) fn assign_to(&mut self, target: &Expr, value: Value) -> Result<(), RuntimeError> {
        match target {
            Expr::Var(name) => self.set_var(name, value),
            Expr::Field(idx_expr) => {
                let idx = self.eval_expr(idx_expr)?.to_number().max(0.0) as usize;
                let text = value.to_awk_string(&self.env.convfmt());
                if idx == 0 {
                    self.record.set_field0(text);
                    Ok(())
                } else {
                    self.set_field(idx, text)
                }
            }
            Expr::Index { name, indices } => {
                let key = self.build_subscript(indices)?;
                let arr = self.resolve_array(name)?;
                arr.as_array().unwrap().borrow_mut().insert(key, value);
                Ok(())
            }
            Expr::Grouping(inner) => self.assign_to(inner, value),
            _ => Err(RuntimeError::Other("invalid assignment target".to_string())),
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
        if crate::builtins::is_builtin(name) {
            return self.call_builtin(name, args);
        }
        self.call_user_function(name, args)
    }

    fn arg_values(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    /// Dispatch a built-in call by name (§4.9). Array-accepting
    /// built-ins (`split`, `length(arr)`, `asort`, `asorti`, `isarray`,
    /// `match`'s 3rd arg, `delete`'s callee `in`) recognize their
    /// argument as an array name by inspecting the unevaluated `Expr`
    /// rather than a value, since an uninitialized bare variable must
    /// be promotable to an array in place.
    fn call_builtin(&mut self, name: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
        let convfmt = self.env.convfmt();
        match name {
            "length" => match args.first() {
                None => {
                    let text = self.current_record_text()?;
                    Ok(Value::Number(b_string::str_length(&text)))
                }
                Some(Expr::Var(vname)) if matches!(self.env.get(vname), Value::Array(_)) => {
                    let arr = self.resolve_array(vname)?;
                    Ok(Value::Number(arr.as_array().unwrap().borrow().len() as f64))
                }
                Some(e) => {
                    let v = self.eval_expr(e)?;
                    if let Value::Array(a) = &v {
                        Ok(Value::Number(a.borrow().len() as f64))
                    } else {
                        Ok(Value::Number(b_string::str_length(&v.to_awk_string(&convfmt))))
                    }
                }
            },
            "substr" => {
                let vals = self.arg_values(args)?;
                let s = vals[0].to_awk_string(&convfmt);
                let start = vals[1].to_number();
                let len = vals.get(2).map(|v| v.to_number());
                Ok(Value::from_str(b_string::substr(&s, start, len)))
            }
            "index" => {
                let vals = self.arg_values(args)?;
                let s = vals[0].to_awk_string(&convfmt);
                let t = vals[1].to_awk_string(&convfmt);
                Ok(Value::Number(b_string::index_of(&s, &t)))
            }
            "split" => self.call_split(args, false),
            "patsplit" => self.call_split(args, true),
            "sub" => self.call_sub_gsub(args, false),
            "gsub" => self.call_sub_gsub(args, true),
            "gensub" => {
                let pat = self.regex_source(&args[0])?;
                let repl = self.eval_expr(&args[1])?.to_awk_string(&convfmt);
                let how = self.eval_expr(&args[2])?.to_awk_string(&convfmt);
                let target = match args.get(3) {
                    Some(e) => self.eval_expr(e)?.to_awk_string(&convfmt),
                    None => self.current_record_text()?,
                };
                let ic = self.env.ignorecase();
                let re = self.regex_cache.get_or_compile(&pat, ic)?;
                Ok(Value::from_str(b_string::gensub(&re, &repl, &how, &target)))
            }
            "match" => {
                let s = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                let pat = self.regex_source(&args[1])?;
                let ic = self.env.ignorecase();
                let re = self.regex_cache.get_or_compile(&pat, ic)?;
                let (rstart, rlength) = b_string::match_pos(&re, &s);
                self.env.set("RSTART", Value::Number(rstart));
                self.env.set("RLENGTH", Value::Number(rlength));
                if let Some(Expr::Var(arr_name)) = args.get(2) {
                    let subsep = self.env.subsep();
                    let entries = b_string::match_captures(&re, &s, &subsep);
                    let arr = self.resolve_array(arr_name)?;
                    let handle = arr.as_array().unwrap().clone();
                    let mut map = handle.borrow_mut();
                    map.clear();
                    for (k, v) in entries {
                        map.insert(k, v);
                    }
                }
                Ok(Value::Number(rstart))
            }
            "tolower" => {
                let s = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::from_str(b_string::tolower(&s)))
            }
            "toupper" => {
                let s = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::from_str(b_string::toupper(&s)))
            }
            "sprintf" => {
                let vals = self.arg_values(args)?;
                let fmt = vals[0].to_awk_string(&convfmt);
                Ok(Value::from_str(printf_fmt::sprintf(&fmt, &vals[1..], &convfmt)))
            }
            "strtonum" => {
                let s = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::Number(b_string::strtonum(&s)))
            }
            "ord" => {
                let s = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::Number(b_string::ord(&s)))
            }
            "chr" => {
                let n = self.eval_expr(&args[0])?.to_number();
                Ok(Value::from_str(b_string::chr(n)))
            }
            "sin" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().sin())),
            "cos" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().cos())),
            "tan" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().tan())),
            "asin" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().asin())),
            "acos" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().acos())),
            "atan2" => {
                let a = self.eval_expr(&args[0])?.to_number();
                let b = self.eval_expr(&args[1])?.to_number();
                Ok(Value::Number(a.atan2(b)))
            }
            "sinh" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().sinh())),
            "cosh" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().cosh())),
            "tanh" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().tanh())),
            "exp" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().exp())),
            "log" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().ln())),
            "log10" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().log10())),
            "log2" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().log2())),
            "sqrt" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().sqrt())),
            "int" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().trunc())),
            "ceil" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().ceil())),
            "floor" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().floor())),
            "round" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().round())),
            "abs" => Ok(Value::Number(self.eval_expr(&args[0])?.to_number().abs())),
            "fmod" => {
                let a = self.eval_expr(&args[0])?.to_number();
                let b = self.eval_expr(&args[1])?.to_number();
                Ok(Value::Number(math::fmod(a, b)))
            }
            "pow" => {
                let a = self.eval_expr(&args[0])?.to_number();
                let b = self.eval_expr(&args[1])?.to_number();
                Ok(Value::Number(a.powf(b)))
            }
            "min" => {
                let vals = self.arg_values(args)?;
                let nums: Vec<f64> = vals.iter().map(|v| v.to_number()).collect();
                Ok(Value::Number(nums.into_iter().fold(f64::INFINITY, f64::min)))
            }
            "max" => {
                let vals = self.arg_values(args)?;
                let nums: Vec<f64> = vals.iter().map(|v| v.to_number()).collect();
                Ok(Value::Number(nums.into_iter().fold(f64::NEG_INFINITY, f64::max)))
            }
            "rand" => Ok(Value::Number(self.prng.rand())),
            "srand" => {
                let seed = match args.first() {
                    Some(e) => self.eval_expr(e)?.to_number(),
                    None => time::systime(),
                };
                Ok(Value::Number(self.prng.srand(seed)))
            }
            "asort" | "asorti" => self.call_asort(name, args),
            "isarray" => match args.first() {
                Some(Expr::Var(vname)) => Ok(types::mkbool(matches!(self.env.get(vname), Value::Array(_)))),
                Some(e) => Ok(types::mkbool(self.eval_expr(e)?.is_array())),
                None => Ok(types::mkbool(false)),
            },
            "close" => {
                let target = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::Number(self.io.close(&target) as f64))
            }
            "fflush" => {
                let target = match args.first() {
                    Some(e) => Some(self.eval_expr(e)?.to_awk_string(&convfmt)),
                    None => None,
                };
                Ok(Value::Number(self.io.fflush(target.as_deref()) as f64))
            }
            "system" => {
                let _ = self.stdout.flush();
                let cmd = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::Number(crate::io::system(&cmd)? as f64))
            }
            "systime" => Ok(Value::Number(time::systime())),
            "mktime" => {
                let spec = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
                Ok(Value::Number(time::mktime(&spec)))
            }
            "strftime" => {
                let fmt = match args.first() {
                    Some(e) => self.eval_expr(e)?.to_awk_string(&convfmt),
                    None => "%a %b %e %H:%M:%S %Z %Y".to_string(),
                };
                let ts = match args.get(1) {
                    Some(e) => self.eval_expr(e)?.to_number(),
                    None => time::systime(),
                };
                Ok(Value::from_str(time::strftime(&fmt, ts)))
            }
            "and" | "or" | "xor" => {
                let vals = self.arg_values(args)?;
                let nums: Vec<f64> = vals.iter().map(|v| v.to_number()).collect();
                let n = match name {
                    "and" => bits::and(&nums),
                    "or" => bits::or(&nums),
                    _ => bits::xor(&nums),
                };
                Ok(Value::Number(n))
            }
            "lshift" => {
                let a = self.eval_expr(&args[0])?.to_number();
                let b = self.eval_expr(&args[1])?.to_number();
                Ok(Value::Number(bits::lshift(a, b)))
            }
            "rshift" => {
                let a = self.eval_expr(&args[0])?.to_number();
                let b = self.eval_expr(&args[1])?.to_number();
                Ok(Value::Number(bits::rshift(a, b)))
            }
            "compl" => {
                let a = self.eval_expr(&args[0])?.to_number();
                Ok(Value::Number(bits::compl(a)))
            }
            "typeof" => match args.first() {
                Some(Expr::Var(vname)) => {
                    let v = self.env.get(vname);
                    Ok(Value::from_str(types::typeof_value(&v)))
                }
                Some(e) => {
                    let v = self.eval_expr(e)?;
                    Ok(Value::from_str(types::typeof_value(&v)))
                }
                None => Ok(Value::from_str("untyped")),
            },
            "mkbool" => {
                let v = self.eval_expr(&args[0])?;
                Ok(types::mkbool(v.is_truthy()))
            }
            "dcgettext" => {
                let vals = self.arg_values(args)?;
                let msgid = vals[0].to_awk_string(&convfmt);
                let domain = vals
                    .get(1)
                    .map(|v| v.to_awk_string(&convfmt))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| self.env.get("TEXTDOMAIN").to_awk_string(&convfmt));
                let category = vals.get(2).map(|v| v.to_awk_string(&convfmt)).unwrap_or_else(|| "LC_MESSAGES".to_string());
                Ok(Value::from_str(self.translator.gettext(&domain, &msgid, &category)))
            }
            "dcngettext" => {
                let vals = self.arg_values(args)?;
                let msgid = vals[0].to_awk_string(&convfmt);
                let plural = vals[1].to_awk_string(&convfmt);
                let n = vals[2].to_number() as i64;
                let domain = vals
                    .get(3)
                    .map(|v| v.to_awk_string(&convfmt))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| self.env.get("TEXTDOMAIN").to_awk_string(&convfmt));
                let category = vals.get(4).map(|v| v.to_awk_string(&convfmt)).unwrap_or_else(|| "LC_MESSAGES".to_string());
                Ok(Value::from_str(self.translator.ngettext(&domain, &msgid, &plural, n, &category)))
            }
            "bindtextdomain" => {
                let vals = self.arg_values(args)?;
                let domain = vals[0].to_awk_string(&convfmt);
                let dir = vals.get(1).map(|v| v.to_awk_string(&convfmt)).unwrap_or_default();
                Ok(Value::from_str(self.textdomains.bind(&domain, &dir)))
            }
            "getline" => Err(RuntimeError::Other("getline is parsed as an expression form, not a call".to_string())),
            other => Err(RuntimeError::UndefinedFunction(other.to_string())),
        }
    }

    fn call_split(&mut self, args: &[Expr], fpat_style: bool) -> Result<Value, RuntimeError> {
        let convfmt = self.env.convfmt();
        let s = self.eval_expr(&args[0])?.to_awk_string(&convfmt);
        let arr_name = match &args[1] {
            Expr::Var(n) => n.clone(),
            _ => return Err(RuntimeError::Other("split's second argument must be an array".to_string())),
        };
        let ic = self.env.ignorecase();
        let parts = if let Some(fs_expr) = args.get(2) {
            let fs = self.regex_source(fs_expr)?;
            let mode = if fpat_style {
                let re = self.regex_cache.get_or_compile(&fs, ic)?;
                crate::fields::SplitMode::FPat(re)
            } else if fs == " " {
                crate::fields::SplitMode::DefaultWhitespace
            } else {
                let mut chars = fs.chars();
                let first = chars.next();
                if let (Some(c), None) = (first, chars.next()) {
                    crate::fields::SplitMode::SingleChar(c)
                } else {
                    let re = self.regex_cache.get_or_compile(&fs, ic)?;
                    crate::fields::SplitMode::Regex(re)
                }
            };
            crate::fields::split_fields(&s, &mode)
        } else {
            let mode = self.split_mode()?;
            crate::fields::split_fields(&s, &mode)
        };
        let arr = self.resolve_array(&arr_name)?;
        let handle = arr.as_array().unwrap().clone();
        {
            let mut map = handle.borrow_mut();
            map.clear();
            for (i, part) in parts.iter().enumerate() {
                map.insert((i + 1).to_string(), Value::strnum(part.clone()));
            }
        }
        if let Some(seps_expr) = args.get(3) {
            if let Expr::Var(seps_name) = seps_expr {
                let seps_arr = self.resolve_array(seps_name)?;
                seps_arr.as_array().unwrap().borrow_mut().clear();
            }
        }
        Ok(Value::Number(parts.len() as f64))
    }

    fn call_sub_gsub(&mut self, args: &[Expr], global: bool) -> Result<Value, RuntimeError> {
        let convfmt = self.env.convfmt();
        let pat = self.regex_source(&args[0])?;
        let repl = self.eval_expr(&args[1])?.to_awk_string(&convfmt);
        let ic = self.env.ignorecase();
        let re = self.regex_cache.get_or_compile(&pat, ic)?;
        let target_expr = args.get(2);
        let original = match target_expr {
            Some(e) => self.eval_expr(e)?.to_awk_string(&convfmt),
            None => self.current_record_text()?,
        };
        let (new_text, count) = if global {
            b_string::gsub_all(&re, &repl, &original)
        } else {
            b_string::sub_once(&re, &repl, &original)
        };
        if count > 0 {
            match target_expr {
                Some(e) => self.assign_to(e, Value::from_str(new_text))?,
                None => self.record.set_field0(new_text),
            }
        }
        Ok(Value::Number(count as f64))
    }

    fn call_asort(&mut self, name: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
        let convfmt = self.env.convfmt();
        let ic = self.env.ignorecase();
        let src_name = match &args[0] {
            Expr::Var(n) => n.clone(),
            _ => return Err(RuntimeError::Other(format!("{name}'s first argument must be an array"))),
        };
        let src = self.resolve_array(&src_name)?;
        let src_handle = src.as_array().unwrap().clone();
        let sorted = if name == "asort" {
            let values: Vec<Value> = src_handle.borrow().values().cloned().collect();
            b_array::asort(values, &convfmt, ic)
        } else {
            let keys: Vec<String> = src_handle.borrow().keys().cloned().collect();
            b_array::asorti(keys, &convfmt, ic)
        };
        let dest_name = match args.get(1) {
            Some(Expr::Var(n)) => n.clone(),
            _ => src_name.clone(),
        };
        let dest = self.resolve_array(&dest_name)?;
        let dest_handle = dest.as_array().unwrap().clone();
        let n = sorted.len();
        *dest_handle.borrow_mut() = sorted;
        Ok(Value::Number(n as f64))
    }

    /// `getline` in all eight forms, driving the shared NR/FNR/NF
    /// update table (§4.7, §9):
    ///
    /// | source      | target | NR  | FNR | NF  |
    /// |-------------|--------|-----|-----|-----|
    /// | Main        | $0     | yes | yes | yes |
    /// | Main        | var    | yes | yes | no  |
    /// | File        | $0     | no  | no  | yes |
    /// | File        | var    | no  | no  | no  |
    /// | Cmd/Coproc  | $0     | yes | no  | yes |
    /// | Cmd/Coproc  | var    | yes | no  | no  |
    fn eval_getline(&mut self, target: Option<&Expr>, source: &GetlineSource) -> Result<Value, RuntimeError> {
        let rs = self.env.get("RS").to_awk_string(&self.env.convfmt());
        let ic = self.env.ignorecase();
        let result = match source {
            GetlineSource::Main => {
                let got = self.next_main_record_for_getline()?;
                return self.apply_getline_result(got, target, true, true);
            }
            GetlineSource::File(path_expr) => {
                let path = self.eval_expr(path_expr)?.to_awk_string(&self.env.convfmt());
                if self.io.ensure_input_file(&path).is_err() {
                    return Ok(Value::Number(-1.0));
                }
                self.io.read_record_from(&path, &rs, &mut self.regex_cache, ic)
            }
            GetlineSource::Cmd(cmd_expr) => {
                let cmd = self.eval_expr(cmd_expr)?.to_awk_string(&self.env.convfmt());
                if self.io.ensure_input_pipe(&cmd).is_err() {
                    return Ok(Value::Number(-1.0));
                }
                self.io.read_record_from(&cmd, &rs, &mut self.regex_cache, ic)
            }
            GetlineSource::Coprocess(cmd_expr) => {
                let cmd = self.eval_expr(cmd_expr)?.to_awk_string(&self.env.convfmt());
                if self.io.ensure_coprocess(&cmd).is_err() {
                    return Ok(Value::Number(-1.0));
                }
                self.io.read_record_from_coprocess(&cmd, &rs, &mut self.regex_cache, ic)
            }
        };
        let bumps_nr = matches!(source, GetlineSource::Cmd(_) | GetlineSource::Coprocess(_));
        match result {
            Ok(got) => self.apply_getline_result(got, target, bumps_nr, false),
            Err(_) => Ok(Value::Number(-1.0)),
        }
    }

    fn next_main_record_for_getline(&mut self) -> Result<Option<(String, String)>, RuntimeError> {
        self.next_main_record()
    }

    fn apply_getline_result(
        &mut self,
        got: Option<(String, String)>,
        target: Option<&Expr>,
        bumps_nr_if_not_main: bool,
        is_main: bool,
    ) -> Result<Value, RuntimeError> {
        let Some((rec, rt)) = got else {
            return Ok(Value::Number(0.0));
        };
        self.env.set("RT", Value::from_str(rt));
        if !is_main && bumps_nr_if_not_main {
            let nr = self.env.get("NR").to_number() + 1.0;
            self.env.set("NR", Value::Number(nr));
        }
        match target {
            Some(lvalue) => {
                self.assign_to(lvalue, Value::strnum(rec))?;
            }
            None => {
                self.record.set_raw(rec);
            }
        }
        Ok(Value::Number(1.0))
    }
}

fn apply_binop(op: BinOp, a: f64, b: f64) -> Result<f64, RuntimeError> {
    Ok(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a / b
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(RuntimeError::ModuloByZero);
            }
            math::fmod(a, b)
        }
        BinOp::Pow => a.powf(b),
    })
}

fn apply_cmpop(op: CmpOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        CmpOp::Eq => ordering == Equal,
        CmpOp::Ne => ordering != Equal,
        CmpOp::Lt => ordering == Less,
        CmpOp::Le => ordering != Greater,
        CmpOp::Gt => ordering == Greater,
        CmpOp::Ge => ordering != Less,
    }
}
