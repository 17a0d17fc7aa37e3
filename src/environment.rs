//! Name tables: globals, the lexical scope stack used for function
//! calls, and the built-in special variables that are always present.

use std::collections::HashMap;

use crate::value::Value;

/// Special variables that POSIX/gawk give a predefined meaning. These
/// are never subject to `@namespace` qualification (§4.2) and always
/// exist with a sensible default even before a program touches them.
pub const SPECIAL_VARS: &[&str] = &[
    "FS", "RS", "OFS", "ORS", "NR", "NF", "FNR", "FILENAME", "SUBSEP", "CONVFMT", "OFMT",
    "RSTART", "RLENGTH", "ARGC", "ARGV", "ENVIRON", "IGNORECASE", "RT", "FPAT", "TEXTDOMAIN",
    "PROCINFO",
];

pub fn is_special_var(name: &str) -> bool {
    SPECIAL_VARS.contains(&name)
}

/// Where an as-yet-uninitialized array-parameter formal should write
/// through once it is promoted to an array inside the callee (§4.5):
/// either a global, or another still-live call frame identified by its
/// position in [`Environment::scopes`]. Populated at call sites for
/// bare-variable arguments that were uninitialized at the call, so that
/// `function f(a) { a[1] = 1 }` called as `f(x)` turns `x` itself into
/// an array even though `x` held no value yet.
#[derive(Debug, Clone)]
pub struct ArrayAlias {
    pub scope_index: Option<usize>,
    pub name: String,
}

/// A single lexical scope: the local variables/arrays of one active
/// function-call frame, keyed by formal-parameter name.
#[derive(Debug, Default)]
pub struct Scope {
    pub vars: HashMap<String, Value>,
    pub array_aliases: HashMap<String, ArrayAlias>,
}

/// The name table: globals plus a stack of function-call scopes.
/// Lookup falls through from the innermost scope to globals, matching
/// the one-level-deep dynamic scoping AWK functions actually have (no
/// nested function literals, so there is never more than the current
/// call frame plus globals).
pub struct Environment {
    pub globals: HashMap<String, Value>,
    pub scopes: Vec<Scope>,
}

impl Environment {
    pub fn new() -> Self {
        let mut globals = HashMap::new();
        globals.insert("FS".into(), Value::from_str(" "));
        globals.insert("RS".into(), Value::from_str("\n"));
        globals.insert("OFS".into(), Value::from_str(" "));
        globals.insert("ORS".into(), Value::from_str("\n"));
        globals.insert("NR".into(), Value::Number(0.0));
        globals.insert("NF".into(), Value::Number(0.0));
        globals.insert("FNR".into(), Value::Number(0.0));
        globals.insert("FILENAME".into(), Value::from_str(""));
        globals.insert("SUBSEP".into(), Value::from_str("\u{1c}"));
        globals.insert("CONVFMT".into(), Value::from_str("%.6g"));
        globals.insert("OFMT".into(), Value::from_str("%.6g"));
        globals.insert("RSTART".into(), Value::Number(0.0));
        globals.insert("RLENGTH".into(), Value::Number(-1.0));
        globals.insert("ARGC".into(), Value::Number(1.0));
        globals.insert("ARGV".into(), Value::new_array());
        globals.insert("ENVIRON".into(), Value::new_array());
        globals.insert("PROCINFO".into(), Value::new_array());
        globals.insert("IGNORECASE".into(), Value::Number(0.0));
        globals.insert("RT".into(), Value::from_str(""));
        globals.insert("FPAT".into(), Value::from_str(""));
        globals.insert("TEXTDOMAIN".into(), Value::from_str("messages"));
        Environment {
            globals,
            scopes: Vec::new(),
        }
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> Scope {
        self.scopes.pop().expect("scope stack underflow")
    }

    fn top_scope_mut(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    fn top_scope(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// True if `name` is bound as a local (formal parameter) in the
    /// current call frame.
    pub fn is_local(&self, name: &str) -> bool {
        self.top_scope().map(|s| s.vars.contains_key(name)).unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Value {
        if let Some(scope) = self.top_scope() {
            if let Some(v) = scope.vars.get(name) {
                return v.clone();
            }
        }
        self.globals.get(name).cloned().unwrap_or(Value::Uninitialized)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.top_scope_mut() {
            if scope.vars.contains_key(name) {
                scope.vars.insert(name.to_string(), value);
                return;
            }
        }
        self.globals.insert(name.to_string(), value);
    }

    /// Fetch-or-create the array behind `name`, promoting an
    /// uninitialized scalar to an empty array in place. Returns an
    /// error message if `name` already holds a non-array scalar.
    pub fn get_array(&mut self, name: &str) -> Result<Value, String> {
        let existing = self.get(name);
        match existing {
            Value::Array(_) => Ok(existing),
            Value::Uninitialized => {
                let arr = Value::new_array();
                self.set(name, arr.clone());
                Ok(arr)
            }
            _ => Err(name.to_string()),
        }
    }

    pub fn convfmt(&self) -> String {
        self.get("CONVFMT").to_awk_string("%.6g")
    }

    pub fn ofmt(&self) -> String {
        self.get("OFMT").to_awk_string("%.6g")
    }

    pub fn subsep(&self) -> String {
        self.get("SUBSEP").to_awk_string(&self.convfmt())
    }

    pub fn ignorecase(&self) -> bool {
        self.get("IGNORECASE").is_truthy()
    }

    pub fn join_subscript(&self, parts: &[String]) -> String {
        parts.join(&self.subsep())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
