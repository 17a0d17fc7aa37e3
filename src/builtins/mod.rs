//! Built-in function surface (§4.9): string, math, array, I/O, time,
//! bitwise, type, and i18n groups. Dispatch lives in
//! [`crate::interp`]; this module holds the pure implementations so
//! they are independently unit-testable.

pub mod array;
pub mod bits;
pub mod i18n;
pub mod math;
pub mod printf_fmt;
pub mod string;
pub mod time;
pub mod types;

/// Every built-in function name, used by the preprocessor to exempt
/// built-in calls from `@namespace` qualification (§4.2) and by the
/// parser/evaluator to decide whether an unresolved call name should
/// be dispatched as a built-in rather than a user function.
pub const BUILTIN_NAMES: &[&str] = &[
    "length", "substr", "index", "split", "sub", "gsub", "gensub", "match", "tolower", "toupper",
    "sprintf", "strtonum", "patsplit", "ord", "chr",
    "sin", "cos", "tan", "atan2", "asin", "acos", "sinh", "cosh", "tanh", "exp", "log", "log10",
    "log2", "sqrt", "int", "ceil", "floor", "round", "abs", "fmod", "pow", "rand", "srand", "min",
    "max",
    "asort", "asorti", "isarray",
    "close", "fflush", "system", "getline",
    "systime", "mktime", "strftime",
    "and", "or", "xor", "lshift", "rshift", "compl",
    "typeof", "mkbool",
    "dcgettext", "dcngettext", "bindtextdomain",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}
