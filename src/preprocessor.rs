//! `@include`/`@namespace` resolution (§4.2).
//!
//! `@include` is resolved as a textual splice over the *merged*
//! program source, before a single lexer pass runs — this keeps the
//! lexer's regex/division disambiguation and its `rescan_as_regex` hook
//! (§4.1, §9) working against one contiguous buffer instead of having
//! to reconcile byte offsets across spliced per-file token streams.
//! `@namespace` is resolved afterwards, as a token-stream rewrite,
//! since it only needs to recognize identifiers and is independent of
//! include boundaries (a namespace declared inside an included file
//! applies only until the next `@namespace` or end of file, exactly as
//! if the text had been pasted in directly, which is what happened).
//!
//! Line numbers inside spliced-in content are relative to the merged
//! buffer rather than the original included file — a known
//! simplification over tracking per-file source maps, noted in
//! DESIGN.md.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::ast::{Token, TokenKind};
use crate::builtins::is_builtin;
use crate::environment::is_special_var;
use crate::error::{CompileError, CompileErrorKind};

/// Reads program source from disk; factored out as a trait so the
/// embedding interface can swap in an in-memory loader for tests
/// without touching the filesystem (§6).
pub trait SourceLoader {
    fn read(&self, path: &Path) -> Result<String, String>;
    fn canonicalize(&self, path: &Path) -> PathBuf;
}

pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn read(&self, path: &Path) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|e| e.to_string())
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Resolve every `@include` directive reachable from `src` (treated as
/// if it lived in `base_dir`), returning the fully-merged source text.
/// A directive re-including an already-included file (by canonicalized
/// path, §4.2) is replaced with nothing, silently.
pub fn resolve_includes(
    src: &str,
    base_dir: &Path,
    loader: &dyn SourceLoader,
) -> Result<String, Vec<CompileError>> {
    let mut seen = HashSet::new();
    expand(src, base_dir, loader, &mut seen)
}

fn expand(
    src: &str,
    base_dir: &Path,
    loader: &dyn SourceLoader,
    seen: &mut HashSet<PathBuf>,
) -> Result<String, Vec<CompileError>> {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    let mut line = 1usize;
    loop {
        let Some(at_pos) = find_directive(rest, "@include") else {
            out.push_str(rest);
            break;
        };
        let (before, after_kw) = rest.split_at(at_pos);
        out.push_str(before);
        line += before.matches('\n').count();
        let after_kw = &after_kw["@include".len()..];
        let (path_str, after_path) = match parse_quoted_string(after_kw) {
            Some(v) => v,
            None => {
                return Err(vec![CompileError::new(
                    line,
                    1,
                    CompileErrorKind::IncludeNotFound("expected a quoted path after @include".into()),
                )])
            }
        };
        let path = Path::new(&path_str);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        let canon = loader.canonicalize(&resolved);
        if !seen.contains(&canon) {
            let contents = loader.read(&resolved).map_err(|_| {
                vec![CompileError::new(
                    line,
                    1,
                    CompileErrorKind::IncludeNotFound(path_str.clone()),
                )]
            })?;
            seen.insert(canon);
            let included_dir = resolved.parent().map(Path::to_path_buf).unwrap_or_else(|| base_dir.to_path_buf());
            let expanded = expand(&contents, &included_dir, loader, seen)?;
            out.push_str(&expanded);
            out.push('\n');
        }
        rest = after_path;
    }
    Ok(out)
}

/// Find a bare `@include`/`@namespace` keyword occurrence that is not
/// part of a longer identifier and not inside a string/regex/comment.
/// A full lexer pass would be more precise, but directives only ever
/// appear at statement boundaries in valid programs, so a
/// comment/string-aware scan is sufficient here.
fn find_directive(text: &str, keyword: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    let mut in_regex = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if in_regex {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == '/' {
                in_regex = false;
            }
            i += 1;
            continue;
        }
        if c == '#' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            i += 1;
            continue;
        }
        if text[i..].starts_with(keyword) {
            let prev_ok = i == 0 || !(bytes[i - 1] as char).is_ascii_alphanumeric();
            let after = i + keyword.len();
            let next_ok = after >= bytes.len() || !(bytes[after] as char).is_ascii_alphanumeric();
            if prev_ok && next_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Parse a `"..."`-quoted string starting right after leading
/// whitespace in `text`, returning the unescaped-enough path text and
/// the remainder of `text` after the closing quote. Directive
/// arguments don't need the lexer's full escape handling, just quotes.
fn parse_quoted_string(text: &str) -> Option<(String, &str)> {
    let trimmed = text.trim_start_matches(|c: char| c == ' ' || c == '\t');
    let mut chars = trimmed.char_indices();
    let (_, first) = chars.next()?;
    if first != '"' {
        return None;
    }
    for (idx, c) in chars {
        if c == '"' {
            let value = trimmed[1..idx].to_string();
            return Some((value, &trimmed[idx + 1..]));
        }
    }
    None
}

/// The default namespace; unqualified names here are left alone (§4.2).
const DEFAULT_NAMESPACE: &str = "awk";

/// Rewrite unqualified identifiers inside `@namespace "ns"` sections as
/// `ns::name`, exempting special variables, built-in function names,
/// and identifiers already explicitly qualified with `::`.
pub fn apply_namespaces(tokens: Vec<Token>) -> Result<Vec<Token>, Vec<CompileError>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut ns = DEFAULT_NAMESPACE.to_string();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Namespace => {
                let (line, column) = (tokens[i].line, tokens[i].column);
                match tokens.get(i + 1) {
                    Some(Token { kind: TokenKind::String(name), .. }) => {
                        ns = name.clone();
                        i += 2;
                    }
                    _ => {
                        return Err(vec![CompileError::new(
                            line,
                            column,
                            CompileErrorKind::BadNamespace("expected a string name after @namespace".into()),
                        )]);
                    }
                }
                continue;
            }
            TokenKind::Ident(name) | TokenKind::FuncName(name) => {
                let is_func = matches!(tokens[i].kind, TokenKind::FuncName(_));
                let prev_is_scope = out
                    .last()
                    .map(|t: &Token| t.kind == TokenKind::ColonColon)
                    .unwrap_or(false);
                let next_is_scope = tokens
                    .get(i + 1)
                    .map(|t| t.kind == TokenKind::ColonColon)
                    .unwrap_or(false);
                let exempt = ns == DEFAULT_NAMESPACE
                    || prev_is_scope
                    || next_is_scope
                    || is_special_var(name)
                    || is_builtin(name);
                if exempt {
                    out.push(tokens[i].clone());
                } else {
                    let mut tok = tokens[i].clone();
                    let qualified = format!("{ns}::{name}");
                    tok.kind = if is_func {
                        TokenKind::FuncName(qualified)
                    } else {
                        TokenKind::Ident(qualified)
                    };
                    out.push(tok);
                }
                i += 1;
            }
            _ => {
                out.push(tokens[i].clone());
                i += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MemLoader {
        files: RefCell<HashMap<PathBuf, String>>,
    }

    impl SourceLoader for MemLoader {
        fn read(&self, path: &Path) -> Result<String, String> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| "not found".to_string())
        }

        fn canonicalize(&self, path: &Path) -> PathBuf {
            path.to_path_buf()
        }
    }

    #[test]
    fn include_splices_source_text() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("/base/lib.awk"), "function f() { return 1 }".to_string());
        let loader = MemLoader { files: RefCell::new(files) };
        let merged = resolve_includes("@include \"lib.awk\"\nBEGIN { print f() }", Path::new("/base"), &loader).unwrap();
        assert!(merged.contains("function f()"));
        assert!(merged.contains("print f()"));
    }

    #[test]
    fn repeated_include_is_silent_noop() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("/base/lib.awk"), "function f() { return 1 }".to_string());
        let loader = MemLoader { files: RefCell::new(files) };
        let src = "@include \"lib.awk\"\n@include \"lib.awk\"\nBEGIN { print f() }";
        let merged = resolve_includes(src, Path::new("/base"), &loader).unwrap();
        assert_eq!(merged.matches("function f()").count(), 1);
    }

    #[test]
    fn namespace_qualifies_unqualified_names() {
        let tokens = tokenize("@namespace \"math\"\nfunction sq(x) { return x*x }");
        let out = apply_namespaces(tokens).unwrap();
        let names: Vec<&str> = out
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Ident(n) | TokenKind::FuncName(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"math::sq"));
        assert!(names.contains(&"math::x"));
    }

    #[test]
    fn namespace_exempts_builtins_and_special_vars() {
        let tokens = tokenize("@namespace \"ns\"\nBEGIN { print length(FS) }");
        let out = apply_namespaces(tokens).unwrap();
        let names: Vec<&str> = out
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Ident(n) | TokenKind::FuncName(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"length"));
        assert!(names.contains(&"FS"));
    }
}
