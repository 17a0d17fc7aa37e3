//! String built-ins (§4.9): `length`, `substr`, `index`, `split`,
//! `sub`/`gsub`/`gensub`, `match`, `tolower`/`toupper`, `strtonum`,
//! `patsplit`, `ord`/`chr`.

use regex_lite::{Captures, Regex};

use crate::value::{str_to_number, Value};

pub fn str_length(s: &str) -> f64 {
    s.chars().count() as f64
}

/// `substr(s, start[, length])`: 1-based, clamped to the string's
/// bounds; a non-positive or fractional `start` is truncated toward
/// the POSIX rule of "as if the string were padded with empty
/// characters to the left".
pub fn substr(s: &str, start: f64, length: Option<f64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len() as f64;
    let start = start.trunc();
    let end = match length {
        Some(l) => start + l.trunc(),
        None => n + 1.0,
    };
    let begin = start.max(1.0);
    let end = end.min(n + 1.0);
    if end <= begin {
        return String::new();
    }
    let begin_idx = (begin - 1.0) as usize;
    let end_idx = (end - 1.0) as usize;
    chars[begin_idx.min(chars.len())..end_idx.min(chars.len())].iter().collect()
}

/// `index(s, t)`: 1-based position of the first occurrence of `t` in
/// `s`, or 0 if absent.
pub fn index_of(s: &str, t: &str) -> f64 {
    if t.is_empty() {
        return if s.is_empty() { 0.0 } else { 1.0 };
    }
    match s.find(t) {
        Some(byte_pos) => (s[..byte_pos].chars().count() + 1) as f64,
        None => 0.0,
    }
}

pub fn tolower(s: &str) -> String {
    s.to_lowercase()
}

pub fn toupper(s: &str) -> String {
    s.to_uppercase()
}

pub fn ord(s: &str) -> f64 {
    s.chars().next().map(|c| c as u32 as f64).unwrap_or(0.0)
}

pub fn chr(n: f64) -> String {
    char::from_u32(n as u32).map(|c| c.to_string()).unwrap_or_default()
}

pub fn strtonum(s: &str) -> f64 {
    crate::value::strtonum(s)
}

/// Expand a `sub`/`gsub`/`gensub` replacement template: `&` is the
/// whole match, `\&` a literal `&`, `\\` a literal `\`. When `caps` is
/// present (only for `gensub`), `\1`..`\9` are back-references.
fn expand_replacement(repl: &str, matched: &str, caps: Option<&Captures>) -> String {
    let mut out = String::new();
    let mut chars = repl.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek().copied() {
                Some('&') => {
                    out.push('&');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                Some(d) if d.is_ascii_digit() && d != '0' => {
                    chars.next();
                    if let Some(caps) = caps {
                        let n = d.to_digit(10).unwrap() as usize;
                        if let Some(m) = caps.get(n) {
                            out.push_str(m.as_str());
                        }
                    } else {
                        out.push(d);
                    }
                }
                _ => out.push('\\'),
            }
        } else if c == '&' {
            out.push_str(matched);
        } else {
            out.push(c);
        }
    }
    out
}

/// `sub(re, repl, target)`: replaces the first match only. Returns
/// `(new_value, replacement_count)`.
pub fn sub_once(re: &Regex, repl: &str, target: &str) -> (String, i64) {
    match re.find(target) {
        Some(m) => {
            let mut out = String::with_capacity(target.len());
            out.push_str(&target[..m.start()]);
            out.push_str(&expand_replacement(repl, m.as_str(), None));
            out.push_str(&target[m.end()..]);
            (out, 1)
        }
        None => (target.to_string(), 0),
    }
}

/// `gsub(re, repl, target)`: replaces every non-overlapping match.
pub fn gsub_all(re: &Regex, repl: &str, target: &str) -> (String, i64) {
    let mut out = String::with_capacity(target.len());
    let mut last_end = 0;
    let mut count = 0i64;
    for m in re.find_iter(target) {
        out.push_str(&target[last_end..m.start()]);
        out.push_str(&expand_replacement(repl, m.as_str(), None));
        last_end = m.end();
        count += 1;
    }
    out.push_str(&target[last_end..]);
    (out, count)
}

/// `gensub(re, repl, how, target)`: like `gsub` but supports `\1`..`\9`
/// back-references and a selector: `"g"` for every match, or a
/// positive integer N for only the Nth match. Unlike `sub`/`gsub`,
/// `gensub` never mutates `target` in place; it always returns a new
/// string.
pub fn gensub(re: &Regex, repl: &str, how: &str, target: &str) -> String {
    let global = how.trim().eq_ignore_ascii_case("g");
    let nth = if global {
        None
    } else {
        let n = str_to_number(how).trunc();
        if n >= 1.0 {
            Some(n as usize)
        } else {
            Some(1)
        }
    };
    let mut out = String::with_capacity(target.len());
    let mut last_end = 0;
    let mut seen = 0usize;
    for caps in re.captures_iter(target) {
        let m = caps.get(0).unwrap();
        seen += 1;
        if global || nth == Some(seen) {
            out.push_str(&target[last_end..m.start()]);
            out.push_str(&expand_replacement(repl, m.as_str(), Some(&caps)));
            last_end = m.end();
        }
    }
    out.push_str(&target[last_end..]);
    out
}

/// `match(s, re)`: returns `(rstart, rlength)` 1-based, or `(0, -1)` if
/// there is no match (§8).
pub fn match_pos(re: &Regex, s: &str) -> (f64, f64) {
    match re.find(s) {
        Some(m) => {
            let start_chars = s[..m.start()].chars().count();
            let match_chars = s[m.start()..m.end()].chars().count();
            ((start_chars + 1) as f64, match_chars as f64)
        }
        None => (0.0, -1.0),
    }
}

/// Populate the optional third-argument array of `match(s, re, arr)`
/// with capture groups, gawk-style: `arr[i]` is the text of group `i`
/// (0 = whole match), `arr[i, "start"]`/`arr[i, "length"]` its
/// position.
pub fn match_captures(re: &Regex, s: &str, subsep: &str) -> Vec<(String, Value)> {
    let mut entries = Vec::new();
    if let Some(caps) = re.captures(s) {
        for i in 0..caps.len() {
            if let Some(m) = caps.get(i) {
                let start_chars = s[..m.start()].chars().count() + 1;
                let len_chars = s[m.start()..m.end()].chars().count();
                entries.push((i.to_string(), Value::strnum(m.as_str().to_string())));
                entries.push((
                    format!("{i}{subsep}start"),
                    Value::Number(start_chars as f64),
                ));
                entries.push((
                    format!("{i}{subsep}length"),
                    Value::Number(len_chars as f64),
                ));
            } else {
                entries.push((i.to_string(), Value::from_str("")));
                entries.push((format!("{i}{subsep}start"), Value::Number(0.0)));
                entries.push((format!("{i}{subsep}length"), Value::Number(-1.0)));
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex_lite::Regex;

    #[test]
    fn substr_basic_and_clamped() {
        assert_eq!(substr("hello world", 7.0, None), "world");
        assert_eq!(substr("hello", 2.0, Some(2.0)), "el");
        assert_eq!(substr("hello", -2.0, Some(5.0)), "he");
        assert_eq!(substr("hello", 10.0, Some(3.0)), "");
    }

    #[test]
    fn index_of_finds_and_misses() {
        assert_eq!(index_of("hello world", "wor"), 7.0);
        assert_eq!(index_of("hello", "zz"), 0.0);
    }

    #[test]
    fn gsub_replaces_all_and_counts() {
        let re = Regex::new("o").unwrap();
        let (s, n) = gsub_all(&re, "0", "foo bar boo");
        assert_eq!(s, "f00 bar b00");
        assert_eq!(n, 3);
    }

    #[test]
    fn gsub_ampersand_and_escapes() {
        let re = Regex::new("[a-z]+").unwrap();
        let (s, _) = gsub_all(&re, "<&>", "abc 123 def");
        assert_eq!(s, "<abc> 123 <def>");
        let (s2, _) = gsub_all(&re, r"\&", "abc");
        assert_eq!(s2, "&");
    }

    #[test]
    fn gensub_nth_and_backreferences() {
        let re = Regex::new(r"(\w+)@(\w+)").unwrap();
        let out = gensub(&re, r"\2@\1", "g", "a@b c@d");
        assert_eq!(out, "b@a d@c");
        let re2 = Regex::new("o").unwrap();
        let out2 = gensub(&re2, "0", "2", "foo boo");
        assert_eq!(out2, "fo0 boo");
    }

    #[test]
    fn match_position_and_no_match() {
        let re = Regex::new("wor").unwrap();
        assert_eq!(match_pos(&re, "hello world"), (7.0, 3.0));
        let re2 = Regex::new("zzz").unwrap();
        assert_eq!(match_pos(&re2, "hello"), (0.0, -1.0));
    }
}
