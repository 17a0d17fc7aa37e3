//! The record/field engine (§4.7): lazy field splitting, `$0`
//! rebuilding, and the three FS/FPAT splitting modes.

use regex_lite::Regex;

use crate::error::RuntimeError;
use crate::regex_cache::RegexCache;

/// How the current record is split into fields, derived from FS/FPAT.
#[derive(Debug, Clone)]
pub enum SplitMode {
    /// FS == " ": runs of whitespace, record trimmed first.
    DefaultWhitespace,
    /// FS is exactly one character (other than space): literal split,
    /// empty fields preserved.
    SingleChar(char),
    /// FS is more than one character: treated as an ERE separator.
    Regex(Regex),
    /// FPAT is in effect: fields are the *matches* of this ERE, not the
    /// separators between them.
    FPat(Regex),
}

/// Decide the active split mode from the current FS/FPAT/IGNORECASE
/// values and whichever of FS/FPAT was assigned most recently (§10.6:
/// FPAT, once it takes effect, stays in effect until the program
/// explicitly reverts by using FS again after reassigning FPAT to "").
///
/// `paragraph_mode` is true when RS is empty (§4.7, §8 boundary
/// behavior): in that case FS additionally always splits on embedded
/// newlines regardless of the configured FS, on top of whatever FS
/// itself specifies.
pub fn resolve_split_mode(
    fs: &str,
    fpat: &str,
    fpat_active: bool,
    ignorecase: bool,
    paragraph_mode: bool,
    cache: &mut RegexCache,
) -> Result<SplitMode, RuntimeError> {
    if fpat_active && !fpat.is_empty() {
        let re = cache.get_or_compile(fpat, ignorecase)?;
        return Ok(SplitMode::FPat(re));
    }
    if fs == " " {
        return Ok(SplitMode::DefaultWhitespace);
    }
    let mut chars = fs.chars();
    let single_char = match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    };
    if let Some(c) = single_char {
        if !paragraph_mode || c == '\n' {
            return Ok(SplitMode::SingleChar(c));
        }
        let pattern = format!("{}|\n", regex_lite::escape(&c.to_string()));
        let re = cache.get_or_compile(&pattern, ignorecase)?;
        return Ok(SplitMode::Regex(re));
    }
    let pattern = if paragraph_mode {
        format!("(?:{fs})|\n")
    } else {
        fs.to_string()
    };
    let re = cache.get_or_compile(&pattern, ignorecase)?;
    Ok(SplitMode::Regex(re))
}

pub fn split_fields(record: &str, mode: &SplitMode) -> Vec<String> {
    match mode {
        SplitMode::DefaultWhitespace => {
            let trimmed = record.trim_matches(|c: char| c.is_ascii_whitespace());
            if trimmed.is_empty() {
                Vec::new()
            } else {
                trimmed.split_ascii_whitespace().map(|s| s.to_string()).collect()
            }
        }
        SplitMode::SingleChar(sep) => {
            if record.is_empty() {
                Vec::new()
            } else {
                record.split(*sep).map(|s| s.to_string()).collect()
            }
        }
        SplitMode::Regex(re) => {
            if record.is_empty() {
                Vec::new()
            } else {
                re.split(record).map(|s| s.to_string()).collect()
            }
        }
        SplitMode::FPat(re) => re.find_iter(record).map(|m| m.as_str().to_string()).collect(),
    }
}

/// The current record: `$0` plus its lazily-derived field vector. A
/// write to either side invalidates the other, which is recomputed on
/// next access (§4.7).
#[derive(Debug, Default, Clone)]
pub struct Record {
    raw: String,
    fields: Vec<String>,
    fields_fresh: bool,
    raw_fresh: bool,
}

impl Record {
    pub fn new() -> Self {
        Record {
            raw: String::new(),
            fields: Vec::new(),
            fields_fresh: true,
            raw_fresh: true,
        }
    }

    /// Load a freshly-read record: `$0` is authoritative, fields are
    /// not parsed until first accessed.
    pub fn set_raw(&mut self, raw: String) {
        self.raw = raw;
        self.fields.clear();
        self.fields_fresh = false;
        self.raw_fresh = true;
    }

    fn ensure_fields(&mut self, mode: &SplitMode) {
        if !self.fields_fresh {
            self.fields = split_fields(&self.raw, mode);
            self.fields_fresh = true;
        }
    }

    fn ensure_raw(&mut self, ofs: &str) {
        if !self.raw_fresh {
            self.raw = self.fields.join(ofs);
            self.raw_fresh = true;
        }
    }

    pub fn nf(&mut self, mode: &SplitMode) -> usize {
        self.ensure_fields(mode);
        self.fields.len()
    }

    pub fn raw(&mut self, mode: &SplitMode, ofs: &str) -> &str {
        self.ensure_fields(mode);
        self.ensure_raw(ofs);
        &self.raw
    }

    /// `$i` for `i >= 1`; out-of-range reads return `""` without
    /// mutating NF (§8 boundary behavior).
    pub fn get_field(&mut self, index: usize, mode: &SplitMode) -> String {
        self.ensure_fields(mode);
        self.fields.get(index.wrapping_sub(1)).cloned().unwrap_or_default()
    }

    /// `$0 = value`: replaces the record and invalidates the field
    /// cache wholesale.
    pub fn set_field0(&mut self, value: String) {
        self.set_raw(value);
    }

    /// `$i = value` for `i >= 1`: extends the field vector with empty
    /// strings if `i > NF`, then invalidates `$0`.
    pub fn set_field(&mut self, index: usize, value: String, mode: &SplitMode) {
        self.ensure_fields(mode);
        if index == 0 {
            self.set_field0(value);
            return;
        }
        if index > self.fields.len() {
            self.fields.resize(index, String::new());
        }
        self.fields[index - 1] = value;
        self.raw_fresh = false;
    }

    /// Assigning to NF: truncates or extends the field vector with
    /// empty fields, invalidating `$0` (§4.7).
    pub fn set_nf(&mut self, new_nf: usize, mode: &SplitMode) {
        self.ensure_fields(mode);
        self.fields.resize(new_nf, String::new());
        self.raw_fresh = false;
    }

    pub fn fields_snapshot(&mut self, mode: &SplitMode) -> &[String] {
        self.ensure_fields(mode);
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> SplitMode {
        SplitMode::DefaultWhitespace
    }

    #[test]
    fn default_whitespace_trims_and_splits() {
        assert_eq!(
            split_fields("  a   b\tc  ", &ws()),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn single_char_fs_preserves_empty_fields() {
        let mode = SplitMode::SingleChar(':');
        assert_eq!(
            split_fields("root::0:0", &mode),
            vec!["root", "", "0", "0"]
        );
    }

    #[test]
    fn field_write_rebuilds_record_lazily() {
        let mut rec = Record::new();
        rec.set_raw("a b c".to_string());
        let mode = ws();
        assert_eq!(rec.nf(&mode), 3);
        rec.set_field(2, "X".to_string(), &mode);
        assert_eq!(rec.raw(&mode, " "), "a X c");
    }

    #[test]
    fn writing_beyond_nf_extends_with_empties() {
        let mut rec = Record::new();
        rec.set_raw("a b".to_string());
        let mode = ws();
        rec.set_field(4, "z".to_string(), &mode);
        assert_eq!(rec.raw(&mode, " "), "a b  z");
        assert_eq!(rec.nf(&mode), 4);
    }

    #[test]
    fn reading_past_nf_does_not_change_nf() {
        let mut rec = Record::new();
        rec.set_raw("a b".to_string());
        let mode = ws();
        assert_eq!(rec.get_field(9, &mode), "");
        assert_eq!(rec.nf(&mode), 2);
    }

    #[test]
    fn set_nf_truncates() {
        let mut rec = Record::new();
        rec.set_raw("a b c d".to_string());
        let mode = ws();
        rec.set_nf(2, &mode);
        assert_eq!(rec.raw(&mode, " "), "a b");
    }

    #[test]
    fn fpat_mode_collects_matches() {
        let mut cache = RegexCache::new();
        let mode = resolve_split_mode("", "[0-9]+", true, false, false, &mut cache).unwrap();
        assert_eq!(split_fields("ab12 cd34", &mode), vec!["12", "34"]);
    }

    #[test]
    fn paragraph_mode_splits_single_char_fs_on_embedded_newline() {
        let mut cache = RegexCache::new();
        let mode = resolve_split_mode(":", "", false, false, true, &mut cache).unwrap();
        assert_eq!(split_fields("a:b\nc:d", &mode), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn paragraph_mode_splits_multichar_fs_on_embedded_newline() {
        let mut cache = RegexCache::new();
        let mode = resolve_split_mode("::", "", false, false, true, &mut cache).unwrap();
        assert_eq!(split_fields("a::b\nc::d", &mode), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn non_paragraph_mode_single_char_fs_ignores_newline() {
        let mut cache = RegexCache::new();
        let mode = resolve_split_mode(":", "", false, false, false, &mut cache).unwrap();
        assert_eq!(split_fields("a:b\nc:d", &mode), vec!["a", "b\nc", "d"]);
    }
}
