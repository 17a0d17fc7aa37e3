//! Tokenizer.
//!
//! Tokenizes the whole source up front into a `Vec<Token>` (the parser
//! walks this with one-token look-ahead). Each token also carries its
//! byte offsets into the source so the parser can splice in a regex
//! re-scan when the simple "previous token" heuristic misclassifies a
//! `/` as division in an argument position that actually wants an ERE
//! (see [`rescan_as_regex`]).

use crate::ast::{Token, TokenKind};
use crate::error::{CompileError, CompileErrorKind};

/// POSIX bracket-expression classes, expanded to ASCII-range equivalents
/// since `regex-lite` does not implement `[[:class:]]` natively.
fn expand_posix_classes(pattern: &str) -> String {
    pattern
        .replace("[[:space:]]", r"[ \t\n\r\f\v]")
        .replace("[[:blank:]]", r"[ \t]")
        .replace("[[:alpha:]]", "[a-zA-Z]")
        .replace("[[:digit:]]", "[0-9]")
        .replace("[[:alnum:]]", "[a-zA-Z0-9]")
        .replace("[[:upper:]]", "[A-Z]")
        .replace("[[:lower:]]", "[a-z]")
        .replace(
            "[[:punct:]]",
            r##"[!"#$%&'()*+,\-./:;<=>?@\[\]\\^_`{|}~]"##,
        )
        .replace("[[:xdigit:]]", "[0-9A-Fa-f]")
        .replace("[[:graph:]]", "[!-~]")
        .replace("[[:print:]]", "[ -~]")
        .replace("[[:cntrl:]]", r"[\x00-\x1f\x7f]")
}

fn lookup_keyword(name: &str) -> Option<TokenKind> {
    Some(match name {
        "BEGIN" => TokenKind::Begin,
        "END" => TokenKind::End,
        "BEGINFILE" => TokenKind::BeginFile,
        "ENDFILE" => TokenKind::EndFile,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "next" => TokenKind::Next,
        "nextfile" => TokenKind::NextFile,
        "exit" => TokenKind::Exit,
        "return" => TokenKind::Return,
        "delete" => TokenKind::Delete,
        "function" | "func" => TokenKind::Function,
        "print" => TokenKind::Print,
        "printf" => TokenKind::Printf,
        "getline" => TokenKind::Getline,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        _ => return None,
    })
}

/// Whether `/` at this point should start a regex literal, based on the
/// grammatical class of the last emitted token. Division can only follow
/// something that denotes a value: a literal, identifier, `)`, `]`, or
/// postfix `++`/`--`.
fn can_be_regex(last: Option<&TokenKind>) -> bool {
    match last {
        None => true,
        Some(tt) => !matches!(
            tt,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Ident(_)
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Incr
                | TokenKind::Decr
        ),
    }
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<char>,
    byte_offsets: Vec<usize>,
    pos: usize,
    line: usize,
    column: usize,
    last_kind: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut byte_offsets = Vec::with_capacity(src.len() + 1);
        let mut chars = Vec::with_capacity(src.len());
        for (b, c) in src.char_indices() {
            byte_offsets.push(b);
            chars.push(c);
        }
        byte_offsets.push(src.len());
        Lexer {
            src,
            chars,
            byte_offsets,
            pos: 0,
            line: 1,
            column: 1,
            last_kind: None,
        }
    }

    fn peek(&self, off: usize) -> char {
        *self.chars.get(self.pos + off).unwrap_or(&'\0')
    }

    fn byte_pos(&self) -> usize {
        *self.byte_offsets.get(self.pos).unwrap_or(&self.src.len())
    }

    fn advance(&mut self) -> char {
        if self.pos >= self.chars.len() {
            return '\0';
        }
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_trivia(&mut self) {
        loop {
            let ch = self.peek(0);
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '\\' && self.peek(1) == '\n' {
                self.advance();
                self.advance();
            } else if ch == '#' {
                while !self.at_end() && self.peek(0) != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> (TokenKind, usize, usize) {
        let (line, col) = (self.line, self.column);
        self.advance();
        let mut value = String::new();
        let mut terminated = false;
        while !self.at_end() {
            if self.peek(0) == '"' {
                terminated = true;
                break;
            }
            if self.peek(0) == '\n' {
                break;
            }
            if self.peek(0) == '\\' {
                self.advance();
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'f' => value.push('\x0C'),
                    'b' => value.push('\x08'),
                    'v' => value.push('\x0B'),
                    'a' => value.push('\x07'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '/' => value.push('/'),
                    'x' => {
                        let mut hex = String::new();
                        while hex.len() < 2 && self.peek(0).is_ascii_hexdigit() {
                            hex.push(self.advance());
                        }
                        if let Some(c) =
                            u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                        {
                            value.push(c);
                        } else {
                            value.push('x');
                        }
                    }
                    c if ('0'..='7').contains(&c) => {
                        let mut octal = String::new();
                        octal.push(c);
                        while octal.len() < 3 && ('0'..='7').contains(&self.peek(0)) {
                            octal.push(self.advance());
                        }
                        if let Some(c) =
                            u32::from_str_radix(&octal, 8).ok().and_then(char::from_u32)
                        {
                            value.push(c);
                        }
                    }
                    other => value.push(other),
                }
            } else {
                value.push(self.advance());
            }
        }
        if terminated {
            self.advance();
            (TokenKind::String(value), line, col)
        } else {
            (
                TokenKind::Error("unterminated string literal".into()),
                line,
                col,
            )
        }
    }

    fn read_regex(&mut self) -> (TokenKind, usize, usize) {
        let (line, col) = (self.line, self.column);
        self.advance();
        let mut pattern = String::new();
        let mut terminated = false;
        while !self.at_end() {
            if self.peek(0) == '/' {
                terminated = true;
                break;
            }
            if self.peek(0) == '\n' {
                break;
            }
            if self.peek(0) == '\\' {
                pattern.push(self.advance());
                if !self.at_end() {
                    pattern.push(self.advance());
                }
            } else {
                pattern.push(self.advance());
            }
        }
        if terminated {
            self.advance();
            (
                TokenKind::Regex(expand_posix_classes(&pattern)),
                line,
                col,
            )
        } else {
            (
                TokenKind::Error("unterminated regex literal".into()),
                line,
                col,
            )
        }
    }

    fn read_number(&mut self) -> (TokenKind, usize, usize) {
        let (line, col) = (self.line, self.column);
        let mut s = String::new();

        if self.peek(0) == '0' && (self.peek(1) == 'x' || self.peek(1) == 'X') {
            self.advance();
            self.advance();
            let mut hex = String::new();
            while self.peek(0).is_ascii_hexdigit() {
                hex.push(self.advance());
            }
            let n = i64::from_str_radix(&hex, 16).unwrap_or(0) as f64;
            return (TokenKind::Number(n), line, col);
        }
        if self.peek(0) == '0' && ('0'..='7').contains(&self.peek(1)) {
            self.advance();
            let mut oct = String::new();
            while ('0'..='7').contains(&self.peek(0)) {
                oct.push(self.advance());
            }
            let n = i64::from_str_radix(&oct, 8).unwrap_or(0) as f64;
            return (TokenKind::Number(n), line, col);
        }

        while self.peek(0).is_ascii_digit() {
            s.push(self.advance());
        }
        if self.peek(0) == '.' {
            s.push(self.advance());
            while self.peek(0).is_ascii_digit() {
                s.push(self.advance());
            }
        }
        if self.peek(0) == 'e' || self.peek(0) == 'E' {
            let save = s.len();
            let mut exp = String::new();
            exp.push(self.advance());
            if self.peek(0) == '+' || self.peek(0) == '-' {
                exp.push(self.advance());
            }
            let mut has_digit = false;
            while self.peek(0).is_ascii_digit() {
                exp.push(self.advance());
                has_digit = true;
            }
            if has_digit {
                s.push_str(&exp);
            } else {
                s.truncate(save);
            }
        }
        let n = s.parse::<f64>().unwrap_or(0.0);
        (TokenKind::Number(n), line, col)
    }

    fn read_ident(&mut self) -> (TokenKind, usize, usize) {
        let (line, col) = (self.line, self.column);
        let mut name = String::new();
        while self.peek(0).is_ascii_alphanumeric() || self.peek(0) == '_' {
            name.push(self.advance());
        }
        if let Some(kw) = lookup_keyword(&name) {
            return (kw, line, col);
        }
        // An identifier with `(` immediately adjacent (no intervening
        // whitespace) names a call, per POSIX's "no space before the
        // parenthesis" rule distinguishing `f(x)` from grouping/concat
        // like `f (x)`. The parser uses this to tell calls apart from a
        // bare variable followed by a parenthesized expression.
        let kind = if self.peek(0) == '(' {
            TokenKind::FuncName(name)
        } else {
            TokenKind::Ident(name)
        };
        (kind, line, col)
    }

    fn read_operator(&mut self) -> (TokenKind, usize, usize) {
        let (line, col) = (self.line, self.column);
        let ch = self.advance();
        let next = self.peek(0);
        let kind = match ch {
            '+' if next == '+' => {
                self.advance();
                TokenKind::Incr
            }
            '+' if next == '=' => {
                self.advance();
                TokenKind::PlusAssign
            }
            '+' => TokenKind::Plus,
            '-' if next == '-' => {
                self.advance();
                TokenKind::Decr
            }
            '-' if next == '=' => {
                self.advance();
                TokenKind::MinusAssign
            }
            '-' => TokenKind::Minus,
            '*' if next == '*' => {
                self.advance();
                TokenKind::Caret
            }
            '*' if next == '=' => {
                self.advance();
                TokenKind::StarAssign
            }
            '*' => TokenKind::Star,
            '/' if next == '=' => {
                self.advance();
                TokenKind::SlashAssign
            }
            '/' => TokenKind::Slash,
            '%' if next == '=' => {
                self.advance();
                TokenKind::PercentAssign
            }
            '%' => TokenKind::Percent,
            '^' if next == '=' => {
                self.advance();
                TokenKind::CaretAssign
            }
            '^' => TokenKind::Caret,
            '=' if next == '=' => {
                self.advance();
                TokenKind::Eq
            }
            '=' => TokenKind::Assign,
            '!' if next == '=' => {
                self.advance();
                TokenKind::Ne
            }
            '!' if next == '~' => {
                self.advance();
                TokenKind::NotMatch
            }
            '!' => TokenKind::Not,
            '<' if next == '=' => {
                self.advance();
                TokenKind::Le
            }
            '<' => TokenKind::Lt,
            '>' if next == '=' => {
                self.advance();
                TokenKind::Ge
            }
            '>' if next == '>' => {
                self.advance();
                TokenKind::Append
            }
            '>' => TokenKind::Gt,
            '&' if next == '&' => {
                self.advance();
                TokenKind::AndAnd
            }
            '|' if next == '|' => {
                self.advance();
                TokenKind::OrOr
            }
            '|' if next == '&' => {
                self.advance();
                TokenKind::PipeAmp
            }
            '|' => TokenKind::Pipe,
            '~' => TokenKind::Match,
            '?' => TokenKind::Question,
            ':' if next == ':' => {
                self.advance();
                TokenKind::ColonColon
            }
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '$' => TokenKind::Dollar,
            '@' => {
                // @include / @namespace directives, or a bare @ for indirect calls.
                self.skip_inline_ws();
                if self.peek(0).is_ascii_alphabetic() || self.peek(0) == '_' {
                    let save_pos = self.pos;
                    let save_line = self.line;
                    let save_col = self.column;
                    let mut word = String::new();
                    while self.peek(0).is_ascii_alphanumeric() || self.peek(0) == '_' {
                        word.push(self.advance());
                    }
                    match word.as_str() {
                        "include" => TokenKind::Include,
                        "namespace" => TokenKind::Namespace,
                        _ => {
                            // Not a directive keyword: rewind, this @ is an
                            // indirect-call sigil and `word` is the callee name.
                            self.pos = save_pos;
                            self.line = save_line;
                            self.column = save_col;
                            TokenKind::At
                        }
                    }
                } else {
                    TokenKind::At
                }
            }
            other => TokenKind::Error(format!("unexpected character '{}'", other)),
        };
        (kind, line, col)
    }

    fn skip_inline_ws(&mut self) {
        while self.peek(0) == ' ' || self.peek(0) == '\t' {
            self.advance();
        }
    }

    fn next_token(&mut self) -> Option<(TokenKind, usize, usize, usize, usize)> {
        self.skip_trivia();
        if self.at_end() {
            return None;
        }
        let start_off = self.byte_pos();
        let ch = self.peek(0);
        let (kind, line, col) = if ch == '\n' {
            let (l, c) = (self.line, self.column);
            self.advance();
            (TokenKind::Newline, l, c)
        } else if ch == '"' {
            self.read_string()
        } else if ch == '/' && can_be_regex(self.last_kind.as_ref()) {
            self.read_regex()
        } else if ch.is_ascii_digit() || (ch == '.' && self.peek(1).is_ascii_digit()) {
            self.read_number()
        } else if ch.is_ascii_alphabetic() || ch == '_' {
            self.read_ident()
        } else {
            self.read_operator()
        };
        let end_off = self.byte_pos();
        Some((kind, line, col, start_off, end_off))
    }
}

/// Tokenize a complete source string.
pub fn tokenize(src: &str) -> Vec<Token> {
    tokenize_with_offsets(src).0
}

/// Tokenize, additionally returning `(start_offset, end_offset)` per
/// token, needed by [`rescan_as_regex`].
pub fn tokenize_with_offsets(src: &str) -> (Vec<Token>, Vec<(usize, usize)>) {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    let mut offsets = Vec::new();
    while let Some((kind, line, column, start, end)) = lexer.next_token() {
        lexer.last_kind = Some(kind.clone());
        tokens.push(Token { kind, line, column });
        offsets.push((start, end));
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line: lexer.line,
        column: lexer.column,
    });
    offsets.push((src.len(), src.len()));
    (tokens, offsets)
}

/// Re-scan a `/` (lexed as division because of the previous-token
/// heuristic) as the start of a regex literal, starting at `offset`
/// into `src`. Used when the parser reaches an argument position that
/// is known from the grammar to require an ERE (e.g. the separator
/// argument of `split`/`match`/`sub`/`gsub`/`gensub`) but the eager
/// tokenizer classified the `/` as division.
///
/// Returns the regex token and the byte offset immediately after its
/// closing `/`.
pub fn rescan_as_regex(src: &str, offset: usize) -> Result<(TokenKind, usize), CompileError> {
    let rest = &src[offset..];
    let mut lexer = Lexer::new(rest);
    if lexer.peek(0) != '/' {
        return Err(CompileError::new(
            0,
            0,
            CompileErrorKind::MalformedToken("expected '/' to rescan as regex".into()),
        ));
    }
    let (kind, _line, _col) = lexer.read_regex();
    if matches!(kind, TokenKind::Error(_)) {
        return Err(CompileError::new(
            0,
            0,
            CompileErrorKind::UnterminatedRegex,
        ));
    }
    Ok((kind, offset + lexer.byte_pos()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn basic_rule() {
        assert_eq!(
            kinds("{ print $1 }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Print,
                TokenKind::Dollar,
                TokenKind::Number(1.0),
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn regex_vs_division() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Ident("a".into()), TokenKind::Slash, TokenKind::Ident("b".into())]
        );
        assert_eq!(kinds("/pat/"), vec![TokenKind::Regex("pat".into())]);
    }

    #[test]
    fn hex_and_octal_numbers() {
        assert_eq!(kinds("0x1F"), vec![TokenKind::Number(31.0)]);
        assert_eq!(kinds("010"), vec![TokenKind::Number(8.0)]);
    }

    #[test]
    fn string_escapes() {
        let toks = tokenize(r#""a\tb\x41\101""#);
        assert_eq!(toks[0].kind, TokenKind::String("a\tbAA".into()));
    }

    #[test]
    fn include_and_namespace_directives() {
        assert_eq!(
            kinds("@include \"foo.awk\""),
            vec![TokenKind::Include, TokenKind::String("foo.awk".into())]
        );
        assert_eq!(
            kinds("@namespace \"ns\""),
            vec![TokenKind::Namespace, TokenKind::String("ns".into())]
        );
    }

    #[test]
    fn indirect_call_sigil() {
        assert_eq!(
            kinds("@f(1)"),
            vec![
                TokenKind::At,
                TokenKind::FuncName("f".into()),
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn call_adjacency_distinguishes_funcname_from_ident() {
        assert_eq!(
            kinds("f(1)"),
            vec![
                TokenKind::FuncName("f".into()),
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::RParen,
            ]
        );
        assert_eq!(
            kinds("f (1)"),
            vec![
                TokenKind::Ident("f".into()),
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn pipe_amp_and_colon_colon() {
        assert_eq!(kinds("cmd |& getline"), vec![
            TokenKind::Ident("cmd".into()),
            TokenKind::PipeAmp,
            TokenKind::Getline,
        ]);
        assert_eq!(kinds("ns::f"), vec![
            TokenKind::Ident("ns".into()),
            TokenKind::ColonColon,
            TokenKind::Ident("f".into()),
        ]);
    }

    #[test]
    fn switch_case_default_keywords() {
        assert_eq!(
            kinds("switch case default"),
            vec![TokenKind::Switch, TokenKind::Case, TokenKind::Default]
        );
    }

    #[test]
    fn rescan_regex_recovers_misclassified_division() {
        let src = "a, /foo/";
        // comma already puts us in regex context in practice; verify the
        // rescan helper independently reconstructs the same regex from a
        // raw '/' offset.
        let offset = src.find('/').unwrap();
        let (kind, end) = rescan_as_regex(src, offset).unwrap();
        assert_eq!(kind, TokenKind::Regex("foo".into()));
        assert_eq!(&src[offset..end], "/foo/");
    }
}
