//! `printf`/`sprintf` format-string interpretation, and the single-spec
//! helper used to render numbers through CONVFMT/OFMT (§4.4).

use crate::value::Value;

struct Spec {
    left_align: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: Option<i64>,
    precision: Option<i64>,
    conv: char,
}

fn parse_int_literal(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<i64> {
    let mut s = String::new();
    while let Some(&d) = chars.peek() {
        if d.is_ascii_digit() {
            s.push(d);
            chars.next();
        } else {
            break;
        }
    }
    if s.is_empty() {
        None
    } else {
        s.parse().ok()
    }
}

fn next_num(args: &[Value], idx: &mut usize, convfmt: &str) -> f64 {
    let v = args.get(*idx).cloned().unwrap_or(Value::Uninitialized);
    *idx += 1;
    let _ = convfmt;
    v.to_number()
}

fn next_val(args: &[Value], idx: &mut usize) -> Value {
    let v = args.get(*idx).cloned().unwrap_or(Value::Uninitialized);
    *idx += 1;
    v
}

fn pad(body: String, width: Option<i64>, left_align: bool, zero: bool) -> String {
    let w = width.unwrap_or(0);
    let left_align = left_align || w < 0;
    let w = w.unsigned_abs() as usize;
    let len = body.chars().count();
    if len >= w {
        return body;
    }
    let fill = w - len;
    if left_align {
        format!("{}{}", body, " ".repeat(fill))
    } else if zero {
        if let Some(rest) = body.strip_prefix('-') {
            format!("-{}{}", "0".repeat(fill), rest)
        } else if let Some(rest) = body.strip_prefix('+') {
            format!("+{}{}", "0".repeat(fill), rest)
        } else {
            format!("{}{}", "0".repeat(fill), body)
        }
    } else {
        format!("{}{}", " ".repeat(fill), body)
    }
}

fn sign_prefix(neg: bool, plus: bool, space: bool) -> &'static str {
    if neg {
        "-"
    } else if plus {
        "+"
    } else if space {
        " "
    } else {
        ""
    }
}

fn fmt_decimal(n: f64, spec: &Spec) -> String {
    let i = n as i64;
    let mut digits = i.unsigned_abs().to_string();
    if let Some(p) = spec.precision {
        if p == 0 && i == 0 {
            digits.clear();
        }
        while (digits.len() as i64) < p {
            digits.insert(0, '0');
        }
    }
    let body = format!("{}{}", sign_prefix(i < 0, spec.plus, spec.space), digits);
    pad(body, spec.width, spec.left_align, spec.zero && spec.precision.is_none())
}

fn fmt_unsigned(n: f64, radix: u32, upper: bool, spec: &Spec) -> String {
    let u = (n as i64) as u64;
    let mut digits = match radix {
        8 => format!("{:o}", u),
        16 if upper => format!("{:X}", u),
        16 => format!("{:x}", u),
        _ => u.to_string(),
    };
    if let Some(p) = spec.precision {
        if p == 0 && u == 0 {
            digits.clear();
        }
        while (digits.len() as i64) < p {
            digits.insert(0, '0');
        }
    }
    if spec.alt && u != 0 {
        match radix {
            8 if !digits.starts_with('0') => digits.insert(0, '0'),
            16 => digits = format!("{}{}", if upper { "0X" } else { "0x" }, digits),
            _ => {}
        }
    }
    pad(digits, spec.width, spec.left_align, spec.zero && spec.precision.is_none())
}

fn fmt_char(v: &Value) -> String {
    match v {
        Value::Number(n) => {
            let code = *n as u32;
            char::from_u32(code).map(|c| c.to_string()).unwrap_or_default()
        }
        other => {
            let s = other.to_awk_string("%.6g");
            s.chars().next().map(|c| c.to_string()).unwrap_or_default()
        }
    }
}

fn fmt_string(v: &Value, convfmt: &str, spec: &Spec) -> String {
    let mut s = v.to_awk_string(convfmt);
    if let Some(p) = spec.precision {
        let p = p.max(0) as usize;
        if s.chars().count() > p {
            s = s.chars().take(p).collect();
        }
    }
    pad(s, spec.width, spec.left_align, false)
}

fn fmt_float(n: f64, spec: &Spec) -> String {
    let prec = spec.precision.unwrap_or(6).max(0) as usize;
    let body = if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{:.*}", prec, n.abs())
    };
    let body = if n.is_sign_negative() && !n.is_nan() {
        format!("-{body}")
    } else {
        format!("{}{body}", sign_prefix(false, spec.plus, spec.space))
    };
    let body = if spec.conv.is_ascii_uppercase() {
        body.to_uppercase()
    } else {
        body
    };
    pad(body, spec.width, spec.left_align, spec.zero)
}

fn fmt_exp(n: f64, spec: &Spec) -> String {
    let prec = spec.precision.unwrap_or(6).max(0) as usize;
    if n.is_nan() || n.is_infinite() {
        return fmt_float(n, spec);
    }
    let neg = n.is_sign_negative();
    let mag = n.abs();
    let (mantissa, exp) = if mag == 0.0 {
        (0.0, 0)
    } else {
        let e = mag.log10().floor() as i32;
        let m = mag / 10f64.powi(e);
        // guard against rounding pushing mantissa to 10.0
        if m >= 10.0 {
            (m / 10.0, e + 1)
        } else if m < 1.0 {
            (m * 10.0, e - 1)
        } else {
            (m, e)
        }
    };
    let mant_str = format!("{:.*}", prec, mantissa);
    let mant_str: f64 = mant_str.parse().unwrap_or(mantissa);
    let (mant_str, exp) = if mant_str >= 10.0 {
        (format!("{:.*}", prec, mantissa / 10.0), exp + 1)
    } else {
        (format!("{:.*}", prec, mantissa), exp)
    };
    let e_letter = if spec.conv == 'E' { 'E' } else { 'e' };
    let body = format!(
        "{}{}{}{}{:02}",
        sign_prefix(neg, spec.plus, spec.space),
        mant_str,
        e_letter,
        if exp < 0 { "-" } else { "+" },
        exp.abs()
    );
    pad(body, spec.width, spec.left_align, spec.zero)
}

fn fmt_general(n: f64, spec: &Spec) -> String {
    let prec = spec.precision.unwrap_or(6).max(1);
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return fmt_float(n, spec);
    }
    let exp = n.abs().log10().floor() as i64;
    let use_exp = exp < -4 || exp >= prec;
    let mut body = if use_exp {
        let mut s = Spec { precision: Some(prec - 1), ..clone_spec(spec) };
        s.conv = if spec.conv == 'G' { 'E' } else { 'e' };
        fmt_exp(n, &s)
    } else {
        let decimals = (prec - 1 - exp).max(0);
        let mut s = Spec { precision: Some(decimals), ..clone_spec(spec) };
        s.conv = 'f';
        fmt_float(n, &s)
    };
    if !spec.alt {
        body = trim_trailing_zeros(&body);
    }
    // re-pad since trimming happened after fmt_float/fmt_exp already padded
    let trimmed_len = body.trim_start().len();
    let _ = trimmed_len;
    pad(body.trim().to_string(), spec.width, spec.left_align, spec.zero)
}

fn clone_spec(spec: &Spec) -> Spec {
    Spec {
        left_align: spec.left_align,
        plus: spec.plus,
        space: spec.space,
        zero: false,
        alt: spec.alt,
        width: None,
        precision: spec.precision,
        conv: spec.conv,
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if let Some(epos) = s.find(['e', 'E']) {
        let (mantissa, rest) = s.split_at(epos);
        format!("{}{}", trim_trailing_zeros(mantissa), rest)
    } else if s.contains('.') {
        let t = s.trim_end_matches('0');
        let t = t.trim_end_matches('.');
        t.to_string()
    } else {
        s.to_string()
    }
}

/// Implements `printf`/`sprintf`: expand `fmt` against positional
/// `args`, honoring `%[flags][width][.precision]conv` for `d i u o x X
/// c s e E f F g G %`.
pub fn sprintf(fmt: &str, args: &[Value], convfmt: &str) -> String {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut idx = 0usize;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            out.push('%');
            chars.next();
            continue;
        }
        let mut left_align = false;
        let mut plus = false;
        let mut space = false;
        let mut zero = false;
        let mut alt = false;
        loop {
            match chars.peek() {
                Some('-') => {
                    left_align = true;
                    chars.next();
                }
                Some('+') => {
                    plus = true;
                    chars.next();
                }
                Some(' ') => {
                    space = true;
                    chars.next();
                }
                Some('0') => {
                    zero = true;
                    chars.next();
                }
                Some('#') => {
                    alt = true;
                    chars.next();
                }
                _ => break,
            }
        }
        let width = if chars.peek() == Some(&'*') {
            chars.next();
            Some(next_num(args, &mut idx, convfmt) as i64)
        } else {
            parse_int_literal(&mut chars)
        };
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'*') {
                chars.next();
                Some(next_num(args, &mut idx, convfmt) as i64)
            } else {
                Some(parse_int_literal(&mut chars).unwrap_or(0))
            }
        } else {
            None
        };
        let conv = match chars.next() {
            Some(c) => c,
            None => {
                out.push('%');
                break;
            }
        };
        let spec = Spec {
            left_align,
            plus,
            space,
            zero,
            alt,
            width,
            precision,
            conv,
        };
        let rendered = match conv {
            'd' | 'i' => fmt_decimal(next_num(args, &mut idx, convfmt), &spec),
            'o' => fmt_unsigned(next_num(args, &mut idx, convfmt), 8, false, &spec),
            'x' => fmt_unsigned(next_num(args, &mut idx, convfmt), 16, false, &spec),
            'X' => fmt_unsigned(next_num(args, &mut idx, convfmt), 16, true, &spec),
            'u' => fmt_unsigned(next_num(args, &mut idx, convfmt), 10, false, &spec),
            'c' => pad(fmt_char(&next_val(args, &mut idx)), width, left_align, false),
            's' => fmt_string(&next_val(args, &mut idx), convfmt, &spec),
            'e' | 'E' => fmt_exp(next_num(args, &mut idx, convfmt), &spec),
            'f' | 'F' => fmt_float(next_num(args, &mut idx, convfmt), &spec),
            'g' | 'G' => fmt_general(next_num(args, &mut idx, convfmt), &spec),
            other => {
                out.push('%');
                out.push(other);
                continue;
            }
        };
        out.push_str(&rendered);
    }
    out
}

/// Render a single number through a CONVFMT/OFMT-style format string
/// (exactly one conversion spec, as POSIX requires of those two
/// variables).
pub fn sprintf_one(fmt: &str, n: f64) -> String {
    sprintf(fmt, &[Value::Number(n)], fmt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_decimal_and_string() {
        assert_eq!(sprintf("%d", &[Value::Number(42.0)], "%.6g"), "42");
        assert_eq!(sprintf("%5d", &[Value::Number(3.0)], "%.6g"), "    3");
        assert_eq!(sprintf("%-5d|", &[Value::Number(3.0)], "%.6g"), "3    |");
        assert_eq!(sprintf("%05d", &[Value::Number(3.0)], "%.6g"), "00003");
        assert_eq!(
            sprintf("%s-%s", &[Value::from_str("a"), Value::from_str("b")], "%.6g"),
            "a-b"
        );
    }

    #[test]
    fn hex_and_octal() {
        assert_eq!(sprintf("%x", &[Value::Number(255.0)], "%.6g"), "ff");
        assert_eq!(sprintf("%X", &[Value::Number(255.0)], "%.6g"), "FF");
        assert_eq!(sprintf("%#x", &[Value::Number(255.0)], "%.6g"), "0xff");
        assert_eq!(sprintf("%o", &[Value::Number(8.0)], "%.6g"), "10");
    }

    #[test]
    fn float_precision() {
        assert_eq!(sprintf("%.2f", &[Value::Number(3.14159)], "%.6g"), "3.14");
        assert_eq!(sprintf("%.0f", &[Value::Number(2.6)], "%.6g"), "3");
    }

    #[test]
    fn percent_literal_and_char() {
        assert_eq!(sprintf("100%%", &[], "%.6g"), "100%");
        assert_eq!(sprintf("%c", &[Value::Number(65.0)], "%.6g"), "A");
        assert_eq!(sprintf("%c", &[Value::from_str("xyz")], "%.6g"), "x");
    }

    #[test]
    fn general_format_trims_trailing_zeros() {
        assert_eq!(sprintf_one("%.6g", 6.0), "6");
        assert_eq!(sprintf_one("%.6g", 3.14), "3.14");
        assert_eq!(sprintf_one("%.6g", 100000.0), "100000");
    }
}
