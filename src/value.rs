use std::cell::{Cell, OnceCell};
use std::fmt;
use std::sync::Arc;

use crate::core::ScriptCore;

/// Constructor input for a [`Value`]: the scalar kinds a script can turn
/// into a weakly typed value. Obtained through `From` conversions, so
/// `script.new_value(42)`, `script.new_value("x")`, and
/// `script.new_value(3.5)` all work.
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    Copy(Value),
}

macro_rules! scalar_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Scalar::Int(v as i64)
            }
        }
    )*};
}

scalar_from_int!(i8, i16, i32, i64, isize);

macro_rules! scalar_from_uint {
    ($($t:ty),*) => {$(
        impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Scalar::Int(i64::try_from(v).unwrap_or(i64::MAX))
            }
        }
    )*};
}

scalar_from_uint!(u8, u16, u32, u64, usize);

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v as f64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Int(if v { 1 } else { 0 })
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<&String> for Scalar {
    fn from(v: &String) -> Self {
        Scalar::Str(v.clone())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<Value> for Scalar {
    fn from(v: Value) -> Self {
        Scalar::Copy(v)
    }
}

impl From<&Value> for Scalar {
    fn from(v: &Value) -> Self {
        Scalar::Copy(v.clone())
    }
}

/// An immutable datum that can be read as an `i64`, `f64`, or string in
/// best-effort fashion, never returning an error. Exactly one projection is
/// populated at construction; the others are computed and cached on first
/// access. The caches are not externally observable.
#[derive(Clone)]
pub struct Value {
    ival: Cell<Option<i64>>,
    fval: Cell<Option<f64>>,
    sval: OnceCell<String>,
    core: Arc<ScriptCore>,
}

impl Value {
    pub(crate) fn from_scalar(scalar: Scalar, core: Arc<ScriptCore>) -> Self {
        let v = Value {
            ival: Cell::new(None),
            fval: Cell::new(None),
            sval: OnceCell::new(),
            core,
        };
        match scalar {
            Scalar::Int(i) => v.ival.set(Some(i)),
            Scalar::Float(f) => v.fval.set(Some(f)),
            Scalar::Str(s) => {
                let _ = v.sval.set(s);
            }
            Scalar::Copy(other) => return other.rebind(v.core),
        }
        v
    }

    /// A full copy of this value attached to a different script interior.
    pub(crate) fn rebind(&self, core: Arc<ScriptCore>) -> Self {
        Value {
            ival: self.ival.clone(),
            fval: self.fval.clone(),
            sval: self.sval.clone(),
            core,
        }
    }

    /// The value as an `i64`.
    ///
    /// Floats truncate toward zero; out-of-range floats clamp to
    /// `i64::MIN`. Strings are parsed by stripping trailing characters
    /// until the remainder is a signed decimal, yielding 0 if nothing
    /// parses.
    #[inline]
    pub fn int(&self) -> i64 {
        if let Some(i) = self.ival.get() {
            return i;
        }
        let i = if let Some(f) = self.fval.get() {
            f64_to_i64(f)
        } else {
            parse_int_prefix(self.sval.get().map(String::as_str).unwrap_or(""))
        };
        self.ival.set(Some(i));
        i
    }

    /// The value as an `f64`. Strings are parsed from the longest leading
    /// numeric substring, yielding 0.0 if there is none.
    #[inline]
    pub fn float(&self) -> f64 {
        if let Some(f) = self.fval.get() {
            return f;
        }
        let f = if let Some(i) = self.ival.get() {
            i as f64
        } else {
            parse_leading_float(self.sval.get().map(String::as_str).unwrap_or(""))
        };
        self.fval.set(Some(f));
        f
    }

    /// The value as a string. Integers format as decimal; floats format
    /// with the script's current number-conversion format.
    #[inline]
    pub fn string(&self) -> &str {
        self.sval.get_or_init(|| {
            if let Some(i) = self.ival.get() {
                i.to_string()
            } else if let Some(f) = self.fval.get() {
                format_number(f, &self.core.conv_fmt())
            } else {
                String::new()
            }
        })
    }

    /// Test the string projection against a regular expression, honoring
    /// the script's IgnoreCase setting, and record the match position in
    /// the script's RStart/RLength observables (1-based byte start and
    /// byte length; `(0, -1)` on no match). A pattern that fails to
    /// compile counts as no match.
    pub fn matches(&self, expr: &str) -> bool {
        let re = match self.core.compile_regex(expr) {
            Ok(re) => re,
            Err(_) => {
                self.core.set_match(0, -1);
                return false;
            }
        };
        match re.find(self.string()) {
            Some(m) => {
                self.core.set_match(m.start() as i64 + 1, m.len() as i64);
                true
            }
            None => {
                self.core.set_match(0, -1);
                false
            }
        }
    }

    /// String equality against anything convertible to a value,
    /// case-insensitively (ASCII folding) when the script's IgnoreCase is
    /// set.
    pub fn str_equal(&self, other: impl Into<Scalar>) -> bool {
        let other = Value::from_scalar(other.into(), Arc::clone(&self.core));
        if self.core.ignore_case() {
            self.string().eq_ignore_ascii_case(other.string())
        } else {
            self.string() == other.string()
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("ival", &self.ival.get())
            .field("fval", &self.fval.get())
            .field("sval", &self.sval.get())
            .finish()
    }
}

/// Truncate toward zero; values outside the `i64` range (and NaN) clamp to
/// `i64::MIN`.
pub(crate) fn f64_to_i64(f: f64) -> i64 {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, so `t <` excludes exactly the
    // unrepresentable values.
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        t as i64
    } else {
        i64::MIN
    }
}

/// Parse a string as a signed decimal by repeatedly stripping the trailing
/// character until the remainder parses or is exhausted.
/// "42abc" -> 42, "-17" -> -17, "x42" -> 0
pub(crate) fn parse_int_prefix(s: &str) -> i64 {
    let mut t = s;
    while !t.is_empty() {
        if let Ok(n) = t.parse::<i64>() {
            return n;
        }
        let last = t.char_indices().next_back().map(|(i, _)| i).unwrap_or(0);
        t = &t[..last];
    }
    0
}

/// Parse the leading numeric portion of a string using byte-based scanning.
/// "42abc" -> 42.0
/// "  3.14  " -> 3.14
/// "abc" -> 0.0
pub(crate) fn parse_leading_float(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut i = 0;

    // Skip leading whitespace
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    if i >= bytes.len() {
        return 0.0;
    }

    let start = i;

    // Optional sign
    if bytes[i] == b'+' || bytes[i] == b'-' {
        i += 1;
    }

    let mut has_digits = false;

    // Digits before decimal
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        has_digits = true;
    }

    // Decimal point and digits after
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            has_digits = true;
        }
    }

    if !has_digits {
        return 0.0;
    }

    // Exponent
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let exp_start = i;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        if i < bytes.len() && bytes[i].is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        } else {
            // Invalid exponent, back up
            i = exp_start;
        }
    }

    // An out-of-range literal parses to +/- infinity.
    s[start..i].parse().unwrap_or(0.0)
}

/// Format a number according to a printf-style specification such as
/// "%.6g". Supports the d/i, f/F, e/E, and g/G conversions with optional
/// flags, width, and precision. An unparsable specification falls back to
/// the shortest default formatting.
pub(crate) fn format_number(n: f64, spec: &str) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let Some(parsed) = parse_spec(spec) else {
        return format!("{}", n);
    };

    let formatted = match parsed.conv {
        'd' | 'i' => f64_to_i64(n).to_string(),
        'f' | 'F' => format!("{:.*}", parsed.precision.unwrap_or(6), n),
        'e' | 'E' => {
            let mut s = exponential(n, parsed.precision.unwrap_or(6));
            if parsed.conv == 'E' {
                s.make_ascii_uppercase();
            }
            s
        }
        'g' | 'G' => {
            let mut s = format_g(n, parsed.precision.unwrap_or(6));
            if parsed.conv == 'G' {
                s.make_ascii_uppercase();
            }
            s
        }
        _ => return format!("{}", n),
    };

    pad(formatted, parsed.width, parsed.left_align, parsed.zero_pad)
}

struct NumSpec {
    width: Option<usize>,
    precision: Option<usize>,
    left_align: bool,
    zero_pad: bool,
    conv: char,
}

fn parse_spec(spec: &str) -> Option<NumSpec> {
    let mut chars = spec.strip_prefix('%')?.chars().peekable();

    let mut left_align = false;
    let mut zero_pad = false;
    while let Some(&c) = chars.peek() {
        match c {
            '-' => left_align = true,
            '0' => zero_pad = true,
            '+' | ' ' | '#' => {}
            _ => break,
        }
        chars.next();
    }

    let mut width = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            width.push(c);
            chars.next();
        } else {
            break;
        }
    }

    let mut precision = String::new();
    let mut has_precision = false;
    if chars.peek() == Some(&'.') {
        chars.next();
        has_precision = true;
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                precision.push(c);
                chars.next();
            } else {
                break;
            }
        }
    }

    let conv = chars.next()?;
    if chars.next().is_some() {
        return None;
    }

    Some(NumSpec {
        width: width.parse().ok(),
        // "%.g" means precision 0
        precision: if has_precision {
            Some(precision.parse().unwrap_or(0))
        } else {
            None
        },
        left_align,
        zero_pad,
        conv,
    })
}

fn pad(s: String, width: Option<usize>, left_align: bool, zero_pad: bool) -> String {
    let Some(w) = width else { return s };
    if s.len() >= w {
        return s;
    }
    if left_align {
        format!("{:<w$}", s)
    } else if zero_pad {
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", s.as_str()),
        };
        format!("{sign}{}{digits}", "0".repeat(w - s.len()))
    } else {
        format!("{:>w$}", s)
    }
}

/// C-style %e: two-or-more exponent digits with an explicit sign.
fn exponential(n: f64, precision: usize) -> String {
    let s = format!("{:.*e}", precision, n);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let e: i32 = exp.parse().unwrap_or(0);
            format!("{mantissa}e{}{:02}", if e < 0 { '-' } else { '+' }, e.abs())
        }
        None => s,
    }
}

/// C-style %g: fixed notation when the decimal exponent is in [-4, prec),
/// exponential otherwise, with trailing zeros removed.
fn format_g(n: f64, precision: usize) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let prec = precision.max(1);

    // Round to `prec` significant digits first; the branch below depends
    // on the exponent after rounding.
    let e_str = format!("{:.*e}", prec - 1, n);
    let (mantissa, exp) = match e_str.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (e_str.as_str(), 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if exp >= -4 && exp < prec as i32 {
        // Fixed notation built from the rounded digits.
        let fixed = if exp >= 0 {
            let point = (exp as usize + 1).min(digits.len());
            let int_part = &digits[..point];
            let pad = (exp as usize + 1).saturating_sub(digits.len());
            let frac = trim_zeros(&digits[point..]);
            if frac.is_empty() {
                format!("{int_part}{}", "0".repeat(pad))
            } else {
                format!("{int_part}.{frac}")
            }
        } else {
            let frac = trim_zeros(&digits);
            format!("0.{}{frac}", "0".repeat((-exp - 1) as usize))
        };
        format!("{sign}{fixed}")
    } else {
        let rest = trim_zeros(&digits[1..]);
        let mantissa = if rest.is_empty() {
            digits[..1].to_string()
        } else {
            format!("{}.{rest}", &digits[..1])
        };
        format!(
            "{sign}{mantissa}e{}{:02}",
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        )
    }
}

fn trim_zeros(digits: &str) -> &str {
    digits.trim_end_matches('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(scalar: impl Into<Scalar>) -> Value {
        Value::from_scalar(scalar.into(), ScriptCore::new())
    }

    #[test]
    fn test_int_round_trip() {
        for n in [0i64, 1, -1, 42, i64::MAX, i64::MIN] {
            let v = value(n);
            assert_eq!(v.int(), n);
            assert_eq!(v.float(), n as f64);
        }
    }

    #[test]
    fn test_string_identity() {
        for s in ["", "hello", "  3.14  ", "日本語"] {
            assert_eq!(value(s).string(), s);
        }
    }

    #[test]
    fn test_int_to_string() {
        assert_eq!(value(42).string(), "42");
        assert_eq!(value(-7).string(), "-7");
    }

    #[test]
    fn test_float_to_string_conv_fmt() {
        assert_eq!(value(3.14159).string(), "3.14159");
        assert_eq!(value(20.0).string(), "20");
        assert_eq!(value(1234567.0).string(), "1.23457e+06");
        assert_eq!(value(0.0001).string(), "0.0001");
    }

    #[test]
    fn test_float_to_int_truncates() {
        assert_eq!(value(42.9).int(), 42);
        assert_eq!(value(-42.9).int(), -42);
    }

    #[test]
    fn test_float_to_int_overflow_clamps() {
        assert_eq!(value(1e300).int(), i64::MIN);
        assert_eq!(value(-1e300).int(), i64::MIN);
    }

    #[test]
    fn test_string_to_int() {
        assert_eq!(value("42abc").int(), 42);
        assert_eq!(value("-17").int(), -17);
        assert_eq!(value("+5").int(), 5);
        assert_eq!(value("-17.5").int(), -17);
        assert_eq!(value("abc").int(), 0);
        assert_eq!(value("").int(), 0);
    }

    #[test]
    fn test_string_to_float() {
        assert_eq!(value("42abc").float(), 42.0);
        assert_eq!(value("  3.14  ").float(), 3.14);
        assert_eq!(value("-5.5e2").float(), -550.0);
        assert_eq!(value(".25").float(), 0.25);
        assert_eq!(value("abc").float(), 0.0);
        assert!(value("1e999").float().is_infinite());
        assert!(value("-1e999").float() < 0.0);
    }

    #[test]
    fn test_float_parse_bad_exponent_backs_up() {
        assert_eq!(value("3e").float(), 3.0);
        assert_eq!(value("3e+").float(), 3.0);
    }

    #[test]
    fn test_bool_and_saturation() {
        assert_eq!(value(true).int(), 1);
        assert_eq!(value(false).int(), 0);
        assert_eq!(value(true).string(), "1");
        assert_eq!(value(u64::MAX).int(), i64::MAX);
    }

    #[test]
    fn test_copy_construction() {
        let a = value("99 bottles");
        assert_eq!(a.int(), 99);
        let b = Value::from_scalar(Scalar::from(&a), ScriptCore::new());
        assert_eq!(b.string(), "99 bottles");
        assert_eq!(b.int(), 99);
    }

    #[test]
    fn test_matches_sets_observables() {
        let core = ScriptCore::new();
        let v = Value::from_scalar("foo bar baz".into(), Arc::clone(&core));
        assert!(v.matches("ba+r"));
        assert_eq!(core.rstart(), 5);
        assert_eq!(core.rlength(), 3);

        assert!(!v.matches("quux"));
        assert_eq!(core.rstart(), 0);
        assert_eq!(core.rlength(), -1);
    }

    #[test]
    fn test_matches_bad_regex_is_silent() {
        let core = ScriptCore::new();
        let v = Value::from_scalar("anything".into(), Arc::clone(&core));
        assert!(v.matches("thing"));
        assert!(!v.matches("("));
        assert_eq!(core.rstart(), 0);
        assert_eq!(core.rlength(), -1);
    }

    #[test]
    fn test_matches_ignore_case() {
        let core = ScriptCore::new();
        let v = Value::from_scalar("Hello".into(), Arc::clone(&core));
        assert!(!v.matches("hello"));
        core.set_ignore_case(true);
        assert!(v.matches("hello"));
    }

    #[test]
    fn test_str_equal() {
        let core = ScriptCore::new();
        let v = Value::from_scalar("Duck".into(), Arc::clone(&core));
        assert!(v.str_equal("Duck"));
        assert!(!v.str_equal("duck"));
        core.set_ignore_case(true);
        assert!(v.str_equal("DUCK"));
        assert!(v.str_equal(&v.clone()));
    }

    #[test]
    fn test_format_number_g() {
        assert_eq!(format_number(42.0, "%.6g"), "42");
        assert_eq!(format_number(-2.5, "%.6g"), "-2.5");
        assert_eq!(format_number(0.0, "%.6g"), "0");
        assert_eq!(format_number(100000.0, "%.6g"), "100000");
        assert_eq!(format_number(1000000.0, "%.6g"), "1e+06");
        assert_eq!(format_number(0.00001, "%.6g"), "1e-05");
        assert_eq!(format_number(1.5, "%.1g"), "2");
        assert_eq!(format_number(123.456, "%.4g"), "123.5");
    }

    #[test]
    fn test_format_number_other_conversions() {
        assert_eq!(format_number(42.7, "%d"), "42");
        assert_eq!(format_number(-42.7, "%i"), "-42");
        assert_eq!(format_number(3.14, "%.1f"), "3.1");
        assert_eq!(format_number(1500.0, "%.2e"), "1.50e+03");
        assert_eq!(format_number(1500.0, "%.2E"), "1.50E+03");
    }

    #[test]
    fn test_format_number_width() {
        assert_eq!(format_number(3.14, "%8.1f"), "     3.1");
        assert_eq!(format_number(3.14, "%-8.1f"), "3.1     ");
        assert_eq!(format_number(-3.0, "%05d"), "-0003");
    }

    #[test]
    fn test_format_number_special() {
        assert_eq!(format_number(f64::NAN, "%.6g"), "nan");
        assert_eq!(format_number(f64::INFINITY, "%.6g"), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY, "%.6g"), "-inf");
        // Unparsable specification falls back to default formatting.
        assert_eq!(format_number(2.0, "bogus"), "2");
    }
}
