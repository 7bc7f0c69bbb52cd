//! Brace-style templates for stat display strings.
//!
//! Monitors publish templates such as `"{last:.4f}"` or `" ({running_avg:.4f})"`
//! alongside their values, and the text logger renders them against the
//! stat object. Supported replacement fields:
//!
//! - `{name}` and `{name:spec}` look up `name` in the named arguments
//! - `{}` and `{:spec}` use the positional value
//! - `{{` and `}}` are literal braces
//!
//! `spec` is `[[fill]align][sign][#][0][width][,|_][.precision][type]`, with
//! `type` one of `s b d n o x X e E f F g G %`.

use crate::{Result, VizlogError};
use serde_json::{Map, Value};

/// Arguments a template is rendered against.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatArgs<'a> {
    positional: Option<&'a Value>,
    named: Option<&'a Map<String, Value>>,
}

impl<'a> FormatArgs<'a> {
    pub fn positional(value: &'a Value) -> Self {
        Self {
            positional: Some(value),
            named: None,
        }
    }

    pub fn named(map: &'a Map<String, Value>) -> Self {
        Self {
            positional: None,
            named: Some(map),
        }
    }

    fn lookup(&self, name: &str) -> Result<&'a Value> {
        if name.is_empty() {
            return self
                .positional
                .ok_or_else(|| VizlogError::Format("no positional argument".to_string()));
        }
        self.named
            .and_then(|map| map.get(name))
            .ok_or_else(|| VizlogError::Format(format!("missing key '{}'", name)))
    }
}

/// Render `template` against `args`.
pub fn format_template(template: &str, args: FormatArgs<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => {
                            return Err(VizlogError::Format(format!(
                                "unclosed '{{' in template {:?}",
                                template
                            )))
                        }
                    }
                }
                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name, spec),
                    None => (field.as_str(), ""),
                };
                let value = args.lookup(name)?;
                out.push_str(&format_value(value, spec)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(VizlogError::Format(format!(
                    "single '}}' in template {:?}",
                    template
                )))
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

#[derive(Debug, Default, PartialEq)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

const KINDS: &str = "sbdnoxXeEfFgG%";

fn is_align(c: char) -> bool {
    matches!(c, '<' | '>' | '^' | '=')
}

fn parse_spec(spec: &str) -> Result<Spec> {
    let bad = || VizlogError::Format(format!("invalid format spec {:?}", spec));
    let chars: Vec<char> = spec.chars().collect();
    let number = |digits: &[char]| digits.iter().collect::<String>().parse::<usize>().ok();
    let mut parsed = Spec::default();
    let mut i = 0;

    if chars.len() >= 2 && is_align(chars[1]) {
        parsed.fill = Some(chars[0]);
        parsed.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().map_or(false, is_align) {
        parsed.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&(c @ ('+' | '-' | ' '))) = chars.get(i) {
        parsed.sign = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        parsed.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        parsed.zero = true;
        i += 1;
    }

    let start = i;
    while chars.get(i).map_or(false, char::is_ascii_digit) {
        i += 1;
    }
    if i > start {
        parsed.width = number(&chars[start..i]).ok_or_else(bad)?;
    }

    if let Some(&(c @ (',' | '_'))) = chars.get(i) {
        parsed.grouping = Some(c);
        i += 1;
    }

    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).map_or(false, char::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return Err(bad());
        }
        parsed.precision = Some(number(&chars[start..i]).ok_or_else(bad)?);
    }

    match &chars[i..] {
        [] => {}
        [kind] if KINDS.contains(*kind) => parsed.kind = Some(*kind),
        _ => return Err(bad()),
    }
    Ok(parsed)
}

/// Render a single value with a format spec.
///
/// `spec` follows `[[fill]align][sign][#][0][width][,|_][.precision][type]`.
/// An empty spec renders the value as plain text (`str()`).
pub fn format_value(value: &Value, spec: &str) -> Result<String> {
    if spec.is_empty() {
        return Ok(display(value));
    }
    let spec = parse_spec(spec)?;
    match value {
        Value::Number(n) => match n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from)) {
            Some(i) => format_integer(i, &spec),
            None => format_float(number(value)?, &spec),
        },
        Value::Bool(b) => format_integer(i128::from(*b), &spec),
        other => format_text(&display(other), &spec),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::Number(n) => n.as_f64().map(repr_float).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn format_text(text: &str, spec: &Spec) -> Result<String> {
    let bad = |what: &str| VizlogError::Format(format!("{} not allowed for text {:?}", what, text));
    if !matches!(spec.kind, None | Some('s')) {
        return Err(VizlogError::Format(format!(
            "format code '{}' does not apply to {:?}",
            spec.kind.unwrap_or('?'),
            text
        )));
    }
    if spec.sign.is_some() {
        return Err(bad("sign"));
    }
    if spec.grouping.is_some() {
        return Err(bad("grouping"));
    }
    if spec.alternate {
        return Err(bad("alternate form"));
    }
    if spec.align == Some('=') {
        return Err(bad("'=' alignment"));
    }

    let body = match spec.precision {
        Some(p) => text.chars().take(p).collect(),
        None => text.to_string(),
    };
    let fill = spec.fill.unwrap_or(if spec.zero { '0' } else { ' ' });
    Ok(pad(body, spec.width, spec.align.unwrap_or('<'), fill))
}

fn format_integer(i: i128, spec: &Spec) -> Result<String> {
    let (prefix, digits, every) = match spec.kind {
        Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') => return format_float(i as f64, spec),
        Some('s') => {
            return Err(VizlogError::Format(format!(
                "format code 's' does not apply to integer {}",
                i
            )))
        }
        _ if spec.precision.is_some() => {
            return Err(VizlogError::Format(format!(
                "precision not allowed for integer {}",
                i
            )))
        }
        Some('b') => ("0b", format!("{:b}", i.unsigned_abs()), 4),
        Some('o') => ("0o", format!("{:o}", i.unsigned_abs()), 4),
        Some('x') => ("0x", format!("{:x}", i.unsigned_abs()), 4),
        Some('X') => ("0X", format!("{:X}", i.unsigned_abs()), 4),
        _ => ("", i.unsigned_abs().to_string(), 3),
    };

    let digits = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, every),
        None => digits,
    };
    let prefix = if spec.alternate { prefix } else { "" };
    Ok(finish_number(i < 0, prefix, digits, spec))
}

fn format_float(x: f64, spec: &Spec) -> Result<String> {
    let negative = x.is_sign_negative();
    let x = x.abs();
    let body = match (spec.kind, spec.precision) {
        (Some('f' | 'F'), p) => fixed(x, p.unwrap_or(6)),
        (Some('e'), p) => scientific(x, p.unwrap_or(6)),
        (Some('E'), p) => scientific(x, p.unwrap_or(6)).to_uppercase(),
        (Some('g' | 'n'), p) => general(x, p.unwrap_or(6), spec.alternate, false),
        (Some('G'), p) => general(x, p.unwrap_or(6), spec.alternate, false).to_uppercase(),
        (Some('%'), p) => format!("{}%", fixed(x * 100.0, p.unwrap_or(6))),
        (None, Some(p)) => general(x, p, spec.alternate, true),
        (None, None) => repr_float(x),
        (Some(kind), _) => {
            return Err(VizlogError::Format(format!(
                "format code '{}' does not apply to float {}",
                kind, x
            )))
        }
    };

    let body = match spec.grouping {
        Some(sep) => group_digits(&body, sep, 3),
        None => body,
    };
    Ok(finish_number(negative, "", body, spec))
}

/// Sign, prefix, padding and digits, with `=` padding placed after the sign.
fn finish_number(negative: bool, prefix: &str, body: String, spec: &Spec) -> String {
    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    };
    let fill = spec.fill.unwrap_or(if spec.zero { '0' } else { ' ' });
    let align = spec.align.unwrap_or(if spec.zero { '=' } else { '>' });
    let head = format!("{}{}", sign, prefix);

    if align == '=' {
        let len = head.chars().count() + body.chars().count();
        let padding = fill.to_string().repeat(spec.width.saturating_sub(len));
        return format!("{}{}{}", head, padding, body);
    }
    pad(head + &body, spec.width, align, fill)
}

/// Insert `sep` every `every` digits of the leading digit run.
fn group_digits(body: &str, sep: char, every: usize) -> String {
    let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
    let (int_part, rest) = body.split_at(split);
    let mut grouped = String::with_capacity(body.len() + int_part.len() / every);
    for (idx, c) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % every == 0 {
            grouped.push(sep);
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

fn number(value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| VizlogError::Format(format!("expected a number, got {}", value)))
}

fn fixed(x: f64, precision: usize) -> String {
    format!("{:.*}", precision, x)
}

fn split_exponent(raw: &str) -> (&str, i32) {
    match raw.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (raw, 0),
    }
}

/// Signed, at least two-digit exponent (`+03`, `-05`).
fn exponent(exp: i32) -> String {
    format!("{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs())
}

/// Scientific notation such as `1.50e+03`.
fn scientific(x: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, x);
    let (mantissa, exp) = split_exponent(&raw);
    format!("{}e{}", mantissa, exponent(exp))
}

fn strip_zeros(body: &str) -> String {
    if body.contains('.') {
        body.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        body.to_string()
    }
}

/// `precision` significant digits, switching to scientific notation for
/// large or small exponents. With `add_dot_0` (no type code given) the
/// switch happens one digit earlier and fixed output keeps a `.0`.
fn general(x: f64, precision: usize, alternate: bool, add_dot_0: bool) -> String {
    let p = precision.max(1);
    let raw = format!("{:.*e}", p - 1, x);
    let (mantissa, exp) = split_exponent(&raw);
    let limit = if add_dot_0 { p as i32 - 1 } else { p as i32 };

    if exp < -4 || exp >= limit {
        let mantissa = if alternate { mantissa.to_string() } else { strip_zeros(mantissa) };
        return format!("{}e{}", mantissa, exponent(exp));
    }

    let decimals = (p as i32 - 1 - exp).max(0) as usize;
    let mut body = fixed(x, decimals);
    if !alternate {
        body = strip_zeros(&body);
    }
    if add_dot_0 && !body.contains('.') {
        body.push_str(".0");
    }
    body
}

/// Shortest round-trip float, scientific outside `1e-4 <= |x| < 1e16`.
fn repr_float(x: f64) -> String {
    let shortest = format!("{:e}", x);
    let (mantissa, exp) = split_exponent(&shortest);
    if x != 0.0 && (exp < -4 || exp >= 16) {
        return format!("{}e{}", mantissa, exponent(exp));
    }
    let mut body = x.to_string();
    if !body.contains('.') {
        body.push_str(".0");
    }
    body
}

fn pad(body: String, width: usize, align: char, fill: char) -> String {
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill_str = |n: usize| fill.to_string().repeat(n);
    let missing = width - len;
    match align {
        '>' => format!("{}{}", fill_str(missing), body),
        '^' => {
            let left = missing / 2;
            format!("{}{}{}", fill_str(left), body, fill_str(missing - left))
        }
        _ => format!("{}{}", body, fill_str(missing)),
    }
}
