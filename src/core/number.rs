// Numeric rendering hooks for integer, floating, and exact-decimal columns.
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number<'a> {
    Integer(i64),
    Float(f64),
    /// Exact decimal in plain text form, e.g. `-1234.5600`.
    Decimal(&'a str),
}

impl fmt::Display for Number<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
            Number::Decimal(text) => f.write_str(text),
        }
    }
}

pub trait NumberFormat {
    fn format(&self, number: Number<'_>) -> String;
}

impl<F> NumberFormat for F
where
    F: Fn(Number<'_>) -> String,
{
    fn format(&self, number: Number<'_>) -> String {
        self(number)
    }
}

/// Fixed-fraction formatter with optional thousands grouping.
///
/// Fractions longer than `max_fraction` are rounded half away from zero; shorter ones are
/// padded with zeros up to `min_fraction`. Text that is not a plain decimal number is
/// passed through untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecimalFormat {
    pub min_fraction: usize,
    pub max_fraction: usize,
    pub grouping: bool,
}

impl DecimalFormat {
    pub fn new(min_fraction: usize, max_fraction: usize) -> Self {
        Self {
            min_fraction,
            max_fraction: max_fraction.max(min_fraction),
            grouping: false,
        }
    }

    pub fn integer() -> Self {
        Self::new(0, 0)
    }

    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    fn format_text(&self, text: &str) -> Option<String> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !is_digits(int_part) || !is_digits(frac_part) {
            return None;
        }

        let (mut int_digits, mut frac_digits) =
            round_half_up(int_part.as_bytes(), frac_part.as_bytes(), self.max_fraction);
        while frac_digits.len() > self.min_fraction && frac_digits.last() == Some(&b'0') {
            frac_digits.pop();
        }
        while frac_digits.len() < self.min_fraction {
            frac_digits.push(b'0');
        }
        while int_digits.len() > 1 && int_digits[0] == b'0' {
            int_digits.remove(0);
        }
        if int_digits.is_empty() {
            int_digits.push(b'0');
        }

        let is_zero = int_digits.iter().chain(frac_digits.iter()).all(|b| *b == b'0');
        let mut out = String::new();
        if negative && !is_zero {
            out.push('-');
        }
        out.push_str(&group(&int_digits, self.grouping));
        if !frac_digits.is_empty() {
            out.push('.');
            out.extend(frac_digits.iter().map(|b| *b as char));
        }
        Some(out)
    }
}

impl NumberFormat for DecimalFormat {
    fn format(&self, number: Number<'_>) -> String {
        let text = match number {
            Number::Float(value) if !value.is_finite() => return value.to_string(),
            // Shortest round-trip digits, always positional.
            Number::Float(value) => value.to_string(),
            Number::Integer(value) => value.to_string(),
            Number::Decimal(text) => text.trim().to_string(),
        };
        self.format_text(&text).unwrap_or(text)
    }
}

fn round_half_up(int_part: &[u8], frac_part: &[u8], keep: usize) -> (Vec<u8>, Vec<u8>) {
    let mut int_digits = int_part.to_vec();
    if frac_part.len() <= keep {
        return (int_digits, frac_part.to_vec());
    }
    let mut frac_digits = frac_part[..keep].to_vec();
    if frac_part[keep] < b'5' {
        return (int_digits, frac_digits);
    }
    let mut carry = true;
    for digit in frac_digits.iter_mut().rev().chain(int_digits.iter_mut().rev()) {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            carry = false;
            break;
        }
    }
    if carry {
        int_digits.insert(0, b'1');
    }
    (int_digits, frac_digits)
}

fn group(int_digits: &[u8], grouping: bool) -> String {
    let mut out = String::with_capacity(int_digits.len() + int_digits.len() / 3);
    for (idx, digit) in int_digits.iter().enumerate() {
        let remaining = int_digits.len() - idx;
        if grouping && idx > 0 && remaining % 3 == 0 {
            out.push(',');
        }
        out.push(*digit as char);
    }
    out
}
