//! printf-style column formats for data set output.
//!
//! A format holds exactly one conversion, optionally surrounded by literal
//! text: `%10.4f`, `%8d`, `#%7s`, `% 20d`, `%12.3e`. Supported flags are
//! `-`, `+`, space and `0`; supported conversions are `d i u f F e E s`.
//! `%%` renders a literal percent sign.

use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};
use thiserror::Error;

/// Largest width or precision a format may request.
pub const MAX_FIELD_WIDTH: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("'{0}' contains no conversion")]
    MissingConversion(String),
    #[error("'{0}' contains more than one conversion")]
    MultipleConversions(String),
    #[error("unsupported conversion '{conversion}' in '{format}'")]
    UnsupportedConversion { format: String, conversion: char },
    #[error("'{0}' ends inside a conversion")]
    Incomplete(String),
    #[error("'{0}' must use a text conversion ('%s')")]
    NotText(String),
    #[error("width or precision in '{format}' exceeds {limit}")]
    FieldTooWide { format: String, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `%d`: value truncated toward zero.
    Integer,
    /// `%f`: fixed-point notation.
    Fixed,
    /// `%e` / `%E`: scientific notation with a signed two-digit exponent.
    Exponent { upper: bool },
    /// `%s`: plain text.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFormat {
    source: String,
    prefix: String,
    suffix: String,
    left_align: bool,
    force_sign: bool,
    space_sign: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

impl ColumnFormat {
    pub fn conversion(&self) -> Conversion {
        self.conversion
    }

    pub fn is_text(&self) -> bool {
        self.conversion == Conversion::Text
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parses `format` and checks that it renders text, as required for headers.
    pub fn text(format: &str) -> Result<Self, FormatError> {
        let parsed: Self = format.parse()?;
        if parsed.is_text() {
            Ok(parsed)
        } else {
            Err(FormatError::NotText(format.to_string()))
        }
    }

    /// Renders a numeric value.
    pub fn format_value(&self, value: f64) -> String {
        let (negative, body, numeric) = match self.conversion {
            Conversion::Text => (false, format!("{:?}", value), false),
            _ if value.is_nan() => (false, "nan".to_string(), false),
            _ if value.is_infinite() => (value < 0.0, "inf".to_string(), false),
            Conversion::Integer => {
                let truncated = value.trunc();
                let mut digits = format!("{:.0}", truncated.abs());
                if let Some(min_digits) = self.precision {
                    if digits.len() < min_digits {
                        digits = format!("{}{}", "0".repeat(min_digits - digits.len()), digits);
                    }
                }
                (truncated < 0.0, digits, true)
            }
            Conversion::Fixed => {
                let precision = self.precision.unwrap_or(6);
                (
                    value.is_sign_negative(),
                    format!("{:.*}", precision, value.abs()),
                    true,
                )
            }
            Conversion::Exponent { upper } => {
                let precision = self.precision.unwrap_or(6);
                (
                    value.is_sign_negative(),
                    exponent_body(value.abs(), precision, upper),
                    true,
                )
            }
        };
        let sign = if negative {
            "-"
        } else if self.force_sign && self.conversion != Conversion::Text {
            "+"
        } else if self.space_sign && self.conversion != Conversion::Text {
            " "
        } else {
            ""
        };
        self.render(sign, &body, numeric)
    }

    /// Renders a text value, such as a column name.
    pub fn format_text(&self, text: &str) -> String {
        let body: String = match (self.conversion, self.precision) {
            (Conversion::Text, Some(max)) => text.chars().take(max).collect(),
            _ => text.to_string(),
        };
        self.render("", &body, false)
    }

    fn render(&self, sign: &str, body: &str, zero_paddable: bool) -> String {
        let len = sign.chars().count() + body.chars().count();
        let fill = self.width.saturating_sub(len);
        let padded = if fill == 0 {
            format!("{}{}", sign, body)
        } else if self.left_align {
            format!("{}{}{}", sign, body, " ".repeat(fill))
        } else if self.zero_pad && zero_paddable {
            format!("{}{}{}", sign, "0".repeat(fill), body)
        } else {
            format!("{}{}{}", " ".repeat(fill), sign, body)
        };
        format!("{}{}{}", self.prefix, padded, self.suffix)
    }
}

fn exponent_body(value: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, value);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, marker, sign, exponent.abs())
}

/// Reads a run of decimal digits, rejecting values above [`MAX_FIELD_WIDTH`].
fn read_field(chars: &mut Peekable<Chars<'_>>, format: &str) -> Result<usize, FormatError> {
    let mut value = 0usize;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit as usize))
            .filter(|&v| v <= MAX_FIELD_WIDTH)
            .ok_or_else(|| FormatError::FieldTooWide {
                format: format.to_string(),
                limit: MAX_FIELD_WIDTH,
            })?;
        chars.next();
    }
    Ok(value)
}

impl FromStr for ColumnFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec: Option<(bool, bool, bool, bool, usize, Option<usize>, Conversion)> = None;
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            let literal = if spec.is_none() { &mut prefix } else { &mut suffix };
            if c != '%' {
                literal.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }
            if spec.is_some() {
                return Err(FormatError::MultipleConversions(s.to_string()));
            }

            let (mut left, mut plus, mut space, mut zero) = (false, false, false, false);
            while let Some(&flag) = chars.peek() {
                match flag {
                    '-' => left = true,
                    '+' => plus = true,
                    ' ' => space = true,
                    '0' => zero = true,
                    '#' => {}
                    _ => break,
                }
                chars.next();
            }

            let width = read_field(&mut chars, s)?;

            let mut precision = None;
            if chars.peek() == Some(&'.') {
                chars.next();
                precision = Some(read_field(&mut chars, s)?);
            }

            while matches!(chars.peek(), Some('l' | 'h' | 'L')) {
                chars.next();
            }

            let conversion = match chars.next() {
                Some('d' | 'i' | 'u') => Conversion::Integer,
                Some('f' | 'F') => Conversion::Fixed,
                Some('e') => Conversion::Exponent { upper: false },
                Some('E') => Conversion::Exponent { upper: true },
                Some('s') => Conversion::Text,
                Some(other) => {
                    return Err(FormatError::UnsupportedConversion {
                        format: s.to_string(),
                        conversion: other,
                    });
                }
                None => return Err(FormatError::Incomplete(s.to_string())),
            };
            spec = Some((left, plus, space, zero, width, precision, conversion));
        }

        let (left_align, force_sign, space_sign, zero_pad, width, precision, conversion) =
            spec.ok_or_else(|| FormatError::MissingConversion(s.to_string()))?;
        Ok(Self {
            source: s.to_string(),
            prefix,
            suffix,
            left_align,
            force_sign,
            space_sign,
            zero_pad,
            width,
            precision,
            conversion,
        })
    }
}

impl fmt::Display for ColumnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
