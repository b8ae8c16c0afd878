//! Property transforms and allowed-value sets.
//!
//! Transforms are a closed set so schema classes stay plain data. They run in
//! declaration order on a freshly assigned value, before its validators.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char as pchar, digit1, hex_digit1},
    combinator::{all_consuming, opt, recognize},
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};

use crate::value::Value;

/// Allowed literals, grouped by synonym. The first member of each group is
/// the canonical spelling every other member normalizes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedValues {
    groups: Vec<Vec<&'static str>>,
}

impl AllowedValues {
    pub fn new(groups: &[&[&'static str]]) -> Self {
        Self {
            groups: groups
                .iter()
                .filter(|g| !g.is_empty())
                .map(|g| g.to_vec())
                .collect(),
        }
    }

    /// The canonical spelling of `value`, if it is allowed at all.
    pub fn canonical(&self, value: &str) -> Option<&'static str> {
        self.groups
            .iter()
            .find(|group| group.iter().any(|member| *member == value))
            .map(|group| group[0])
    }

    pub fn contains(&self, value: &str) -> bool {
        self.canonical(value).is_some()
    }
}

impl fmt::Display for AllowedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(group[0])?;
            if group.len() > 1 {
                write!(f, " ({})", group[1..].join(", "))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Lowercase,
    /// Normalize synonyms to their canonical spelling; unknown text is left
    /// untouched for the `allowed` validator to reject.
    Alias(AllowedValues),
    /// Decimal or `0x` hexadecimal, optionally signed.
    Integer,
    Boolean,
    /// Split a field type into its base and container suffixes.
    TypeChain,
}

impl Transform {
    pub fn apply(&self, value: Value) -> Result<Value, String> {
        match (self, value) {
            (Transform::Lowercase, Value::Text(s)) => Ok(Value::Text(s.to_lowercase())),
            (Transform::Alias(allowed), Value::Text(s)) => Ok(Value::Text(
                allowed.canonical(&s).map(str::to_string).unwrap_or(s),
            )),
            (Transform::Integer, Value::Text(s)) => parse_integer(&s).map(Value::Integer),
            (Transform::Boolean, Value::Text(s)) => parse_boolean(&s).map(Value::Boolean),
            (Transform::TypeChain, Value::Text(s)) => dissect_type(&s).map(Value::List),
            (transform, other) => Err(format!(
                "{transform:?} transform cannot apply to a {} value",
                other.kind()
            )),
        }
    }
}

fn hex_literal(input: &str) -> IResult<&str, &str> {
    preceded(alt((tag("0x"), tag("0X"))), hex_digit1)(input)
}

fn signed<'a>(
    digits: impl FnMut(&'a str) -> IResult<&'a str, &'a str>,
) -> impl FnMut(&'a str) -> IResult<&'a str, (Option<char>, &'a str)> {
    pair(opt(alt((pchar('-'), pchar('+')))), digits)
}

pub fn parse_integer(text: &str) -> Result<i64, String> {
    let not_integer = || format!("`{text}` is not an integer");

    if let Ok((_, (sign, hex))) = all_consuming(signed(hex_literal))(text) {
        let magnitude = i128::from(u64::from_str_radix(hex, 16).map_err(|_| not_integer())?);
        let value = if sign == Some('-') { -magnitude } else { magnitude };
        return i64::try_from(value).map_err(|_| not_integer());
    }

    let (_, literal) =
        all_consuming(recognize(signed(digit1)))(text).map_err(|_| not_integer())?;
    literal.parse::<i64>().map_err(|_| not_integer())
}

pub fn parse_boolean(text: &str) -> Result<bool, String> {
    match text.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!(
            "`{text}` is not a boolean; expected one of true, false, yes, no, on, off, 1, 0"
        )),
    }
}

/// `uint32[]{}` → `["uint32", "[]", "{}"]`.
pub fn dissect_type(text: &str) -> Result<Vec<String>, String> {
    fn chain(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
        pair(
            take_while1(|c: char| c != '[' && c != ']' && c != '{' && c != '}'),
            many0(alt((tag("[]"), tag("{}")))),
        )(input)
    }

    let (_, (base, containers)) = all_consuming(chain)(text)
        .map_err(|_| format!("malformed type `{text}`; expected a name followed by [] or {{}}"))?;

    let mut out = Vec::with_capacity(containers.len() + 1);
    out.push(base.to_string());
    out.extend(containers.into_iter().map(str::to_string));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_chain_keeps_container_order() {
        assert_eq!(dissect_type("uint32").unwrap(), vec!["uint32"]);
        assert_eq!(
            dissect_type("Point[]{}").unwrap(),
            vec!["Point", "[]", "{}"]
        );
        assert!(dissect_type("[]").is_err());
        assert!(dissect_type("Point[").is_err());
        assert!(dissect_type("Po]nt").is_err());
    }

    #[test]
    fn integers_accept_sign_and_hex() {
        assert_eq!(parse_integer("42"), Ok(42));
        assert_eq!(parse_integer("-7"), Ok(-7));
        assert_eq!(parse_integer("+3"), Ok(3));
        assert_eq!(parse_integer("0x1F"), Ok(31));
        assert_eq!(parse_integer("-0x10"), Ok(-16));
        assert!(parse_integer("4.5").is_err());
        assert!(parse_integer("ten").is_err());
        assert!(parse_integer("99999999999999999999").is_err());
    }

    #[test]
    fn hex_and_decimal_share_the_i64_range() {
        assert_eq!(parse_integer("-0x8000000000000000"), Ok(i64::MIN));
        assert_eq!(parse_integer("-9223372036854775808"), Ok(i64::MIN));
        assert_eq!(parse_integer("0x7fffffffffffffff"), Ok(i64::MAX));
        assert!(parse_integer("0x8000000000000000").is_err());
        assert!(parse_integer("-0x8000000000000001").is_err());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        assert_eq!(parse_boolean("YES"), Ok(true));
        assert_eq!(parse_boolean("off"), Ok(false));
        assert!(parse_boolean("maybe").is_err());
    }

    #[test]
    fn alias_normalizes_to_first_member() {
        let allowed = AllowedValues::new(&[&["class"], &["enumeration", "enum"], &["glossary"]]);
        let out = Transform::Alias(allowed.clone())
            .apply(Value::Text("enum".into()))
            .unwrap();
        assert_eq!(out, Value::Text("enumeration".into()));

        let untouched = Transform::Alias(allowed.clone())
            .apply(Value::Text("struct".into()))
            .unwrap();
        assert_eq!(untouched, Value::Text("struct".into()));
        assert_eq!(allowed.to_string(), "class, enumeration (enum), glossary");
    }

    #[test]
    fn text_transforms_reject_converted_values() {
        assert!(Transform::Lowercase.apply(Value::Integer(1)).is_err());
    }
}
