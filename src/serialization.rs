//! Canonical string forms for values.
//!
//! Every fundamental kind describes the text it accepts as an ordered list of
//! [`RegexAlternative`]s. [`deserialize`] walks that list in order and commits
//! to the first alternative that fully matches; if that match does not parse
//! or fails `validate_item`, the text is rejected. [`serialize`] renders the
//! single canonical form.
//!
//! Dates accept four field orders, tried in this precedence:
//!
//! | # | Order      | Example      |
//! |---|------------|--------------|
//! | 1 | `Y-M-D`    | `2016-01-02` |
//! | 2 | `M-D-Y`    | `01-02-2016` |
//! | 3 | `YY-M-D`   | `16-01-02`   |
//! | 4 | `M-D-YY`   | `01-02-16`   |
//!
//! Separators may be `-`, `/` or `.`. Two-digit years land in the current
//! century, so `01-02-03` reads as 2001-02-03.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use regex::{Captures, Regex, RegexBuilder};
use url::Url;
use uuid::Uuid;

use crate::error::{SchemaError, ValidationError};
use crate::type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, StringKind,
    TypeInfo, TypeVisitor,
};
use crate::types::{value_type_name, SourceLocation, Value};

/// One accepted textual form of a kind.
#[derive(Clone)]
pub struct RegexAlternative {
    /// Unanchored expression; the whole text must match it.
    pub pattern: String,
    pub case_insensitive: bool,
    anchored: Regex,
    parse: Parse,
}

impl RegexAlternative {
    fn new(
        pattern: impl Into<String>,
        case_insensitive: bool,
        parse: Parse,
    ) -> Result<Self, SchemaError> {
        let pattern = pattern.into();
        let anchored = RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| {
                SchemaError::metadata(
                    &["validation_expression"],
                    format!("invalid regular expression: {}", e),
                )
            })?;
        Ok(Self {
            pattern,
            case_insensitive,
            anchored,
            parse,
        })
    }

    /// Whether the whole of `text` matches this alternative.
    pub fn is_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl fmt::Debug for RegexAlternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexAlternative")
            .field("pattern", &self.pattern)
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}

impl fmt::Display for RegexAlternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.case_insensitive {
            write!(f, "{} (case-insensitive)", self.pattern)
        } else {
            f.write_str(&self.pattern)
        }
    }
}

/// Ordered alternatives accepted for `ti`.
///
/// # Errors
///
/// `UnsupportedConstruct` for classes and dictionaries, which have no string form.
pub fn regex_alternatives(ti: &TypeInfo) -> Result<Vec<RegexAlternative>, SchemaError> {
    ti.accept(&mut Alternatives)
}

/// Render a value in its canonical text form.
///
/// The value is checked with `validate_item` first; collections are not
/// accepted here, serialize their items one by one.
///
/// # Errors
///
/// `InvalidValue` if the value is rejected, `UnsupportedConstruct` for classes
/// and dictionaries.
pub fn serialize(ti: &TypeInfo, value: &Value) -> Result<String, SchemaError> {
    ti.validate_item(value)?;
    ti.accept(&mut Canonical { value })
}

/// Parse text into a value of `ti`'s kind.
///
/// # Errors
///
/// `StringFormat` naming the kind and text when no alternative yields a valid value.
pub fn deserialize(ti: &TypeInfo, text: &str) -> Result<Value, SchemaError> {
    for alternative in regex_alternatives(ti)? {
        let Some(captures) = alternative.anchored.captures(text) else {
            continue;
        };
        // the first full match decides; later alternatives are not consulted
        return alternative
            .parse
            .parse(&captures, text)
            .and_then(|value| {
                ti.validate_item(&value)
                    .map(|()| value)
                    .map_err(|e| e.message)
            })
            .map_err(|reason| SchemaError::string_format(ti.kind_name(), text, reason));
    }
    Err(SchemaError::string_format(
        ti.kind_name(),
        text,
        "no alternative matched",
    ))
}

// ---- alternatives -------------------------------------------------------

const YEAR4: &str = r"(?P<year>\d{4})";
const YEAR2: &str = r"(?P<year>\d{2})";
const MONTH: &str = r"(?P<month>0?[1-9]|1[0-2])";
const DAY: &str = r"(?P<day>0?[1-9]|[12]\d|3[01])";
const SEP: &str = "[-/.]";
const TIME: &str =
    r"(?P<hour>[01]?\d|2[0-3]):(?P<minute>[0-5]\d)(?::(?P<second>[0-5]\d)(?:\.(?P<fraction>\d{1,9}))?)?";
const DURATION: &str = r"(?P<sign>-)?(?:(?P<days>\d+)\.)?(?P<hours>\d{1,2}):(?P<minutes>[0-5]?\d):(?P<seconds>[0-5]?\d)(?:\.(?P<fraction>\d{1,9}))?";

/// Date field orders in precedence order.
fn date_patterns() -> [String; 4] {
    [
        format!("{YEAR4}{SEP}{MONTH}{SEP}{DAY}"),
        format!("{MONTH}{SEP}{DAY}{SEP}{YEAR4}"),
        format!("{YEAR2}{SEP}{MONTH}{SEP}{DAY}"),
        format!("{MONTH}{SEP}{DAY}{SEP}{YEAR2}"),
    ]
}

fn digit_count(n: u64) -> usize {
    n.to_string().len()
}

fn float_digits(f: f64) -> usize {
    format!("{:.0}", f.abs().trunc()).len()
}

fn sign(non_negative: bool) -> &'static str {
    if non_negative {
        r"\+?"
    } else {
        "[-+]?"
    }
}

fn int_pattern(min: Option<i64>, max: Option<i64>) -> String {
    let digits = match (min, max) {
        (Some(lo), Some(hi)) => format!(
            r"\d{{1,{}}}",
            digit_count(lo.unsigned_abs()).max(digit_count(hi.unsigned_abs()))
        ),
        _ => r"\d+".to_string(),
    };
    format!("{}{}", sign(matches!(min, Some(lo) if lo >= 0)), digits)
}

fn float_pattern(min: Option<f64>, max: Option<f64>) -> String {
    let sign = sign(matches!(min, Some(lo) if lo >= 0.0));
    match (min, max) {
        (Some(lo), Some(hi)) => format!(
            r"{}(?:\d{{1,{}}}(?:\.\d+)?|\.\d+)",
            sign,
            float_digits(lo).max(float_digits(hi))
        ),
        _ => format!(r"{}(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?", sign),
    }
}

fn choice(values: &[String]) -> String {
    let escaped: Vec<String> = values.iter().map(|v| regex::escape(v)).collect();
    format!("(?:{})", escaped.join("|"))
}

type AlternativeList = Result<Vec<RegexAlternative>, SchemaError>;

struct Alternatives;

impl Alternatives {
    fn one(pattern: impl Into<String>, case_insensitive: bool, parse: Parse) -> AlternativeList {
        Ok(vec![RegexAlternative::new(pattern, case_insensitive, parse)?])
    }
}

impl TypeVisitor for Alternatives {
    type Output = AlternativeList;

    fn visit_bool(&mut self, _: &TypeInfo) -> AlternativeList {
        Ok(vec![
            RegexAlternative::new("true|t|yes|y|on|1", true, Parse::Bool(true))?,
            RegexAlternative::new("false|f|no|n|off|0", true, Parse::Bool(false))?,
        ])
    }

    fn visit_int(&mut self, _: &TypeInfo, kind: &IntKind) -> AlternativeList {
        let width = kind.width_bounds();
        let min = kind.min.or(width.map(|(lo, _)| lo));
        let max = kind.max.or(width.map(|(_, hi)| hi));
        Self::one(int_pattern(min, max), false, Parse::Int)
    }

    fn visit_float(&mut self, _: &TypeInfo, kind: &FloatKind) -> AlternativeList {
        Self::one(float_pattern(kind.min, kind.max), false, Parse::Float)
    }

    fn visit_string(&mut self, _: &TypeInfo, kind: &StringKind) -> AlternativeList {
        let pattern = match &kind.validation_expression {
            Some(expression) => expression.as_str().to_string(),
            None if kind.min_length == 0 => "(?s:.*)".to_string(),
            None => "(?s:.+)".to_string(),
        };
        Self::one(pattern, false, Parse::Text)
    }

    fn visit_enum(&mut self, _: &TypeInfo, kind: &EnumKind) -> AlternativeList {
        let mut alternatives = vec![RegexAlternative::new(
            choice(&kind.values),
            true,
            Parse::Enum {
                accepted: kind.values.clone(),
                values: kind.values.clone(),
            },
        )?];
        if let Some(friendly) = &kind.friendly_values {
            alternatives.push(RegexAlternative::new(
                choice(friendly),
                true,
                Parse::Enum {
                    accepted: friendly.clone(),
                    values: kind.values.clone(),
                },
            )?);
        }
        Ok(alternatives)
    }

    fn visit_date(&mut self, _: &TypeInfo) -> AlternativeList {
        date_patterns()
            .into_iter()
            .map(|pattern| RegexAlternative::new(pattern, false, Parse::Date))
            .collect()
    }

    fn visit_time(&mut self, _: &TypeInfo) -> AlternativeList {
        Self::one(TIME, false, Parse::Time)
    }

    fn visit_date_time(&mut self, _: &TypeInfo) -> AlternativeList {
        date_patterns()
            .into_iter()
            .map(|date| RegexAlternative::new(format!("{}[T ]{}", date, TIME), true, Parse::DateTime))
            .collect()
    }

    fn visit_duration(&mut self, _: &TypeInfo) -> AlternativeList {
        Self::one(DURATION, false, Parse::Duration)
    }

    fn visit_guid(&mut self, _: &TypeInfo) -> AlternativeList {
        Self::one(
            r"\{?[0-9a-f]{8}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{12}\}?",
            true,
            Parse::Guid,
        )
    }

    fn visit_uri(&mut self, _: &TypeInfo) -> AlternativeList {
        Self::one(r"[A-Za-z][A-Za-z0-9+.\-]*:\S+", false, Parse::Uri)
    }

    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> AlternativeList {
        Self::one("(?s:.+)", false, Parse::Path)
    }

    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> AlternativeList {
        Self::one("(?s:.+)", false, Parse::Path)
    }

    fn visit_class(&mut self, _: &TypeInfo, _: &ClassKind) -> AlternativeList {
        Err(SchemaError::unsupported(
            "string serialization of a class",
            &SourceLocation::api(),
        ))
    }

    fn visit_dict(&mut self, _: &TypeInfo, _: &ClassKind) -> AlternativeList {
        Err(SchemaError::unsupported(
            "string serialization of a dictionary",
            &SourceLocation::api(),
        ))
    }

    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> AlternativeList {
        let mut all = Vec::new();
        for alternative in &kind.alternatives {
            all.extend(alternative.accept(self)?);
        }
        Ok(all)
    }
}

// ---- parsing ------------------------------------------------------------

#[derive(Debug, Clone)]
enum Parse {
    Bool(bool),
    Int,
    Float,
    Text,
    /// Text matched one of `accepted`; the value is the entry of `values` at the same index.
    Enum {
        accepted: Vec<String>,
        values: Vec<String>,
    },
    Date,
    Time,
    DateTime,
    Duration,
    Guid,
    Uri,
    Path,
}

impl Parse {
    fn parse(&self, captures: &Captures<'_>, text: &str) -> Result<Value, String> {
        match self {
            Parse::Bool(b) => Ok(Value::Bool(*b)),
            Parse::Int => text.parse().map(Value::Int).map_err(|e| e.to_string()),
            Parse::Float => text.parse().map(Value::Float).map_err(|e| e.to_string()),
            Parse::Text => Ok(Value::String(text.to_string())),
            Parse::Enum { accepted, values } => {
                let lowered = text.to_lowercase();
                accepted
                    .iter()
                    .position(|a| a == text)
                    .or_else(|| accepted.iter().position(|a| a.to_lowercase() == lowered))
                    .and_then(|i| values.get(i))
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| format!("\"{}\" is not one of the values", text))
            }
            Parse::Date => parse_date(captures).map(Value::Date),
            Parse::Time => parse_time(captures).map(Value::Time),
            Parse::DateTime => Ok(Value::DateTime(NaiveDateTime::new(
                parse_date(captures)?,
                parse_time(captures)?,
            ))),
            Parse::Duration => parse_duration(captures).map(Value::Duration),
            Parse::Guid => Uuid::parse_str(text.trim_start_matches('{').trim_end_matches('}'))
                .map(Value::Guid)
                .map_err(|e| e.to_string()),
            Parse::Uri => Url::parse(text).map(Value::Uri).map_err(|e| e.to_string()),
            Parse::Path => Ok(Value::Path(PathBuf::from(text))),
        }
    }
}

/// A numeric capture; absent optional groups read as zero.
fn field<T>(captures: &Captures<'_>, name: &str) -> Result<T, String>
where
    T: FromStr + Default,
    T::Err: fmt::Display,
{
    match captures.name(name) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|e| format!("{} \"{}\": {}", name, m.as_str(), e)),
        None => Ok(T::default()),
    }
}

/// Fractional digits scaled to `places` decimal places.
fn fraction(captures: &Captures<'_>, places: usize) -> Result<u32, String> {
    match captures.name("fraction") {
        Some(m) => {
            let mut digits = m.as_str().to_string();
            digits.truncate(places);
            while digits.len() < places {
                digits.push('0');
            }
            digits.parse().map_err(|e| format!("fraction: {}", e))
        }
        None => Ok(0),
    }
}

fn parse_date(captures: &Captures<'_>) -> Result<NaiveDate, String> {
    let mut year: i32 = field(captures, "year")?;
    if captures.name("year").map(|m| m.as_str().len()) == Some(2) {
        year += Utc::now().year() / 100 * 100;
    }
    let month: u32 = field(captures, "month")?;
    let day: u32 = field(captures, "day")?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("{:04}-{:02}-{:02} is not a calendar date", year, month, day))
}

fn parse_time(captures: &Captures<'_>) -> Result<NaiveTime, String> {
    let hour: u32 = field(captures, "hour")?;
    let minute: u32 = field(captures, "minute")?;
    let second: u32 = field(captures, "second")?;
    NaiveTime::from_hms_nano_opt(hour, minute, second, fraction(captures, 9)?)
        .ok_or_else(|| format!("{:02}:{:02}:{:02} is not a time of day", hour, minute, second))
}

fn parse_duration(captures: &Captures<'_>) -> Result<TimeDelta, String> {
    let days: i64 = field(captures, "days")?;
    let hours: i64 = field(captures, "hours")?;
    let minutes: i64 = field(captures, "minutes")?;
    let seconds: i64 = field(captures, "seconds")?;
    let nanos = i64::from(fraction(captures, 9)?);

    let magnitude = days
        .checked_mul(86_400)
        .and_then(|s| s.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .and_then(TimeDelta::try_seconds)
        .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos)))
        .ok_or_else(|| "duration out of range".to_string())?;

    Ok(if captures.name("sign").is_some() {
        -magnitude
    } else {
        magnitude
    })
}

// ---- canonical text -----------------------------------------------------

type Rendered = Result<String, SchemaError>;

struct Canonical<'a> {
    value: &'a Value,
}

impl Canonical<'_> {
    fn unexpected(&self, expected: &str) -> SchemaError {
        SchemaError::InvalidValue(ValidationError::new(format!(
            "expected {}, got {}",
            expected,
            value_type_name(self.value)
        )))
    }
}

/// Dates render with four-digit years; chrono writes others with a sign no
/// alternative accepts.
fn four_digit_year(date: &NaiveDate) -> Result<(), SchemaError> {
    if (0..=9999).contains(&date.year()) {
        Ok(())
    } else {
        Err(SchemaError::InvalidValue(ValidationError::new(format!(
            "year {} has no four-digit text form",
            date.year()
        ))))
    }
}

/// Microsecond digits when they are exact, nanosecond digits otherwise.
fn format_duration(delta: &TimeDelta) -> String {
    let sign = if *delta < TimeDelta::zero() { "-" } else { "" };
    let magnitude = delta.abs();
    let seconds = magnitude.num_seconds().unsigned_abs();
    let nanos = magnitude.subsec_nanos().unsigned_abs();
    let (days, rest) = (seconds / 86_400, seconds % 86_400);

    let mut text = sign.to_string();
    if days > 0 {
        text.push_str(&format!("{}.", days));
    }
    text.push_str(&format!(
        "{:02}:{:02}:{:02}",
        rest / 3_600,
        rest % 3_600 / 60,
        rest % 60
    ));
    if nanos % 1_000 != 0 {
        text.push_str(&format!(".{:09}", nanos));
    } else if nanos > 0 {
        text.push_str(&format!(".{:06}", nanos / 1_000));
    }
    text
}

impl TypeVisitor for Canonical<'_> {
    type Output = Rendered;

    fn visit_bool(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(self.unexpected("bool")),
        }
    }

    fn visit_int(&mut self, _: &TypeInfo, _: &IntKind) -> Rendered {
        match self.value {
            Value::Int(i) => Ok(i.to_string()),
            _ => Err(self.unexpected("int")),
        }
    }

    fn visit_float(&mut self, _: &TypeInfo, _: &FloatKind) -> Rendered {
        // f64's Display is the shortest text that parses back to the same value
        match self.value {
            Value::Float(f) => Ok(f.to_string()),
            Value::Int(i) => Ok((*i as f64).to_string()),
            _ => Err(self.unexpected("number")),
        }
    }

    fn visit_string(&mut self, _: &TypeInfo, _: &StringKind) -> Rendered {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.unexpected("string")),
        }
    }

    fn visit_enum(&mut self, _: &TypeInfo, _: &EnumKind) -> Rendered {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.unexpected("string")),
        }
    }

    fn visit_date(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::Date(d) => {
                four_digit_year(d)?;
                Ok(d.format("%Y-%m-%d").to_string())
            }
            _ => Err(self.unexpected("date")),
        }
    }

    fn visit_time(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::Time(t) => Ok(t.format("%H:%M:%S%.f").to_string()),
            _ => Err(self.unexpected("time")),
        }
    }

    fn visit_date_time(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::DateTime(dt) => {
                four_digit_year(&dt.date())?;
                Ok(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            _ => Err(self.unexpected("datetime")),
        }
    }

    fn visit_duration(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::Duration(d) => Ok(format_duration(d)),
            _ => Err(self.unexpected("duration")),
        }
    }

    fn visit_guid(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::Guid(g) => Ok(g.hyphenated().to_string()),
            _ => Err(self.unexpected("guid")),
        }
    }

    fn visit_uri(&mut self, _: &TypeInfo) -> Rendered {
        match self.value {
            Value::Uri(u) => Ok(u.as_str().to_string()),
            _ => Err(self.unexpected("uri")),
        }
    }

    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> Rendered {
        match self.value {
            Value::Path(p) => Ok(p.to_string_lossy().replace('\\', "/")),
            _ => Err(self.unexpected("path")),
        }
    }

    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> Rendered {
        match self.value {
            Value::Path(p) => Ok(p.to_string_lossy().replace('\\', "/")),
            _ => Err(self.unexpected("path")),
        }
    }

    fn visit_class(&mut self, _: &TypeInfo, _: &ClassKind) -> Rendered {
        Err(SchemaError::unsupported(
            "string serialization of a class",
            &SourceLocation::api(),
        ))
    }

    fn visit_dict(&mut self, _: &TypeInfo, _: &ClassKind) -> Rendered {
        Err(SchemaError::unsupported(
            "string serialization of a dictionary",
            &SourceLocation::api(),
        ))
    }

    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Rendered {
        let accepting = kind
            .alternatives
            .iter()
            .find(|alt| alt.validate_item(self.value).is_ok())
            .ok_or_else(|| self.unexpected("a value accepted by one of the alternatives"))?;
        accepting.accept(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_info::TypeKind;

    fn ti(kind: TypeKind) -> TypeInfo {
        TypeInfo::new(kind).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn date_order_precedence() {
        let date_ti = ti(TypeKind::Date);
        let century = Utc::now().year() / 100 * 100;

        assert_eq!(deserialize(&date_ti, "2016-01-02").unwrap(), date(2016, 1, 2));
        assert_eq!(deserialize(&date_ti, "01-02-2016").unwrap(), date(2016, 1, 2));
        assert_eq!(deserialize(&date_ti, "1/2/2016").unwrap(), date(2016, 1, 2));
        // YY-M-D is tried before M-D-YY
        assert_eq!(
            deserialize(&date_ti, "01-02-03").unwrap(),
            date(century + 1, 2, 3)
        );
        // 31 is not a month, so only M-D-YY fits
        assert_eq!(
            deserialize(&date_ti, "12.31.99").unwrap(),
            date(century + 99, 12, 31)
        );
    }

    #[test]
    fn first_matching_date_order_decides() {
        // YY-M-D matches and February 31st does not exist; M-D-YY is not tried
        let err = deserialize(&ti(TypeKind::Date), "01-02-31").unwrap_err();
        match err {
            SchemaError::StringFormat { text, reason, .. } => {
                assert_eq!(text, "01-02-31");
                assert!(reason.contains("not a calendar date"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn date_rejects_impossible_dates() {
        let err = deserialize(&ti(TypeKind::Date), "2016-02-30").unwrap_err();
        match err {
            SchemaError::StringFormat { kind, text, reason, .. } => {
                assert_eq!(kind, "date");
                assert_eq!(text, "2016-02-30");
                assert!(reason.contains("not a calendar date"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn int_patterns_are_digit_bounded() {
        let bounded = ti(TypeKind::Int(IntKind::range(2, 10)));
        let alternatives = regex_alternatives(&bounded).unwrap();
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].pattern, r"\+?\d{1,2}");
        assert!(!alternatives[0].is_match("100"));

        let signed = ti(TypeKind::Int(IntKind::range(-500, 20)));
        assert_eq!(regex_alternatives(&signed).unwrap()[0].pattern, r"[-+]?\d{1,3}");

        let open = ti(TypeKind::Int(IntKind::default()));
        assert_eq!(regex_alternatives(&open).unwrap()[0].pattern, r"[-+]?\d+");

        let byte = ti(TypeKind::Int(IntKind {
            min: Some(0),
            max: None,
            bytes: Some(1),
        }));
        assert_eq!(regex_alternatives(&byte).unwrap()[0].pattern, r"\+?\d{1,3}");
    }

    #[test]
    fn int_deserialize_revalidates() {
        let bounded = ti(TypeKind::Int(IntKind::range(2, 10)));
        assert_eq!(deserialize(&bounded, "+7").unwrap(), Value::Int(7));
        assert!(matches!(
            deserialize(&bounded, "11"),
            Err(SchemaError::StringFormat { .. })
        ));
        assert!(matches!(
            deserialize(&bounded, "seven"),
            Err(SchemaError::StringFormat { .. })
        ));
    }

    #[test]
    fn bool_forms_are_case_insensitive() {
        let b = ti(TypeKind::Bool);
        let alternatives = regex_alternatives(&b).unwrap();
        assert!(alternatives.iter().all(|a| a.case_insensitive));
        assert_eq!(deserialize(&b, "YES").unwrap(), Value::Bool(true));
        assert_eq!(deserialize(&b, "off").unwrap(), Value::Bool(false));
        assert_eq!(serialize(&b, &Value::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn enum_accepts_friendly_values() {
        let e = ti(TypeKind::Enum(EnumKind {
            values: vec!["r".into(), "g".into()],
            friendly_values: Some(vec!["Red".into(), "Green".into()]),
        }));
        assert_eq!(deserialize(&e, "G").unwrap(), Value::from("g"));
        assert_eq!(deserialize(&e, "red").unwrap(), Value::from("r"));
        assert!(deserialize(&e, "blue").is_err());
    }

    #[test]
    fn enum_prefers_exact_case() {
        let e = ti(TypeKind::Enum(EnumKind::new(["A", "a"])));
        assert_eq!(deserialize(&e, "a").unwrap(), Value::from("a"));
        assert_eq!(deserialize(&e, "A").unwrap(), Value::from("A"));
    }

    #[test]
    fn durations() {
        let d = ti(TypeKind::Duration);
        let value = Value::Duration(
            TimeDelta::days(1) + TimeDelta::hours(2) + TimeDelta::milliseconds(4_500),
        );
        let text = serialize(&d, &value).unwrap();
        assert_eq!(text, "1.02:00:04.500000");
        assert_eq!(deserialize(&d, &text).unwrap(), value);

        let negative = Value::Duration(-TimeDelta::minutes(90));
        assert_eq!(serialize(&d, &negative).unwrap(), "-01:30:00");
        assert_eq!(deserialize(&d, "-1:30:00").unwrap(), negative);
    }

    #[test]
    fn durations_keep_nanoseconds() {
        let d = ti(TypeKind::Duration);
        let value = Value::Duration(TimeDelta::seconds(2) + TimeDelta::nanoseconds(1_500));
        let text = serialize(&d, &value).unwrap();
        assert_eq!(text, "00:00:02.000001500");
        assert_eq!(deserialize(&d, &text).unwrap(), value);

        let negative = Value::Duration(-TimeDelta::nanoseconds(7));
        let text = serialize(&d, &negative).unwrap();
        assert_eq!(text, "-00:00:00.000000007");
        assert_eq!(deserialize(&d, &text).unwrap(), negative);
    }

    #[test]
    fn dates_beyond_four_digit_years_do_not_serialize() {
        let far = Value::Date(NaiveDate::from_ymd_opt(10_000, 1, 1).unwrap());
        let err = serialize(&ti(TypeKind::Date), &far).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue(_)));

        let far = Value::DateTime(
            NaiveDate::from_ymd_opt(-1, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        assert!(serialize(&ti(TypeKind::DateTime), &far).is_err());

        let last = date(9999, 12, 31);
        let text = serialize(&ti(TypeKind::Date), &last).unwrap();
        assert_eq!(deserialize(&ti(TypeKind::Date), &text).unwrap(), last);
    }

    #[test]
    fn guid_canonical_form() {
        let g = ti(TypeKind::Guid);
        let value = deserialize(&g, "{6F9619FF-8B86-D011-B42D-00C04FC964FF}").unwrap();
        assert_eq!(
            serialize(&g, &value).unwrap(),
            "6f9619ff-8b86-d011-b42d-00c04fc964ff"
        );
    }

    #[test]
    fn round_trips_match_an_alternative() {
        let cases = vec![
            (ti(TypeKind::Bool), Value::Bool(false)),
            (ti(TypeKind::Int(IntKind::range(-100, 100))), Value::Int(-42)),
            (ti(TypeKind::Float(FloatKind::default())), Value::Float(0.1)),
            (ti(TypeKind::Float(FloatKind::default())), Value::Float(-2.5)),
            (ti(TypeKind::String(StringKind::default())), Value::from("hello world")),
            (ti(TypeKind::String(StringKind::default())), Value::from("a\nb")),
            (ti(TypeKind::Enum(EnumKind::new(["a", "b"]))), Value::from("b")),
            (ti(TypeKind::Date), date(2016, 1, 2)),
            (
                ti(TypeKind::Time),
                Value::Time(NaiveTime::from_hms_milli_opt(13, 4, 5, 250).unwrap()),
            ),
            (
                ti(TypeKind::DateTime),
                Value::DateTime(
                    NaiveDate::from_ymd_opt(2020, 12, 31)
                        .unwrap()
                        .and_hms_opt(23, 59, 58)
                        .unwrap(),
                ),
            ),
            (ti(TypeKind::Duration), Value::Duration(TimeDelta::seconds(3_661))),
            (
                ti(TypeKind::Guid),
                Value::Guid(Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap()),
            ),
            (
                ti(TypeKind::Uri),
                Value::Uri(Url::parse("https://example.com/a?b=c").unwrap()),
            ),
            (
                ti(TypeKind::Filename(FilenameKind::default())),
                Value::Path(PathBuf::from("dir/file.txt")),
            ),
            (
                ti(TypeKind::Filename(FilenameKind::default())),
                Value::Path(PathBuf::from("line\nbreak.txt")),
            ),
            (
                ti(TypeKind::Directory(DirectoryKind::default())),
                Value::Path(PathBuf::from("some/dir")),
            ),
        ];

        for (info, value) in cases {
            let text = serialize(&info, &value).unwrap();
            let alternatives = regex_alternatives(&info).unwrap();
            assert!(
                alternatives.iter().any(|a| a.is_match(&text)),
                "{} text {:?} matches no alternative",
                info.kind_name(),
                text
            );
            assert_eq!(deserialize(&info, &text).unwrap(), value, "{}", info.kind_name());
        }
    }

    #[test]
    fn any_of_commits_to_the_first_match() {
        let any = ti(TypeKind::AnyOf(AnyOfKind {
            alternatives: vec![
                ti(TypeKind::Int(IntKind::range(0, 10))),
                ti(TypeKind::String(StringKind::default())),
            ],
        }));
        assert_eq!(regex_alternatives(&any).unwrap().len(), 2);
        assert_eq!(deserialize(&any, "5").unwrap(), Value::Int(5));
        assert_eq!(deserialize(&any, "abc").unwrap(), Value::from("abc"));
        // "30" matches the int pattern, so the out-of-range int is final
        assert!(matches!(
            deserialize(&any, "30"),
            Err(SchemaError::StringFormat { ref kind, .. }) if kind == "any_of"
        ));
        assert_eq!(serialize(&any, &Value::Int(3)).unwrap(), "3");
    }

    #[test]
    fn composite_kinds_have_no_string_form() {
        let class = ti(TypeKind::Class(ClassKind::default()));
        assert!(matches!(
            regex_alternatives(&class),
            Err(SchemaError::UnsupportedConstruct { .. })
        ));
        assert!(matches!(
            deserialize(&class, "x"),
            Err(SchemaError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn serialize_validates_first() {
        let bounded = ti(TypeKind::Int(IntKind::range(2, 10)));
        let err = serialize(&bounded, &Value::Int(11)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue(_)));
        assert_eq!(err.exit_code(), 1);

        let path = ti(TypeKind::Filename(FilenameKind::default()));
        assert!(serialize(&path, &Value::from("not a path")).is_err());
    }

    #[test]
    fn string_expression_is_the_alternative() {
        let s = ti(TypeKind::String(StringKind {
            validation_expression: Some(crate::type_info::Pattern::new("[a-z]+").unwrap()),
            ..StringKind::default()
        }));
        let alternatives = regex_alternatives(&s).unwrap();
        assert_eq!(alternatives[0].pattern, "[a-z]+");
        assert!(deserialize(&s, "abc").is_ok());
        assert!(deserialize(&s, "ABC").is_err());
    }
}
