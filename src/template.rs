//! Turn timestamps into file names and back.
//!
//! A [`FilenameTemplate`] is an ordered list of [`Part`]s: literal path
//! fragments and zero padded time fields. Rendering is total, parsing is its
//! inverse and recovers the timestamp to millisecond precision.
//!
//! Templates can be written as a pattern string where the time fields are
//! tokens between braces:
//!
//! ```text
//! /data/{YYYY}/{MM}/{DD}/cbt_processed_{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}+0000.sgy
//! ```
use core::fmt;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    /// 4 digits
    Year,
    /// 2 digits, 01..=12
    Month,
    /// 2 digits, 01..=31
    Day,
    /// 2 digits, 24 hour clock
    Hour,
    Minute,
    Second,
    /// 3 digits
    Millisecond,
}

impl Part {
    fn width(&self) -> usize {
        match self {
            Part::Literal(text) => text.len(),
            Part::Year => 4,
            Part::Millisecond => 3,
            Part::Month | Part::Day | Part::Hour | Part::Minute | Part::Second => 2,
        }
    }

    fn token(&self) -> Option<&'static str> {
        Some(match self {
            Part::Literal(_) => return None,
            Part::Year => "YYYY",
            Part::Month => "MM",
            Part::Day => "DD",
            Part::Hour => "HH",
            Part::Minute => "mm",
            Part::Second => "SS",
            Part::Millisecond => "mmm",
        })
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "YYYY" => Part::Year,
            "MM" => Part::Month,
            "DD" => Part::Day,
            "HH" => Part::Hour,
            "mm" => Part::Minute,
            "SS" => Part::Second,
            "mmm" => Part::Millisecond,
            _ => return None,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("Unknown time field token: {{{0}}}, expected one of YYYY, MM, DD, HH, mm, SS or mmm")]
    UnknownToken(String),
    #[error("Opening brace at byte {0} is never closed")]
    Unclosed(usize),
    #[error("Pattern contains no time fields, every file would get the same name")]
    NoTimeFields,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("File name is not valid utf8")]
    NotUtf8,
    #[error("Expected literal {expected:?} at byte {at} of {name:?}")]
    LiteralMismatch {
        expected: String,
        at: usize,
        name: String,
    },
    #[error("Expected {width} digits at byte {at} of {name:?}")]
    NotDigits {
        width: usize,
        at: usize,
        name: String,
    },
    #[error("Trailing text after the last template part: {0:?}")]
    TrailingText(String),
    #[error("Field {token} appears twice with different values: {first} and {second}")]
    Inconsistent {
        token: &'static str,
        first: u32,
        second: u32,
    },
    #[error("Template needs year, month and day fields to recover a timestamp")]
    MissingDate,
    #[error("Fields do not form a valid date and time")]
    InvalidDateTime,
}

/// Ordered list of literal and time field parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilenameTemplate {
    parts: Vec<Part>,
}

impl FilenameTemplate {
    /// Adjacent literals are merged and empty ones dropped.
    #[must_use]
    pub fn new(parts: impl IntoIterator<Item = Part>) -> Self {
        let mut merged: Vec<Part> = Vec::new();
        for part in parts {
            match (merged.last_mut(), part) {
                (_, Part::Literal(text)) if text.is_empty() => (),
                (Some(Part::Literal(prev)), Part::Literal(text)) => prev.push_str(&text),
                (_, part) => merged.push(part),
            }
        }
        Self { parts: merged }
    }

    /// # Errors
    /// Returns an error if a token is unknown, a brace is never closed or
    /// the pattern has no time field at all.
    pub fn from_pattern(pattern: &str) -> Result<Self, PatternError> {
        let mut parts = Vec::new();
        let mut rest = pattern;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            parts.push(Part::Literal(rest[..open].to_owned()));
            let close = rest[open..]
                .find('}')
                .ok_or(PatternError::Unclosed(offset + open))?
                + open;
            let token = &rest[open + 1..close];
            let part = Part::from_token(token)
                .ok_or_else(|| PatternError::UnknownToken(token.to_owned()))?;
            parts.push(part);
            offset += close + 1;
            rest = &rest[close + 1..];
        }
        parts.push(Part::Literal(rest.to_owned()));

        let template = Self::new(parts);
        if template.parts.iter().all(|p| matches!(p, Part::Literal(_))) {
            return Err(PatternError::NoTimeFields);
        }
        Ok(template)
    }

    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Inverse of [`from_pattern`](Self::from_pattern)
    #[must_use]
    pub fn pattern(&self) -> String {
        let mut pattern = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => pattern.push_str(text),
                field => {
                    let token = field.token().unwrap_or_default();
                    let _ = write!(pattern, "{{{token}}}");
                }
            }
        }
        pattern
    }

    #[must_use]
    pub fn render(&self, ts: Timestamp) -> PathBuf {
        let mut name = String::new();
        for part in &self.parts {
            // writing to a String never fails
            let _ = match part {
                Part::Literal(text) => name.write_str(text),
                Part::Year => write!(name, "{:04}", ts.year()),
                Part::Month => write!(name, "{:02}", ts.month()),
                Part::Day => write!(name, "{:02}", ts.day()),
                Part::Hour => write!(name, "{:02}", ts.hour()),
                Part::Minute => write!(name, "{:02}", ts.minute()),
                Part::Second => write!(name, "{:02}", ts.second()),
                Part::Millisecond => write!(name, "{:03}", ts.timestamp_subsec_millis() % 1000),
            };
        }
        PathBuf::from(name)
    }

    /// Recover the timestamp a file name was rendered from.
    ///
    /// Fields may appear more then once (the canonical layout repeats the
    /// date in the directory and the file name) as long as they agree.
    /// Missing hour, minute, second or millisecond fields are taken to be
    /// zero.
    ///
    /// # Errors
    /// Returns an error if the name does not follow this template.
    pub fn parse(&self, name: impl AsRef<Path>) -> Result<Timestamp, ParseError> {
        let name = name.as_ref().to_str().ok_or(ParseError::NotUtf8)?;
        let mut fields = Fields::default();
        let mut at = 0;

        for part in &self.parts {
            let width = part.width();
            let Some(slice) = name.get(at..at + width) else {
                return Err(match part {
                    Part::Literal(expected) => ParseError::LiteralMismatch {
                        expected: expected.clone(),
                        at,
                        name: name.to_owned(),
                    },
                    _ => ParseError::NotDigits {
                        width,
                        at,
                        name: name.to_owned(),
                    },
                });
            };

            match part {
                Part::Literal(expected) if slice != expected => {
                    return Err(ParseError::LiteralMismatch {
                        expected: expected.clone(),
                        at,
                        name: name.to_owned(),
                    })
                }
                Part::Literal(_) => (),
                field => {
                    if !slice.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(ParseError::NotDigits {
                            width,
                            at,
                            name: name.to_owned(),
                        });
                    }
                    let value = slice.parse().map_err(|_| ParseError::NotDigits {
                        width,
                        at,
                        name: name.to_owned(),
                    })?;
                    fields.set(field, value)?;
                }
            }
            at += width;
        }

        if at != name.len() {
            return Err(ParseError::TrailingText(name[at..].to_owned()));
        }
        fields.into_timestamp()
    }
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<u32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    millisecond: Option<u32>,
}

impl Fields {
    fn set(&mut self, part: &Part, value: u32) -> Result<(), ParseError> {
        let slot = match part {
            Part::Literal(_) => return Ok(()),
            Part::Year => &mut self.year,
            Part::Month => &mut self.month,
            Part::Day => &mut self.day,
            Part::Hour => &mut self.hour,
            Part::Minute => &mut self.minute,
            Part::Second => &mut self.second,
            Part::Millisecond => &mut self.millisecond,
        };
        match slot {
            Some(first) if *first != value => Err(ParseError::Inconsistent {
                token: part.token().unwrap_or_default(),
                first: *first,
                second: value,
            }),
            _ => {
                *slot = Some(value);
                Ok(())
            }
        }
    }

    fn into_timestamp(self) -> Result<Timestamp, ParseError> {
        let (Some(year), Some(month), Some(day)) = (self.year, self.month, self.day) else {
            return Err(ParseError::MissingDate);
        };
        let year = i32::try_from(year).map_err(|_| ParseError::InvalidDateTime)?;
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| {
                date.and_hms_milli_opt(
                    self.hour.unwrap_or(0),
                    self.minute.unwrap_or(0),
                    self.second.unwrap_or(0),
                    self.millisecond.unwrap_or(0),
                )
            })
            .map(|dt| dt.and_utc())
            .ok_or(ParseError::InvalidDateTime)
    }
}

impl TryFrom<String> for FilenameTemplate {
    type Error = PatternError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::from_pattern(&pattern)
    }
}

impl From<FilenameTemplate> for String {
    fn from(template: FilenameTemplate) -> Self {
        template.pattern()
    }
}

impl fmt::Display for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    const CANONICAL: &str =
        "/data/{YYYY}/{MM}/{DD}/cbt_processed_{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}+0000.sgy";

    #[test]
    fn renders_canonical_layout() {
        let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
        let ts = Utc.with_ymd_and_hms(2017, 3, 9, 7, 5, 30).unwrap()
            + chrono::Duration::milliseconds(40);
        assert_eq!(
            template.render(ts),
            PathBuf::from("/data/2017/03/09/cbt_processed_20170309_070530.040+0000.sgy")
        );
    }

    #[test]
    fn pattern_survives_round_trip() {
        let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
        assert_eq!(template.pattern(), CANONICAL);
    }

    #[test]
    fn adjacent_literals_merge() {
        let template = FilenameTemplate::new([
            Part::Literal("a".into()),
            Part::Literal(String::new()),
            Part::Literal("b".into()),
            Part::Year,
        ]);
        assert_eq!(template.parts(), &[Part::Literal("ab".into()), Part::Year]);
    }

    #[test]
    fn bad_patterns() {
        assert_eq!(
            FilenameTemplate::from_pattern("x_{YY}"),
            Err(PatternError::UnknownToken("YY".into()))
        );
        assert_eq!(
            FilenameTemplate::from_pattern("x_{YYYY"),
            Err(PatternError::Unclosed(2))
        );
        assert_eq!(
            FilenameTemplate::from_pattern("plain.sgy"),
            Err(PatternError::NoTimeFields)
        );
    }

    #[test]
    fn disagreeing_repeated_fields() {
        let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
        let err = template
            .parse("/data/2017/03/10/cbt_processed_20170309_070530.040+0000.sgy")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::Inconsistent {
                token: "DD",
                first: 10,
                second: 9
            }
        );
    }

    #[test]
    fn rejects_trailing_text() {
        let template = FilenameTemplate::from_pattern("{YYYY}{MM}{DD}.sgy").unwrap();
        assert!(matches!(
            template.parse("20170309.sgy.bak"),
            Err(ParseError::TrailingText(rest)) if rest == ".bak"
        ));
    }
}
