//! crates/trip_journal_core/src/sort.rs
//!
//! Sort stage of the companion list pipeline.
//!
//! Every branch builds an ascending key and a descending order only reverses
//! the comparison result. Sorting is stable, so records with equal keys keep
//! their incoming relative order in both directions.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::collation::compare_ja;
use crate::domain::TripPerson;

/// Stand-in for a missing birthday. It does not move with the sort direction.
pub const MISSING_BIRTHDAY: &str = "9999-12-31";

/// Value used for a missing or unparseable `created_at`.
const UNPARSEABLE_TIMESTAMP: i64 = i64::MIN;

//=========================================================================================
// Sort Key and Direction
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortBy {
    /// No sort requested; the filtered order is kept.
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "created_at")]
    CreatedAt,
    #[serde(rename = "birthday")]
    Birthday,
    #[serde(rename = "relationship")]
    Relationship,
}

impl SortBy {
    /// Selectable values with their UI labels, in display order.
    pub const OPTIONS: [(Self, &'static str); 5] = [
        (Self::Unset, "選択してください"),
        (Self::Name, "名前順"),
        (Self::CreatedAt, "登録日順"),
        (Self::Birthday, "誕生日順"),
        (Self::Relationship, "関係性順"),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::Birthday => "birthday",
            Self::Relationship => "relationship",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != Self::Unset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const OPTIONS: [(Self, &'static str); 2] = [(Self::Asc, "昇順"), (Self::Desc, "降順")];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn apply(self, ascending: Ordering) -> Ordering {
        match self {
            Self::Asc => ascending,
            Self::Desc => ascending.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort value: {0}")]
pub struct UnknownSortValue(pub String);

impl FromStr for SortBy {
    type Err = UnknownSortValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::OPTIONS
            .iter()
            .map(|(value, _)| *value)
            .find(|value| value.as_str() == s)
            .ok_or_else(|| UnknownSortValue(s.to_string()))
    }
}

impl FromStr for SortOrder {
    type Err = UnknownSortValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(UnknownSortValue(other.to_string())),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Sorting
//=========================================================================================

#[derive(Debug, PartialEq, Eq)]
enum SortKey<'a> {
    Name(&'a str),
    Millis(i64),
    Relationship(i64),
}

impl<'a> SortKey<'a> {
    fn for_person(person: &'a TripPerson, sort_by: SortBy) -> Self {
        match sort_by {
            SortBy::Name => Self::Name(&person.name),
            SortBy::CreatedAt => Self::Millis(
                person
                    .created_at
                    .as_deref()
                    .and_then(parse_timestamp_millis)
                    .unwrap_or(UNPARSEABLE_TIMESTAMP),
            ),
            SortBy::Birthday => Self::Millis(birthday_millis(person.birthday.as_deref())),
            SortBy::Relationship => Self::Relationship(person.relationship_id),
            // Never built: unsorted input short-circuits before keys are made.
            SortBy::Unset => Self::Relationship(0),
        }
    }

    /// Ascending comparison. Keys of one sort are always the same variant.
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Name(a), Self::Name(b)) => compare_ja(a, b),
            (Self::Millis(a), Self::Millis(b)) | (Self::Relationship(a), Self::Relationship(b)) => {
                a.cmp(b)
            }
            _ => Ordering::Equal,
        }
    }
}

/// Returns a newly ordered sequence of the given companions.
///
/// `SortBy::Unset` keeps the incoming order. The input is never reordered in
/// place.
pub fn sort_trip_people<'a, I>(people: I, sort_by: SortBy, order: SortOrder) -> Vec<&'a TripPerson>
where
    I: IntoIterator<Item = &'a TripPerson>,
{
    if !sort_by.is_set() {
        return people.into_iter().collect();
    }

    let mut keyed: Vec<(SortKey<'a>, &'a TripPerson)> = people
        .into_iter()
        .map(|person| (SortKey::for_person(person, sort_by), person))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| order.apply(a.compare(b)));
    keyed.into_iter().map(|(_, person)| person).collect()
}

fn birthday_millis(birthday: Option<&str>) -> i64 {
    birthday
        .and_then(parse_timestamp_millis)
        .or_else(|| parse_timestamp_millis(MISSING_BIRTHDAY))
        .unwrap_or(i64::MAX)
}

//=========================================================================================
// Date Parsing
//=========================================================================================

/// Parses the timestamp forms the backend emits into milliseconds since the
/// Unix epoch. Offset-less values are read as UTC.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }
    parse_calendar_date(raw)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}

/// Parses a `YYYY-MM-DD` date, also accepting a full timestamp and keeping its
/// date part.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|parsed| parsed.date_naive())
    })
}
