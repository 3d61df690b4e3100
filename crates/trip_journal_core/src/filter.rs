//! crates/trip_journal_core/src/filter.rs
//!
//! The companion list pipeline: free-text search and relationship filtering,
//! followed by the sort stage in `sort.rs`.
//!
//! Every call is pure. The input slice is only borrowed, and the result is a
//! fresh sequence of references into it, so identical inputs always produce
//! identical output (tie order included).

use serde::{Deserialize, Serialize};

use crate::domain::TripPerson;
use crate::sort::{sort_trip_people, SortBy, SortOrder};

/// The combined search/filter/sort configuration driving the companion list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub search: String,
    /// Numeric string or empty. Non-numeric text disables the filter.
    #[serde(default)]
    pub relationship_id: String,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::empty()
    }
}

impl FilterSpec {
    /// No search, no relationship filter, no sort. The order defaults to
    /// descending so picking a sort key first sorts newest/highest first.
    pub fn empty() -> Self {
        Self {
            search: String::new(),
            relationship_id: String::new(),
            sort_by: SortBy::Unset,
            sort_order: SortOrder::Desc,
        }
    }

    /// Whether any search, relationship filter or sort key is in effect.
    pub fn has_active_filters(&self) -> bool {
        !self.search.trim().is_empty()
            || !self.relationship_id.trim().is_empty()
            || self.sort_by.is_set()
    }
}

pub fn create_empty_filter_spec() -> FilterSpec {
    FilterSpec::empty()
}

pub fn has_active_filters(spec: &FilterSpec) -> bool {
    spec.has_active_filters()
}

//=========================================================================================
// Relationship filter parsing
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationshipFilter {
    Any,
    Exactly(i64),
    /// A number that no integer id can equal (e.g. `2.5`).
    Nothing,
}

impl RelationshipFilter {
    /// Reads the filter text the way a JavaScript `Number()` conversion does:
    /// decimal with an optional exponent, `0x`/`0o`/`0b` integers, and the
    /// signed `Infinity` literals. Text that is not a number means no filter.
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Any;
        }
        match numeric_value(raw) {
            None => Self::Any,
            Some(Numeric::Integer(id)) => Self::Exactly(id),
            Some(Numeric::Float(value)) => {
                if value.is_finite()
                    && value.fract() == 0.0
                    && value >= i64::MIN as f64
                    && value < i64::MAX as f64
                {
                    Self::Exactly(value as i64)
                } else {
                    Self::Nothing
                }
            }
            Some(Numeric::OutOfRange) => Self::Nothing,
        }
    }

    fn admits(self, person: &TripPerson) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(id) => person.relationship_id == id,
            Self::Nothing => false,
        }
    }
}

enum Numeric {
    Integer(i64),
    Float(f64),
    /// A well-formed integer literal too large for any id.
    OutOfRange,
}

fn numeric_value(raw: &str) -> Option<Numeric> {
    let radix = match raw.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &raw[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return Some(match i64::from_str_radix(digits, radix) {
            Ok(id) => Numeric::Integer(id),
            Err(_) => Numeric::OutOfRange,
        });
    }

    match raw {
        "Infinity" | "+Infinity" => return Some(Numeric::Float(f64::INFINITY)),
        "-Infinity" => return Some(Numeric::Float(f64::NEG_INFINITY)),
        _ => {}
    }
    // Rust's float grammar also takes `inf` and `NaN`; those are not numbers here.
    if !raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    if let Ok(id) = raw.parse::<i64>() {
        return Some(Numeric::Integer(id));
    }
    raw.parse::<f64>().ok().map(Numeric::Float)
}

//=========================================================================================
// Pipeline
//=========================================================================================

fn matches_search(person: &TripPerson, term: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(term);
    contains(&person.name)
        || [
            person.likes.as_deref(),
            person.dislikes.as_deref(),
            person.address.as_deref(),
            person.memo.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(contains)
}

/// Applies the search and relationship filters, then the requested sort.
pub fn filter_trip_people<'a, I>(people: I, spec: &FilterSpec) -> Vec<&'a TripPerson>
where
    I: IntoIterator<Item = &'a TripPerson>,
{
    let term = spec.search.trim().to_lowercase();
    let relationship = RelationshipFilter::parse(&spec.relationship_id);

    let filtered = people
        .into_iter()
        .filter(|person| term.is_empty() || matches_search(person, &term))
        .filter(|person| relationship.admits(person));

    sort_trip_people(filtered, spec.sort_by, spec.sort_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn person(id: i64, name: &str) -> TripPerson {
        TripPerson {
            id,
            name: name.to_string(),
            relationship_id: 1,
            relationship_name: None,
            birthday: None,
            age: None,
            display_age: None,
            likes: None,
            dislikes: None,
            address: None,
            memo: None,
            user_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[rstest]
    #[case("", RelationshipFilter::Any)]
    #[case("   ", RelationshipFilter::Any)]
    #[case("2", RelationshipFilter::Exactly(2))]
    #[case(" 3 ", RelationshipFilter::Exactly(3))]
    #[case("family", RelationshipFilter::Any)]
    #[case("2.5", RelationshipFilter::Nothing)]
    #[case("1e1", RelationshipFilter::Exactly(10))]
    #[case("2.0", RelationshipFilter::Exactly(2))]
    #[case("-0", RelationshipFilter::Exactly(0))]
    #[case("0x2", RelationshipFilter::Exactly(2))]
    #[case("0b11", RelationshipFilter::Exactly(3))]
    #[case("0xZZ", RelationshipFilter::Any)]
    #[case("-0x2", RelationshipFilter::Any)]
    #[case("Infinity", RelationshipFilter::Nothing)]
    #[case("-Infinity", RelationshipFilter::Nothing)]
    #[case("inf", RelationshipFilter::Any)]
    #[case("NaN", RelationshipFilter::Any)]
    #[case("1e999", RelationshipFilter::Nothing)]
    #[case("0xFFFFFFFFFFFFFFFFFF", RelationshipFilter::Nothing)]
    fn relationship_filter_parsing(#[case] raw: &str, #[case] expected: RelationshipFilter) {
        assert_eq!(RelationshipFilter::parse(raw), expected);
    }

    #[rstest]
    #[case("ramen", true)]
    #[case("RAMEN", true)]
    #[case("kyoto", true)]
    #[case("natto", true)]
    #[case("window seat", true)]
    #[case("sushi", false)]
    fn search_covers_every_text_field(#[case] term: &str, #[case] expected: bool) {
        let mut p = person(1, "Aiko");
        p.likes = Some("Ramen".to_string());
        p.dislikes = Some("natto".to_string());
        p.address = Some("Kyoto".to_string());
        p.memo = Some("prefers a window seat".to_string());
        let spec = FilterSpec {
            search: term.to_string(),
            ..FilterSpec::empty()
        };
        let people = [p];
        assert_eq!(filter_trip_people(&people, &spec).len(), usize::from(expected));
    }

    #[test]
    fn missing_optional_fields_do_not_match() {
        let people = [person(1, "Aiko")];
        let spec = FilterSpec {
            search: "memo".to_string(),
            ..FilterSpec::empty()
        };
        assert!(filter_trip_people(&people, &spec).is_empty());
    }

    #[test]
    fn search_is_trimmed() {
        let people = [person(1, "Aiko"), person(2, "Ben")];
        let spec = FilterSpec {
            search: "  aik  ".to_string(),
            ..FilterSpec::empty()
        };
        let found = filter_trip_people(&people, &spec);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[test]
    fn empty_spec_is_inactive_and_descending() {
        let spec = create_empty_filter_spec();
        assert!(!has_active_filters(&spec));
        assert_eq!(spec.sort_order, SortOrder::Desc);
        assert_eq!(FilterSpec::default(), spec);
    }

    #[rstest]
    #[case(FilterSpec { search: " x ".into(), ..FilterSpec::empty() })]
    #[case(FilterSpec { relationship_id: "1".into(), ..FilterSpec::empty() })]
    #[case(FilterSpec { sort_by: SortBy::Name, ..FilterSpec::empty() })]
    fn any_field_activates(#[case] spec: FilterSpec) {
        assert!(spec.has_active_filters());
    }

    #[test]
    fn whitespace_only_fields_stay_inactive() {
        let spec = FilterSpec {
            search: "   ".into(),
            relationship_id: "\t".into(),
            sort_order: SortOrder::Asc,
            ..FilterSpec::empty()
        };
        assert!(!spec.has_active_filters());
    }

    #[test]
    fn spec_deserialises_from_partial_json() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"search":"a","sort_by":"birthday"}"#).expect("partial spec");
        assert_eq!(spec.sort_by, SortBy::Birthday);
        assert_eq!(spec.sort_order, SortOrder::Desc);
        assert_eq!(spec.relationship_id, "");
    }
}
