//! Metadata filtering as a candidate eligibility mask.
//!
//! Filtering happens before ranking: ineligible records are never
//! candidates, so a filtered-out record cannot be confused with an eligible
//! record that scored zero.

use crate::corpus::Record;
use crate::error::{Result, StrataError};
use crate::search::request::Filters;

/// Indices of the records matching every filter, ascending.
///
/// Each filter is an exact equality test on one metadata field. A record
/// without the field never matches.
///
/// # Errors
///
/// [`StrataError::InvalidParameter`] when a filter names a field that no
/// record carries, which is almost always a typo rather than an intentionally
/// empty selection.
pub fn eligible(records: &[Record], filters: &Filters) -> Result<Vec<usize>> {
    for field in filters.keys() {
        if !records.iter().any(|r| r.contains(field)) {
            return Err(StrataError::invalid_parameter(format!(
                "filter field '{field}' does not occur in the corpus"
            )));
        }
    }

    Ok(records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches(record, filters))
        .map(|(i, _)| i)
        .collect())
}

/// Whether a record satisfies every filter.
pub fn matches(record: &Record, filters: &Filters) -> bool {
    filters
        .iter()
        .all(|(field, value)| record.get(field) == Some(value.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::from_pairs([("course", "A"), ("section", "intro")]),
            Record::from_pairs([("course", "B"), ("section", "intro")]),
            Record::from_pairs([("course", "A"), ("section", "setup")]),
            Record::from_pairs([("section", "setup")]),
        ]
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        assert_eq!(eligible(&records(), &Filters::new()).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_filters_are_anded() {
        let mut filters = Filters::new();
        filters.insert("course".into(), "A".into());
        assert_eq!(eligible(&records(), &filters).unwrap(), vec![0, 2]);

        filters.insert("section".into(), "setup".into());
        assert_eq!(eligible(&records(), &filters).unwrap(), vec![2]);

        filters.insert("course".into(), "C".into());
        assert!(eligible(&records(), &filters).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_filter_field() {
        let mut filters = Filters::new();
        filters.insert("year".into(), "2024".into());
        let err = eligible(&records(), &filters).unwrap_err();
        assert!(err.is_invalid_parameter());
    }
}
