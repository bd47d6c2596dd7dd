//! Filter construction for Qdrant.
//!
//! Every query is scoped by the keyword-indexed `file_name` payload field.

use qdrant_client::qdrant::{
    Condition, FieldCondition, Filter, Match, RepeatedStrings, condition::ConditionOneOf,
    r#match::MatchValue,
};

use crate::chunk::FILE_NAME_FIELD;

/// `file_name ∈ names`.
pub fn file_names_filter(names: &[String]) -> Filter {
    Filter {
        must: vec![field_match(MatchValue::Keywords(RepeatedStrings {
            strings: names.to_vec(),
        }))],
        ..Default::default()
    }
}

/// `file_name == name`.
pub fn file_name_filter(name: &str) -> Filter {
    Filter {
        must: vec![field_match(MatchValue::Keyword(name.to_string()))],
        ..Default::default()
    }
}

fn field_match(value: MatchValue) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: FILE_NAME_FIELD.to_string(),
            r#match: Some(Match {
                match_value: Some(value),
            }),
            ..Default::default()
        })),
    }
}
