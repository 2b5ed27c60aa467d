//! Field accessors for administrative command responses.
//!
//! The server encodes sizes and counters as Int32, Int64 or Double depending
//! on magnitude and version, and omits fields it considers empty. These
//! helpers normalize that into non-negative integers.

use mongodb::bson::{Bson, Document};

use crate::error::FetchError;

/// Read a non-negative count or size, treating an absent field as zero.
pub(crate) fn count(doc: &Document, field: &str) -> Result<u64, FetchError> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(0),
        Some(value) => to_count(value, field),
    }
}

/// Read a required sub-document.
pub(crate) fn document<'a>(doc: &'a Document, field: &str) -> Result<&'a Document, FetchError> {
    match doc.get(field) {
        Some(Bson::Document(inner)) => Ok(inner),
        Some(other) => Err(FetchError::decode(
            field,
            format!("expected a document, found {:?}", other.element_type()),
        )),
        None => Err(FetchError::decode(field, "missing")),
    }
}

/// Read a required string.
pub(crate) fn string<'a>(doc: &'a Document, field: &str) -> Result<&'a str, FetchError> {
    match doc.get(field) {
        Some(Bson::String(value)) => Ok(value),
        Some(other) => Err(FetchError::decode(
            field,
            format!("expected a string, found {:?}", other.element_type()),
        )),
        None => Err(FetchError::decode(field, "missing")),
    }
}

pub(crate) fn to_count(value: &Bson, field: &str) -> Result<u64, FetchError> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).map_err(|_| negative(field, *v)),
        Bson::Int64(v) => u64::try_from(*v).map_err(|_| negative(field, *v)),
        Bson::Double(v) if v.is_finite() && *v >= 0.0 => Ok(v.trunc() as u64),
        Bson::Double(v) => Err(FetchError::decode(field, format!("invalid value {v}"))),
        other => Err(FetchError::decode(
            field,
            format!("expected a number, found {:?}", other.element_type()),
        )),
    }
}

fn negative(field: &str, value: impl std::fmt::Display) -> FetchError {
    FetchError::decode(field, format!("negative value {value}"))
}
