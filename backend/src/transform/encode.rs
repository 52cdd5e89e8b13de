//! Value encoders for the canonical export.
//!
//! Structured values are built as typed records and serialized with
//! `serde_json`, so embedded quotes and backslashes are escaped by the
//! serializer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{TransformError, TransformResult};
use crate::registry::rights_uri;

static SMALL_INT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,6}$").expect("Invalid small int regex"));

/// `{"value": .., "attr0": ..}`
#[derive(Debug, Serialize)]
struct Attributed<'a> {
    value: &'a str,
    attr0: &'a str,
}

/// `{"number": .., "type": ..}`
#[derive(Debug, Serialize)]
struct PartDetail<'a> {
    number: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

/// A related item, either by title or by typed identifier.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RelatedItem<'a> {
    Title {
        title: &'a str,
    },
    Identifier {
        #[serde(rename = "type")]
        kind: &'a str,
        identifier: &'a str,
    },
}

pub fn yes_no(column: &str, value: &str) -> TransformResult<String> {
    match value {
        "Yes" => Ok("1".to_string()),
        "No" => Ok("0".to_string()),
        _ => Err(TransformError::cell(column, value, "expected Yes or No")),
    }
}

/// A short numeric id that refers to another row of the batch.
pub fn small_int(column: &str, value: &str) -> TransformResult<String> {
    if SMALL_INT_REGEX.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(TransformError::cell(column, value, "expected a number of at most 6 digits"))
    }
}

/// A non-negative integer without leading zeros.
pub fn integer(column: &str, value: &str) -> TransformResult<String> {
    value
        .parse::<u64>()
        .map(|n| n.to_string())
        .map_err(|e| TransformError::cell(column, value, e.to_string()))
}

pub fn rights(column: &str, value: &str) -> TransformResult<String> {
    rights_uri(value)
        .map(str::to_string)
        .ok_or_else(|| TransformError::cell(column, value, "not a known rights statement"))
}

pub fn attributed(value: &str, attr0: &str) -> TransformResult<String> {
    Ok(serde_json::to_string(&Attributed { value, attr0 })?)
}

pub fn part_detail(value: &str, kind: &str) -> TransformResult<String> {
    Ok(serde_json::to_string(&PartDetail { number: value, kind })?)
}

pub fn related_title(value: &str) -> TransformResult<String> {
    Ok(serde_json::to_string(&RelatedItem::Title { title: value })?)
}

pub fn related_identifier(value: &str, kind: &str) -> TransformResult<String> {
    Ok(serde_json::to_string(&RelatedItem::Identifier { kind, identifier: value })?)
}

pub fn vocabulary_prefixed(value: &str, vocabulary: &str) -> String {
    format!("{vocabulary}:{value}")
}
