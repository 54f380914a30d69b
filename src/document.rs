//! # Stored Items and Their Tuple Form
//!
//! Every item stored in an index page is serialized as a JSON array (a
//! "tuple") rather than an object. Field names are implied by position, which
//! keeps pages small: a page holds as many documents as fit after compression,
//! so every byte of framing costs documents.
//!
//! ## Tuple Schema
//!
//! Each item type declares a [`TupleSchema`]: its ordered field list and the
//! number of leading fields that are always present. Optional fields sit at
//! the tail. The two schema rules are:
//!
//! - **truncate** (write): trailing `null`s are dropped, down to the required
//!   prefix. A document without score, term or state is written as
//!   `["title", "url", "extract"]`.
//! - **pad** (read): missing trailing fields are restored as `null`.
//!
//! ```text
//! Document schema:  [title, url, extract | score, term, state]
//!                    ^^^^^^^^^^^^^^^^^^^   ^^^^^^^^^^^^^^^^^^
//!                    required              optional tail
//! ```
//!
//! ## Document State
//!
//! [`DocumentState`] records where a document came from and whether a curator
//! approved it. The numeric values are part of the page format. States at or
//! above [`DocumentState::OrganicApproved`] are curated and sort ahead of
//! organic results when pages are merged.

use eyre::{bail, ensure, Result};
use serde_json::Value;

/// Positional serialized form of an item.
pub type Tuple = Vec<Value>;

/// Ordered field list of an item type with its optional tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleSchema {
    pub fields: &'static [&'static str],
    pub required: usize,
}

impl TupleSchema {
    pub const fn new(fields: &'static [&'static str], required: usize) -> Self {
        assert!(required <= fields.len());
        Self { fields, required }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drops trailing `null`s, never shortening below the required prefix.
    pub fn truncate(&self, mut values: Tuple) -> Tuple {
        while values.len() > self.required && matches!(values.last(), Some(Value::Null)) {
            values.pop();
        }
        values
    }

    /// Restores omitted trailing fields as `null`.
    pub fn pad(&self, mut values: Tuple) -> Result<Tuple> {
        ensure!(
            values.len() >= self.required,
            "tuple has {} fields, at least {} required ({})",
            values.len(),
            self.required,
            self.fields[..self.required].join(", ")
        );
        ensure!(
            values.len() <= self.fields.len(),
            "tuple has {} fields, at most {} allowed",
            values.len(),
            self.fields.len()
        );
        values.resize(self.fields.len(), Value::Null);
        Ok(values)
    }
}

/// A record that can be stored in index pages.
///
/// `TYPE_NAME` is written into the index metadata when the index is created
/// and checked whenever the index is opened.
pub trait Item: Sized {
    const TYPE_NAME: &'static str;
    const SCHEMA: TupleSchema;

    /// Full tuple, one value per schema field.
    fn to_values(&self) -> Tuple;

    /// Builds an item from a full (padded) tuple.
    fn from_values(values: Tuple) -> Result<Self>;

    /// Index key this copy was filed under, if any.
    fn term(&self) -> Option<&str>;

    fn to_tuple(&self) -> Tuple {
        Self::SCHEMA.truncate(self.to_values())
    }

    fn from_tuple(values: Tuple) -> Result<Self> {
        Self::from_values(Self::SCHEMA.pad(values)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentState {
    SyncedWithMainIndex,
    Deleted,
    FromUser,
    FromGoogle,
    FromWiki,
    OrganicApproved,
    FromUserApproved,
    FromGoogleApproved,
}

impl DocumentState {
    pub const ALL: [DocumentState; 8] = [
        DocumentState::SyncedWithMainIndex,
        DocumentState::Deleted,
        DocumentState::FromUser,
        DocumentState::FromGoogle,
        DocumentState::FromWiki,
        DocumentState::OrganicApproved,
        DocumentState::FromUserApproved,
        DocumentState::FromGoogleApproved,
    ];

    /// Lowest state value that counts as curated.
    pub const CURATED_THRESHOLD: i64 = 7;

    pub fn value(self) -> i64 {
        match self {
            DocumentState::SyncedWithMainIndex => -2,
            DocumentState::Deleted => -1,
            DocumentState::FromUser => 2,
            DocumentState::FromGoogle => 3,
            DocumentState::FromWiki => 4,
            DocumentState::OrganicApproved => 7,
            DocumentState::FromUserApproved => 8,
            DocumentState::FromGoogleApproved => 9,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.value() == value)
    }

    pub fn is_curated(self) -> bool {
        self.value() >= Self::CURATED_THRESHOLD
    }
}

impl PartialOrd for DocumentState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value().cmp(&other.value())
    }
}

/// A search result stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub url: String,
    pub extract: String,
    /// Only finite scores are stored. NaN and infinities are written as an
    /// absent score.
    pub score: Option<f64>,
    pub term: Option<String>,
    pub state: Option<DocumentState>,
}

impl Document {
    pub fn new(title: impl Into<String>, url: impl Into<String>, extract: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            extract: extract.into(),
            score: None,
            term: None,
            state: None,
        }
    }

    /// A non-finite `score` leaves the document without one.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score).filter(|s| s.is_finite());
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_state(mut self, state: DocumentState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn is_curated(&self) -> bool {
        self.state.is_some_and(DocumentState::is_curated)
    }
}

fn string_field(value: Value, name: &str, nullable: bool) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null if nullable => Ok(String::new()),
        other => bail!("document field '{}' must be a string, got {}", name, other),
    }
}

impl Item for Document {
    const TYPE_NAME: &'static str = "Document";
    const SCHEMA: TupleSchema =
        TupleSchema::new(&["title", "url", "extract", "score", "term", "state"], 3);

    fn to_values(&self) -> Tuple {
        vec![
            Value::from(self.title.as_str()),
            Value::from(self.url.as_str()),
            Value::from(self.extract.as_str()),
            self.score.filter(|s| s.is_finite()).map_or(Value::Null, Value::from),
            self.term.as_deref().map_or(Value::Null, Value::from),
            self.state.map_or(Value::Null, |s| Value::from(s.value())),
        ]
    }

    fn from_values(values: Tuple) -> Result<Self> {
        let [title, url, extract, score, term, state]: [Value; 6] = values
            .try_into()
            .map_err(|v: Tuple| eyre::eyre!("document tuple has {} fields, expected 6", v.len()))?;

        let score = match score {
            Value::Null => None,
            Value::Number(n) => n.as_f64(),
            other => bail!("document score must be a number, got {}", other),
        };

        let term = match term {
            Value::Null => None,
            other => Some(string_field(other, "term", false)?),
        };

        // Unknown states from newer writers decode as organic.
        let state = state.as_i64().and_then(DocumentState::from_value);

        Ok(Self {
            title: string_field(title, "title", true)?,
            url: string_field(url, "url", false)?,
            extract: string_field(extract, "extract", true)?,
            score,
            term,
            state,
        })
    }

    fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn truncate_drops_trailing_nulls_only() {
        let doc = Document::new("title", "url", "extract").with_term("python");

        let tuple = doc.to_tuple();

        assert_eq!(tuple, vec![json!("title"), json!("url"), json!("extract"), Value::Null, json!("python")]);
    }

    #[test]
    fn truncate_keeps_required_prefix() {
        let schema = Document::SCHEMA;
        let tuple = vec![Value::Null, json!("url"), Value::Null, Value::Null];

        assert_eq!(schema.truncate(tuple), vec![Value::Null, json!("url"), Value::Null]);
    }

    #[test]
    fn pad_restores_missing_tail() {
        let padded = Document::SCHEMA
            .pad(vec![json!("t"), json!("u"), json!("e")])
            .unwrap();

        assert_eq!(padded.len(), 6);
        assert!(padded[3..].iter().all(Value::is_null));
    }

    #[test]
    fn pad_rejects_short_and_long_tuples() {
        assert!(Document::SCHEMA.pad(vec![json!("t"), json!("u")]).is_err());
        assert!(Document::SCHEMA.pad(vec![Value::Null; 7]).is_err());
    }

    #[test]
    fn constructing_document_replaces_null_title_and_extract() {
        let doc = Document::from_tuple(vec![Value::Null, json!("url"), Value::Null, json!(1.0)]).unwrap();

        assert_eq!(doc.title, "");
        assert_eq!(doc.extract, "");
        assert_eq!(doc.score, Some(1.0));
    }

    #[test]
    fn non_finite_score_is_stored_as_absent() {
        assert_eq!(Document::new("t", "u", "e").with_score(f64::NAN).score, None);

        let mut doc = Document::new("t", "u", "e").with_term("t");
        doc.score = Some(f64::INFINITY);
        let tuple = doc.to_tuple();

        assert!(tuple[3].is_null());
        assert_eq!(Document::from_tuple(tuple).unwrap().score, None);
    }

    #[test]
    fn unknown_state_decodes_as_none() {
        let doc = Document::from_tuple(vec![
            json!("t"),
            json!("u"),
            json!("e"),
            Value::Null,
            json!("term"),
            json!(42),
        ])
        .unwrap();

        assert_eq!(doc.state, None);
        assert_eq!(doc.term.as_deref(), Some("term"));
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(Document::from_tuple(vec![json!("t"), Value::Null, json!("e")]).is_err());
    }

    #[test]
    fn curated_threshold() {
        assert!(!DocumentState::FromWiki.is_curated());
        assert!(!DocumentState::Deleted.is_curated());
        assert!(DocumentState::OrganicApproved.is_curated());
        assert!(DocumentState::FromGoogleApproved.is_curated());
        assert!(DocumentState::SyncedWithMainIndex < DocumentState::Deleted);
        assert!(DocumentState::FromUser < DocumentState::OrganicApproved);
    }

    #[test]
    fn state_values_round_trip() {
        for state in DocumentState::ALL {
            assert_eq!(DocumentState::from_value(state.value()), Some(state));
        }
    }

    fn arb_state() -> impl Strategy<Value = Option<DocumentState>> {
        prop_oneof![
            Just(None),
            proptest::sample::select(DocumentState::ALL.to_vec()).prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn document_tuple_roundtrip(
            title in ".{0,20}",
            url in ".{0,20}",
            extract in ".{0,40}",
            score in proptest::option::of((-4_000_000i32..4_000_000).prop_map(|v| f64::from(v) / 4.0)),
            term in proptest::option::of("[a-z ]{1,12}"),
            state in arb_state(),
        ) {
            let doc = Document { title, url, extract, score, term, state };

            let json = serde_json::to_string(&doc.to_tuple()).unwrap();
            let tuple: Tuple = serde_json::from_str(&json).unwrap();
            let decoded = Document::from_tuple(tuple).unwrap();

            prop_assert_eq!(decoded, doc);
        }
    }
}
