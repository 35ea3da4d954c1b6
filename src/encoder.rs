//! Category Encoder Adapter
//!
//! Maps categorical field values to the integer indices the classifier was
//! fit on. Encoders are built offline and shipped inside the model artifact;
//! values never seen during training fall back to [`DEFAULT_INDEX`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index returned for values outside a field's known classes.
pub const DEFAULT_INDEX: usize = 0;

/// Categorical columns of the historical event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "State")]
    Region,
    #[serde(rename = "District")]
    District,
    #[serde(rename = "RequestType")]
    RequestType,
    #[serde(rename = "Gender")]
    Gender,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Region,
        Field::District,
        Field::RequestType,
        Field::Gender,
    ];
}

/// Encoder for a single field. Classes are kept sorted so the index of a
/// value is its rank, matching how the offline label encoders assign codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }
}

/// Per-field encoders, loaded once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "HashMap<Field, Vec<String>>")]
pub struct CategoryEncoder {
    fields: HashMap<Field, LabelEncoder>,
}

impl From<HashMap<Field, Vec<String>>> for CategoryEncoder {
    fn from(raw: HashMap<Field, Vec<String>>) -> Self {
        Self {
            fields: raw
                .into_iter()
                .map(|(field, classes)| (field, LabelEncoder::fit(classes)))
                .collect(),
        }
    }
}

impl CategoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Field, encoder: LabelEncoder) -> Self {
        self.fields.insert(field, encoder);
        self
    }

    /// Encode `value` for `field`. Never fails: unknown fields and unseen
    /// values both map to [`DEFAULT_INDEX`].
    pub fn encode(&self, field: Field, value: &str) -> usize {
        self.fields
            .get(&field)
            .and_then(|enc| enc.transform(value))
            .unwrap_or(DEFAULT_INDEX)
    }

    pub fn field(&self, field: Field) -> Option<&LabelEncoder> {
        self.fields.get(&field)
    }

    /// Fields the artifact did not provide an encoder for.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.fields.contains_key(f))
            .collect()
    }
}
