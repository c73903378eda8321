//! Sample selections.
//!
//! A selection can be given either as bare sample identifiers or as rich
//! records carrying display metadata. Rich records are normalized into a
//! side table keyed by sample id; a record with a `link` but no `displayName`
//! gets the link's text, with markup stripped, as its display name.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]*>").expect("valid markup regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace regex");
    static ref ENTITY: Regex =
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex");
}

/// A sample with optional display metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub id: String,
    #[serde(
        default,
        rename = "displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SampleRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            link: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// A sample selection as supplied by a caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleInput {
    Ids(Vec<String>),
    Records(Vec<SampleRecord>),
}

impl From<Vec<String>> for SampleInput {
    fn from(ids: Vec<String>) -> Self {
        SampleInput::Ids(ids)
    }
}

impl From<Vec<SampleRecord>> for SampleInput {
    fn from(records: Vec<SampleRecord>) -> Self {
        SampleInput::Records(records)
    }
}

/// An ordered list of sample ids, plus display metadata when the selection
/// was given as rich records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSelection {
    ids: Vec<String>,
    metadata: Option<IndexMap<String, SampleRecord>>,
}

impl SampleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: Vec<String>) -> Self {
        Self {
            ids,
            metadata: None,
        }
    }

    /// Build a selection from rich records, deriving missing display
    /// names from the record's link markup.
    pub fn from_records(records: Vec<SampleRecord>) -> Self {
        let mut ids = Vec::with_capacity(records.len());
        let mut metadata = IndexMap::with_capacity(records.len());
        for mut record in records {
            if record.display_name.is_none() {
                if let Some(link) = &record.link {
                    record.display_name = Some(strip_markup(link));
                }
            }
            ids.push(record.id.clone());
            metadata.insert(record.id.clone(), record);
        }
        Self {
            ids,
            metadata: Some(metadata),
        }
    }

    /// Normalize either input form.
    pub fn normalize(input: SampleInput) -> Self {
        match input {
            SampleInput::Ids(ids) => Self::from_ids(ids),
            SampleInput::Records(records) => Self::from_records(records),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The display side table; `None` when the selection was bare ids.
    pub fn metadata(&self) -> Option<&IndexMap<String, SampleRecord>> {
        self.metadata.as_ref()
    }

    /// The name to show for a sample: its display name when one is known,
    /// otherwise the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(id))
            .and_then(|record| record.display_name.as_deref())
            .unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<SampleInput> for SampleSelection {
    fn from(input: SampleInput) -> Self {
        SampleSelection::normalize(input)
    }
}

/// Reduce a markup fragment to its visible text.
pub fn strip_markup(markup: &str) -> String {
    let text = MARKUP_TAG.replace_all(markup, "");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Decode character references in one pass: numeric (`&#233;`, `&#x27;`)
/// and the named ones links commonly carry. Unknown names are kept as is.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name.strip_prefix('#') {
                Some(number) => match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse::<u32>().ok(),
                }
                .and_then(char::from_u32),
                None => match name {
                    "nbsp" => Some(' '),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "amp" => Some('&'),
                    _ => None,
                },
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
