//! Dataset metadata served by the backend's bootstrap endpoints.
//!
//! `GET /configuration` returns a [`DatasetMetadata`]; `GET /genes` returns a
//! [`GenesTable`] in the column/row ("split") layout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chromosomes::{ChromosomeIndex, ChromosomeMetadata},
    error::ViewError,
};

/// The cohort and chromosome metadata of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Number of genome copies per sample.
    pub ploidy: u8,
    pub chromosomes: Vec<ChromosomeMetadata>,
    /// The sample universe of the dataset, in backend order.
    pub samples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_genotypes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_variants: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_elements: Option<u64>,
    /// Everything else the backend reports (gff3 summary, features, descriptions).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DatasetMetadata {
    pub fn new(ploidy: u8, chromosomes: Vec<ChromosomeMetadata>, samples: Vec<String>) -> Self {
        Self {
            ploidy,
            chromosomes,
            samples,
            count_genotypes: None,
            count_variants: None,
            count_elements: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Build the id lookup for this dataset's chromosomes.
    pub fn chromosome_index(&self) -> Result<ChromosomeIndex, ViewError> {
        ChromosomeIndex::new(&self.chromosomes)
    }

    /// Whether the backend announced a gene annotation track.
    pub fn has_genes(&self) -> bool {
        self.extra
            .get("gff3")
            .and_then(|gff3| gff3.get("has_gff3"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// The gene feature table, in column/row layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesTable {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl GenesTable {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The index of a named column.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Iterate over the rows as column name to value records.
    pub fn records(&self) -> impl Iterator<Item = IndexMap<&str, &Value>> + '_ {
        self.data.iter().map(|row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}
