//! Chromosome identifiers, metadata, and the [`ChromosomeIndex`] lookup.
//!
//! Backends report chromosome identifiers either as JSON numbers (`1`, `2`, ...)
//! or as strings (`"chr1"`, `"1H"`). The backend compares the identifiers it
//! receives against its own list, so a [`ChromosomeId`] keeps the JSON type it
//! was read with and serializes back to the same type.
//!
//! Coordinates are 1-based and inclusive.

use std::{cmp::Ordering, fmt};

use genomap::GenomeMap;
use serde::{Deserialize, Serialize};

use crate::{error::ViewError, traits::TsvSerialize, Position};

/// A chromosome identifier, as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChromosomeId {
    Numeric(u64),
    Named(String),
}

impl ChromosomeId {
    /// Parse a user-supplied identifier: all-digit strings become
    /// [`ChromosomeId::Numeric`], everything else [`ChromosomeId::Named`].
    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = id.parse::<u64>() {
                return ChromosomeId::Numeric(number);
            }
        }
        ChromosomeId::Named(id.to_string())
    }

    /// Ordering used when an identifier is not in any [`ChromosomeIndex`]:
    /// numeric ids compare numerically, anything else lexically.
    pub fn natural_cmp(&self, other: &ChromosomeId) -> Ordering {
        match (self, other) {
            (ChromosomeId::Numeric(left), ChromosomeId::Numeric(right)) => left.cmp(right),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for ChromosomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChromosomeId::Numeric(number) => write!(f, "{}", number),
            ChromosomeId::Named(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for ChromosomeId {
    fn from(value: &str) -> Self {
        ChromosomeId::parse(value)
    }
}

impl From<u64> for ChromosomeId {
    fn from(value: u64) -> Self {
        ChromosomeId::Numeric(value)
    }
}

/// Per-chromosome metadata from the dataset configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChromosomeMetadata {
    pub id: ChromosomeId,
    /// Position of the first variant on this chromosome.
    pub start: Position,
    /// Position of the last variant on this chromosome.
    pub end: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centromere_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_variants: Option<u64>,
}

impl ChromosomeMetadata {
    pub fn new(id: ChromosomeId, start: Position, end: Position) -> Self {
        Self {
            id,
            start,
            end,
            label: None,
            centromere_position: None,
            number_of_variants: None,
        }
    }

    /// The label to show for this chromosome, falling back to its id.
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.id.to_string())
    }
}

impl TsvSerialize for ChromosomeMetadata {
    fn to_tsv(&self) -> String {
        let optional = |value: Option<String>| value.unwrap_or_else(|| ".".to_string());
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.display_label(),
            self.start,
            self.end,
            optional(self.centromere_position.map(|position| position.to_string())),
            optional(self.number_of_variants.map(|count| count.to_string())),
        )
    }
}

/// Lookup of [`ChromosomeMetadata`] by id, built once per metadata load.
///
/// The index also defines the genome order of chromosomes: the order they
/// were listed in the dataset metadata.
#[derive(Clone, Debug)]
pub struct ChromosomeIndex {
    chromosomes: GenomeMap<ChromosomeMetadata>,
}

impl ChromosomeIndex {
    /// Build the index. Fails if the list is empty or an id is duplicated.
    pub fn new(chromosomes: &[ChromosomeMetadata]) -> Result<Self, ViewError> {
        if chromosomes.is_empty() {
            return Err(ViewError::NoChromosomes);
        }
        let mut map = GenomeMap::new();
        for chromosome in chromosomes {
            map.insert(&chromosome.id.to_string(), chromosome.clone())?;
        }
        Ok(Self { chromosomes: map })
    }

    pub fn get(&self, id: &ChromosomeId) -> Option<&ChromosomeMetadata> {
        self.chromosomes.get(&id.to_string())
    }

    /// Look up a chromosome by its textual id (e.g. from the command line),
    /// regardless of whether the backend reports it as a number or a string.
    pub fn resolve(&self, id: &str) -> Option<&ChromosomeMetadata> {
        self.chromosomes.get(id.trim())
    }

    /// Like [`ChromosomeIndex::get`], but an unknown id is an error.
    pub fn require(&self, id: &ChromosomeId) -> Result<&ChromosomeMetadata, ViewError> {
        self.get(id)
            .ok_or_else(|| ViewError::UnknownChromosome(id.to_string()))
    }

    /// The first chromosome in genome order.
    pub fn first(&self) -> Option<&ChromosomeMetadata> {
        self.chromosomes.values().next()
    }

    /// The position of `id` in genome order.
    pub fn rank(&self, id: &ChromosomeId) -> Option<usize> {
        let key = id.to_string();
        self.chromosomes.names().iter().position(|name| *name == key)
    }

    /// Compare two chromosome ids in genome order. Ids missing from the
    /// index fall back to [`ChromosomeId::natural_cmp`].
    pub fn compare(&self, left: &ChromosomeId, right: &ChromosomeId) -> Ordering {
        match (self.rank(left), self.rank(right)) {
            (Some(left_rank), Some(right_rank)) => left_rank.cmp(&right_rank),
            _ => left.natural_cmp(right),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChromosomeMetadata> {
        self.chromosomes.values()
    }

    pub fn len(&self) -> usize {
        self.chromosomes.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
