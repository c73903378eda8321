//! Genomic windows: what the viewer asks for, and what the backend returns.
//!
//! A [`GenomicWindow`] is anchored either at its start or at its end, never both.
//! The backend derives the other end from the number of variants that fit into
//! the viewport (see [`visible_variant_count`]) and returns a [`VariantWindow`]
//! describing the page of variants it found, plus the bounds of the adjacent
//! pages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{chromosomes::ChromosomeId, Position};

/// The authoritative end of a window; the other end is derived by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Start(Position),
    End(Position),
}

/// The navigational state of the viewer: a chromosome, an anchor, and the
/// width in pixels of one variant column.
#[derive(Clone, Debug, PartialEq)]
pub struct GenomicWindow {
    pub chromosome: ChromosomeId,
    pub anchor: Anchor,
    pub snp_width: u32,
}

impl GenomicWindow {
    pub fn new(chromosome: ChromosomeId, anchor: Anchor, snp_width: u32) -> Self {
        Self {
            chromosome,
            anchor,
            snp_width,
        }
    }

    pub fn startpos(&self) -> Option<Position> {
        match self.anchor {
            Anchor::Start(position) => Some(position),
            Anchor::End(_) => None,
        }
    }

    pub fn endpos(&self) -> Option<Position> {
        match self.anchor {
            Anchor::End(position) => Some(position),
            Anchor::Start(_) => None,
        }
    }

    /// Anchor the window at `position`, clearing any end anchor.
    pub fn set_start(&mut self, position: Position) {
        self.anchor = Anchor::Start(position);
    }

    /// Anchor the window at `position`, clearing any start anchor.
    pub fn set_end(&mut self, position: Position) {
        self.anchor = Anchor::End(position);
    }
}

/// How many variant columns fit into the viewport:
/// `floor((viewport_width - chrome_width) / snp_width)`.
///
/// This is the page size requested from the backend. A result below one means
/// nothing fits and no load should happen.
///
/// # Example
/// ```
/// use snpview::window::visible_variant_count;
///
/// assert_eq!(visible_variant_count(1000, 200, 20), 40);
/// assert_eq!(visible_variant_count(150, 200, 20), -3);
/// ```
pub fn visible_variant_count(viewport_width: u32, chrome_width: u32, snp_width: u32) -> i64 {
    if snp_width == 0 {
        return 0;
    }
    let usable = viewport_width as i64 - chrome_width as i64;
    usable.div_euclid(snp_width as i64)
}

/// The request body of `POST /variants` and `POST /variant_calls`.
///
/// Anchors are only sent when positive; the backend otherwise starts at the
/// beginning of the chromosome.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowRequest {
    pub chrom: ChromosomeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startpos: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpos: Option<Position>,
    pub samples: Vec<String>,
    pub count: usize,
}

impl WindowRequest {
    pub fn new(window: &GenomicWindow, samples: Vec<String>, count: usize) -> Self {
        Self {
            chrom: window.chromosome.clone(),
            startpos: window.startpos().filter(|position| *position > 0),
            endpos: window.endpos().filter(|position| *position > 0),
            samples,
            count,
        }
    }

    /// The same window, restricted to another set of samples.
    pub fn with_samples(&self, samples: Vec<String>) -> Self {
        Self {
            samples,
            ..self.clone()
        }
    }
}

/// The page of variants returned by `POST /variants`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantWindow {
    /// First position of this page.
    pub coordinate_first: Position,
    /// Last position of this page.
    pub coordinate_last: Position,
    /// First position of the next page.
    pub coordinate_first_next: Position,
    /// Last position of the previous page.
    pub coordinate_last_prev: Position,
    /// The chromosome of `coordinate_first`; at genome edges this may differ
    /// from the requested chromosome.
    pub coordinate_first_chromosome: ChromosomeId,
    /// The chromosome of `coordinate_first_next`.
    pub coordinate_last_chromosome: ChromosomeId,
    /// The positions of this page, ascending.
    #[serde(default)]
    pub variants_coordinates: Vec<Position>,
    /// Everything else the backend reports for the page (reference and
    /// alternate alleles, per-variant statistics, features).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl VariantWindow {
    pub fn len(&self) -> usize {
        self.variants_coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants_coordinates.is_empty()
    }

    /// The page wrapped around a chromosome boundary: its first position
    /// lies after its last, or after the first position of the next page.
    pub fn is_invalid(&self) -> bool {
        self.starts_after_end() || self.starts_after_next()
    }

    pub fn starts_after_end(&self) -> bool {
        self.coordinate_first > self.coordinate_last
    }

    pub fn starts_after_next(&self) -> bool {
        self.coordinate_first > self.coordinate_first_next
    }

    /// The next page does not overlap this one, so moving forward shows new
    /// variants.
    pub fn has_next_page(&self) -> bool {
        self.coordinate_last < self.coordinate_first_next
    }

    /// The previous page does not overlap this one.
    pub fn has_previous_page(&self) -> bool {
        self.coordinate_last_prev < self.coordinate_first
    }
}
