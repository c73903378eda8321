//! # snpview
//!
//! A client-side engine for browsing per-sample genotype calls across a linear
//! genomic coordinate space. The two main pieces are:
//!
//!  1. The [`Controller`], which owns navigation state (chromosome, window anchor,
//!     variant width) and reconciles a requested window against the backend,
//!     correcting windows that run across a chromosome boundary.
//!
//!  2. The [`DataLoader`], a lazy per-sample call cache. Only a bounded slice of
//!     samples is fetched when a window loads; the remaining samples are fetched
//!     on demand as they become visible, and never fetched twice.
//!
//! Both talk to the backend through the [`DataSource`] trait ([`HttpSource`] is
//! the HTTP implementation) and publish their results on an [`EventBus`].
//!
//! [`Controller`]: crate::controller::Controller
//! [`DataLoader`]: crate::cache::loader::DataLoader
//! [`DataSource`]: crate::traits::DataSource
//! [`HttpSource`]: crate::io::http::HttpSource
//! [`EventBus`]: crate::events::EventBus

pub mod analysis;
pub mod cache;
pub mod chromosomes;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod genotypes;
pub mod io;
pub mod metadata;
pub mod reporting;
pub mod samples;
pub mod test_utilities;
pub mod traits;
pub mod window;

#[cfg(not(feature = "big-position"))]
pub type Position = u32;
#[cfg(feature = "big-position")]
pub type Position = u64;

/// The default number of samples whose calls are fetched eagerly when a new
/// window loads and no visible subset has been reported yet.
pub const INITIAL_SAMPLE_CAP: usize = 30;

pub mod prelude {
    pub use crate::cache::loader::{DataLoader, IncrementalOutcome, LoadStatus, WindowData};
    pub use crate::analysis::{AnalysisParams, AnalysisRequest, BlastRecord, BlastRequest};
    pub use crate::cache::{AttributeCache, CallSlot, CallsPayload, SampleCache};
    pub use crate::chromosomes::{ChromosomeId, ChromosomeIndex, ChromosomeMetadata};
    pub use crate::config::ViewerConfig;
    pub use crate::controller::{Controller, DrawOutcome};
    pub use crate::error::ViewError;
    pub use crate::events::{Channel, DisplayState, Event, EventBus};
    pub use crate::genotypes::{SampleCalls, VariantType};
    pub use crate::io::http::HttpSource;
    pub use crate::metadata::{DatasetMetadata, GenesTable};
    pub use crate::samples::{SampleInput, SampleRecord, SampleSelection};
    pub use crate::traits::{DataSource, TsvSerialize};
    pub use crate::window::{Anchor, GenomicWindow, VariantWindow, WindowRequest};

    pub use crate::chroms;
    pub use crate::sample_ids;
}

/// Create a `Vec<ChromosomeMetadata>` from `id => (start, end)` pairs.
///
/// Ids that are all digits become numeric chromosome ids, anything
/// else is a named id.
///
/// # Example
/// ```
/// use snpview::prelude::*;
///
/// let chroms = chroms!(1 => (1, 1000), "chrX" => (5, 500));
/// assert_eq!(chroms[0].id, ChromosomeId::Numeric(1));
/// assert_eq!(chroms[1].id, ChromosomeId::Named("chrX".to_string()));
/// ```
#[macro_export]
macro_rules! chroms {
    ($($id:expr => ($start:expr, $end:expr)),* $(,)?) => {
        vec![
            $($crate::chromosomes::ChromosomeMetadata::new(
                $crate::chromosomes::ChromosomeId::parse(&$id.to_string()),
                $start,
                $end,
            )),*
        ]
    };
}

/// Create a `Vec<String>` of sample identifiers.
///
/// # Example
/// ```
/// use snpview::prelude::*;
///
/// let samples = sample_ids!["A", "B"];
/// assert_eq!(samples, vec!["A".to_string(), "B".to_string()]);
/// ```
#[macro_export]
macro_rules! sample_ids {
    ($($id:expr),* $(,)?) => {
        vec![$($id.to_string()),*]
    };
}
