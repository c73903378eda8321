//! Traits used by the snpview library.
//!

use serde_json::Value;

use crate::{
    analysis::{AnalysisRequest, BlastRequest, BlastResponse},
    cache::CallsPayload,
    error::ViewError,
    metadata::{DatasetMetadata, GenesTable},
    window::{VariantWindow, WindowRequest},
};

/// The [`DataSource`] trait is the boundary to the backend: everything the
/// viewer knows about a dataset comes through one of these calls.
///
/// The viewer runs on a single thread, so implementations need not be
/// `Send`. [`HttpSource`] talks to a live backend; tests use the
/// in-memory [`MockSource`].
///
/// [`HttpSource`]: crate::io::http::HttpSource
/// [`MockSource`]: crate::test_utilities::MockSource
#[allow(async_fn_in_trait)]
pub trait DataSource {
    /// `GET /configuration`: cohort and chromosome metadata.
    async fn configuration(&self) -> Result<DatasetMetadata, ViewError>;

    /// `GET /genes`: the gene table, `None` if the dataset has none.
    async fn genes(&self) -> Result<Option<GenesTable>, ViewError>;

    /// `POST /variants`: the page of variants for a window.
    async fn variants(&self, request: &WindowRequest) -> Result<VariantWindow, ViewError>;

    /// `POST /variant_calls`: genotype calls and per-call attributes for the
    /// samples of `request`.
    async fn variant_calls(&self, request: &WindowRequest) -> Result<CallsPayload, ViewError>;

    async fn vcf_export_check(&self, request: &AnalysisRequest) -> Result<Value, ViewError>;

    async fn genomic_window_summary(&self, request: &AnalysisRequest)
        -> Result<Value, ViewError>;

    async fn pca(&self, request: &AnalysisRequest) -> Result<Value, ViewError>;

    async fn blast(&self, request: &BlastRequest) -> Result<BlastResponse, ViewError>;
}

/// The [`TsvSerialize`] trait defines how a type is written as (part of)
/// a row of TSV output.
pub trait TsvSerialize {
    // Serialize something to a TSV [`String`].
    fn to_tsv(&self) -> String;
}

impl TsvSerialize for &String {
    fn to_tsv(&self) -> String {
        self.to_string()
    }
}

impl TsvSerialize for String {
    fn to_tsv(&self) -> String {
        self.to_string()
    }
}

impl TsvSerialize for Option<String> {
    fn to_tsv(&self) -> String {
        self.as_ref().map_or(".".to_string(), |x| x.to_tsv())
    }
}

impl<U: TsvSerialize> TsvSerialize for Vec<U> {
    fn to_tsv(&self) -> String {
        self.iter()
            .map(|x| x.to_tsv())
            .collect::<Vec<_>>()
            .join("\t")
    }
}
