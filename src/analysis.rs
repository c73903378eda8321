//! Request and result types of the analytics endpoints.
//!
//! These endpoints (`/vcf_export_check`, `/genomic_window_summary`, `/pca`,
//! `/blast`) are single request/response calls; nothing here is cached.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{chromosomes::ChromosomeId, Position};

/// Caller-supplied parameters of a window analysis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisParams {
    pub startpos: Position,
    pub endpos: Position,
    pub variant_filter_settings: Option<Value>,
    /// Only used by `/pca`.
    pub umap_n_neighbors: Option<u32>,
}

impl AnalysisParams {
    pub fn new(startpos: Position, endpos: Position) -> Self {
        Self {
            startpos,
            endpos,
            ..Default::default()
        }
    }

    pub fn with_filter_settings(mut self, settings: Value) -> Self {
        self.variant_filter_settings = Some(settings);
        self
    }

    pub fn with_umap_neighbors(mut self, neighbors: u32) -> Self {
        self.umap_n_neighbors = Some(neighbors);
        self
    }
}

/// The request body of the window analysis endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub chrom: ChromosomeId,
    pub startpos: Position,
    pub endpos: Position,
    pub samples: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_filter_settings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub umap_n_neighbors: Option<u32>,
}

impl AnalysisRequest {
    pub fn new(chrom: ChromosomeId, samples: Vec<String>, params: AnalysisParams) -> Self {
        Self {
            chrom,
            startpos: params.startpos,
            endpos: params.endpos,
            samples,
            variant_filter_settings: params.variant_filter_settings,
            umap_n_neighbors: params.umap_n_neighbors,
        }
    }
}

/// The request body of `POST /blast`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlastRequest {
    pub query: String,
    pub blast_type: String,
}

/// The response of `POST /blast`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlastResponse {
    #[serde(default)]
    pub blast_hits: Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One entry of the blast history kept by the controller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlastRecord {
    pub query: String,
    pub blast_hits: Value,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analysis_request_serialization() {
        let params = AnalysisParams::new(100, 900).with_umap_neighbors(15);
        let request = AnalysisRequest::new(ChromosomeId::Numeric(2), vec!["A".into()], params);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"chrom": 2, "startpos": 100, "endpos": 900, "samples": ["A"], "umap_n_neighbors": 15})
        );

        let params = AnalysisParams::new(1, 5).with_filter_settings(json!({"filterByMaf": true}));
        let request = AnalysisRequest::new(ChromosomeId::Named("1H".into()), vec![], params);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["variant_filter_settings"]["filterByMaf"], true);
        assert!(json.get("umap_n_neighbors").is_none());
    }

    #[test]
    fn test_blast_response_deserialize() {
        let response: BlastResponse =
            serde_json::from_str(r#"{"success": true, "blast_hits": [{"chromosome": "1H"}]}"#)
                .unwrap();
        assert_eq!(response.blast_hits[0]["chromosome"], "1H");
        assert_eq!(response.extra["success"], true);
    }
}
