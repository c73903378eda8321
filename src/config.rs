//! Viewer configuration.
//!
//! Keys are camelCase so a configuration written for the browser front end
//! can be read as is, e.g.:
//!
//! ```json
//! {"apiBaseUrl": "http://localhost:8080", "samples": ["A", "B"], "snpWidth": 25}
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ViewError, samples::SampleInput, INITIAL_SAMPLE_CAP};

pub const DEFAULT_SNP_WIDTH: u32 = 20;
pub const DEFAULT_CHROME_WIDTH: u32 = 200;
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1000;

fn default_initial_sample_cap() -> usize {
    INITIAL_SAMPLE_CAP
}

fn default_snp_width() -> u32 {
    DEFAULT_SNP_WIDTH
}

fn default_chrome_width() -> u32 {
    DEFAULT_CHROME_WIDTH
}

fn default_viewport_width() -> u32 {
    DEFAULT_VIEWPORT_WIDTH
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Origin of every backend request.
    pub api_base_url: String,
    /// The initial sample selection; bare ids or rich records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<SampleInput>,
    /// When explicitly `false`, an empty selection is not replaced by the
    /// whole cohort on setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_all_samples_on_init: Option<bool>,
    /// Samples whose calls a full load fetches when none are known visible.
    #[serde(default = "default_initial_sample_cap")]
    pub initial_sample_cap: usize,
    /// Pixel width of one variant column.
    #[serde(default = "default_snp_width")]
    pub snp_width: u32,
    /// Pixels of the viewport taken by labels and margins.
    #[serde(default = "default_chrome_width")]
    pub chrome_width: u32,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl ViewerConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            samples: None,
            show_all_samples_on_init: None,
            initial_sample_cap: INITIAL_SAMPLE_CAP,
            snp_width: DEFAULT_SNP_WIDTH,
            chrome_width: DEFAULT_CHROME_WIDTH,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            request_timeout_secs: None,
        }
    }

    /// Read a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ViewError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: ViewerConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ViewError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ViewError::InvalidConfig(
                "apiBaseUrl must not be empty".to_string(),
            ));
        }
        if self.snp_width == 0 {
            return Err(ViewError::InvalidSnpWidth);
        }
        if self.initial_sample_cap == 0 {
            return Err(ViewError::InvalidConfig(
                "initialSampleCap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether setup may default an empty selection to the whole cohort.
    pub fn show_all_samples_on_init(&self) -> bool {
        self.show_all_samples_on_init != Some(false)
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"apiBaseUrl": "http://example.org/api"}"#).unwrap();
        assert_eq!(config.initial_sample_cap, 30);
        assert_eq!(config.snp_width, 20);
        assert_eq!(config.chrome_width, 200);
        assert_eq!(config.viewport_width, 1000);
        assert!(config.samples.is_none());
        assert!(config.show_all_samples_on_init());
    }

    #[test]
    fn test_show_all_samples_only_suppressed_by_false() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{"apiBaseUrl": "x", "showAllSamplesOnInit": false, "samples": [{"id": "S1"}]}"#,
        )
        .unwrap();
        assert!(!config.show_all_samples_on_init());
        assert!(matches!(config.samples, Some(SampleInput::Records(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"apiBaseUrl": "http://localhost:5000", "snpWidth": 25, "initialSampleCap": 10}}"#
        )
        .unwrap();
        let config = ViewerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.snp_width, 25);
        assert_eq!(config.initial_sample_cap, 10);
    }

    #[test]
    fn test_validate() {
        let mut config = ViewerConfig::new(" ");
        assert!(matches!(config.validate(), Err(ViewError::InvalidConfig(_))));
        config.api_base_url = "http://localhost".to_string();
        config.snp_width = 0;
        assert!(matches!(config.validate(), Err(ViewError::InvalidSnpWidth)));
    }
}
