//! [`HttpSource`]: the [`DataSource`] of a live backend, over `reqwest`.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    analysis::{AnalysisRequest, BlastRequest, BlastResponse},
    cache::CallsPayload,
    config::ViewerConfig,
    error::ViewError,
    metadata::{DatasetMetadata, GenesTable},
    traits::DataSource,
    window::{VariantWindow, WindowRequest},
};

/// The body the backend sends, with a 2xx status, when it cannot serve a
/// window: `{"success": false, "status": "error", "message": ...}`.
#[derive(Debug, Deserialize)]
struct ServerFailure {
    #[allow(dead_code)]
    status: FailureStatus,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FailureStatus {
    Error,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WindowReply<T> {
    Failed(ServerFailure),
    Served(T),
}

impl<T> WindowReply<T> {
    fn into_result(self) -> Result<T, ViewError> {
        match self {
            WindowReply::Served(value) => Ok(value),
            WindowReply::Failed(failure) => Err(ViewError::WindowData(failure.message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenesReply {
    genes: GenesField,
}

/// `/genes` answers `{"genes": false}` for datasets without annotation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenesField {
    Table(GenesTable),
    Absent(bool),
}

/// A backend reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self, ViewError> {
        Self::build(base_url, None)
    }

    /// A source for `config.api_base_url`, honouring its request timeout.
    pub fn from_config(config: &ViewerConfig) -> Result<Self, ViewError> {
        Self::build(
            &config.api_base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> Result<Self, ViewError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ViewError::Network {
            url: base_url.to_string(),
            message: format!("could not create HTTP client: {}", e),
        })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The full URL of an endpoint.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ViewError> {
        let url = self.endpoint(path);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(&url, e))?;
        decode(url, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ViewError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(&url, e))?;
        decode(url, response).await
    }
}

fn network_error(url: &str, error: reqwest::Error) -> ViewError {
    ViewError::Network {
        url: url.to_string(),
        message: error.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<T, ViewError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ViewError::Network {
            url,
            message: format!("HTTP {}", status),
        });
    }
    response.json::<T>().await.map_err(|e| ViewError::Network {
        message: format!("failed to decode response: {}", e),
        url,
    })
}

impl DataSource for HttpSource {
    async fn configuration(&self) -> Result<DatasetMetadata, ViewError> {
        self.get_json("configuration").await
    }

    async fn genes(&self) -> Result<Option<GenesTable>, ViewError> {
        let reply: GenesReply = self.get_json("genes").await?;
        Ok(match reply.genes {
            GenesField::Table(table) => Some(table),
            GenesField::Absent(_) => None,
        })
    }

    async fn variants(&self, request: &WindowRequest) -> Result<VariantWindow, ViewError> {
        let reply: WindowReply<VariantWindow> = self.post_json("variants", request).await?;
        reply.into_result()
    }

    async fn variant_calls(&self, request: &WindowRequest) -> Result<CallsPayload, ViewError> {
        let reply: WindowReply<CallsPayload> = self.post_json("variant_calls", request).await?;
        reply.into_result()
    }

    async fn vcf_export_check(&self, request: &AnalysisRequest) -> Result<Value, ViewError> {
        self.post_json("vcf_export_check", request).await
    }

    async fn genomic_window_summary(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Value, ViewError> {
        self.post_json("genomic_window_summary", request).await
    }

    async fn pca(&self, request: &AnalysisRequest) -> Result<Value, ViewError> {
        self.post_json("pca", request).await
    }

    async fn blast(&self, request: &BlastRequest) -> Result<BlastResponse, ViewError> {
        self.post_json("blast", request).await
    }
}
