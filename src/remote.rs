use std::time::Duration;

use anyhow::{ensure, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::analysis::ScoreResult;

/// Readiness report of the trained-model service, as served by `/api/ml/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlStatus {
    pub trained: bool,
    pub models_count: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl MlStatus {
    /// Reported when no trained-model service answers; the heuristic is in use.
    pub fn fallback() -> Self {
        Self {
            trained: false,
            models_count: 0,
            fallback: true,
        }
    }
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    text: &'a str,
}

/// Client for an external trained-model service speaking the same JSON contract.
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    client: Client,
    base_url: String,
}

impl RemoteClassifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build ML service client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Asks the service to score `text`. Any non-2xx status or out-of-range confidence
    /// is an error.
    pub async fn analyze(&self, text: &str) -> Result<ScoreResult> {
        let url = format!("{}/api/ml/analyze", self.base_url);
        let result = self
            .client
            .post(&url)
            .json(&AnalyzeBody { text })
            .send()
            .await
            .context("ML service unreachable")?
            .error_for_status()
            .context("ML service rejected the article")?
            .json::<ScoreResult>()
            .await
            .context("ML service returned an unexpected body")?;
        check_confidences(&result)?;
        Ok(result)
    }

    pub async fn status(&self) -> Result<MlStatus> {
        let url = format!("{}/api/ml/status", self.base_url);
        let status = self
            .client
            .get(&url)
            .send()
            .await
            .context("ML service unreachable")?
            .error_for_status()?
            .json::<MlStatus>()
            .await
            .context("ML service returned an unexpected status body")?;
        Ok(status)
    }
}

/// Confidences are percentages; a trained-model service must stay within `[0, 100]`.
fn check_confidences(result: &ScoreResult) -> Result<()> {
    ensure!(
        result.confidence <= 100,
        "ML service confidence {} is out of range",
        result.confidence
    );
    for model in &result.models {
        ensure!(
            model.confidence <= 100,
            "ML service confidence {} for {:?} is out of range",
            model.confidence,
            model.name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ModelName, ModelResult, Prediction, Verdict};

    #[test]
    fn fallback_status_shape() {
        let json = serde_json::to_value(MlStatus::fallback()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "trained": false, "models_count": 0, "fallback": true })
        );
    }

    #[test]
    fn remote_status_omits_fallback_flag() {
        let status: MlStatus =
            serde_json::from_str(r#"{ "trained": true, "models_count": 4 }"#).unwrap();
        assert!(!status.fallback);
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("fallback").is_none());
    }

    fn remote_result(confidence: u8, model_confidences: [u8; 4]) -> ScoreResult {
        ScoreResult {
            verdict: Verdict::Fake,
            confidence,
            models: std::array::from_fn(|i| ModelResult {
                name: ModelName::ALL[i],
                prediction: Prediction::Fake,
                confidence: model_confidences[i],
            }),
        }
    }

    #[test]
    fn confidences_must_be_percentages() {
        assert!(check_confidences(&remote_result(100, [0, 55, 100, 97])).is_ok());
        assert!(check_confidences(&remote_result(250, [90, 90, 90, 90])).is_err());
        assert!(check_confidences(&remote_result(90, [90, 200, 90, 90])).is_err());
        assert!(check_confidences(&remote_result(90, [90, 90, 90, 255])).is_err());
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let remote = RemoteClassifier::new("http://localhost:5001/", Duration::from_secs(1)).unwrap();
        assert_eq!(remote.base_url(), "http://localhost:5001");
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        // port 9 (discard) is closed on test hosts
        let remote = RemoteClassifier::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(remote.analyze("some article text").await.is_err());
        assert!(remote.status().await.is_err());
    }
}
