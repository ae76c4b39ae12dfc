//! Writes `profile_export_aiperf.json`: the full `ProfileResults` of a run
//! alongside the `UserConfig` that produced it, the error summary, and the
//! wall-clock timestamps the run started and ended at.

use std::path::Path;

use serde::Serialize;

use aiperf_core::config::UserConfig;
use aiperf_core::error::{AIPerfError, AIPerfResult};
use aiperf_core::models::{ErrorSummaryEntry, ProfileResults};

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary<'a> {
    pub results: &'a ProfileResults,
    pub config: &'a UserConfig,
    pub error_summary: &'a [ErrorSummaryEntry],
    pub started_at_ns: u64,
    pub ended_at_ns: u64,
}

/// Writes `profile_export_aiperf.json` to `artifact_dir`, pretty-printed.
pub async fn write_summary(artifact_dir: &Path, summary: &ProfileSummary<'_>) -> AIPerfResult<()> {
    let path = artifact_dir.join("profile_export_aiperf.json");
    let body = serde_json::to_vec_pretty(summary).map_err(|e| AIPerfError::configuration(format!("failed to serialize profile summary: {e}")))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AIPerfError::comms(format!("failed to create artifact dir {}: {e}", parent.display())))?;
    }
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| AIPerfError::comms(format!("failed to write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), "wrote profile summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_a_readable_json_file() {
        let dir = std::env::temp_dir().join(format!("aiperf-summary-test-{}", std::process::id()));
        let _ = tokio::fs::remove_dir_all(&dir).await;

        let results = ProfileResults::default();
        let config = UserConfig::default();
        let summary = ProfileSummary {
            results: &results,
            config: &config,
            error_summary: &[],
            started_at_ns: 1,
            ended_at_ns: 2,
        };

        write_summary(&dir, &summary).await.unwrap();
        let contents = tokio::fs::read_to_string(dir.join("profile_export_aiperf.json")).await.unwrap();
        assert!(contents.contains("\"request_count\""));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
