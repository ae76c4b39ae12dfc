//! Writes the final artifacts for a completed [`RunOutcome`] via
//! `aiperf-export`, gated by the run's configured `ExportLevel`.

use aiperf_core::error::AIPerfResult;
use aiperf_export::{write_csv, write_inputs, write_summary, ProfileSummary};

use crate::controller::{submitted_turns, Controller, RunOutcome};

/// Writes `profile_export_aiperf.json`, `profile_export_aiperf.csv`, and
/// (when the export level isn't `Summary`) `inputs.json` to the run's
/// configured artifact directory. Per-record JSONL artifacts are already
/// on disk by the time this runs - `run_profile` writes them as it goes.
pub async fn write_artifacts(controller: &Controller, outcome: &RunOutcome, started_at_ns: u64, ended_at_ns: u64) -> AIPerfResult<()> {
    let artifact_dir = &controller.user_config().output.artifact_dir;

    let summary = ProfileSummary {
        results: &outcome.results,
        config: controller.user_config(),
        error_summary: &outcome.results.error_summary,
        started_at_ns,
        ended_at_ns,
    };
    write_summary(artifact_dir, &summary).await?;
    write_csv(artifact_dir, &outcome.results).await?;

    if controller.user_config().output.export_level != aiperf_core::enums::ExportLevel::Summary {
        let endpoint = &controller.user_config().endpoint;
        let extractor = aiperf_parsers::for_endpoint(endpoint.endpoint_type, None);
        let inputs = submitted_turns(controller.conversations(), extractor.as_ref(), &endpoint.model, endpoint.streaming);
        write_inputs(artifact_dir, &inputs).await?;
    }

    Ok(())
}
