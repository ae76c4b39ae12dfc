//! Writes `inputs.json`: every conversation turn actually submitted to the
//! endpoint during a run, keyed by session id. Exists so a run can be
//! reproduced byte-for-byte: identical config plus identical random seed
//! must produce an identical `inputs.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use aiperf_core::error::{AIPerfError, AIPerfResult};
use aiperf_core::models::Conversation;

/// One submitted request body, in the order turns were issued within a
/// session.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedTurn {
    pub turn_index: usize,
    pub payload: serde_json::Value,
}

/// `inputs.json`'s top-level shape: session id to the ordered list of turns
/// submitted under it. A `BTreeMap` so the file is written in a
/// deterministic session order regardless of completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputsRecord {
    pub sessions: BTreeMap<String, Vec<SubmittedTurn>>,
}

impl InputsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, conversation: &Conversation, turn_index: usize, payload: serde_json::Value) {
        self.sessions.entry(conversation.session_id.clone()).or_default().push(SubmittedTurn { turn_index, payload });
    }
}

/// Writes `inputs.json` to `artifact_dir`, pretty-printed.
pub async fn write_inputs(artifact_dir: &Path, inputs: &InputsRecord) -> AIPerfResult<()> {
    let path = artifact_dir.join("inputs.json");
    let body = serde_json::to_vec_pretty(inputs).map_err(|e| AIPerfError::configuration(format!("failed to serialize inputs: {e}")))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AIPerfError::comms(format!("failed to create artifact dir {}: {e}", parent.display())))?;
    }
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| AIPerfError::comms(format!("failed to write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), turns = inputs.sessions.values().map(Vec::len).sum::<usize>(), "wrote inputs.json");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_turns_by_session_in_submission_order() {
        let mut inputs = InputsRecord::new();
        let conversation = Conversation {
            session_id: "session_0".to_string(),
            turns: Vec::new(),
        };
        inputs.record(&conversation, 0, json!({"prompt": "hi"}));
        inputs.record(&conversation, 1, json!({"prompt": "again"}));

        let turns = inputs.sessions.get("session_0").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn_index, 0);
        assert_eq!(turns[1].turn_index, 1);
    }

    #[tokio::test]
    async fn writes_a_readable_json_file() {
        let dir = std::env::temp_dir().join(format!("aiperf-inputs-test-{}", std::process::id()));
        let _ = tokio::fs::remove_dir_all(&dir).await;

        let mut inputs = InputsRecord::new();
        let conversation = Conversation {
            session_id: "session_0".to_string(),
            turns: Vec::new(),
        };
        inputs.record(&conversation, 0, json!({"prompt": "hi"}));

        write_inputs(&dir, &inputs).await.unwrap();
        let contents = tokio::fs::read_to_string(dir.join("inputs.json")).await.unwrap();
        assert!(contents.contains("session_0"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
