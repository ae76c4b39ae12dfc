//! Builds the placeholder conversations a run falls back to when no input
//! dataset file is configured. Intentionally minimal: fixed-length
//! whitespace-token placeholder text, not a distribution-sampled synthetic
//! dataset composer (prompt/image/audio/video generation is explicitly out
//! of scope) - just enough to drive [`crate::conversation::StaticConversationProvider`]
//! end to end.

use aiperf_core::config::DatasetSettings;
use aiperf_core::models::{Conversation, Text, Turn};

fn placeholder_text(word_count: u32) -> String {
    std::iter::repeat("lorem").take(word_count.max(1) as usize).collect::<Vec<_>>().join(" ")
}

/// Builds `settings.synthetic_conversations` conversations, each with
/// `settings.synthetic_turns_per_conversation` turns of placeholder text
/// sized to `synthetic_input_tokens_mean` words (the stddev fields are
/// intentionally ignored here - a fixed-length placeholder needs no
/// distribution).
pub fn build_synthetic_conversations(settings: &DatasetSettings) -> Vec<Conversation> {
    (0..settings.synthetic_conversations)
        .map(|session_index| {
            let turns = (0..settings.synthetic_turns_per_conversation)
                .map(|_| Turn {
                    texts: vec![Text {
                        contents: vec![placeholder_text(settings.synthetic_input_tokens_mean)],
                    }],
                    role: Some("user".to_string()),
                    max_tokens: Some(settings.synthetic_output_tokens_mean),
                    ..Default::default()
                })
                .collect();
            Conversation {
                session_id: format!("session_{session_index}"),
                turns,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_configured_shape() {
        let settings = DatasetSettings {
            synthetic_conversations: 3,
            synthetic_turns_per_conversation: 2,
            synthetic_input_tokens_mean: 5,
            ..Default::default()
        };
        let conversations = build_synthetic_conversations(&settings);
        assert_eq!(conversations.len(), 3);
        assert_eq!(conversations[0].turns.len(), 2);
        assert_eq!(conversations[0].turns[0].texts[0].contents[0].split_whitespace().count(), 5);
        assert_eq!(conversations[0].session_id, "session_0");
    }
}
