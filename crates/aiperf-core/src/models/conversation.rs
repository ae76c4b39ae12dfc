//! Dataset entities: a [`Conversation`] is an ordered list of [`Turn`]s, each
//! carrying zero or more modality payloads. Mirrors `aiperf.common.models` in
//! the reference implementation's dataset module.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// A single turn of a conversation. `delay_ns` is the inter-turn delay to
/// honor before issuing this turn's request, relative to the previous turn's
/// response; the first turn's delay is always ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Turn {
    /// Timestamp of the turn in milliseconds, when replaying a trace.
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub texts: Vec<Text>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub audios: Vec<Audio>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub delay_ns: Option<u64>,
}

/// A named text field. `contents` is a list rather than a scalar so a single
/// turn can carry a batched text payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    pub contents: Vec<String>,
}

/// A named image field, batched the same way as [`Text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Base64-encoded payloads, or `data:` URLs, depending on the provider.
    pub contents: Vec<String>,
}

/// A named audio field, batched the same way as [`Text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audio {
    pub contents: Vec<String>,
}
