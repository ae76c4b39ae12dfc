//! Wire-level data model shared by every AIPerf service.
//!
//! These types cross the bus boundary as JSON, so every public field is
//! `serde`-visible and every type derives `Serialize`/`Deserialize`.

mod conversation;
mod credit;
mod message;
mod metric;
mod record;

pub use conversation::{Audio, Conversation, Image, Text, Turn};
pub use credit::{CreditDrop, CreditPhaseStats, CreditReturn};
pub use message::{Message, MessagePayload, ProgressReport, RealtimeMetricSnapshot};
pub use metric::{ErrorDetails, ErrorSummaryEntry, MetricRecord, MetricResult, ProfileResults};
pub use record::{ParsedResponse, ParsedResponseRecord, RequestRecord};
