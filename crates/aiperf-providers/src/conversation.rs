//! A reference, in-memory `ConversationProvider`: enough to drive and test
//! the rest of the pipeline, not a full dataset composer (synthetic
//! prompt/image/audio generation and custom dataset loaders are explicitly
//! out of scope).

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::Mutex;

use aiperf_core::error::AIPerfResult;
use aiperf_core::models::Conversation;
use aiperf_core::providers::ConversationProvider;

/// How `StaticConversationProvider::get` maps a scheduler-issued index onto
/// the backing conversation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// `index % len()`, in the order conversations were supplied.
    Sequential,
    /// A fixed random permutation of the list, computed once at
    /// construction and then indexed sequentially, so the full set is
    /// covered exactly once per cycle through the dataset.
    Shuffled,
    /// A uniformly random conversation on every call, ignoring `index`.
    Random,
}

pub struct StaticConversationProvider {
    conversations: Vec<Conversation>,
    order: Vec<usize>,
    mode: SelectionMode,
    rng: Mutex<StdRng>,
}

impl StaticConversationProvider {
    pub fn new(conversations: Vec<Conversation>, mode: SelectionMode, seed: Option<u64>) -> Self {
        let mut rng = seed.map(StdRng::seed_from_u64).unwrap_or_else(StdRng::from_entropy);
        let mut order: Vec<usize> = (0..conversations.len()).collect();
        if mode == SelectionMode::Shuffled {
            order.shuffle(&mut rng);
        }
        Self {
            conversations,
            order,
            mode,
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl ConversationProvider for StaticConversationProvider {
    fn len(&self) -> usize {
        self.conversations.len()
    }

    async fn get(&self, index: usize) -> AIPerfResult<Conversation> {
        if self.conversations.is_empty() {
            return Err(aiperf_core::error::AIPerfError::configuration("conversation provider has no conversations loaded"));
        }

        let resolved = match self.mode {
            SelectionMode::Sequential => index % self.conversations.len(),
            SelectionMode::Shuffled => self.order[index % self.order.len()],
            SelectionMode::Random => {
                let mut rng = self.rng.lock().await;
                (0..self.conversations.len()).collect::<Vec<_>>().choose(&mut *rng).copied().unwrap_or(0)
            }
        };

        Ok(self.conversations[resolved].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::models::Turn;

    fn conversations(n: usize) -> Vec<Conversation> {
        (0..n)
            .map(|i| Conversation {
                session_id: format!("session_{i}"),
                turns: vec![Turn::default()],
            })
            .collect()
    }

    #[tokio::test]
    async fn sequential_mode_wraps_modulo_len() {
        let provider = StaticConversationProvider::new(conversations(3), SelectionMode::Sequential, None);
        assert_eq!(provider.get(0).await.unwrap().session_id, "session_0");
        assert_eq!(provider.get(3).await.unwrap().session_id, "session_0");
        assert_eq!(provider.get(4).await.unwrap().session_id, "session_1");
    }

    #[tokio::test]
    async fn shuffled_mode_is_deterministic_for_a_fixed_seed() {
        let a = StaticConversationProvider::new(conversations(5), SelectionMode::Shuffled, Some(7));
        let b = StaticConversationProvider::new(conversations(5), SelectionMode::Shuffled, Some(7));
        for i in 0..5 {
            assert_eq!(a.get(i).await.unwrap().session_id, b.get(i).await.unwrap().session_id);
        }
    }

    #[tokio::test]
    async fn empty_provider_errors_instead_of_panicking() {
        let provider = StaticConversationProvider::new(Vec::new(), SelectionMode::Sequential, None);
        assert!(provider.get(0).await.is_err());
    }
}
