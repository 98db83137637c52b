use crate::{Card, CoreError};
use async_trait::async_trait;
use parking_lot::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    cards: RwLock<Vec<Card>>,
    saves: RwLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self {
            cards: RwLock::new(cards),
            saves: RwLock::new(0),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }
}

#[async_trait]
impl crate::repo::CardStore for MemoryStore {
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError> {
        Ok(self.cards.read().clone())
    }

    async fn save_cards(&self, cards: &[Card]) -> Result<(), CoreError> {
        *self.cards.write() = cards.to_vec();
        *self.saves.write() += 1;
        Ok(())
    }
}
