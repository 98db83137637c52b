use crate::{Card, CoreError};
use async_trait::async_trait;

pub mod memory;

pub use memory::MemoryStore;

/// Where a deck's card list is persisted. Implementations hand back records
/// exactly as they were saved; errors surface as [`CoreError::Storage`].
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn load_cards(&self) -> Result<Vec<Card>, CoreError>;
    async fn save_cards(&self, cards: &[Card]) -> Result<(), CoreError>;
}
