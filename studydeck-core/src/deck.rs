use crate::{
    deck_stats, filter_due, Card, CardId, CardStore, CoreError, DeckStats, NewCard, Rating,
    ScheduleInfo, DEFAULT_LEARNING_STEPS,
};
use chrono::{DateTime, Utc};

/// The learner's card collection, in insertion order.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    learning_steps: Vec<u32>,
}

impl Default for Deck {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            learning_steps: DEFAULT_LEARNING_STEPS.to_vec(),
        }
    }
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            ..Self::default()
        }
    }

    /// Ladder given to cards added from now on. Existing cards keep theirs.
    pub fn with_learning_steps(mut self, steps: Vec<u32>) -> Result<Self, CoreError> {
        if steps.is_empty() {
            return Err(CoreError::Invalid("learning steps must not be empty"));
        }
        self.learning_steps = steps;
        Ok(self)
    }

    /// Loads the card list. The store only holds cards, so the deck-level
    /// ladder comes back as the default; chain [`Deck::with_learning_steps`]
    /// to restore a custom one. Loaded cards keep their own ladders.
    pub async fn load<S: CardStore + ?Sized>(store: &S) -> Result<Self, CoreError> {
        let cards = store.load_cards().await?;
        log::info!("loaded {} cards", cards.len());
        Ok(Self::from_cards(cards))
    }

    pub async fn save<S: CardStore + ?Sized>(&self, store: &S) -> Result<(), CoreError> {
        store.save_cards(&self.cards).await?;
        log::debug!("saved {} cards", self.cards.len());
        Ok(())
    }

    pub fn add_card(&mut self, record: NewCard, now: DateTime<Utc>) -> CardId {
        let mut card = Card::new(record.question, record.answer, now);
        card.learning_steps = self.learning_steps.clone();
        let id = card.id;
        self.cards.push(card);
        id
    }

    /// Appends one new card per record. Duplicates are not detected.
    pub fn add_cards<I>(&mut self, records: I, now: DateTime<Utc>) -> Vec<CardId>
    where
        I: IntoIterator<Item = NewCard>,
    {
        records.into_iter().map(|r| self.add_card(r, now)).collect()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn due_cards(&self, now: DateTime<Utc>) -> Vec<&Card> {
        filter_due(&self.cards, now)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> DeckStats {
        deck_stats(&self.cards, now)
    }

    pub fn answer(
        &mut self,
        id: CardId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<ScheduleInfo, CoreError> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CoreError::NotFound("card"))?;
        Ok(card.answer(rating, now))
    }

    pub fn remove(&mut self, id: CardId) -> Result<Card, CoreError> {
        let pos = self
            .cards
            .iter()
            .position(|c| c.id == id)
            .ok_or(CoreError::NotFound("card"))?;
        Ok(self.cards.remove(pos))
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}
