use crate::{Card, CardState};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct DeckStats {
    pub total: usize,
    pub due: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub relearning: usize,
}

impl DeckStats {
    pub fn record(&mut self, card: &Card, now: DateTime<Utc>) {
        self.total += 1;
        if card.is_due(now) {
            self.due += 1;
        }
        match card.state() {
            CardState::New => self.new += 1,
            CardState::Learning => self.learning += 1,
            CardState::Review => self.review += 1,
            CardState::Relearning => self.relearning += 1,
        }
    }
}

pub fn deck_stats(cards: &[Card], now: DateTime<Utc>) -> DeckStats {
    let mut stats = DeckStats::default();
    for c in cards {
        stats.record(c, now);
    }
    stats
}
