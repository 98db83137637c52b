use crate::{Card, CardState};
use chrono::{DateTime, Utc};

/// Case-insensitive match on question or answer. A blank query matches every card.
pub fn matches_text(card: &Card, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    q.is_empty()
        || card.question.to_lowercase().contains(&q)
        || card.answer.to_lowercase().contains(&q)
}

pub fn filter_by_text<'a>(cards: &'a [Card], query: &str) -> Vec<&'a Card> {
    cards.iter().filter(|c| matches_text(c, query)).collect()
}

pub fn filter_by_state(cards: &[Card], want: CardState) -> Vec<&Card> {
    cards.iter().filter(|c| c.state() == want).collect()
}

/// Due cards, most overdue first. Cards due at the same instant keep their
/// original relative order.
pub fn filter_due(cards: &[Card], now: DateTime<Utc>) -> Vec<&Card> {
    let mut due: Vec<&Card> = cards.iter().filter(|c| c.is_due(now)).collect();
    due.sort_by_key(|c| c.next_review());
    due
}
