use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::CoreError;

pub type CardId = Uuid;

pub const STARTING_FACTOR: f64 = 2.5;
pub const MIN_FACTOR: f64 = 1.3;
pub const DEFAULT_LEARNING_STEPS: [u32; 2] = [1, 10];

/// Scheduling phase of a card. The integer codes are part of the persisted format.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum CardState {
    New = 0,
    Learning = 1,
    Review = 2,
    Relearning = 3,
}

impl CardState {
    pub fn label(&self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
        }
    }
}

impl TryFrom<u8> for CardState {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CardState::New),
            1 => Ok(CardState::Learning),
            2 => Ok(CardState::Review),
            3 => Ok(CardState::Relearning),
            other => Err(CoreError::InvalidState(other)),
        }
    }
}

impl From<CardState> for u8 {
    fn from(s: CardState) -> u8 {
        s as u8
    }
}

/// Learner's recall rating, one per answer button.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(CoreError::InvalidRating(other)),
        }
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r as u8
    }
}

/// Question/answer pair handed in by whatever originates cards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCard {
    pub question: String,
    pub answer: String,
}

impl NewCard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// One fact to be learned. Scheduling fields are read-only outside the crate;
/// they change only through [`Card::answer`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub question: String,
    pub answer: String,

    pub(crate) state: CardState,
    pub(crate) interval: u32,
    pub(crate) ease_factor: f64,
    pub(crate) repetitions: u32,
    pub(crate) lapses: u32,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub(crate) last_reviewed: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) next_review: DateTime<Utc>,
    #[serde(default = "default_learning_steps", deserialize_with = "steps_or_default")]
    pub(crate) learning_steps: Vec<u32>,
    #[serde(default, deserialize_with = "step_or_zero")]
    pub(crate) current_learning_step: usize,
}

impl Card {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            answer: answer.into(),
            state: CardState::New,
            interval: 0,
            ease_factor: STARTING_FACTOR,
            repetitions: 0,
            lapses: 0,
            last_reviewed: None,
            next_review: now.trunc_subsecs(3),
            learning_steps: default_learning_steps(),
            current_learning_step: 0,
        }
    }

    pub fn with_id(mut self, id: CardId) -> Self {
        self.id = id;
        self
    }

    /// Replaces the learning ladder. Only valid before the first answer.
    pub fn with_learning_steps(mut self, steps: Vec<u32>) -> Result<Self, CoreError> {
        if steps.is_empty() {
            return Err(CoreError::Invalid("learning steps must not be empty"));
        }
        if self.state != CardState::New {
            return Err(CoreError::Invalid("learning steps can only be set on a new card"));
        }
        self.learning_steps = steps;
        self.current_learning_step = 0;
        Ok(self)
    }

    pub fn state(&self) -> CardState {
        self.state
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn lapses(&self) -> u32 {
        self.lapses
    }

    pub fn last_reviewed(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed
    }

    pub fn next_review(&self) -> DateTime<Utc> {
        self.next_review
    }

    pub fn learning_steps(&self) -> &[u32] {
        &self.learning_steps
    }

    pub fn current_learning_step(&self) -> usize {
        self.current_learning_step
    }

    pub fn is_new(&self) -> bool {
        self.state == CardState::New
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review
    }
}

fn default_learning_steps() -> Vec<u32> {
    DEFAULT_LEARNING_STEPS.to_vec()
}

// Older records carry no ladder, or null; an empty ladder is treated the same way.
fn steps_or_default<'de, D>(de: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let steps = Option::<Vec<u32>>::deserialize(de)?;
    Ok(steps.filter(|s| !s.is_empty()).unwrap_or_else(default_learning_steps))
}

fn step_or_zero<'de, D>(de: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(de)?.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn new_card_defaults() {
        let c = Card::new("q", "a", at(1_000));
        assert_eq!(c.state(), CardState::New);
        assert_eq!(c.interval(), 0);
        assert_eq!(c.ease_factor(), STARTING_FACTOR);
        assert_eq!(c.learning_steps(), &[1, 10]);
        assert_eq!(c.current_learning_step(), 0);
        assert_eq!(c.next_review(), at(1_000));
        assert!(c.last_reviewed().is_none());
        assert!(c.is_due(at(1_000)));
        assert!(!c.is_due(at(999)));
        assert!(c.is_new());

        let id = Uuid::new_v4();
        assert_eq!(Card::new("q", "a", at(0)).with_id(id).id, id);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(u8::from(CardState::Relearning), 3);
        assert_eq!(u8::from(Rating::Easy), 4);
        assert_eq!(Rating::try_from(1u8).unwrap(), Rating::Again);
        assert!(matches!(Rating::try_from(0u8), Err(CoreError::InvalidRating(0))));
        assert!(matches!(Rating::try_from(5u8), Err(CoreError::InvalidRating(5))));
        assert!(matches!(CardState::try_from(4u8), Err(CoreError::InvalidState(4))));
    }

    #[test]
    fn record_uses_camel_case_and_integer_codes() {
        let c = Card::new("q", "a", at(5_000));
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["state"], json!(0));
        assert_eq!(v["easeFactor"], json!(2.5));
        assert_eq!(v["nextReview"], json!(5_000));
        assert_eq!(v["lastReviewed"], json!(null));
        assert_eq!(v["learningSteps"], json!([1, 10]));
        assert_eq!(v["currentLearningStep"], json!(0));
    }

    #[test]
    fn missing_ladder_fields_default() {
        let v = json!({
            "id": Uuid::new_v4(),
            "question": "q",
            "answer": "a",
            "state": 2,
            "interval": 6,
            "easeFactor": 2.36,
            "repetitions": 3,
            "lapses": 1,
            "lastReviewed": 1_000,
            "nextReview": 2_000
        });
        let c: Card = serde_json::from_value(v).unwrap();
        assert_eq!(c.state(), CardState::Review);
        assert_eq!(c.learning_steps(), &[1, 10]);
        assert_eq!(c.current_learning_step(), 0);
        assert_eq!(c.last_reviewed(), Some(at(1_000)));
    }

    #[test]
    fn unknown_state_code_is_rejected() {
        let v = json!({
            "id": Uuid::new_v4(),
            "question": "q",
            "answer": "a",
            "state": 7,
            "interval": 0,
            "easeFactor": 2.5,
            "repetitions": 0,
            "lapses": 0,
            "lastReviewed": null,
            "nextReview": 0
        });
        assert!(serde_json::from_value::<Card>(v).is_err());
    }

    #[test]
    fn empty_ladder_rejected() {
        let c = Card::new("q", "a", at(0));
        assert!(matches!(
            c.with_learning_steps(vec![]),
            Err(CoreError::Invalid(_))
        ));
    }
}
