//! SM-2 family scheduler.
//!
//! New and learning cards climb a ladder of minute-scale steps before
//! graduating to day-scale review intervals. A failed review (a lapse) sends
//! the card back down a relearning ladder with a halved interval and a lower
//! ease factor.

use crate::{Card, CardState, CoreError, Rating, MIN_FACTOR};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;

pub const FACTOR_MODIFIER: f64 = 0.15;
pub const EASY_BONUS: f64 = 1.3;
pub const HARD_MULTIPLIER: f64 = 1.2;
pub const LAPSE_PENALTY: f64 = 0.2;
pub const LAPSE_INTERVAL_FACTOR: f64 = 0.5;
pub const GRADUATING_INTERVAL: u32 = 1;
pub const EASY_INTERVAL: u32 = 4;
/// Upper bound on a review interval, in days (100 years).
pub const MAX_INTERVAL: u32 = 36_500;

/// Summary of a computed schedule, for display after an answer.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfo {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_review: DateTime<Utc>,
    pub interval: u32,
    pub time_string: String,
    pub state: CardState,
    pub repetitions: u32,
    pub lapses: u32,
    /// Rounded to two decimals.
    pub ease_factor: f64,
}

fn lower_ease(ef: f64, by: f64) -> f64 {
    (ef - by).max(MIN_FACTOR)
}

fn grow(interval: u32, multiplier: f64) -> u32 {
    (interval as f64 * multiplier).ceil().min(MAX_INTERVAL as f64) as u32
}

/// `now + by`, saturating at the latest representable instant.
fn later(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    now.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Short display of a delay: minutes under an hour, hours under a day, days
/// otherwise. Any remainder rounds up to the next unit.
pub fn format_delay(delay: Duration) -> String {
    const MINUTE: i64 = 60 * 1000;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let ms = delay.num_milliseconds();
    let ceil_div = |unit: i64| ms.saturating_add(unit - 1).div_euclid(unit);
    if ms < HOUR {
        format!("{} min", ceil_div(MINUTE))
    } else if ms < DAY {
        format!("{} hrs", ceil_div(HOUR))
    } else {
        format!("{} days", ceil_div(DAY))
    }
}

impl Card {
    /// Applies `rating` at `now`, moving the card to its next scheduling state.
    pub fn answer(&mut self, rating: Rating, now: DateTime<Utc>) -> ScheduleInfo {
        let now = now.trunc_subsecs(3);
        let from = self.state;
        self.last_reviewed = Some(now);

        match self.state {
            CardState::New | CardState::Learning => self.answer_learning(rating, now),
            CardState::Review => self.answer_review(rating, now),
            CardState::Relearning => self.answer_relearning(rating, now),
        }
        // Records from older clients may carry an index past the ladder's end.
        if self.current_learning_step >= self.learning_steps.len() {
            self.current_learning_step = 0;
        }

        log::debug!(
            "card {} answered {}: {} -> {}, interval={}d ease={:.2}",
            self.id,
            rating.label(),
            from.label(),
            self.state.label(),
            self.interval,
            self.ease_factor
        );

        self.schedule_info(now)
    }

    /// Like [`Card::answer`] but takes a raw rating code; codes outside 1..=4
    /// are rejected without touching the card.
    pub fn answer_code(&mut self, code: u8, now: DateTime<Utc>) -> Result<ScheduleInfo, CoreError> {
        let rating = Rating::try_from(code)?;
        Ok(self.answer(rating, now))
    }

    pub fn schedule_info(&self, now: DateTime<Utc>) -> ScheduleInfo {
        ScheduleInfo {
            next_review: self.next_review,
            interval: self.interval,
            time_string: format_delay(self.next_review - now),
            state: self.state,
            repetitions: self.repetitions,
            lapses: self.lapses,
            ease_factor: (self.ease_factor * 100.0).round() / 100.0,
        }
    }

    fn answer_learning(&mut self, rating: Rating, now: DateTime<Utc>) {
        match rating {
            Rating::Again => {
                self.restart_ladder(now);
                self.state = CardState::Learning;
            }
            // Hard and Good advance the ladder identically.
            Rating::Hard | Rating::Good => {
                if self.advance_ladder(now) {
                    self.graduate(GRADUATING_INTERVAL, now);
                } else {
                    self.state = CardState::Learning;
                }
            }
            Rating::Easy => self.graduate(EASY_INTERVAL, now),
        }
    }

    fn answer_review(&mut self, rating: Rating, now: DateTime<Utc>) {
        if rating == Rating::Again {
            self.state = CardState::Relearning;
            self.lapses += 1;
            self.interval = ((self.interval as f64 * LAPSE_INTERVAL_FACTOR).floor() as u32).max(1);
            self.ease_factor = lower_ease(self.ease_factor, LAPSE_PENALTY);
            self.restart_ladder(now);
            return;
        }

        self.repetitions += 1;
        self.interval = match rating {
            Rating::Hard => {
                self.ease_factor = lower_ease(self.ease_factor, FACTOR_MODIFIER);
                grow(self.interval, HARD_MULTIPLIER)
            }
            Rating::Good => grow(self.interval, self.ease_factor),
            _ => {
                let next = grow(self.interval, self.ease_factor * EASY_BONUS);
                self.ease_factor += FACTOR_MODIFIER;
                next
            }
        };
        self.next_review = later(now, Duration::days(self.interval as i64));
    }

    fn answer_relearning(&mut self, rating: Rating, now: DateTime<Utc>) {
        if rating == Rating::Again {
            self.restart_ladder(now);
        } else if self.advance_ladder(now) {
            // The interval was already halved at lapse time.
            self.state = CardState::Review;
            self.repetitions += 1;
            self.current_learning_step = 0;
            self.next_review = later(now, Duration::days(self.interval as i64));
        }
    }

    fn restart_ladder(&mut self, now: DateTime<Utc>) {
        self.current_learning_step = 0;
        self.next_review = later(now, self.step_delay(0));
    }

    /// Moves one rung up. Returns true when the ladder is exhausted; the
    /// caller must then graduate the card.
    fn advance_ladder(&mut self, now: DateTime<Utc>) -> bool {
        let next = self.current_learning_step + 1;
        if next >= self.learning_steps.len() {
            return true;
        }
        self.current_learning_step = next;
        self.next_review = later(now, self.step_delay(next));
        false
    }

    fn graduate(&mut self, interval: u32, now: DateTime<Utc>) {
        self.state = CardState::Review;
        self.interval = interval;
        self.repetitions = 1;
        self.current_learning_step = 0;
        self.next_review = later(now, Duration::days(interval as i64));
    }

    fn step_delay(&self, step: usize) -> Duration {
        let minutes = self.learning_steps.get(step).copied().unwrap_or(0);
        Duration::minutes(minutes as i64)
    }
}

/// What each rating would produce, without changing the card.
pub fn preview(card: &Card, now: DateTime<Utc>) -> [(Rating, ScheduleInfo); 4] {
    Rating::ALL.map(|r| {
        let mut scratch = card.clone();
        (r, scratch.answer(r, now))
    })
}
