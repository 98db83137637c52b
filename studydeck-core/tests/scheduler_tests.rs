use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use studydeck_core::{Card, CardState, Rating, MAX_INTERVAL, MIN_FACTOR};
use uuid::Uuid;

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

fn review_card(interval: u32, ease: f64) -> Card {
    serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "question": "hola",
        "answer": "hello",
        "state": 2,
        "interval": interval,
        "easeFactor": ease,
        "repetitions": 3,
        "lapses": 0,
        "lastReviewed": 0,
        "nextReview": 0
    }))
    .unwrap()
}

#[test]
fn good_good_good_from_new() {
    let now = at(1_700_000_000_000);
    let mut card = Card::new("hola", "hello", now);

    let info = card.answer(Rating::Good, now);
    assert_eq!(card.state(), CardState::Learning);
    assert_eq!(card.current_learning_step(), 1);
    assert_eq!(card.next_review(), now + Duration::minutes(10));
    assert_eq!(info.time_string, "10 min");

    let info = card.answer(Rating::Good, now);
    assert_eq!(card.state(), CardState::Review);
    assert_eq!(card.interval(), 1);
    assert_eq!(card.repetitions(), 1);
    assert_eq!(info.time_string, "1 days");

    let info = card.answer(Rating::Good, now);
    assert_eq!(card.state(), CardState::Review);
    assert_eq!(card.interval(), 3);
    assert_eq!(card.repetitions(), 2);
    assert_eq!(info.ease_factor, 2.5);
    assert_eq!(card.next_review(), now + Duration::days(3));
}

#[test]
fn easy_from_new_skips_ladder() {
    let now = at(0);
    let mut card = Card::new("a", "b", now);
    card.answer(Rating::Easy, now);

    assert_eq!(card.state(), CardState::Review);
    assert_eq!(card.interval(), 4);
    assert_eq!(card.repetitions(), 1);
    assert_eq!(card.next_review(), now + Duration::days(4));
}

#[test]
fn review_again_is_a_lapse() {
    for (interval, ease) in [(1, 2.5), (7, 2.5), (10, 1.4), (31, 1.3)] {
        let mut card = review_card(interval, ease);
        card.answer(Rating::Again, at(0));

        assert_eq!(card.state(), CardState::Relearning);
        assert_eq!(card.lapses(), 1);
        assert_eq!(card.interval(), (interval / 2).max(1));
        assert!((card.ease_factor() - (ease - 0.2).max(MIN_FACTOR)).abs() < 1e-9);
        assert_eq!(card.current_learning_step(), 0);
        assert_eq!(card.next_review(), at(0) + Duration::minutes(1));
    }
}

#[test]
fn review_good_multiplies_by_ease() {
    for (interval, ease) in [(1u32, 2.5f64), (3, 2.5), (6, 1.3), (10, 2.0)] {
        let mut card = review_card(interval, ease);
        card.answer(Rating::Good, at(0));

        assert_eq!(card.state(), CardState::Review);
        assert_eq!(card.interval(), (interval as f64 * ease).ceil() as u32);
        assert_eq!(card.ease_factor(), ease);
        assert_eq!(card.repetitions(), 4);
    }
}

#[test]
fn ease_never_drops_below_floor() {
    let mut card = review_card(10, 2.5);
    for _ in 0..20 {
        card.answer(Rating::Hard, at(0));
        assert!(card.ease_factor() >= MIN_FACTOR);
    }
    assert_eq!(card.ease_factor(), MIN_FACTOR);

    // Repeated lapses, relearning back to review each time.
    let mut card = review_card(10, 2.5);
    for _ in 0..10 {
        card.answer(Rating::Again, at(0));
        card.answer(Rating::Good, at(0));
        card.answer(Rating::Good, at(0));
        assert_eq!(card.state(), CardState::Review);
        assert!(card.ease_factor() >= MIN_FACTOR);
    }
    assert_eq!(card.ease_factor(), MIN_FACTOR);
    assert_eq!(card.lapses(), 10);
    assert_eq!(card.interval(), 1);
}

#[test]
fn not_due_right_after_answer() {
    let now = at(5_000);
    for rating in Rating::ALL {
        let mut card = Card::new("q", "a", now);
        assert!(card.is_due(now));
        card.answer(rating, now);
        assert!(!card.is_due(now));
        assert!(card.is_due(card.next_review()));
    }
}

#[test]
fn record_round_trip() {
    let now = at(1_234_567);
    let mut card = Card::new("q", "a", now);
    card.answer(Rating::Good, now);
    card.answer(Rating::Easy, now);
    card.answer(Rating::Again, now + Duration::days(1));

    let text = serde_json::to_string(&card).unwrap();
    let back: Card = serde_json::from_str(&text).unwrap();
    assert_eq!(back, card);
}

#[test]
fn computed_ease_factors_round_trip_exactly() {
    let now = at(1_700_000_000_000);
    for easy in 0..6 {
        for hard in 0..8 {
            let mut card = Card::new("q", "a", now);
            card.answer(Rating::Easy, now);
            for _ in 0..easy {
                card.answer(Rating::Easy, now);
            }
            for _ in 0..hard {
                card.answer(Rating::Hard, now);
            }
            card.answer(Rating::Again, now);

            let text = serde_json::to_string(&card).unwrap();
            let back: Card = serde_json::from_str(&text).unwrap();
            assert_eq!(
                back.ease_factor().to_bits(),
                card.ease_factor().to_bits(),
                "easy={easy} hard={hard}: {} vs {}",
                back.ease_factor(),
                card.ease_factor()
            );
            assert_eq!(back, card);
        }
    }
}

#[test]
fn repeated_easy_answers_stay_in_range() {
    let now = at(1_700_000_000_000);
    let mut card = Card::new("q", "a", now);
    for _ in 0..40 {
        let info = card.answer(Rating::Easy, now);
        assert!(info.interval <= MAX_INTERVAL);
        assert!(card.next_review() > now);
    }
    assert_eq!(card.interval(), MAX_INTERVAL);
    assert_eq!(card.next_review(), now + Duration::days(MAX_INTERVAL as i64));
}

#[test]
fn long_learning_step_reports_hours() {
    let now = at(0);
    let mut card = Card::new("q", "a", now)
        .with_learning_steps(vec![1, 90, 600])
        .unwrap();

    let info = card.answer(Rating::Good, now);
    assert_eq!(card.state(), CardState::Learning);
    assert_eq!(info.time_string, "2 hrs");

    let info = card.answer(Rating::Good, now);
    assert_eq!(info.time_string, "10 hrs");
}

fn record_with_step(state: u8, step: usize) -> Card {
    serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "question": "q",
        "answer": "a",
        "state": state,
        "interval": 4,
        "easeFactor": 2.5,
        "repetitions": 1,
        "lapses": 0,
        "lastReviewed": 0,
        "nextReview": 0,
        "learningSteps": [1, 10],
        "currentLearningStep": step
    }))
    .unwrap()
}

#[test]
fn out_of_range_step_index_is_repaired_on_answer() {
    for state in 0..=3u8 {
        for rating in Rating::ALL {
            let mut card = record_with_step(state, 7);
            assert_eq!(card.current_learning_step(), 7);
            card.answer(rating, at(0));
            assert!(
                card.current_learning_step() < card.learning_steps().len(),
                "state={state} rating={rating:?} left step {}",
                card.current_learning_step()
            );
        }
    }

    // A learning card past the end of its ladder graduates on Good.
    let mut card = record_with_step(1, 7);
    card.answer(Rating::Good, at(0));
    assert_eq!(card.state(), CardState::Review);
    assert_eq!(card.interval(), 1);
}
