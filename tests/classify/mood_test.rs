//! Mood detector scoring, negation and tie-breaking tests.

use kindred::classify::MoodDetector;
use kindred::types::MoodLabel;

fn score_of(detector: &MoodDetector, message: &str, mood: MoodLabel) -> u32 {
    detector
        .scores(message)
        .into_iter()
        .find(|(m, _)| *m == mood)
        .map(|(_, score)| score)
        .unwrap_or_default()
}

#[test]
fn single_high_tier_keyword_wins() {
    let detector = MoodDetector::default();
    assert_eq!(detector.detect("I am thrilled"), MoodLabel::Happy);
    assert_eq!(detector.detect("I feel miserable"), MoodLabel::Sad);
    assert_eq!(detector.detect("I am furious"), MoodLabel::Angry);
    assert_eq!(detector.detect("I am terrified"), MoodLabel::Anxious);
}

#[test]
fn matching_is_case_insensitive() {
    let detector = MoodDetector::default();
    assert_eq!(detector.detect("HEARTBROKEN"), MoodLabel::Sad);
}

#[test]
fn no_keywords_is_neutral() {
    let detector = MoodDetector::default();
    assert_eq!(detector.detect("The train leaves at noon"), MoodLabel::Neutral);
}

#[test]
fn negation_reduces_score() {
    let detector = MoodDetector::default();
    let plain = score_of(&detector, "I am happy", MoodLabel::Happy);
    let negated = score_of(&detector, "I am not happy", MoodLabel::Happy);
    assert_eq!(plain, 3);
    assert!(negated < plain);
}

#[test]
fn negated_low_tier_keyword_clamps_to_zero() {
    let detector = MoodDetector::default();
    assert_eq!(score_of(&detector, "not fine", MoodLabel::Happy), 0);
    assert_eq!(detector.detect("not fine"), MoodLabel::Neutral);
}

#[test]
fn keyword_outside_window_is_not_dampened() {
    let detector = MoodDetector::default();
    let message = "I could not make it to the party, but honestly I am happy";
    assert_eq!(score_of(&detector, message, MoodLabel::Happy), 3);
}

#[test]
fn ties_keep_first_mood() {
    let detector = MoodDetector::default();
    assert_eq!(detector.detect("glad and sad"), MoodLabel::Happy);
    assert_eq!(detector.detect("sad and glad"), MoodLabel::Happy);
}

#[test]
fn keywords_accumulate_across_tiers() {
    let detector = MoodDetector::default();
    // worried (2) + nervous (2) beats sad (2)
    assert_eq!(
        detector.detect("worried and nervous, a bit sad"),
        MoodLabel::Anxious
    );
}

#[test]
fn unhappy_is_sad_not_happy() {
    let detector = MoodDetector::default();
    assert_eq!(detector.detect("I'm so unhappy"), MoodLabel::Sad);
    assert_eq!(score_of(&detector, "I'm so unhappy", MoodLabel::Happy), 0);
    assert_eq!(detector.detect("happy but also unhappy"), MoodLabel::Happy);
}
