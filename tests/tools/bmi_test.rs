//! BMI extraction and reply tests.

use kindred::tools::bmi::{calculate_bmi, BmiExtractor, MISSING_DATA_PROMPT};

#[test]
fn computes_bmi_from_message() {
    let extractor = BmiExtractor::new().expect("patterns compile");
    let reply = extractor
        .answer("weight 70kg height 1.75m")
        .expect("bmi computed");
    assert!(reply.contains("22.86"), "reply: {reply}");
    assert!(reply.contains("18.5-24.9 is healthy"));
}

#[test]
fn accepts_spelled_out_units() {
    let extractor = BmiExtractor::new().expect("patterns compile");
    let extracted = extractor
        .extract("I weigh 82.5 Kilograms and I am 1.8 metres tall")
        .expect("no parse error");
    assert_eq!(extracted, Some((82.5, 1.8)));
}

#[test]
fn weight_only_asks_for_data() {
    let extractor = BmiExtractor::new().expect("patterns compile");
    let reply = extractor
        .answer("my weight is 70kg, what's my bmi?")
        .expect("prompt returned");
    assert_eq!(reply, MISSING_DATA_PROMPT);
}

#[test]
fn zero_height_asks_for_data() {
    let extractor = BmiExtractor::new().expect("patterns compile");
    let reply = extractor.answer("70kg and 0m").expect("prompt returned");
    assert_eq!(reply, MISSING_DATA_PROMPT);
}

#[test]
fn rounding_matches_two_decimals() {
    let bmi = calculate_bmi(90.0, 1.8).expect("finite");
    assert!((bmi - 27.78).abs() < 1e-9);
}
