//! Tool detection and invocation tests.

use kindred::tools::{ToolAnswers, ToolError, ToolId, ToolRegistry};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn detects_bmi_requests() {
    let tools = ToolRegistry::new().expect("registry builds");
    assert_eq!(tools.detect("what is my BMI"), Some(ToolId::CalculateBmi));
    assert_eq!(
        tools.detect("my weight and height are fine"),
        Some(ToolId::CalculateBmi)
    );
    assert_eq!(tools.detect("my weight is 70kg"), None);
}

#[test]
fn bmi_takes_priority_over_mindfulness() {
    let tools = ToolRegistry::new().expect("registry builds");
    assert_eq!(
        tools.detect("bmi first, then meditation"),
        Some(ToolId::CalculateBmi)
    );
}

#[test]
fn detects_mindfulness_and_sleep_requests() {
    let tools = ToolRegistry::new().expect("registry builds");
    assert_eq!(
        tools.detect("teach me some Mindfulness"),
        Some(ToolId::MindfulnessExercise)
    );
    assert_eq!(tools.detect("any sleep tips?"), Some(ToolId::SleepTip));
    assert_eq!(tools.detect("I need sleep advice"), Some(ToolId::SleepTip));
    assert_eq!(tools.detect("I could not sleep last night"), None);
}

#[test]
fn picks_from_configured_answers() {
    let tools = ToolRegistry::with_answers(ToolAnswers {
        exercises: &["Breathe slowly."],
        sleep_tips: &["Go to bed early."],
    })
    .expect("registry builds");
    let mut rng = StdRng::seed_from_u64(1);

    let exercise = tools
        .invoke(ToolId::MindfulnessExercise, "mindfulness", &mut rng)
        .expect("exercise returned");
    assert!(exercise.contains("Breathe slowly."));

    let tip = tools
        .invoke(ToolId::SleepTip, "sleep tip", &mut rng)
        .expect("tip returned");
    assert!(tip.contains("Go to bed early."));
}

#[test]
fn same_seed_same_pick() {
    let tools = ToolRegistry::new().expect("registry builds");
    let first = tools
        .invoke(ToolId::SleepTip, "sleep tip", &mut StdRng::seed_from_u64(42))
        .expect("tip returned");
    let second = tools
        .invoke(ToolId::SleepTip, "sleep tip", &mut StdRng::seed_from_u64(42))
        .expect("tip returned");
    assert_eq!(first, second);
}

#[test]
fn empty_answer_list_is_an_error() {
    let tools = ToolRegistry::with_answers(ToolAnswers {
        exercises: &[],
        sleep_tips: &[],
    })
    .expect("registry builds");
    let result = tools.invoke(ToolId::SleepTip, "sleep tip", &mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(ToolError::NoAnswers("getSleepTip"))));
}
