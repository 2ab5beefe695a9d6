use poultry_hub_client::config::ClientOptions;
use poultry_hub_client::error::Error;
use poultry_hub_client::quiz::Question;
use poultry_hub_client::PoultryHub;
use std::time::Duration;

fn question(id: &str) -> Question {
    Question {
        id: id.into(),
        prompt: "Which vaccine protects against Newcastle disease?".into(),
        options: vec!["Lasota".into(), "Gumboro".into(), "Fowl pox".into()],
        correct_option: 0,
        explanation: "Lasota is the common Newcastle vaccine.".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn quiz_uses_configured_rules() {
    let options = ClientOptions::default().with_quiz_rules(Duration::from_secs(10), 50);
    let hub = PoultryHub::new_with_options("http://localhost:54321", "test_key", options).unwrap();

    let mut quiz = hub.quiz(vec![question("q1"), question("q2")]).unwrap();
    assert_eq!(quiz.time_remaining(), Duration::from_secs(10));

    assert!(quiz.answer(0).unwrap().correct);
    quiz.next();
    assert!(!quiz.answer(2).unwrap().correct);
    quiz.next();

    assert!(quiz.is_completed());
    assert_eq!(quiz.score_percent(), 50);
    assert!(quiz.badge_unlocked());
}

#[tokio::test(start_paused = true)]
async fn default_badge_needs_ninety_percent() {
    let hub = PoultryHub::new("http://localhost:54321", "test_key").unwrap();

    let mut quiz = hub.quiz(vec![question("q1"), question("q2")]).unwrap();
    assert_eq!(quiz.time_remaining(), Duration::from_secs(30));

    quiz.answer(0).unwrap();
    quiz.next();
    quiz.answer(1).unwrap();
    quiz.next();

    assert_eq!(quiz.score_percent(), 50);
    assert!(!quiz.badge_unlocked());
}

#[test]
fn empty_quiz_is_rejected() {
    let hub = PoultryHub::new("http://localhost:54321", "test_key").unwrap();
    assert!(matches!(hub.quiz(Vec::new()), Err(Error::Validation(_))));
}
