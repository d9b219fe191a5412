// Echo-safe forwarder guards: marker-based echo rejection, at-most-once
// forwarding under duplicate delivery, quarantine expiry, and prompt
// construction.

use avatar_session::{ForwardDecision, ResponseForwarder, CONTEXT_MARKER};
use std::time::Duration;
use tokio::time::{advance, Instant};

fn forwarder() -> ResponseForwarder {
    ResponseForwarder::new(
        "Patient: Alex, recovering from knee surgery.".to_string(),
        Duration::from_secs(10),
    )
}

#[tokio::test(start_paused = true)]
async fn test_at_most_once_within_quarantine_window() {
    let mut forwarder = forwarder();

    let first = forwarder.decide("what are my exercises?", Instant::now());
    assert!(matches!(first, ForwardDecision::Forward(_)));

    // Duplicate deliveries of the same finalized utterance
    for _ in 0..5 {
        let repeat = forwarder.decide("what are my exercises?", Instant::now());
        assert_eq!(repeat, ForwardDecision::Duplicate);
    }
}

#[tokio::test(start_paused = true)]
async fn test_quarantine_expires() {
    let mut forwarder = forwarder();

    assert!(matches!(
        forwarder.decide("hello", Instant::now()),
        ForwardDecision::Forward(_)
    ));

    advance(Duration::from_secs(9)).await;
    assert_eq!(
        forwarder.decide("hello", Instant::now()),
        ForwardDecision::Duplicate
    );

    advance(Duration::from_secs(2)).await;
    assert!(
        matches!(
            forwarder.decide("hello", Instant::now()),
            ForwardDecision::Forward(_)
        ),
        "same text forwards again once the quarantine window has passed"
    );
}

#[tokio::test(start_paused = true)]
async fn test_echo_with_marker_is_rejected() {
    let mut forwarder = forwarder();

    let echoed = format!("{} Patient: Alex...\nwhat are my exercises?", CONTEXT_MARKER);
    assert_eq!(
        forwarder.decide(&echoed, Instant::now()),
        ForwardDecision::RejectedEcho
    );

    // Rejection happens regardless of dedup state and does not quarantine
    assert_eq!(forwarder.quarantined_count(), 0);
    assert_eq!(
        forwarder.decide(&echoed, Instant::now()),
        ForwardDecision::RejectedEcho
    );
}

#[tokio::test(start_paused = true)]
async fn test_marker_anywhere_in_text_rejects() {
    let mut forwarder = forwarder();

    let embedded = format!("so I heard {} somewhere in the middle", CONTEXT_MARKER);
    assert_eq!(
        forwarder.decide(&embedded, Instant::now()),
        ForwardDecision::RejectedEcho
    );
}

#[tokio::test(start_paused = true)]
async fn test_prompt_contains_marker_context_and_utterance() {
    let mut forwarder = forwarder();

    let decision = forwarder.decide("when can I walk?", Instant::now());
    let ForwardDecision::Forward(prompt) = decision else {
        panic!("expected a forward decision");
    };

    assert!(prompt.contains(CONTEXT_MARKER));
    assert!(prompt.contains("recovering from knee surgery"));
    assert!(prompt.contains("when can I walk?"));
}

#[tokio::test(start_paused = true)]
async fn test_greeting_does_not_seed_quarantine() {
    let mut forwarder = forwarder();

    let greeting = forwarder.greeting_prompt("Welcome back!");
    assert!(greeting.contains(CONTEXT_MARKER));
    assert_eq!(forwarder.quarantined_count(), 0);

    // A user who happens to say the greeting text still gets forwarded
    assert!(matches!(
        forwarder.decide("Welcome back!", Instant::now()),
        ForwardDecision::Forward(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_clear_resets_quarantine() {
    let mut forwarder = forwarder();

    assert!(matches!(
        forwarder.decide("again", Instant::now()),
        ForwardDecision::Forward(_)
    ));
    forwarder.clear();

    assert!(matches!(
        forwarder.decide("again", Instant::now()),
        ForwardDecision::Forward(_)
    ));
}
