use super::*;

fn ready() -> AttemptConditions {
    AttemptConditions {
        destroyed: false,
        hidden: true,
        context_lost: false,
        has_accelerated_surface: true,
    }
}

#[test]
fn only_one_attempt_is_scheduled_at_a_time() {
    let mut h = HibernationController::default();
    assert!(h.try_schedule());
    assert!(!h.try_schedule());
    assert_eq!(h.phase(), HibernationPhase::Scheduled);

    assert_eq!(h.decide(ready()), AttemptDecision::Commit);
    assert_eq!(h.phase(), HibernationPhase::Idle);
    h.enter(vec![1, 2, 3, 4]);
    assert_eq!(h.phase(), HibernationPhase::Hibernating);
    assert!(!h.try_schedule());
}

#[test]
fn abort_reasons_follow_a_fixed_precedence() {
    let mut h = HibernationController::default();
    let all_bad = AttemptConditions {
        destroyed: true,
        hidden: false,
        context_lost: true,
        has_accelerated_surface: false,
    };
    assert_eq!(
        h.decide(all_bad),
        AttemptDecision::Abort(HibernationEvent::HibernationAbortedDueToPendingDestruction)
    );
    assert_eq!(
        h.decide(AttemptConditions {
            destroyed: false,
            ..all_bad
        }),
        AttemptDecision::Abort(HibernationEvent::HibernationAbortedDueToVisibilityChange)
    );
    assert_eq!(
        h.decide(AttemptConditions {
            destroyed: false,
            hidden: true,
            ..all_bad
        }),
        AttemptDecision::Abort(HibernationEvent::HibernationAbortedDueGpuContextLoss)
    );
    assert_eq!(
        h.decide(AttemptConditions {
            has_accelerated_surface: false,
            ..ready()
        }),
        AttemptDecision::Abort(HibernationEvent::HibernationAbortedBecauseNoSurface)
    );
}

#[test]
fn waking_returns_the_image_once() {
    let mut h = HibernationController::default();
    h.enter(vec![9; 4]);
    assert_eq!(h.image(), Some(&[9u8; 4][..]));
    assert_eq!(h.wake(), Some(vec![9; 4]));
    assert_eq!(h.phase(), HibernationPhase::Idle);
    assert_eq!(h.wake(), None);
}

#[test]
fn teardown_reports_only_when_hibernation_was_in_progress() {
    let mut h = HibernationController::default();
    assert_eq!(h.teardown(), None);

    assert!(h.try_schedule());
    assert_eq!(
        h.teardown(),
        Some(HibernationEvent::HibernationEndedWithTeardown)
    );

    h.enter(vec![0; 4]);
    assert_eq!(
        h.teardown(),
        Some(HibernationEvent::HibernationEndedWithTeardown)
    );
    assert!(h.image().is_none());
}
