use crate::bridge::events::HibernationEvent;

/// Where a bridge is in its hibernation cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HibernationPhase {
    #[default]
    Idle,
    /// An attempt task is posted and has not run yet.
    Scheduled,
    /// The GPU surface is released; content lives in the hibernation image.
    Hibernating,
}

/// What the bridge looks like when a scheduled attempt runs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AttemptConditions {
    pub(crate) destroyed: bool,
    pub(crate) hidden: bool,
    pub(crate) context_lost: bool,
    pub(crate) has_accelerated_surface: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttemptDecision {
    Commit,
    Abort(HibernationEvent),
}

/// Bookkeeping half of hibernation. The bridge owns the surfaces and does the actual work; this
/// tracks the phase, holds the hibernation image and decides attempts.
#[derive(Debug, Default)]
pub(crate) struct HibernationController {
    phase: HibernationPhase,
    image: Option<Vec<u8>>,
}

impl HibernationController {
    pub(crate) fn phase(&self) -> HibernationPhase {
        self.phase
    }

    /// Claim the single outstanding attempt. False if one is already scheduled or the bridge
    /// already hibernates.
    pub(crate) fn try_schedule(&mut self) -> bool {
        if self.phase != HibernationPhase::Idle {
            return false;
        }
        self.phase = HibernationPhase::Scheduled;
        true
    }

    /// Decide a scheduled attempt. Releases the schedule either way; a commit is completed with
    /// [`HibernationController::enter`].
    ///
    /// Checks run in a fixed order so a lost context is reported over a missing surface.
    pub(crate) fn decide(&mut self, c: AttemptConditions) -> AttemptDecision {
        if self.phase == HibernationPhase::Scheduled {
            self.phase = HibernationPhase::Idle;
        }
        if c.destroyed {
            return AttemptDecision::Abort(
                HibernationEvent::HibernationAbortedDueToPendingDestruction,
            );
        }
        if !c.hidden {
            return AttemptDecision::Abort(HibernationEvent::HibernationAbortedDueToVisibilityChange);
        }
        if c.context_lost {
            return AttemptDecision::Abort(HibernationEvent::HibernationAbortedDueGpuContextLoss);
        }
        if !c.has_accelerated_surface || self.phase == HibernationPhase::Hibernating {
            return AttemptDecision::Abort(HibernationEvent::HibernationAbortedBecauseNoSurface);
        }
        AttemptDecision::Commit
    }

    pub(crate) fn enter(&mut self, image: Vec<u8>) {
        self.phase = HibernationPhase::Hibernating;
        self.image = Some(image);
    }

    pub(crate) fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    /// Leave hibernation, handing back the saved content.
    pub(crate) fn wake(&mut self) -> Option<Vec<u8>> {
        if self.phase == HibernationPhase::Hibernating {
            self.phase = HibernationPhase::Idle;
        }
        self.image.take()
    }

    /// Reset for teardown. Returns the event to report if hibernation was in progress.
    pub(crate) fn teardown(&mut self) -> Option<HibernationEvent> {
        let was_active = self.phase != HibernationPhase::Idle;
        self.phase = HibernationPhase::Idle;
        self.image = None;
        was_active.then_some(HibernationEvent::HibernationEndedWithTeardown)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/hibernation.rs"]
mod tests;
