//! Capture/retake gating.
//!
//! | From     | Event   | To       | Effect                                   |
//! |----------|---------|----------|------------------------------------------|
//! | Scanning | Tick    | Scanning | run pipeline, publish                    |
//! | Captured | Tick    | Captured | none, result frozen                      |
//! | Scanning | Capture | Captured | disable capture, enable retake, persist  |
//! | Captured | Retake  | Scanning | enable capture, disable retake           |
//! | Captured | Capture | Captured | ignored                                  |
//! | Scanning | Retake  | Scanning | ignored                                  |

use crate::aggregate::DetectionResult;

/// Whether live detection is running or a still has been taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    #[default]
    Scanning,
    Captured,
}

/// Inputs to the state machine: the scheduler tick and the two buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Tick,
    Capture,
    Retake,
}

/// UI side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEffect {
    DisableCapture,
    EnableRetake,
    EnableCapture,
    DisableRetake,
    /// Hand the current frame to the still-persistence collaborator.
    PersistStill,
}

/// Result of feeding one event to [`CaptureState::on_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: CaptureState,
    /// True iff the detection pipeline should run for this event.
    pub run_pipeline: bool,
    pub effects: Vec<UiEffect>,
}

impl Transition {
    fn stay(state: CaptureState) -> Self {
        Self {
            state,
            run_pipeline: false,
            effects: Vec::new(),
        }
    }
}

/// Enabled state of the capture and retake buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStates {
    pub capture_enabled: bool,
    pub retake_enabled: bool,
}

impl CaptureState {
    /// Pure transition function. Events that do not apply in the current
    /// state leave it unchanged with no effects.
    pub fn on_event(self, event: CaptureEvent) -> Transition {
        use CaptureEvent::*;
        use CaptureState::*;
        match (self, event) {
            (Scanning, Tick) => Transition {
                state: Scanning,
                run_pipeline: true,
                effects: Vec::new(),
            },
            (Scanning, Capture) => Transition {
                state: Captured,
                run_pipeline: false,
                effects: vec![
                    UiEffect::DisableCapture,
                    UiEffect::EnableRetake,
                    UiEffect::PersistStill,
                ],
            },
            (Captured, Retake) => Transition {
                state: Scanning,
                run_pipeline: false,
                effects: vec![UiEffect::EnableCapture, UiEffect::DisableRetake],
            },
            (Captured, Tick) | (Captured, Capture) | (Scanning, Retake) => Transition::stay(self),
        }
    }

    pub fn buttons(self) -> ButtonStates {
        match self {
            Self::Scanning => ButtonStates {
                capture_enabled: true,
                retake_enabled: false,
            },
            Self::Captured => ButtonStates {
                capture_enabled: false,
                retake_enabled: true,
            },
        }
    }
}

/// Durable session state: gating state, the last published result, and a
/// counter bumped every time scanning (re)starts.
///
/// `scan_epoch` lets a detection pass started in one scanning period be
/// recognized as stale if Capture (and possibly Retake) happened meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionContext {
    pub state: CaptureState,
    pub last_result: DetectionResult,
    pub scan_epoch: u64,
}

impl SessionContext {
    /// Apply a button event (or a gated tick) and return the requested effects.
    ///
    /// A `Tick` here only reports whether the pipeline should run; committing
    /// its result goes through [`SessionContext::commit`].
    pub fn apply(&mut self, event: CaptureEvent) -> Transition {
        let transition = self.state.on_event(event);
        if transition.state != self.state {
            tracing::trace!("capture state {:?} -> {:?}", self.state, transition.state);
            if transition.state == CaptureState::Scanning {
                self.scan_epoch = self.scan_epoch.wrapping_add(1);
            }
        }
        self.state = transition.state;
        transition
    }

    /// Store a pipeline result if the session is still scanning in `epoch`.
    /// Returns false (and keeps the frozen result) otherwise.
    pub fn commit(&mut self, epoch: u64, result: DetectionResult) -> bool {
        if self.state != CaptureState::Scanning || self.scan_epoch != epoch {
            return false;
        }
        self.last_result = result;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::circle::Circle;

    fn some_result(r: f32) -> DetectionResult {
        let c = Circle {
            x: 10.0,
            y: 10.0,
            radius: r,
            support: 1.0,
        };
        aggregate(Some(c), None)
    }

    #[test]
    fn initial_state_is_scanning() {
        assert_eq!(CaptureState::default(), CaptureState::Scanning);
        assert_eq!(SessionContext::default().state, CaptureState::Scanning);
    }

    #[test]
    fn scanning_tick_runs_pipeline() {
        let t = CaptureState::Scanning.on_event(CaptureEvent::Tick);
        assert_eq!(t.state, CaptureState::Scanning);
        assert!(t.run_pipeline);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn capture_then_retake_effects() {
        let t = CaptureState::Scanning.on_event(CaptureEvent::Capture);
        assert_eq!(t.state, CaptureState::Captured);
        assert!(!t.run_pipeline);
        assert_eq!(
            t.effects,
            vec![
                UiEffect::DisableCapture,
                UiEffect::EnableRetake,
                UiEffect::PersistStill
            ]
        );

        let t = CaptureState::Captured.on_event(CaptureEvent::Retake);
        assert_eq!(t.state, CaptureState::Scanning);
        assert_eq!(
            t.effects,
            vec![UiEffect::EnableCapture, UiEffect::DisableRetake]
        );
    }

    #[test]
    fn captured_tick_is_gated() {
        let t = CaptureState::Captured.on_event(CaptureEvent::Tick);
        assert_eq!(t, Transition::stay(CaptureState::Captured));
    }

    #[test]
    fn invalid_events_are_ignored() {
        assert_eq!(
            CaptureState::Captured.on_event(CaptureEvent::Capture),
            Transition::stay(CaptureState::Captured)
        );
        assert_eq!(
            CaptureState::Scanning.on_event(CaptureEvent::Retake),
            Transition::stay(CaptureState::Scanning)
        );
    }

    #[test]
    fn buttons_follow_state() {
        let scanning = CaptureState::Scanning.buttons();
        assert!(scanning.capture_enabled && !scanning.retake_enabled);
        let captured = CaptureState::Captured.buttons();
        assert!(!captured.capture_enabled && captured.retake_enabled);
    }

    #[test]
    fn context_freezes_and_resumes() {
        let mut ctx = SessionContext::default();
        let epoch = ctx.scan_epoch;
        assert!(ctx.apply(CaptureEvent::Tick).run_pipeline);
        assert!(ctx.commit(epoch, some_result(20.0)));

        ctx.apply(CaptureEvent::Capture);
        assert_eq!(ctx.state, CaptureState::Captured);
        assert!(!ctx.apply(CaptureEvent::Tick).run_pipeline);
        assert!(!ctx.commit(epoch, some_result(5.0)));
        assert_eq!(ctx.last_result.pupil_diameter(), 40.0);

        ctx.apply(CaptureEvent::Retake);
        assert_eq!(ctx.state, CaptureState::Scanning);
        assert_ne!(ctx.scan_epoch, epoch);
        // A pass started before the capture stays stale after retake.
        assert!(!ctx.commit(epoch, some_result(5.0)));
        assert!(ctx.commit(ctx.scan_epoch, some_result(7.0)));
        assert_eq!(ctx.last_result.pupil_diameter(), 14.0);
    }

    #[test]
    fn ignored_events_keep_epoch() {
        let mut ctx = SessionContext::default();
        ctx.apply(CaptureEvent::Retake);
        ctx.apply(CaptureEvent::Tick);
        assert_eq!(ctx.scan_epoch, 0);
    }
}
