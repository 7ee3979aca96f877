//! Live sessions: tick scheduling, gating and publishing.
//!
//! [`Session`] is the single-owner loop: every tick runs to completion before
//! the next event is handled. [`SharedSession`] lets a timer thread tick while
//! button events arrive from elsewhere; overlapping ticks are dropped rather
//! than queued, and a result whose scan was interrupted by Capture is thrown
//! away. [`Ticker`] drives either one at a fixed rate.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::aggregate::DetectionResult;
use crate::capture::{CaptureEvent, CaptureState, SessionContext, Transition};
use crate::frame::{Frame, InputError};
use crate::io::{Feedback, FeedbackSink, FrameSource};
use crate::pipeline::EyeDetector;

/// Why a tick produced no feedback.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The frame source had nothing to offer.
    NoFrame,
    /// The frame could not be preprocessed.
    InvalidFrame(InputError),
    /// Another tick was still running.
    Busy,
    /// Capture arrived while the pass was running; its result was discarded.
    Stale,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The pipeline ran and this feedback was published.
    Published(Feedback),
    /// Captured: the pipeline did not run and the result stays frozen.
    Gated,
    /// Scanning, but nothing was published. The previous result is kept.
    Skipped(SkipReason),
}

impl TickOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Pull one frame and run both passes on it.
fn run_pass<S: FrameSource + ?Sized>(
    detector: &EyeDetector,
    source: &mut S,
) -> Result<(Frame, DetectionResult), SkipReason> {
    let frame = source.capture_frame().ok_or(SkipReason::NoFrame)?;
    match detector.detect(&frame) {
        Ok(result) => Ok((frame, result)),
        Err(e) => {
            tracing::warn!("skipping tick: {}", e);
            Err(SkipReason::InvalidFrame(e))
        }
    }
}

/// Single-owner live session.
pub struct Session<S, K> {
    detector: EyeDetector,
    source: S,
    sink: K,
    ctx: SessionContext,
    last_frame: Option<Frame>,
}

impl<S: FrameSource, K: FeedbackSink> Session<S, K> {
    pub fn new(detector: EyeDetector, source: S, sink: K) -> Self {
        Self {
            detector,
            source,
            sink,
            ctx: SessionContext::default(),
            last_frame: None,
        }
    }

    /// Run one scheduled tick.
    pub fn tick(&mut self) -> TickOutcome {
        let transition = self.ctx.apply(CaptureEvent::Tick);
        if !transition.run_pipeline {
            return TickOutcome::Gated;
        }
        let epoch = self.ctx.scan_epoch;
        let (frame, result) = match run_pass(&self.detector, &mut self.source) {
            Ok(pass) => pass,
            Err(reason) => return TickOutcome::Skipped(reason),
        };
        self.ctx.commit(epoch, result);
        self.last_frame = Some(frame);
        let feedback = Feedback::from(&result);
        self.sink.publish(&feedback);
        TickOutcome::Published(feedback)
    }

    /// Capture button. Freezes the current result.
    pub fn capture(&mut self) -> Transition {
        self.ctx.apply(CaptureEvent::Capture)
    }

    /// Retake button. Resumes scanning.
    pub fn retake(&mut self) -> Transition {
        self.ctx.apply(CaptureEvent::Retake)
    }

    /// Dispatch any event. `Tick` runs [`Session::tick`].
    pub fn handle(&mut self, event: CaptureEvent) -> Transition {
        match event {
            CaptureEvent::Tick => {
                let run_pipeline = self.ctx.state == CaptureState::Scanning;
                self.tick();
                Transition {
                    state: self.ctx.state,
                    run_pipeline,
                    effects: Vec::new(),
                }
            }
            CaptureEvent::Capture => self.capture(),
            CaptureEvent::Retake => self.retake(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.ctx.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Last committed result (frozen while captured).
    pub fn result(&self) -> &DetectionResult {
        &self.ctx.last_result
    }

    /// Frame the last committed result was computed on.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn detector(&self) -> &EyeDetector {
        &self.detector
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_parts(self) -> (S, K, SessionContext) {
        (self.source, self.sink, self.ctx)
    }
}

#[derive(Debug, Default)]
struct SharedState {
    ctx: SessionContext,
    last_frame: Option<Frame>,
}

/// Clears the in-flight flag when a tick ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Session shared between a ticking thread and event handlers.
///
/// At most one detection pass is in flight. The pipeline runs outside the
/// lock; its result is committed only if the session is still scanning in
/// the epoch the pass started in.
#[derive(Debug, Default)]
pub struct SharedSession {
    detector: EyeDetector,
    state: Mutex<SharedState>,
    in_flight: AtomicBool,
}

impl SharedSession {
    pub fn new(detector: EyeDetector) -> Self {
        Self {
            detector,
            state: Mutex::new(SharedState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one tick, or skip it if another is still running.
    pub fn tick<S, K>(&self, source: &mut S, sink: &mut K) -> TickOutcome
    where
        S: FrameSource + ?Sized,
        K: FeedbackSink + ?Sized,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("tick dropped: previous pass still running");
            return TickOutcome::Skipped(SkipReason::Busy);
        }
        let _in_flight = InFlight(&self.in_flight);

        let epoch = {
            let mut st = self.lock();
            if !st.ctx.apply(CaptureEvent::Tick).run_pipeline {
                return TickOutcome::Gated;
            }
            st.ctx.scan_epoch
        };

        let (frame, result) = match run_pass(&self.detector, source) {
            Ok(pass) => pass,
            Err(reason) => return TickOutcome::Skipped(reason),
        };

        {
            let mut st = self.lock();
            if !st.ctx.commit(epoch, result) {
                tracing::debug!("discarding result of interrupted scan");
                return TickOutcome::Skipped(SkipReason::Stale);
            }
            st.last_frame = Some(frame);
        }

        let feedback = Feedback::from(&result);
        sink.publish(&feedback);
        TickOutcome::Published(feedback)
    }

    pub fn capture(&self) -> Transition {
        self.lock().ctx.apply(CaptureEvent::Capture)
    }

    pub fn retake(&self) -> Transition {
        self.lock().ctx.apply(CaptureEvent::Retake)
    }

    pub fn state(&self) -> CaptureState {
        self.lock().ctx.state
    }

    pub fn context(&self) -> SessionContext {
        self.lock().ctx
    }

    pub fn result(&self) -> DetectionResult {
        self.lock().ctx.last_result
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.lock().last_frame.clone()
    }
}

/// Counters reported by [`Ticker::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickerStats {
    /// Callbacks invoked.
    pub ticks: u64,
    /// Deadlines skipped because a callback overran.
    pub dropped: u64,
}

/// Fixed-rate scheduler. Missed deadlines are dropped, never queued.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Flag that ends [`Ticker::run`] before its next tick once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Call `on_tick` with the tick index at every deadline until it breaks
    /// or the stop flag is set. The first tick fires immediately.
    pub fn run<F>(&self, mut on_tick: F) -> TickerStats
    where
        F: FnMut(u64) -> ControlFlow<()>,
    {
        let mut stats = TickerStats::default();
        let mut deadline = Instant::now();
        loop {
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            let now = Instant::now();
            if let Some(wait) = deadline.checked_duration_since(now) {
                std::thread::sleep(wait);
            }

            let flow = on_tick(stats.ticks);
            stats.ticks += 1;
            if flow.is_break() {
                break;
            }

            let now = Instant::now();
            deadline += self.interval;
            let mut missed = 0u64;
            while deadline <= now && !self.interval.is_zero() {
                deadline += self.interval;
                missed += 1;
            }
            if missed > 0 {
                tracing::debug!("tick {} overran: dropped {} deadline(s)", stats.ticks - 1, missed);
                stats.dropped += missed;
            }
        }
        stats
    }
}
