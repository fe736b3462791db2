mod sched;
mod time;

pub use sched::QueueScheduler;
pub use sched::Scheduler;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;

/// Errors raised by a refresh callback. They are contained and reported,
/// never propagated out of the trigger.
pub type CallbackError = Box<dyn std::error::Error>;

type Callback = Box<dyn FnMut() -> Result<(), CallbackError>>;
type InvalidateHook = Box<dyn FnMut()>;

const MIN_BASE_DELAY: f64 = 10.0;

/// A cancellable delayed invocation that coalesces bursty refresh requests
/// and adapts its default delay toward recent execution cost.
///
/// The trigger owns no timers itself: it arms the injected [`Scheduler`]
/// and the host delivers expiry by calling [`DelayedTrigger::fire`] with
/// the armed deadline. At most one schedule is outstanding at a time; a
/// newer [`DelayedTrigger::reset`] always supersedes an older one, even if
/// the older timer's expiry is already in flight.
pub struct DelayedTrigger<S: Scheduler, C: Clock> {
    scheduler: S,
    clock: C,
    base_delay: f64,
    adaptive_speed: f64,
    pending: Option<S::Handle>,
    deadline: Option<u64>,
    callback: Callback,
    on_invalidate: Option<InvalidateHook>,
}

impl<S: Scheduler, C: Clock> DelayedTrigger<S, C> {
    pub fn new(
        scheduler: S,
        clock: C,
        default_delay: u64,
        callback: impl FnMut() -> Result<(), CallbackError> + 'static,
    ) -> Self {
        Self {
            scheduler,
            clock,
            base_delay: default_delay as f64,
            adaptive_speed: 0.0,
            pending: None,
            deadline: None,
            callback: Box::new(callback),
            on_invalidate: None,
        }
    }

    /// Hook invoked when a refresh becomes pending (the Idle-to-Pending
    /// edge only; restarting an already pending trigger does not re-run
    /// it).
    pub fn on_invalidate(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_invalidate = Some(Box::new(hook));
        self
    }

    /// Smoothing factor for the adaptive delay, clamped into [0, 1]. At 0
    /// the base delay never changes; at 1 it tracks the last execution
    /// cost outright. Non-finite input degrades to 0.
    pub fn adaptive_speed(mut self, speed: f64) -> Self {
        self.adaptive_speed = if speed.is_finite() {
            speed.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// The delay used when `reset` is called without an override,
    /// in milliseconds.
    pub fn base_delay(&self) -> f64 {
        self.base_delay
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the last `reset`, while one is pending.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Restarts the pending invocation, cancelling any outstanding
    /// schedule first. `timeout` overrides the adaptively maintained base
    /// delay for this schedule only.
    pub fn reset(&mut self, timeout: Option<u64>) {
        let timeout = timeout.unwrap_or_else(|| self.base_delay.round() as u64);
        let deadline = self.clock.now() + timeout;
        let was_idle = self.pending.is_none();
        self.stop();
        if was_idle {
            if let Some(invalidate) = self.on_invalidate.as_mut() {
                invalidate();
            }
        }
        self.deadline = Some(deadline);
        self.pending = Some(self.scheduler.after(timeout, deadline));
    }

    /// Cancels the pending invocation. Returns true only when a callback
    /// was actually pending.
    pub fn stop(&mut self) -> bool {
        self.deadline = None;
        match self.pending.take() {
            Some(handle) => {
                self.scheduler.cancel(handle);
                true
            }
            None => false,
        }
    }

    /// Host-delivered timer expiry for the schedule armed with `deadline`.
    ///
    /// A deadline that no longer matches the trigger's current one is
    /// stale (superseded by a newer `reset` or a `stop`) and ignored; this
    /// covers the race where a cancel-then-reschedule interleaves with an
    /// expiry already handed to the host. On a live fire the callback runs
    /// with its error contained, and the base delay is smoothed toward ten
    /// times the measured execution cost.
    pub fn fire(&mut self, deadline: u64) {
        if self.deadline != Some(deadline) {
            return;
        }
        self.pending = None;
        self.deadline = None;

        let started = self.clock.now();
        if let Err(error) = (self.callback)() {
            tracing::warn!(%error, "refresh callback failed");
        }
        let duration = (self.clock.now() - started) as f64;

        if self.adaptive_speed > 0.0 {
            self.base_delay = (1.0 - self.adaptive_speed) * self.base_delay
                + self.adaptive_speed * duration * 10.0;
            if self.base_delay < MIN_BASE_DELAY {
                self.base_delay = MIN_BASE_DELAY;
            }
        }
    }
}
