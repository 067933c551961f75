//! Activity/Sleep controller for the status overlay.
//!
//! # State machine
//!
//! ```text
//!            tick: idle > timeout && no modal open
//!   Awake ─────────────────────────────────────────> Asleep
//!     ^                                                 │
//!     └──────────────── any Event arrives ──────────────┘
//! ```
//!
//! The controller never reads a clock itself: every operation takes the
//! current [`Instant`] from the caller.  This keeps the machine deterministic
//! in tests and lets the presentation loop decide where time comes from.
//!
//! # Wake discards the event
//!
//! An event that arrives while the overlay is asleep only wakes it.  The
//! event is *not* forwarded to keystroke injection ([`Admission::ConsumedByWake`]),
//! so the first press after a nap never types anything.
//!
//! # Live timeout
//!
//! The inactivity timeout is read through a [`LiveTimeout`] handle on every
//! tick rather than copied at construction.  The settings surface keeps a
//! clone of the handle and can change the timeout while the bridge runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

/// Visibility of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Awake,
    Asleep,
}

/// What the presentation context should do with an arriving event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The overlay was awake: dispatch the event.
    Forward,
    /// The overlay was asleep: the event woke it and must be dropped.
    ConsumedByWake,
}

/// Shared, live inactivity timeout in whole seconds.
///
/// Cloning yields another handle to the same value.  Values below one second
/// are raised to one second.
#[derive(Debug, Clone)]
pub struct LiveTimeout(Arc<AtomicU64>);

impl LiveTimeout {
    pub fn from_secs(secs: u64) -> Self {
        Self(Arc::new(AtomicU64::new(secs.max(1))))
    }

    /// Replaces the timeout; takes effect on the next tick.
    pub fn set_secs(&self, secs: u64) {
        self.0.store(secs.max(1), Ordering::Relaxed);
    }

    pub fn secs(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn get(&self) -> Duration {
        Duration::from_secs(self.secs())
    }
}

/// Tracks the last qualifying activity and the overlay's [`OverlayState`].
#[derive(Debug)]
pub struct ActivityController {
    state: OverlayState,
    last_activity: Instant,
    timeout: LiveTimeout,
}

impl ActivityController {
    /// Creates an awake controller whose activity clock starts at `now`.
    pub fn new(now: Instant, timeout: LiveTimeout) -> Self {
        Self {
            state: OverlayState::Awake,
            last_activity: now,
            timeout,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_awake(&self) -> bool {
        self.state == OverlayState::Awake
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Handle to the timeout this controller reads on every tick.
    pub fn timeout(&self) -> &LiveTimeout {
        &self.timeout
    }

    /// Time elapsed since the last qualifying activity.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Refreshes the activity clock without touching the overlay state.
    ///
    /// Used for overlay interactions such as dragging or pressing a button.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Gates an event arriving from the device.
    ///
    /// Always refreshes the activity clock.  Returns
    /// [`Admission::ConsumedByWake`] if the overlay was asleep.
    pub fn admit(&mut self, now: Instant) -> Admission {
        if self.wake(now) {
            Admission::ConsumedByWake
        } else {
            self.record_activity(now);
            Admission::Forward
        }
    }

    /// Periodic inactivity check.
    ///
    /// Puts the overlay to sleep when it is awake, has been idle for longer
    /// than the live timeout, and no modal settings surface is open.
    /// Returns `true` if this tick caused the transition.
    pub fn tick(&mut self, now: Instant, modal_open: bool) -> bool {
        if !self.is_awake() || modal_open {
            return false;
        }
        if self.idle_for(now) > self.timeout.get() {
            self.sleep(now)
        } else {
            false
        }
    }

    /// Wakes the overlay.  Returns `true` if the state changed.
    ///
    /// Waking an awake controller only refreshes the activity clock.
    pub fn wake(&mut self, now: Instant) -> bool {
        self.last_activity = now;
        if self.state == OverlayState::Awake {
            return false;
        }
        debug!("overlay waking");
        self.state = OverlayState::Awake;
        true
    }

    /// Puts the overlay to sleep.  Returns `true` if the state changed.
    ///
    /// Sleeping an asleep controller only refreshes the activity clock.
    pub fn sleep(&mut self, now: Instant) -> bool {
        self.last_activity = now;
        if self.state == OverlayState::Asleep {
            return false;
        }
        debug!("overlay going to sleep after {}s timeout", self.timeout.secs());
        self.state = OverlayState::Asleep;
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(timeout_secs: u64) -> (ActivityController, Instant) {
        let t0 = Instant::now();
        (ActivityController::new(t0, LiveTimeout::from_secs(timeout_secs)), t0)
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn test_new_controller_is_awake() {
        let (ctl, t0) = controller(5);
        assert_eq!(ctl.state(), OverlayState::Awake);
        assert_eq!(ctl.last_activity(), t0);
    }

    #[test]
    fn test_live_timeout_clamps_zero_to_one_second() {
        let timeout = LiveTimeout::from_secs(0);
        assert_eq!(timeout.secs(), 1);
        timeout.set_secs(0);
        assert_eq!(timeout.get(), Duration::from_secs(1));
    }

    // ── Awake → Asleep ────────────────────────────────────────────────────────

    #[test]
    fn test_tick_before_timeout_stays_awake() {
        let (mut ctl, t0) = controller(5);
        assert!(!ctl.tick(t0 + Duration::from_secs(5), false));
        assert!(ctl.is_awake());
    }

    #[test]
    fn test_tick_after_timeout_falls_asleep() {
        let (mut ctl, t0) = controller(5);
        assert!(ctl.tick(t0 + Duration::from_millis(5_100), false));
        assert_eq!(ctl.state(), OverlayState::Asleep);
    }

    #[test]
    fn test_tick_with_modal_open_never_sleeps() {
        let (mut ctl, t0) = controller(1);
        assert!(!ctl.tick(t0 + Duration::from_secs(60), true));
        assert!(ctl.is_awake());
    }

    #[test]
    fn test_tick_when_already_asleep_reports_no_transition() {
        let (mut ctl, t0) = controller(1);
        assert!(ctl.tick(t0 + Duration::from_secs(2), false));
        assert!(!ctl.tick(t0 + Duration::from_secs(10), false));
        assert_eq!(ctl.state(), OverlayState::Asleep);
    }

    #[test]
    fn test_record_activity_postpones_sleep() {
        let (mut ctl, t0) = controller(5);
        ctl.record_activity(t0 + Duration::from_secs(4));
        assert!(!ctl.tick(t0 + Duration::from_secs(8), false));
        assert!(ctl.tick(t0 + Duration::from_millis(9_100), false));
    }

    #[test]
    fn test_timeout_change_takes_effect_without_rebuilding() {
        let timeout = LiveTimeout::from_secs(30);
        let t0 = Instant::now();
        let mut ctl = ActivityController::new(t0, timeout.clone());

        assert!(!ctl.tick(t0 + Duration::from_secs(3), false));
        timeout.set_secs(2);
        assert!(ctl.tick(t0 + Duration::from_secs(3), false));
    }

    // ── Asleep → Awake ────────────────────────────────────────────────────────

    #[test]
    fn test_admit_while_awake_forwards_and_refreshes_clock() {
        let (mut ctl, t0) = controller(5);
        let later = t0 + Duration::from_secs(3);
        assert_eq!(ctl.admit(later), Admission::Forward);
        assert_eq!(ctl.last_activity(), later);
    }

    #[test]
    fn test_admit_while_asleep_wakes_and_consumes_event() {
        let (mut ctl, t0) = controller(1);
        ctl.tick(t0 + Duration::from_secs(2), false);

        let arrival = t0 + Duration::from_secs(20);
        assert_eq!(ctl.admit(arrival), Admission::ConsumedByWake);
        assert!(ctl.is_awake());
        assert_eq!(ctl.last_activity(), arrival);
    }

    #[test]
    fn test_only_first_event_after_sleep_is_consumed() {
        let (mut ctl, t0) = controller(1);
        ctl.sleep(t0);
        assert_eq!(ctl.admit(t0), Admission::ConsumedByWake);
        assert_eq!(ctl.admit(t0), Admission::Forward);
    }

    // ── Idempotence ───────────────────────────────────────────────────────────

    #[test]
    fn test_wake_when_awake_is_noop_except_clock() {
        let (mut ctl, t0) = controller(5);
        let later = t0 + Duration::from_secs(1);
        assert!(!ctl.wake(later));
        assert!(ctl.is_awake());
        assert_eq!(ctl.last_activity(), later);
    }

    #[test]
    fn test_sleep_when_asleep_is_noop_except_clock() {
        let (mut ctl, t0) = controller(5);
        assert!(ctl.sleep(t0));
        let later = t0 + Duration::from_secs(1);
        assert!(!ctl.sleep(later));
        assert_eq!(ctl.state(), OverlayState::Asleep);
        assert_eq!(ctl.last_activity(), later);
    }

    #[test]
    fn test_record_activity_does_not_wake() {
        let (mut ctl, t0) = controller(5);
        ctl.sleep(t0);
        ctl.record_activity(t0 + Duration::from_secs(1));
        assert_eq!(ctl.state(), OverlayState::Asleep);
    }
}
