use std::time::{Duration, Instant};

// ============================================================================
// Constants
// ============================================================================

pub const TICK_RATE: Duration = Duration::from_millis(100);
pub const DEFAULT_PHASE_SECS: u64 = 4;
const EXPANDED_SCALE: f64 = 1.15;

// ============================================================================
// Phases & Events
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    BreatheIn,
    HoldIn,
    BreatheOut,
    HoldOut,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Self::BreatheIn, Self::HoldIn, Self::BreatheOut, Self::HoldOut];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Text shown on screen and spoken aloud when the phase begins.
    pub fn label(self) -> &'static str {
        match self {
            Self::BreatheIn => "Breathe In",
            Self::HoldIn | Self::HoldOut => "Hold",
            Self::BreatheOut => "Breathe Out",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleEvent {
    PhaseStarted(Phase),
}

/// Outcome of [`BreathingCycle::toggle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Started(CycleEvent),
    Stopped(Duration),
}

// ============================================================================
// Sequencer
// ============================================================================

#[derive(Clone, Copy, Debug)]
struct Run {
    session_start: Instant,
    phase_start: Instant,
    paused_at: Option<Instant>,
}

/// Four-phase box-breathing stopwatch.
///
/// Driven by polling: the caller passes the current instant to [`tick`],
/// which recomputes the countdown and total from the stored anchors rather
/// than decrementing counters, so a slow or irregular poll never drifts.
/// Phase boundaries sit at `session_start + k * phase_duration`; a pause
/// shifts both anchors forward by the paused gap.
///
/// [`tick`]: BreathingCycle::tick
#[derive(Clone, Debug)]
pub struct BreathingCycle {
    phase_duration: Duration,
    phase_index: usize,
    countdown: u64,
    total: Duration,
    run: Option<Run>,
}

impl Default for BreathingCycle {
    fn default() -> Self {
        Self::new(DEFAULT_PHASE_SECS)
    }
}

impl BreathingCycle {
    pub fn new(phase_secs: u64) -> Self {
        let phase_secs = phase_secs.max(1);
        Self {
            phase_duration: Duration::from_secs(phase_secs),
            phase_index: 0,
            countdown: phase_secs,
            total: Duration::ZERO,
            run: None,
        }
    }

    pub fn phase_secs(&self) -> u64 {
        self.phase_duration.as_secs()
    }

    pub fn set_phase_duration(&mut self, secs: u64) {
        self.phase_duration = Duration::from_secs(secs.max(1));
        if self.run.is_none() {
            self.countdown = self.phase_secs();
        } else {
            self.countdown = self.countdown.min(self.phase_secs());
        }
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.run.is_some_and(|r| r.paused_at.is_some())
    }

    pub fn phase(&self) -> Phase {
        Phase::from_index(self.phase_index)
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    /// Whole seconds left in the current phase, in `0..=phase_secs`.
    pub fn countdown(&self) -> u64 {
        self.countdown
    }

    /// Running time of the current session, excluding pauses.
    pub fn total_time(&self) -> Duration {
        self.total
    }

    /// Relative size of the breathing circle: expanded while inhaling and
    /// during the hold that follows.
    pub fn scale(&self) -> f64 {
        if self.is_active() && self.phase_index() < 2 {
            EXPANDED_SCALE
        } else {
            1.0
        }
    }

    pub fn start(&mut self, now: Instant) -> CycleEvent {
        self.run = Some(Run {
            session_start: now,
            phase_start: now,
            paused_at: None,
        });
        self.phase_index = 0;
        self.countdown = self.phase_secs();
        self.total = Duration::ZERO;
        CycleEvent::PhaseStarted(Phase::BreatheIn)
    }

    /// Ends the session and returns how long it ran. Returns `None` when no
    /// session was active.
    pub fn stop(&mut self, now: Instant) -> Option<Duration> {
        let run = self.run.take()?;
        let end = run.paused_at.unwrap_or(now);
        self.total = end.saturating_duration_since(run.session_start);
        self.countdown = self.phase_secs();
        Some(self.total)
    }

    pub fn toggle(&mut self, now: Instant) -> Transition {
        match self.stop(now) {
            Some(duration) => Transition::Stopped(duration),
            None => Transition::Started(self.start(now)),
        }
    }

    /// Freezes the session. Returns `false` if there was nothing to pause.
    pub fn pause(&mut self, now: Instant) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        if run.paused_at.is_some() {
            return false;
        }
        run.paused_at = Some(now);
        self.total = now.saturating_duration_since(run.session_start);
        true
    }

    /// Continues a paused session in the same phase with the same progress.
    pub fn resume(&mut self, now: Instant) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        let Some(paused_at) = run.paused_at.take() else {
            return false;
        };
        let gap = now.saturating_duration_since(paused_at);
        run.session_start += gap;
        run.phase_start += gap;
        true
    }

    /// Polling step. Emits an event when a new phase began since the last
    /// tick. After a long stall several boundaries may be crossed at once;
    /// only the phase that is current afterwards is reported.
    pub fn tick(&mut self, now: Instant) -> Option<CycleEvent> {
        let run = self.run.as_mut()?;
        if run.paused_at.is_some() {
            return None;
        }

        self.total = now.saturating_duration_since(run.session_start);

        let mut advanced = false;
        while now.saturating_duration_since(run.phase_start) >= self.phase_duration {
            run.phase_start += self.phase_duration;
            self.phase_index = (self.phase_index + 1) % Phase::ALL.len();
            advanced = true;
        }

        let into_phase = now.saturating_duration_since(run.phase_start).as_secs();
        self.countdown = self.phase_secs().saturating_sub(into_phase);

        advanced.then(|| CycleEvent::PhaseStarted(self.phase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn start_announces_breathe_in() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        assert_eq!(cycle.start(t0), CycleEvent::PhaseStarted(Phase::BreatheIn));
        assert!(cycle.is_active());
        assert_eq!(cycle.countdown(), 4);
        assert_eq!(cycle.phase().label(), "Breathe In");
    }

    #[test]
    fn countdown_follows_whole_seconds() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);

        assert_eq!(cycle.tick(t0 + ms(100)), None);
        assert_eq!(cycle.countdown(), 4);
        cycle.tick(t0 + ms(1500));
        assert_eq!(cycle.countdown(), 3);
        cycle.tick(t0 + ms(3900));
        assert_eq!(cycle.countdown(), 1);
        assert_eq!(cycle.total_time(), ms(3900));
    }

    #[test]
    fn phases_advance_in_order_and_wrap() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);

        let mut spoken = Vec::new();
        let mut t = t0;
        while t < t0 + Duration::from_secs(17) {
            t += TICK_RATE;
            if let Some(CycleEvent::PhaseStarted(p)) = cycle.tick(t) {
                spoken.push(p);
            }
        }

        assert_eq!(
            spoken,
            vec![Phase::HoldIn, Phase::BreatheOut, Phase::HoldOut, Phase::BreatheIn]
        );
        assert_eq!(cycle.phase_index(), 0);
    }

    #[test]
    fn boundaries_do_not_drift_with_late_ticks() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);

        // 250ms late on the first boundary, next boundary still lands at 8s.
        assert!(cycle.tick(t0 + ms(4250)).is_some());
        assert_eq!(cycle.tick(t0 + ms(7950)), None);
        assert_eq!(cycle.countdown(), 1);
        assert!(cycle.tick(t0 + ms(8000)).is_some());
        assert_eq!(cycle.phase(), Phase::BreatheOut);
    }

    #[test]
    fn stalled_tick_reports_only_current_phase() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);

        assert_eq!(
            cycle.tick(t0 + ms(9000)),
            Some(CycleEvent::PhaseStarted(Phase::BreatheOut))
        );
        assert_eq!(cycle.countdown(), 3);
    }

    #[test]
    fn pause_freezes_progress_until_resume() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);
        cycle.tick(t0 + ms(2000));

        assert!(cycle.pause(t0 + ms(2000)));
        assert!(cycle.is_paused());
        assert_eq!(cycle.tick(t0 + ms(30_000)), None);
        assert_eq!(cycle.total_time(), ms(2000));

        assert!(cycle.resume(t0 + ms(10_000)));
        assert_eq!(cycle.tick(t0 + ms(11_000)), None);
        assert_eq!(cycle.phase(), Phase::BreatheIn);
        assert_eq!(cycle.countdown(), 1);
        assert_eq!(cycle.total_time(), ms(3000));

        assert!(cycle.tick(t0 + ms(12_000)).is_some());
        assert_eq!(cycle.phase(), Phase::HoldIn);
    }

    #[test]
    fn pause_and_resume_need_an_active_session() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        assert!(!cycle.pause(t0));
        assert!(!cycle.resume(t0));
        cycle.start(t0);
        assert!(!cycle.resume(t0));
        assert!(cycle.pause(t0));
        assert!(!cycle.pause(t0));
    }

    #[test]
    fn stop_returns_duration_and_resets_countdown() {
        let mut cycle = BreathingCycle::new(5);
        let t0 = Instant::now();
        cycle.start(t0);
        cycle.tick(t0 + ms(7200));

        assert_eq!(cycle.stop(t0 + ms(7300)), Some(ms(7300)));
        assert!(!cycle.is_active());
        assert_eq!(cycle.countdown(), 5);
        assert_eq!(cycle.stop(t0 + ms(8000)), None);
    }

    #[test]
    fn stop_while_paused_excludes_pause() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);
        cycle.pause(t0 + ms(3000));
        assert_eq!(cycle.stop(t0 + ms(60_000)), Some(ms(3000)));
    }

    #[test]
    fn new_session_starts_from_zero() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);
        cycle.tick(t0 + ms(6000));
        cycle.stop(t0 + ms(6000));

        let t1 = t0 + ms(20_000);
        cycle.start(t1);
        assert_eq!(cycle.total_time(), Duration::ZERO);
        assert_eq!(cycle.phase_index(), 0);
        cycle.tick(t1 + ms(500));
        assert_eq!(cycle.total_time(), ms(500));
    }

    #[test]
    fn toggle_alternates_start_and_stop() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        assert_eq!(
            cycle.toggle(t0),
            Transition::Started(CycleEvent::PhaseStarted(Phase::BreatheIn))
        );
        assert_eq!(cycle.toggle(t0 + ms(1200)), Transition::Stopped(ms(1200)));
    }

    #[test]
    fn phase_duration_is_clamped_and_shown_when_idle() {
        let mut cycle = BreathingCycle::new(0);
        assert_eq!(cycle.phase_secs(), 1);
        cycle.set_phase_duration(7);
        assert_eq!(cycle.countdown(), 7);
    }

    #[test]
    fn shorter_phase_mid_session_applies_at_once() {
        let mut cycle = BreathingCycle::new(10);
        let t0 = Instant::now();
        cycle.start(t0);
        assert_eq!(cycle.tick(t0 + ms(7500)), None);
        assert_eq!(cycle.countdown(), 3);

        cycle.set_phase_duration(4);
        assert!(cycle.countdown() <= 4);
        assert_eq!(cycle.phase(), Phase::BreatheIn);

        assert_eq!(cycle.tick(t0 + ms(7600)), Some(CycleEvent::PhaseStarted(Phase::HoldIn)));
        assert_eq!(cycle.phase_index(), 1);
        assert_eq!(cycle.countdown(), 1);
        assert_eq!(cycle.total_time(), ms(7600));
    }

    #[test]
    fn longer_phase_mid_session_keeps_countdown() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        cycle.start(t0);
        cycle.tick(t0 + ms(1000));
        cycle.set_phase_duration(8);
        assert_eq!(cycle.countdown(), 3);

        assert_eq!(cycle.tick(t0 + ms(5000)), None);
        assert_eq!(cycle.phase(), Phase::BreatheIn);
        assert_eq!(cycle.countdown(), 3);
    }

    #[test]
    fn scale_expands_on_inhale_and_first_hold() {
        let mut cycle = BreathingCycle::new(4);
        let t0 = Instant::now();
        assert_eq!(cycle.scale(), 1.0);
        cycle.start(t0);
        assert_eq!(cycle.scale(), EXPANDED_SCALE);
        cycle.tick(t0 + ms(4000));
        assert_eq!(cycle.scale(), EXPANDED_SCALE);
        cycle.tick(t0 + ms(8000));
        assert_eq!(cycle.scale(), 1.0);
        cycle.tick(t0 + ms(12_000));
        assert_eq!(cycle.phase(), Phase::HoldOut);
        assert_eq!(cycle.scale(), 1.0);
    }
}
