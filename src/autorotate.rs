// autorotate.rs — 空闲自动旋转：延时启动 + 定时 tick
//
// 单线程事件循环驱动：调度器只记录截止时间，由宿主在 poll(now) 中推进。

use crate::angle::wrap_radians;
use crate::speed::AnimationSpeed;
use std::time::{Duration, Instant};

/// 每 tick 将 phi 向赤道衰减 1/200
pub const PHI_DECAY: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutorotateState {
    Idle,
    /// One-shot start timer pending.
    Armed { fire_at: Instant },
    /// Repeating tick pending.
    Rotating { next_tick: Instant },
}

/// What a call to [`AutorotateScheduler::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutorotateEvent {
    Started,
    Tick { theta: f64, phi: f64 },
}

#[derive(Debug, Clone)]
pub struct AutorotateScheduler {
    state: AutorotateState,
    delay: Option<Duration>,
    speed: AnimationSpeed,
    fps: u32,
    increment: f64,
}

impl AutorotateScheduler {
    pub fn new(delay: Option<Duration>, speed: AnimationSpeed, fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            state: AutorotateState::Idle,
            delay,
            speed,
            fps,
            increment: speed.per_tick(fps),
        }
    }

    pub fn state(&self) -> AutorotateState {
        self.state
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self.state, AutorotateState::Rotating { .. })
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, AutorotateState::Armed { .. })
    }

    pub fn speed(&self) -> AnimationSpeed {
        self.speed
    }

    /// Angle added to theta on each tick (rad).
    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }

    pub fn set_speed(&mut self, speed: AnimationSpeed) {
        self.speed = speed;
        self.increment = speed.per_tick(self.fps);
    }

    /// 已排定的 tick 不重新调度，下一次 tick 起生效
    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps.max(1);
        self.increment = self.speed.per_tick(self.fps);
    }

    pub fn set_delay(&mut self, delay: Option<Duration>) {
        self.delay = delay;
    }

    /// After a panorama finished loading. No-op if the delay is disabled or
    /// rotation is already running.
    pub fn arm(&mut self, now: Instant) -> bool {
        match (self.state, self.delay) {
            (AutorotateState::Rotating { .. }, _) | (_, None) => false,
            (_, Some(delay)) => {
                self.state = AutorotateState::Armed { fire_at: now + delay };
                true
            }
        }
    }

    /// User interaction: cancels any pending timer. Returns `true` if rotation
    /// was running (and has now stopped).
    pub fn interrupt(&mut self) -> bool {
        let was_rotating = self.is_rotating();
        self.state = AutorotateState::Idle;
        was_rotating
    }

    /// Starts rotating; the first tick is due immediately.
    pub fn start(&mut self, now: Instant) {
        self.state = AutorotateState::Rotating { next_tick: now };
    }

    pub fn stop(&mut self) -> bool {
        self.interrupt()
    }

    /// Rotating ↔ Idle. A pending start timer counts as Idle. Returns the new
    /// rotating flag.
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_rotating() {
            self.stop();
            false
        } else {
            self.start(now);
            true
        }
    }

    /// One animation step: ease phi towards the equator, advance theta.
    pub fn step(&self, theta: f64, phi: f64) -> (f64, f64) {
        let phi = phi - phi / PHI_DECAY;
        let theta = wrap_radians(theta + self.increment);
        (theta, phi)
    }

    /// Fires whatever is due at `now`. At most one tick runs per call; the
    /// next one is scheduled a period after `now`.
    pub fn poll(&mut self, now: Instant, theta: f64, phi: f64) -> Option<AutorotateEvent> {
        match self.state {
            AutorotateState::Idle => None,
            AutorotateState::Armed { fire_at } => {
                if now < fire_at {
                    return None;
                }
                self.start(now);
                Some(AutorotateEvent::Started)
            }
            AutorotateState::Rotating { next_tick } => {
                if now < next_tick {
                    return None;
                }
                let (theta, phi) = self.step(theta, phi);
                self.state = AutorotateState::Rotating { next_tick: now + self.period() };
                Some(AutorotateEvent::Tick { theta, phi })
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            AutorotateState::Idle => None,
            AutorotateState::Armed { fire_at } => Some(fire_at),
            AutorotateState::Rotating { next_tick } => Some(next_tick),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    fn scheduler() -> AutorotateScheduler {
        AutorotateScheduler::new(Some(Duration::from_millis(2000)), AnimationSpeed(6.0), 60)
    }

    #[test]
    fn armed_timer_fires_after_delay() {
        let t0 = Instant::now();
        let mut s = scheduler();
        assert!(s.arm(t0));
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(2000)));
        assert_eq!(s.poll(t0 + Duration::from_millis(1999), 0.0, 0.0), None);
        assert_eq!(
            s.poll(t0 + Duration::from_millis(2000), 0.0, 0.0),
            Some(AutorotateEvent::Started)
        );
        assert!(s.is_rotating());
    }

    #[test]
    fn disabled_delay_never_arms() {
        let mut s = AutorotateScheduler::new(None, AnimationSpeed::default(), 60);
        assert!(!s.arm(Instant::now()));
        assert_eq!(s.state(), AutorotateState::Idle);
    }

    #[test]
    fn ticks_decay_phi_and_advance_theta() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.start(t0);
        let (mut theta, mut phi) = (TAU - 0.05, 0.8);
        let mut now = t0;
        for _ in 0..200 {
            let Some(AutorotateEvent::Tick { theta: t, phi: p }) = s.poll(now, theta, phi) else {
                panic!("expected tick");
            };
            assert!(p.abs() <= phi.abs());
            let advanced = (t - theta).rem_euclid(TAU);
            assert_abs_diff_eq!(advanced, 0.1, epsilon = 1e-9);
            assert!((0.0..TAU).contains(&t));
            theta = t;
            phi = p;
            now = s.next_deadline().unwrap();
        }
        assert!(phi < 0.8 * 0.4);
    }

    #[test]
    fn tick_not_due_yet() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.start(t0);
        assert!(s.poll(t0, 0.0, 0.0).is_some());
        assert!(s.poll(t0 + Duration::from_millis(5), 0.0, 0.0).is_none());
    }

    #[test]
    fn interrupt_cancels_everything() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.arm(t0);
        assert!(!s.interrupt());
        assert_eq!(s.poll(t0 + Duration::from_secs(10), 0.0, 0.0), None);

        s.start(t0);
        assert!(s.interrupt());
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.poll(t0 + Duration::from_secs(10), 0.0, 0.0), None);
    }

    #[test]
    fn toggle_from_armed_starts() {
        let t0 = Instant::now();
        let mut s = scheduler();
        s.arm(t0);
        assert!(s.toggle(t0));
        assert!(s.is_rotating());
        assert!(!s.toggle(t0));
        assert_eq!(s.state(), AutorotateState::Idle);
    }

    #[test]
    fn fps_change_rederives_increment() {
        let mut s = scheduler();
        assert_abs_diff_eq!(s.increment(), 0.1, epsilon = 1e-12);
        s.set_fps(30);
        assert_abs_diff_eq!(s.increment(), 0.2, epsilon = 1e-12);
        assert_eq!(s.period(), Duration::from_secs_f64(1.0 / 30.0));
    }
}
