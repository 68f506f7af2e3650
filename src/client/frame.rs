//! Next-frame scheduling for the menu backdrop and the in-game view
//!
//! At most one frame request is outstanding. Switching modes always cancels
//! the pending request before scheduling the next one, so repeated start or
//! stop calls never leave two loops running.

use std::time::{Duration, Instant};

use crate::game::constants::MAP_SIZE;

use super::interpolation::{InterpolatedState, Reconciler};

/// Radius of the menu camera's orbit around the map centre
const MENU_ORBIT_RADIUS: f32 = 800.0;
/// Seconds per radian of the menu camera's orbit
const MENU_ORBIT_PERIOD: f32 = 7.5;

/// Drawing backend; only consumes state
pub trait RenderSink {
    fn render_game(&mut self, state: &InterpolatedState);

    /// Draw the background centred on a moving camera
    fn render_menu(&mut self, camera_x: f32, camera_y: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    Menu,
    InGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub id: u64,
    pub mode: FrameMode,
}

/// Cooperative frame loop driven by the caller's animation clock
#[derive(Debug)]
pub struct FrameLoop {
    pending: Option<FrameRequest>,
    next_id: u64,
    created: Instant,
}

impl FrameLoop {
    /// A fresh loop starts on the menu backdrop
    pub fn new(now: Instant) -> Self {
        let mut frame_loop = Self {
            pending: None,
            next_id: 1,
            created: now,
        };
        frame_loop.request(FrameMode::Menu);
        frame_loop
    }

    pub fn start_rendering(&mut self) {
        self.cancel();
        self.request(FrameMode::InGame);
    }

    pub fn stop_rendering(&mut self) {
        self.cancel();
        self.request(FrameMode::Menu);
    }

    /// Cancel without rescheduling
    pub fn shutdown(&mut self) {
        self.cancel();
    }

    pub fn mode(&self) -> Option<FrameMode> {
        self.pending.map(|r| r.mode)
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Number of loops that will draw on the next frame: 0 or 1
    pub fn active_loops(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    fn request(&mut self, mode: FrameMode) {
        let id = self.next_id;
        self.next_id += 1;
        self.pending = Some(FrameRequest { id, mode });
    }

    fn cancel(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    /// Run the pending frame, if any, and schedule the same mode again.
    /// Returns whether anything was drawn.
    pub fn on_animation_frame<R: RenderSink>(
        &mut self,
        now: Instant,
        reconciler: &mut Reconciler,
        sink: &mut R,
    ) -> bool {
        let Some(request) = self.cancel() else {
            return false;
        };

        match request.mode {
            FrameMode::InGame => {
                if let Some(state) = reconciler.current_state(now) {
                    sink.render_game(&state);
                }
            }
            FrameMode::Menu => {
                let (x, y) = menu_camera(now.saturating_duration_since(self.created));
                sink.render_menu(x, y);
            }
        }

        self.request(request.mode);
        true
    }
}

/// Camera position for the menu backdrop, orbiting the map centre
pub fn menu_camera(elapsed: Duration) -> (f32, f32) {
    let t = elapsed.as_secs_f32() / MENU_ORBIT_PERIOD;
    (
        MAP_SIZE / 2.0 + MENU_ORBIT_RADIUS * t.cos(),
        MAP_SIZE / 2.0 + MENU_ORBIT_RADIUS * t.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{PlayerId, SelfView, Snapshot};

    #[derive(Default)]
    struct CountingSink {
        game_frames: usize,
        menu_frames: usize,
    }

    impl RenderSink for CountingSink {
        fn render_game(&mut self, _state: &InterpolatedState) {
            self.game_frames += 1;
        }

        fn render_menu(&mut self, _camera_x: f32, _camera_y: f32) {
            self.menu_frames += 1;
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            t: 1000,
            tick: 1,
            me: SelfView {
                id: PlayerId(1),
                username: "me".into(),
                x: 10.0,
                y: 10.0,
                direction: 0.0,
                hp: 100,
                score: 0.0,
            },
            others: vec![],
            bullets: vec![],
            leaderboard: vec![],
        }
    }

    #[test]
    fn starts_on_menu() {
        let frames = FrameLoop::new(Instant::now());
        assert_eq!(frames.mode(), Some(FrameMode::Menu));
        assert_eq!(frames.active_loops(), 1);
    }

    #[test]
    fn repeated_start_and_stop_leave_one_loop() {
        let mut frames = FrameLoop::new(Instant::now());

        frames.start_rendering();
        frames.start_rendering();
        assert_eq!(frames.active_loops(), 1);
        assert_eq!(frames.mode(), Some(FrameMode::InGame));

        frames.stop_rendering();
        frames.stop_rendering();
        assert_eq!(frames.active_loops(), 1);
        assert_eq!(frames.mode(), Some(FrameMode::Menu));

        frames.shutdown();
        frames.shutdown();
        assert_eq!(frames.active_loops(), 0);
    }

    #[test]
    fn switching_mode_replaces_the_pending_request() {
        let mut frames = FrameLoop::new(Instant::now());
        let menu = frames.pending().unwrap();
        frames.start_rendering();
        let game = frames.pending().unwrap();
        assert_ne!(menu.id, game.id);
        assert_eq!(game.mode, FrameMode::InGame);
    }

    #[test]
    fn each_frame_draws_once_and_reschedules() {
        let now = Instant::now();
        let mut frames = FrameLoop::new(now);
        let mut reconciler = Reconciler::default();
        let mut sink = CountingSink::default();

        assert!(frames.on_animation_frame(now, &mut reconciler, &mut sink));
        assert!(frames.on_animation_frame(now, &mut reconciler, &mut sink));
        assert_eq!(sink.menu_frames, 2);
        assert_eq!(frames.active_loops(), 1);

        reconciler.push(snapshot(), now);
        frames.start_rendering();
        assert!(frames.on_animation_frame(now, &mut reconciler, &mut sink));
        assert_eq!(sink.game_frames, 1);
        assert_eq!(sink.menu_frames, 2);
        assert_eq!(frames.mode(), Some(FrameMode::InGame));
    }

    #[test]
    fn nothing_runs_after_shutdown() {
        let now = Instant::now();
        let mut frames = FrameLoop::new(now);
        let mut sink = CountingSink::default();
        frames.shutdown();

        assert!(!frames.on_animation_frame(now, &mut Reconciler::default(), &mut sink));
        assert_eq!(sink.menu_frames, 0);
        assert_eq!(frames.active_loops(), 0);
    }

    #[test]
    fn menu_camera_orbits_the_centre() {
        let (x, y) = menu_camera(Duration::ZERO);
        assert_eq!((x, y), (MAP_SIZE / 2.0 + MENU_ORBIT_RADIUS, MAP_SIZE / 2.0));

        let (x, y) = menu_camera(Duration::from_secs(100));
        let r = ((x - MAP_SIZE / 2.0).powi(2) + (y - MAP_SIZE / 2.0).powi(2)).sqrt();
        assert!((r - MENU_ORBIT_RADIUS).abs() < 0.1);
    }
}
