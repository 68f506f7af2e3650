//! Arena Bot - headless client that joins the arena and wanders around
//!
//! Exercises the full client path: session, snapshot interpolation, frame
//! loop and input capture. Frames are "rendered" into the log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Notify;
use tracing::{debug, error, info, trace};

use arena_server::client::{
    ClientSession, FrameLoop, InputCapture, InterpolatedState, RenderSink,
};
use arena_server::config::ClientConfig;
use arena_server::init_tracing;

/// Roughly one display refresh
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// How often the bot picks a new heading
const STEER_INTERVAL: Duration = Duration::from_secs(1);
/// Time spent on the menu before rejoining
const RESPAWN_DELAY: Duration = Duration::from_secs(2);

/// Writes frames to the log instead of a screen
#[derive(Default)]
struct LogRenderer {
    frames: u64,
    menu_frames: u64,
}

impl RenderSink for LogRenderer {
    fn render_game(&mut self, state: &InterpolatedState) {
        self.frames += 1;
        if self.frames % 60 == 0 {
            debug!(
                x = state.me.x,
                y = state.me.y,
                hp = state.me.hp,
                score = state.me.score,
                others = state.others.len(),
                bullets = state.bullets.len(),
                "Frame"
            );
        }
    }

    fn render_menu(&mut self, camera_x: f32, camera_y: f32) {
        self.menu_frames += 1;
        trace!(camera_x, camera_y, "Menu frame");
    }
}

/// Resolves at the respawn deadline; never while still in game
async fn respawn_wait(at: Option<tokio::time::Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env();
    init_tracing(&config.log_level);

    let game_over = Arc::new(Notify::new());
    let notify = game_over.clone();

    let session = match ClientSession::connect(&config.arena_url, move || notify.notify_one()).await
    {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Could not reach the arena");
            return Err(e.into());
        }
    };

    let mut frames = FrameLoop::new(Instant::now());
    let mut input = InputCapture::new();
    let mut renderer = LogRenderer::default();
    let reconciler = session.reconciler();

    session.join(&config.bot_name)?;
    frames.start_rendering();
    input.start();
    info!(
        connection_id = %session.connection_id(),
        name = %config.bot_name,
        "Joined arena"
    );

    let mut frame_timer = tokio::time::interval(FRAME_INTERVAL);
    let mut steer_timer = tokio::time::interval(STEER_INTERVAL);
    // Set while the menu backdrop runs between lives
    let mut respawn_at: Option<tokio::time::Instant> = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frame_timer.tick() => {
                frames.on_animation_frame(Instant::now(), &mut reconciler.lock(), &mut renderer);
            }
            _ = steer_timer.tick() => {
                let direction = {
                    let mut rng = rand::thread_rng();
                    if rng.gen_bool(0.1) {
                        None
                    } else {
                        Some(rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI))
                    }
                };
                if let Some(msg) = input.update(direction) {
                    if let Err(e) = session.send(msg) {
                        debug!(error = %e, "Steering update dropped");
                    }
                }
            }
            _ = game_over.notified() => {
                info!(frames = renderer.frames, "Game over");
                input.stop();
                frames.stop_rendering();
                respawn_at = Some(tokio::time::Instant::now() + RESPAWN_DELAY);
            }
            _ = respawn_wait(respawn_at) => {
                respawn_at = None;

                if !session.is_connected() {
                    error!("Lost connection to the arena");
                    break;
                }

                session.join(&config.bot_name)?;
                frames.start_rendering();
                input.start();
                info!(menu_frames = renderer.menu_frames, "Rejoined arena");
            }
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, leaving arena");
                break;
            }
        }
    }

    frames.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_server::client::{FrameMode, Reconciler};

    #[tokio::test(start_paused = true)]
    async fn menu_keeps_drawing_until_respawn() {
        let mut frames = FrameLoop::new(Instant::now());
        let mut reconciler = Reconciler::default();
        let mut renderer = LogRenderer::default();
        let mut frame_timer = tokio::time::interval(FRAME_INTERVAL);

        frames.start_rendering();
        frames.stop_rendering();
        let respawn_at = Some(tokio::time::Instant::now() + RESPAWN_DELAY);

        loop {
            tokio::select! {
                _ = frame_timer.tick() => {
                    frames.on_animation_frame(Instant::now(), &mut reconciler, &mut renderer);
                }
                _ = respawn_wait(respawn_at) => break,
            }
        }

        let expected = RESPAWN_DELAY.as_millis() / FRAME_INTERVAL.as_millis();
        assert!(renderer.menu_frames as u128 >= expected - 2);
        assert_eq!(renderer.frames, 0);
        assert_eq!(frames.mode(), Some(FrameMode::Menu));
    }

    #[tokio::test(start_paused = true)]
    async fn no_respawn_while_in_game() {
        let waited = tokio::time::timeout(Duration::from_secs(60), respawn_wait(None)).await;
        assert!(waited.is_err());
    }
}
