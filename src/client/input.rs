//! Pointer-to-direction input capture with change detection

use crate::ws::protocol::ClientMsg;

/// Turns pointer samples into INPUT messages while capturing
#[derive(Debug, Default)]
pub struct InputCapture {
    capturing: bool,
    /// Last direction handed out for sending; `None` before the first one
    last_sent: Option<Option<f32>>,
}

impl InputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin capturing. The first sample after a start is always sent.
    pub fn start(&mut self) {
        if !self.capturing {
            self.capturing = true;
            self.last_sent = None;
        }
    }

    pub fn stop(&mut self) {
        self.capturing = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Direction from the screen centre towards the pointer, 0 = up
    pub fn direction_from_pointer(x: f32, y: f32, width: f32, height: f32) -> f32 {
        (x - width / 2.0).atan2(height / 2.0 - y)
    }

    /// Record a sample; returns the message to send if it changed anything
    pub fn update(&mut self, direction: Option<f32>) -> Option<ClientMsg> {
        if !self.capturing || self.last_sent == Some(direction) {
            return None;
        }
        self.last_sent = Some(direction);
        Some(ClientMsg::Input { direction })
    }

    pub fn on_pointer(&mut self, x: f32, y: f32, width: f32, height: f32) -> Option<ClientMsg> {
        self.update(Some(Self::direction_from_pointer(x, y, width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn pointer_directions_match_ship_heading() {
        let up = InputCapture::direction_from_pointer(400.0, 100.0, 800.0, 600.0);
        let right = InputCapture::direction_from_pointer(700.0, 300.0, 800.0, 600.0);
        let down = InputCapture::direction_from_pointer(400.0, 500.0, 800.0, 600.0);
        assert!(up.abs() < 1e-6);
        assert!((right - FRAC_PI_2).abs() < 1e-6);
        assert!((down.abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn nothing_is_sent_unless_capturing() {
        let mut input = InputCapture::new();
        assert!(input.update(Some(1.0)).is_none());

        input.start();
        assert_eq!(input.update(Some(1.0)), Some(ClientMsg::Input { direction: Some(1.0) }));

        input.stop();
        assert!(input.update(Some(2.0)).is_none());
    }

    #[test]
    fn unchanged_direction_is_not_resent() {
        let mut input = InputCapture::new();
        input.start();
        assert!(input.update(Some(1.0)).is_some());
        assert!(input.update(Some(1.0)).is_none());
        assert!(input.update(None).is_some());
        assert!(input.update(None).is_none());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut input = InputCapture::new();
        input.start();
        assert!(input.update(Some(1.0)).is_some());
        input.start();
        assert!(input.update(Some(1.0)).is_none());

        input.stop();
        input.stop();
        assert!(!input.is_capturing());

        input.start();
        assert!(input.update(Some(1.0)).is_some());
    }
}
