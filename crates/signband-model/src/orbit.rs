//! Orbit animation.
//!
//! The whole band turns about the x axis by a fixed angle per display refresh.
//! There is no delta-time compensation: on a slower display the band turns
//! slower.

use std::f64::consts::TAU;

use glam::{Mat4, Vec3};

/// Lifecycle of the render loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Shared rotation phase for the sign, arrow and picking meshes.
///
/// The phase is kept in `f64` and wrapped into `[0, 2π)` every tick so long
/// sessions do not drift.
#[derive(Debug, Clone)]
pub struct AnimationLoop {
    state: LoopState,
    phase: f64,
    speed: f64,
    ticks: u64,
}

impl AnimationLoop {
    /// Starts a running loop at phase zero. `speed` is radians per tick.
    pub fn new(speed: f32) -> Self {
        Self::with_phase(speed, 0.0)
    }

    pub fn with_phase(speed: f32, phase: f32) -> Self {
        Self {
            state: LoopState::Running,
            phase: (phase as f64).rem_euclid(TAU),
            speed: speed as f64,
            ticks: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Current phase in radians, `[0, 2π)`.
    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase as f32
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed as f32
    }

    /// Ticks applied since the loop started.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks for one full revolution, `None` when the band is not moving.
    pub fn revolution_ticks(&self) -> Option<f64> {
        if self.speed == 0.0 {
            None
        } else {
            Some(TAU / self.speed.abs())
        }
    }

    /// Advances one display refresh and returns the new phase.
    ///
    /// Once stopped the loop ignores ticks and returns `None`.
    pub fn tick(&mut self) -> Option<f32> {
        if self.state == LoopState::Stopped {
            return None;
        }
        self.phase = (self.phase + self.speed).rem_euclid(TAU);
        self.ticks = self.ticks.wrapping_add(1);
        Some(self.phase as f32)
    }

    /// Stops the loop. Idempotent.
    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            log::debug!("animation loop stopped after {} ticks", self.ticks);
        }
        self.state = LoopState::Stopped;
    }
}

/// Rotation of the band about its axis by `angle` radians.
#[inline]
pub fn orbit_rotation(angle: f32) -> Mat4 {
    Mat4::from_rotation_x(angle)
}

/// Orbit angle of one instance: the shared phase plus its spread offset.
#[inline]
pub fn instance_angle(phase: f32, pct_offset: f32, orbit_spread: f32) -> f32 {
    phase + orbit_spread * pct_offset * std::f32::consts::TAU
}

/// World-space position of a point on the band after rotating by `angle`.
#[inline]
pub fn rotate_on_band(point: Vec3, angle: f32) -> Vec3 {
    orbit_rotation(angle).transform_point3(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(std::f32::consts::TAU);
        d.min(std::f32::consts::TAU - d)
    }

    #[test]
    fn tick_advances_by_speed_modulo_tau() {
        let mut l = AnimationLoop::new(-0.0005);
        let mut prev = l.phase();
        for _ in 0..10_000 {
            let next = l.tick().unwrap();
            assert!((0.0..std::f32::consts::TAU).contains(&next));
            let step = (next - prev).rem_euclid(std::f32::consts::TAU);
            let expected = (-0.0005f32).rem_euclid(std::f32::consts::TAU);
            assert!((step - expected).abs() < 1e-3, "step {step} expected {expected}");
            prev = next;
        }
        assert_eq!(l.ticks(), 10_000);
    }

    #[test]
    fn full_revolution_returns_to_start() {
        let speed = std::f32::consts::TAU / 600.0;
        let mut l = AnimationLoop::with_phase(speed, 1.25);
        let ticks = l.revolution_ticks().unwrap().round() as usize;
        assert_eq!(ticks, 600);
        for _ in 0..ticks {
            l.tick();
        }
        assert!(angular_distance(l.phase(), 1.25) < 1e-4);
    }

    #[test]
    fn default_speed_revolution_returns_to_start() {
        let mut l = AnimationLoop::new(-0.0005);
        let exact = l.revolution_ticks().unwrap();
        for _ in 0..exact.round() as usize {
            l.tick();
        }
        // The leftover fraction of a tick bounds the error.
        let bound = ((exact - exact.round()).abs() * 0.0005) as f32 + 1e-4;
        assert!(angular_distance(l.phase(), 0.0) <= bound);
    }

    #[test]
    fn stopped_loop_ignores_ticks() {
        let mut l = AnimationLoop::new(0.1);
        l.tick();
        l.stop();
        let phase = l.phase();
        assert_eq!(l.tick(), None);
        assert_eq!(l.phase(), phase);
        assert_eq!(l.state(), LoopState::Stopped);
        l.stop();
        assert!(!l.is_running());
    }

    #[test]
    fn zero_speed_has_no_revolution() {
        assert!(AnimationLoop::new(0.0).revolution_ticks().is_none());
    }

    #[test]
    fn rotation_on_band_keeps_radius() {
        let p = Vec3::new(5.0, 0.0, 300.0);
        let q = rotate_on_band(p, 1.0);
        assert!((q.x - 5.0).abs() < 1e-4);
        assert!((Vec3::new(0.0, q.y, q.z).length() - 300.0).abs() < 1e-3);
    }

    #[test]
    fn spread_offsets_instances_along_orbit() {
        assert_eq!(instance_angle(0.5, 0.25, 0.0), 0.5);
        let a = instance_angle(0.0, 0.5, 1.0);
        assert!((a - std::f32::consts::PI).abs() < 1e-6);
    }
}
