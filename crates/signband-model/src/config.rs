//! Scene configuration.
//!
//! Every field has a default so a config file only needs to name what it
//! overrides. The defaults describe a 300-unit ring of signs seen from
//! `(400, 0, -400)`.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closed interval `[min, max]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    #[inline]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn len(self) -> f32 {
        self.max - self.min
    }

    /// Uniform sample in `[min, max]`. A degenerate span always yields `min`.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f32 {
        self.min + rng.random::<f32>() * self.len()
    }

    fn validate(self, field: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NonFinite { field });
        }
        if self.min > self.max {
            return Err(ConfigError::InvertedRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Placement of signs on the circular band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Ring radius in the y/z plane.
    pub radius: f32,
    /// Range for the x coordinate (across the band).
    pub x_span: Span,
    /// Random sign width multiplier (x scale).
    pub width_scale: Span,
    /// Random sign depth multiplier (z scale).
    pub depth_scale: Span,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            radius: 300.0,
            x_span: Span::new(-30.0, 30.0),
            width_scale: Span::new(0.0, 2.0),
            depth_scale: Span::new(0.5, 1.0),
        }
    }
}

/// Upper bound on grid lines along one axis.
pub const MAX_GRID_LINES: usize = 4096;

/// Reference grid under the band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub x_span: Span,
    pub z_span: Span,
    /// Height of the grid plane.
    pub y: f32,
    pub spacing_x: f32,
    pub spacing_z: f32,
    pub fog_factor: f32,
    pub color: [f32; 4],
}

impl GridConfig {
    /// Lines `span` yields at `spacing`, counting both ends.
    pub fn line_count(span: Span, spacing: f32) -> u64 {
        (f64::from(span.len()) / f64::from(spacing)).floor() as u64 + 1
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x_span: Span::new(-200.0, 200.0),
            z_span: Span::new(-400.0, 400.0),
            y: -320.0,
            spacing_x: 3.0,
            spacing_z: 6.0,
            fog_factor: 0.0005,
            color: [0.7, 0.7, 0.7, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub look_at: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(400.0, 0.0, -400.0),
            look_at: Vec3::ZERO,
            fov_y_degrees: 60.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Signed rotation applied to the band every display refresh, in radians.
    pub speed: f32,
    /// How far `pct_offset` spreads instances along the orbit, in revolutions.
    ///
    /// `0.0` keeps every sign at its sampled angle.
    pub orbit_spread: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speed: -0.0005,
            orbit_spread: 0.0,
        }
    }
}

/// Colors and shading toggles.
///
/// `clear_color` is a `0xRRGGBB` sRGB value; the other colors are linear RGBA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub clear_color: u32,
    pub sign_color: [f32; 4],
    pub arrow_color: [f32; 4],
    pub sign_fog_factor: f32,
    pub lighting: bool,
    /// Point light position in view space.
    pub light_position: Vec3,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            clear_color: 0xeeeeee,
            sign_color: [1.0, 1.0, 1.0, 1.0],
            arrow_color: [0.3, 0.3, 0.3, 1.0],
            sign_fog_factor: 0.0,
            lighting: false,
            light_position: Vec3::new(0.0, 400.0, 200.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub band: BandConfig,
    pub grid: GridConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub style: StyleConfig,
}

impl SceneConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = serde_json::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("band.radius", self.band.radius)?;
        self.band.x_span.validate("band.x_span")?;
        self.band.width_scale.validate("band.width_scale")?;
        self.band.depth_scale.validate("band.depth_scale")?;

        self.grid.x_span.validate("grid.x_span")?;
        self.grid.z_span.validate("grid.z_span")?;
        positive("grid.spacing_x", self.grid.spacing_x)?;
        positive("grid.spacing_z", self.grid.spacing_z)?;
        line_budget("grid.spacing_x", self.grid.x_span, self.grid.spacing_x)?;
        line_budget("grid.spacing_z", self.grid.z_span, self.grid.spacing_z)?;

        positive("camera.fov_y_degrees", self.camera.fov_y_degrees)?;
        positive("camera.near", self.camera.near)?;
        if self.camera.near >= self.camera.far {
            return Err(ConfigError::DepthRange {
                near: self.camera.near,
                far: self.camera.far,
            });
        }
        if !self.camera.position.is_finite() || !self.camera.look_at.is_finite() {
            return Err(ConfigError::NonFinite { field: "camera" });
        }

        if !self.animation.speed.is_finite() {
            return Err(ConfigError::NonFinite { field: "animation.speed" });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn line_budget(field: &'static str, span: Span, spacing: f32) -> Result<(), ConfigError> {
    let lines = GridConfig::line_count(span, spacing);
    if lines > MAX_GRID_LINES as u64 {
        return Err(ConfigError::TooManyGridLines {
            field,
            lines,
            max: MAX_GRID_LINES,
        });
    }
    Ok(())
}
