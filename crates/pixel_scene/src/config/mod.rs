//! Configuration system
//!
//! File backed settings for the visibility query and for applications driving
//! a scene. TOML and RON are supported, chosen by file extension.

pub use serde::{Serialize, Deserialize};

use crate::foundation::geometry::Rect;
use crate::foundation::math::{utils, Vec3};
use crate::scene::Camera;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Visibility determination algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CullMode {
    /// View frustum, distance, anti-portal and cell-portal culling
    #[default]
    Frustum,
    /// Keep the visibility tree of the previous query
    Previous,
}

/// Settings of the visibility query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullConfig {
    /// Culling algorithm
    pub mode: CullMode,
    /// Pixels added on every side of a cell-portal scissor rectangle
    pub portal_rect_expansion: f32,
    /// Radius of the camera sphere used to detect a camera standing inside a portal
    pub camera_portal_radius: f32,
    /// Cull nodes beyond their maximum draw distance
    pub respect_max_draw_distance: bool,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            mode: CullMode::Frustum,
            portal_rect_expansion: 1.0,
            camera_portal_radius: 0.5,
            respect_max_draw_distance: true,
        }
    }
}

impl Config for CullConfig {}

/// Camera placement as stored in a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position
    pub eye: [f32; 3],
    /// Look-at target
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, -5.0],
            target: [0.0, 0.0, 5.0],
            fov_degrees: 90.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    /// Build a camera for a viewport with the given aspect ratio
    pub fn to_camera(&self, aspect: f32) -> Camera {
        Camera::look_at(
            Vec3::from(self.eye),
            Vec3::from(self.target),
            utils::deg_to_rad(self.fov_degrees),
            aspect,
            self.near,
            self.far,
        )
    }
}

/// Application level scene settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Visibility query settings
    pub cull: CullConfig,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Camera placement
    pub camera: CameraConfig,
    /// Default `env_logger` filter
    pub log_filter: String,
    /// Number of frames to simulate
    pub frames: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            cull: CullConfig::default(),
            viewport_width: 800,
            viewport_height: 600,
            camera: CameraConfig::default(),
            log_filter: "info".to_string(),
            frames: 3,
        }
    }
}

impl SceneConfig {
    /// Viewport rectangle
    pub fn viewport(&self) -> Rect {
        Rect::from_xywh(0.0, 0.0, self.viewport_width as f32, self.viewport_height as f32)
    }

    /// Viewport aspect ratio
    pub fn aspect(&self) -> f32 {
        if self.viewport_height == 0 {
            1.0
        } else {
            self.viewport_width as f32 / self.viewport_height as f32
        }
    }
}

impl Config for SceneConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cull_config_defaults() {
        let config = CullConfig::default();
        assert_eq!(config.mode, CullMode::Frustum);
        assert!((config.portal_rect_expansion - 1.0).abs() < f32::EPSILON);
        assert!((config.camera_portal_radius - 0.5).abs() < f32::EPSILON);
        assert!(config.respect_max_draw_distance);
    }

    #[test]
    fn test_scene_config_partial_toml() {
        let config: SceneConfig = toml::from_str(
            "viewport_width = 1024\n[cull]\nmode = \"Previous\"\n",
        )
        .unwrap();
        assert_eq!(config.viewport_width, 1024);
        assert_eq!(config.viewport_height, 600);
        assert_eq!(config.cull.mode, CullMode::Previous);
    }

    #[test]
    fn test_scene_config_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("pixel_scene_config_{}.ron", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut config = SceneConfig::default();
        config.frames = 7;
        config.save_to_file(&path).unwrap();
        let loaded = SceneConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join(format!("pixel_scene_config_{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();
        std::fs::write(&path, "{}").unwrap();

        let loaded = SceneConfig::load_from_file(&path);
        let saved = SceneConfig::default().save_to_file(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(loaded, Err(ConfigError::UnsupportedFormat(ref p)) if *p == path));
        assert!(matches!(saved, Err(ConfigError::UnsupportedFormat(_))));
    }
}
