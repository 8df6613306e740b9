use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::renderer::lights::{MAX_SHADOW_CASCADES, MIN_SHADOW_MAP_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Resolution of the first cascade; each further cascade is halved.
    #[serde(default = "RenderSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    /// World-space depth covered by the cascades of a camera.
    #[serde(default = "RenderSettings::default_shadow_distance")]
    pub shadow_distance: f32,
    #[serde(default = "RenderSettings::default_cascade_count")]
    pub cascade_count: usize,
    /// Upper bound on how far the light-facing bound of a cascade may be
    /// pushed out to reach casters. `None` leaves the expansion unbounded.
    #[serde(default)]
    pub max_cascade_extension: Option<f32>,
    #[serde(default = "RenderSettings::default_probe_faces_per_frame")]
    pub probe_faces_per_frame: usize,
    #[serde(default)]
    pub pools: PoolSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: Self::default_shadow_map_size(),
            shadow_distance: Self::default_shadow_distance(),
            cascade_count: Self::default_cascade_count(),
            max_cascade_extension: None,
            probe_faces_per_frame: Self::default_probe_faces_per_frame(),
            pools: PoolSettings::default(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RenderSettings>(contents).map(Self::validate)
    }

    pub(crate) fn validate(mut self) -> Self {
        if self.shadow_map_size < MIN_SHADOW_MAP_SIZE {
            warn!(
                "Shadow map size must be at least {}. Using default value.",
                MIN_SHADOW_MAP_SIZE
            );
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if !(self.shadow_distance.is_finite() && self.shadow_distance > 0.0) {
            warn!("Shadow distance must be positive. Using default value.");
            self.shadow_distance = Self::default_shadow_distance();
        }

        if self.cascade_count == 0 || self.cascade_count > MAX_SHADOW_CASCADES {
            let clamped = self.cascade_count.clamp(1, MAX_SHADOW_CASCADES);
            warn!(
                "Cascade count {} is outside 1..={}. Using {} instead.",
                self.cascade_count, MAX_SHADOW_CASCADES, clamped
            );
            self.cascade_count = clamped;
        }

        if let Some(extension) = self.max_cascade_extension {
            if !(extension.is_finite() && extension >= 0.0) {
                warn!("Cascade extension limit must be non-negative. Disabling the limit.");
                self.max_cascade_extension = None;
            }
        }

        if self.probe_faces_per_frame == 0 {
            warn!("Probes must render at least one face per frame. Using default value.");
            self.probe_faces_per_frame = Self::default_probe_faces_per_frame();
        }

        self
    }

    const fn default_shadow_map_size() -> u32 {
        2048
    }

    const fn default_shadow_distance() -> f32 {
        100.0
    }

    const fn default_cascade_count() -> usize {
        MAX_SHADOW_CASCADES
    }

    const fn default_probe_faces_per_frame() -> usize {
        6
    }
}

/// Initial capacities of the per-frame bucket pools. Pools grow past these
/// when a frame needs more, logging that the estimate was too small.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub pass_definitions: usize,
    pub state_buckets: usize,
    pub shader_buckets: usize,
    pub variant_buckets: usize,
    pub source_buckets: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pass_definitions: 16,
            state_buckets: 64,
            shader_buckets: 128,
            variant_buckets: 256,
            source_buckets: 512,
        }
    }
}
