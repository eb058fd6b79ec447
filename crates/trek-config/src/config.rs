//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terrain mesh generation and rescale settings.
    pub terrain: TerrainConfig,
    /// Texture layer stack and surface shader settings.
    pub layers: LayerConfig,
    /// Globe grab / navigate settings.
    pub interaction: InteractionConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Terrain model generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Planet radius in meters.
    pub globe_radius_m: f64,
    /// Scene units per meter applied to radius and heights before meshing.
    pub model_scale: f32,
    /// LOD levels generated for the globe, excluding LOD 0.
    pub globe_lod_levels: u32,
    /// LOD levels generated for local patches, excluding LOD 0.
    pub local_lod_levels: u32,
    /// Downsample level of LOD 0 (actual factor is 2^level).
    pub base_downsample: u32,
    /// Downsample level of the globe physics mesh. Negative disables it.
    pub globe_physics_downsample: i32,
    /// Downsample level of local patch physics meshes. Negative disables it.
    pub local_physics_downsample: i32,
    /// DEM samples per side before downsampling.
    pub dem_target_size: u32,
    /// Quiet period after the last rescale before the physics mesh is rebuilt, in seconds.
    pub physics_update_delay_s: f32,
    /// LOD switch coefficient for the globe (threshold = coefficient^(level + 1)).
    pub globe_lod_coefficient: f32,
    /// LOD switch coefficient for local patches.
    pub local_lod_coefficient: f32,
    /// Product id of the global elevation model.
    pub global_dem_id: String,
    /// Product id of the global base mosaic texture.
    pub global_mosaic_id: String,
    /// Height exaggeration applied at startup.
    pub height_exaggeration: f32,
}

/// Layer stack and surface shader presets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerConfig {
    /// Requested texture width and height in pixels.
    pub texture_target_size: u32,
    /// Shader smoothness while textures are shown.
    pub shader_smoothness: f32,
    /// Shader metallic while textures are shown.
    pub shader_metallic: f32,
    /// Shader smoothness while textures are disabled.
    pub no_texture_smoothness: f32,
    /// Shader metallic while textures are disabled.
    pub no_texture_metallic: f32,
    /// Diffuse opacity used by the transparent (interaction-disabled) shaders.
    pub disabled_diffuse_opacity: f32,
}

/// Globe interaction tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InteractionConfig {
    /// Maximum controller-to-hit distance that still starts a grab.
    pub max_grab_distance: f32,
    /// Duration of the navigate-to animation in seconds.
    pub navigate_duration_s: f32,
    /// Maximum gap between two clicks of a double click, in milliseconds.
    pub double_click_interval_ms: u64,
    /// Maximum time a button may be held to count as a click, in milliseconds.
    pub double_click_max_press_ms: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            globe_radius_m: 3_396_190.0,
            model_scale: 2.5e-7,
            globe_lod_levels: 2,
            local_lod_levels: 2,
            base_downsample: 0,
            globe_physics_downsample: 5,
            local_physics_downsample: 3,
            dem_target_size: 512,
            physics_update_delay_s: 0.5,
            globe_lod_coefficient: 0.25,
            local_lod_coefficient: 0.5,
            global_dem_id: "1cc3cfbb-ac38-46d1-a3df-5fff16ca397e".to_string(),
            global_mosaic_id: "8bc9352d-ee73-4d1f-94b8-de5495fd8dfa".to_string(),
            height_exaggeration: 1.0,
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            texture_target_size: 1024,
            shader_smoothness: 0.31,
            shader_metallic: 0.31,
            no_texture_smoothness: 0.37,
            no_texture_metallic: 0.31,
            disabled_diffuse_opacity: 0.69,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_grab_distance: 10.0,
            navigate_duration_s: 1.0,
            double_click_interval_ms: 400,
            double_click_max_press_ms: 300,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

// --- Validation ---

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

impl Config {
    /// Check that every numeric setting is inside the range the terrain code expects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.terrain;
        if !(t.globe_radius_m > 0.0) {
            return Err(invalid("terrain.globe_radius_m", "must be positive"));
        }
        if !(t.model_scale > 0.0) {
            return Err(invalid("terrain.model_scale", "must be positive"));
        }
        if t.dem_target_size < 2 {
            return Err(invalid("terrain.dem_target_size", "must be at least 2"));
        }
        if !(t.physics_update_delay_s >= 0.0) {
            return Err(invalid(
                "terrain.physics_update_delay_s",
                "must be zero or positive",
            ));
        }
        for (field, coefficient) in [
            ("terrain.globe_lod_coefficient", t.globe_lod_coefficient),
            ("terrain.local_lod_coefficient", t.local_lod_coefficient),
        ] {
            if !(coefficient > 0.0 && coefficient < 1.0) {
                return Err(invalid(field, format!("{coefficient} is not in (0, 1)")));
            }
        }
        if !t.height_exaggeration.is_finite() || t.height_exaggeration < 0.0 {
            return Err(invalid(
                "terrain.height_exaggeration",
                "must be finite and non-negative",
            ));
        }
        if self.layers.texture_target_size == 0 {
            return Err(invalid("layers.texture_target_size", "must be non-zero"));
        }
        if !(self.interaction.navigate_duration_s > 0.0) {
            return Err(invalid("interaction.navigate_duration_s", "must be positive"));
        }
        Ok(())
    }
}

// --- Persistence ---

/// File name of the persisted config inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

impl Config {
    /// Path of the config file inside `config_dir`.
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    fn read_validated(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = ron::from_str(&text).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_path(config_dir);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default terrain config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read_validated(&path)?;
        log::info!("Using terrain config {}", path.display());
        Ok(config)
    }

    /// Write this config to `config_dir`, creating the directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let options = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, options).map_err(ConfigError::SerializeError)?;
        std::fs::write(Self::file_path(config_dir), text).map_err(ConfigError::WriteError)
    }

    /// Re-read the file. Returns the new config only when it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_validated(&Self::file_path(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Terrain config changed on disk");
        Ok(Some(fresh))
    }
}
