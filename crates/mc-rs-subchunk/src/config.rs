use serde::Deserialize;
use std::path::Path;

/// Largest palette a record may declare unless configured otherwise.
pub const DEFAULT_MAX_PALETTE_LEN: usize = 4096;

/// Block name a water-logging layer carries at palette index 1.
pub const DEFAULT_WATER_BLOCK_NAME: &str = "minecraft:water";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub water: WaterSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    /// Largest palette size a record may declare. Default: 4096, one entry per block.
    #[serde(default = "default_max_palette_len")]
    pub max_palette_len: usize,
}

fn default_max_palette_len() -> usize {
    DEFAULT_MAX_PALETTE_LEN
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_palette_len: default_max_palette_len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaterSection {
    /// Block name expected at palette index 1 of a water-logging layer.
    #[serde(default = "default_water_block_name")]
    pub block_name: String,
}

fn default_water_block_name() -> String {
    DEFAULT_WATER_BLOCK_NAME.into()
}

impl Default for WaterSection {
    fn default() -> Self {
        Self {
            block_name: default_water_block_name(),
        }
    }
}

impl DecoderConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(s)?;
        Ok(config)
    }
}
