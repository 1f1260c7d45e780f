use std::time::Duration;

use crate::foundation::core::{AccelerationMode, OpacityMode, SurfaceSize};
use crate::foundation::error::{BridgeError, BridgeResult};

/// Hibernation policy.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HibernationConfig {
    /// Whether hidden accelerated canvases give up their GPU surface.
    pub enabled: bool,
    /// Delay between becoming hidden and the hibernation attempt. Zero posts an immediate task.
    pub delay_ms: u64,
}

impl Default for HibernationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 0,
        }
    }
}

/// Draw-command recording policy.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeferralConfig {
    /// Record draws and rasterize them at flush time.
    pub enabled: bool,
    /// Flush as soon as the recording grows beyond this many commands.
    pub max_recorded_ops: usize,
}

impl Default for DeferralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_recorded_ops: 1024,
        }
    }
}

/// Configuration of one [`crate::CanvasSurfaceBridge`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub width: u32,
    pub height: u32,
    pub acceleration: AccelerationMode,
    pub opacity: OpacityMode,
    pub hibernation: HibernationConfig,
    pub deferral: DeferralConfig,
    /// Largest unaccelerated surface, in pixels, the bridge will allocate.
    pub max_software_pixels: u64,
    /// Released handoff textures kept for reuse.
    pub max_recycled_textures: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 150,
            acceleration: AccelerationMode::Enabled,
            opacity: OpacityMode::NonOpaque,
            hibernation: HibernationConfig::default(),
            deferral: DeferralConfig::default(),
            max_software_pixels: 16_777_216,
            max_recycled_textures: 2,
        }
    }
}

impl BridgeConfig {
    /// Default configuration for a canvas of the given size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> BridgeResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        self.size()?;
        if self.deferral.max_recorded_ops == 0 {
            return Err(BridgeError::validation(
                "deferral.max_recorded_ops must be > 0",
            ));
        }
        if self.max_software_pixels == 0 {
            return Err(BridgeError::validation("max_software_pixels must be > 0"));
        }
        Ok(())
    }

    pub fn size(&self) -> BridgeResult<SurfaceSize> {
        SurfaceSize::new(self.width, self.height)
    }

    pub fn hibernation_delay(&self) -> Duration {
        Duration::from_millis(self.hibernation.delay_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/config.rs"]
mod tests;
