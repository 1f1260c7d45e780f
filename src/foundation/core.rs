use crate::foundation::error::{BridgeError, BridgeResult};

pub use kurbo::{Affine, BezPath, Rect};

/// Pixel dimensions of a canvas surface.
///
/// Both sides are non-zero and fit in `u16`, the raster backend's pixmap limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> BridgeResult<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    pub fn validate(self) -> BridgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BridgeError::validation("surface size must be non-zero"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(BridgeError::validation(format!(
                "surface size {}x{} exceeds {}",
                self.width,
                self.height,
                u16::MAX
            )));
        }
        Ok(())
    }

    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn byte_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }

    /// Dimensions as the raster backend's `u16` pair.
    pub(crate) fn as_u16(self) -> BridgeResult<(u16, u16)> {
        let w: u16 = self
            .width
            .try_into()
            .map_err(|_| BridgeError::validation(format!("width exceeds u16: {}", self.width)))?;
        let h: u16 = self.height.try_into().map_err(|_| {
            BridgeError::validation(format!("height exceeds u16: {}", self.height))
        })?;
        Ok((w, h))
    }
}

/// Straight (non-premultiplied) RGBA8 color, as painting clients specify it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_premul(self) -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(self.r, self.g, self.b, self.a)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            ((u16::from(c) * u16::from(a) + 127) / 255) as u8
        }
        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_slice(px: &[u8]) -> Self {
        Self {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        }
    }
}

/// Acceleration policy requested by the embedder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelerationMode {
    /// Never allocate GPU surfaces.
    Disabled,
    /// Use the GPU when a usable context is available.
    #[default]
    Enabled,
    /// Keep retrying GPU allocation even after it has failed once.
    Force,
}

/// What a snapshot consumer would prefer to receive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelerationHint {
    #[default]
    PreferAcceleration,
    PreferNoAcceleration,
}

/// Whether the canvas has an alpha channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpacityMode {
    Opaque,
    #[default]
    NonOpaque,
}

impl OpacityMode {
    /// Premultiplied color a freshly allocated surface starts with.
    pub fn initial_color(self) -> Rgba8Premul {
        match self {
            Self::Opaque => Rgba8::BLACK.to_premul(),
            Self::NonOpaque => Rgba8Premul::transparent(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
