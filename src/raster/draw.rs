use crate::foundation::core::{Affine, Rect, Rgba8};

fn identity() -> Affine {
    Affine::IDENTITY
}

fn is_identity(a: &Affine) -> bool {
    *a == Affine::IDENTITY
}

/// A single drawing command issued by the painting client.
///
/// Colors are straight alpha; the raster layer premultiplies them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Replace every pixel with `color`.
    Clear { color: Rgba8 },
    /// Fill an axis-aligned rectangle (before `transform`).
    FillRect {
        rect: Rect,
        color: Rgba8,
        #[serde(default = "identity", skip_serializing_if = "is_identity")]
        transform: Affine,
    },
    /// Fill an SVG path (`d` attribute syntax) with the non-zero rule.
    FillPath {
        svg_path_d: String,
        color: Rgba8,
        #[serde(default = "identity", skip_serializing_if = "is_identity")]
        transform: Affine,
    },
}

impl DrawCommand {
    pub fn clear(color: Rgba8) -> Self {
        Self::Clear { color }
    }

    pub fn fill_rect(rect: Rect, color: Rgba8) -> Self {
        Self::FillRect {
            rect,
            color,
            transform: Affine::IDENTITY,
        }
    }

    pub fn fill_path(svg_path_d: impl Into<String>, color: Rgba8) -> Self {
        Self::FillPath {
            svg_path_d: svg_path_d.into(),
            color,
            transform: Affine::IDENTITY,
        }
    }

    /// Whether this command overwrites the whole canvas regardless of prior content.
    pub fn overwrites_canvas(&self) -> bool {
        matches!(self, Self::Clear { .. })
    }
}

/// Commands recorded since the last flush.
#[derive(Debug, Default)]
pub(crate) struct Recording {
    ops: Vec<DrawCommand>,
}

impl Recording {
    /// Append a command. A canvas-wide overwrite discards everything recorded before it.
    pub(crate) fn push(&mut self, cmd: DrawCommand) {
        if cmd.overwrites_canvas() && !self.ops.is_empty() {
            tracing::trace!(dropped = self.ops.len(), "overdraw elided recorded ops");
            self.ops.clear();
        }
        self.ops.push(cmd);
    }

    pub(crate) fn len(&self) -> usize {
        self.ops.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn ops(&self) -> &[DrawCommand] {
        &self.ops
    }

    pub(crate) fn clear(&mut self) {
        self.ops.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/draw.rs"]
mod tests;
