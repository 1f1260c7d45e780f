use crate::foundation::core::{Affine, BezPath, Rect, Rgba8};
use crate::foundation::error::BridgeResult;
use crate::raster::composite::{fill, over_in_place};
use crate::raster::draw::DrawCommand;

/// Applies [`DrawCommand`]s to premultiplied RGBA8 pixmaps with `vello_cpu`.
///
/// Clears write pixels directly. Consecutive fills are rendered as one batch into a transparent
/// scratch pixmap and then composited source-over onto the target, so prior content survives
/// regardless of how the render context treats its destination.
#[derive(Default)]
pub(crate) struct Rasterizer {
    scratch: Option<vello_cpu::Pixmap>,
}

impl Rasterizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn apply(
        &mut self,
        target: &mut vello_cpu::Pixmap,
        ops: &[DrawCommand],
    ) -> BridgeResult<()> {
        let mut batch_start = 0;
        for (i, op) in ops.iter().enumerate() {
            if let DrawCommand::Clear { color } = op {
                self.render_batch(target, &ops[batch_start..i])?;
                fill(target.data_as_u8_slice_mut(), color.to_premul().to_array());
                batch_start = i + 1;
            }
        }
        self.render_batch(target, &ops[batch_start..])
    }

    fn render_batch(
        &mut self,
        target: &mut vello_cpu::Pixmap,
        ops: &[DrawCommand],
    ) -> BridgeResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let width = target.width();
        let height = target.height();

        let mut scratch = match self.scratch.take() {
            Some(p) if p.width() == width && p.height() == height => p,
            _ => vello_cpu::Pixmap::new(width, height),
        };
        scratch.data_as_u8_slice_mut().fill(0);

        let mut ctx = vello_cpu::RenderContext::new(width, height);
        for op in ops {
            draw_op(&mut ctx, op);
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut scratch);

        let out = over_in_place(target.data_as_u8_slice_mut(), scratch.data_as_u8_slice());
        self.scratch = Some(scratch);
        out
    }
}

fn draw_op(ctx: &mut vello_cpu::RenderContext, op: &DrawCommand) {
    match op {
        DrawCommand::Clear { .. } => {}
        DrawCommand::FillRect {
            rect,
            color,
            transform,
        } => {
            ctx.set_transform(affine_to_cpu(*transform));
            ctx.set_paint(color_to_cpu(*color));
            ctx.fill_rect(&rect_to_cpu(*rect));
        }
        DrawCommand::FillPath {
            svg_path_d,
            color,
            transform,
        } => {
            let path = match BezPath::from_svg(svg_path_d) {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(%err, "skipping fill_path with malformed svg path");
                    return;
                }
            };
            ctx.set_transform(affine_to_cpu(*transform));
            ctx.set_paint(color_to_cpu(*color));
            ctx.fill_path(&bezpath_to_cpu(&path));
        }
    }
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/raster/rasterizer.rs"]
mod tests;
