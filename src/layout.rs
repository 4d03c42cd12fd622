use druid::{Point, Rect, Size};

/// Scale/offset relationship between a page's natural pixel space and the
/// box it is currently drawn into. Recomputed from the live widget size on
/// every use, never cached across layout changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSnapshot {
    /// Displayed image box within the container, in display pixels.
    pub dest: Rect,
    /// Source dimensions, in natural pixels.
    pub natural: Size,
}

impl LayoutSnapshot {
    /// Aspect-fit `natural` into `container`, centered. `None` until both
    /// have strictly positive dimensions; the page may not be loaded yet.
    pub fn compute(natural: Size, container: Size) -> Option<Self> {
        if natural.width <= 0.0
            || natural.height <= 0.0
            || container.width <= 0.0
            || container.height <= 0.0
        {
            return None;
        }
        let scale = (container.width / natural.width).min(container.height / natural.height);
        let shown = Size::new(natural.width * scale, natural.height * scale);
        let origin = Point::new(
            (container.width - shown.width) / 2.0,
            (container.height - shown.height) / 2.0,
        );
        Some(LayoutSnapshot {
            dest: Rect::from_origin_size(origin, shown),
            natural,
        })
    }

    /// Same displayed box, re-based on a different natural reference.
    /// Stored regions project through the page dimensions recorded at
    /// extraction time, which keeps their overlays registered even after the
    /// viewport has changed.
    pub fn rebase(&self, natural: Size) -> Option<Self> {
        if natural.width <= 0.0 || natural.height <= 0.0 {
            return None;
        }
        Some(LayoutSnapshot {
            dest: self.dest,
            natural,
        })
    }

    /// Natural pixels per display pixel on the horizontal axis.
    pub fn scale_x(&self) -> f64 {
        self.natural.width / self.dest.width()
    }

    /// Natural pixels per display pixel on the vertical axis.
    pub fn scale_y(&self) -> f64 {
        self.natural.height / self.dest.height()
    }

    /// Display-space rectangle -> natural coordinates. The input is clamped
    /// to the displayed image box first, since drags may overshoot the image
    /// edges, then translated by the display offset and scaled.
    pub fn to_natural(&self, display: Rect) -> Option<Rect> {
        let clamped = display.abs().intersect(self.dest);
        if clamped.width() <= 0.0 || clamped.height() <= 0.0 {
            return None;
        }
        let (sx, sy) = (self.scale_x(), self.scale_y());
        Some(Rect::new(
            (clamped.x0 - self.dest.x0) * sx,
            (clamped.y0 - self.dest.y0) * sy,
            (clamped.x1 - self.dest.x0) * sx,
            (clamped.y1 - self.dest.y0) * sy,
        ))
    }

    /// Natural coordinates -> display space. Inverse of [`to_natural`],
    /// used on every paint to re-derive overlay positions.
    ///
    /// [`to_natural`]: LayoutSnapshot::to_natural
    pub fn to_display(&self, natural: Rect) -> Option<Rect> {
        let (sx, sy) = (self.scale_x(), self.scale_y());
        if !sx.is_finite() || !sy.is_finite() || sx <= 0.0 || sy <= 0.0 {
            return None;
        }
        let r = natural.abs();
        Some(Rect::new(
            self.dest.x0 + r.x0 / sx,
            self.dest.y0 + r.y0 / sy,
            self.dest.x0 + r.x1 / sx,
            self.dest.y0 + r.y1 / sy,
        ))
    }
}
