use druid::{Point, Rect, Size};

/// Minimum finished selection size on each axis, in display pixels.
/// Anything smaller is an accidental click and is dropped without comment.
pub const MIN_SELECTION_PX: f64 = 10.0;

/// Transient drag state. Lives only between pointer-down and
/// pointer-up/cancel; committed regions never reference it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Active { start: Point, current: Point },
}

impl Gesture {
    pub fn is_active(&self) -> bool {
        matches!(self, Gesture::Active { .. })
    }

    /// Pointer-down: begin a new drag at `pos`, restarting any drag in
    /// flight.
    pub fn begin(&mut self, pos: Point) {
        *self = Gesture::Active {
            start: pos,
            current: pos,
        };
    }

    /// Pointer-move: track the floating corner, clamped to the container so
    /// a drag can leave the image but not the widget.
    pub fn update(&mut self, pos: Point, container: Size) {
        if let Gesture::Active { current, .. } = self {
            *current = Point::new(
                pos.x.clamp(0.0, container.width),
                pos.y.clamp(0.0, container.height),
            );
        }
    }

    /// The rectangle as currently dragged. Normalized regardless of drag
    /// direction.
    pub fn frame(&self) -> Option<Rect> {
        match self {
            Gesture::Idle => None,
            Gesture::Active { start, current } => Some(Rect::from_points(*start, *current)),
        }
    }

    /// Pointer-up: return the normalized rectangle when it clears the
    /// minimum size on both axes, dropping it silently otherwise. Always
    /// transitions back to idle.
    pub fn finish(&mut self) -> Option<Rect> {
        let frame = self.frame();
        *self = Gesture::Idle;
        frame.filter(|r| r.width() >= MIN_SELECTION_PX && r.height() >= MIN_SELECTION_PX)
    }

    pub fn cancel(&mut self) {
        *self = Gesture::Idle;
    }
}
