//! Region-of-interest selection from a pointer drag.
//!
//! Pointer positions arrive already translated into image pixel space.
//! The selector only normalizes and clamps on release, so the drag can
//! go in any direction from the anchor.

/// A finalized selection in image pixel space.
///
/// Always satisfies `x1 < x2 <= width` and `y1 < y2 <= height` for the
/// image it was clamped against. The high edges are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Builds a box from two arbitrary corners.
    ///
    /// Corners are min/max-normalized, clamped into `[0, width] x [0, height]`
    /// and rounded to whole pixels. Returns `None` when the result has zero area.
    pub fn from_corners(a: (f32, f32), b: (f32, f32), width: u32, height: u32) -> Option<Self> {
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_nan() {
                return 0;
            }
            v.clamp(0.0, max as f32).round() as u32
        };

        let x1 = clamp(a.0.min(b.0), width);
        let x2 = clamp(a.0.max(b.0), width);
        let y1 = clamp(a.1.min(b.1), height);
        let y2 = clamp(a.1.max(b.1), height);

        if x2 > x1 && y2 > y1 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Whether the box lies entirely inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2 && self.x2 <= width && self.y2 <= height
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {}) [{}x{}]",
            self.x1,
            self.y1,
            self.x2,
            self.y2,
            self.width(),
            self.height()
        )
    }
}

/// Selector state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionState {
    /// Nothing selected yet
    Idle,
    /// Pointer is down; `current` is the opposite corner, not normalized
    Dragging {
        anchor: (f32, f32),
        current: (f32, f32),
    },
    /// Last successful selection
    Finalized(BoundingBox),
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Turns press/drag/release into finalized bounding boxes.
#[derive(Clone, Debug, Default)]
pub struct RegionSelector {
    state: SelectionState,
    /// Restored when a release is rejected.
    last_finalized: Option<BoundingBox>,
}

impl RegionSelector {
    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Most recent finalized box, even while a new drag is in progress.
    pub fn finalized(&self) -> Option<BoundingBox> {
        self.last_finalized
    }

    /// Starts a new drag with a zero-size box at the anchor.
    pub fn press(&mut self, x: f32, y: f32) {
        self.state = SelectionState::Dragging {
            anchor: (x, y),
            current: (x, y),
        };
    }

    /// Moves the opposite corner. Ignored unless a drag is in progress.
    pub fn drag(&mut self, x: f32, y: f32) {
        if let SelectionState::Dragging { anchor, .. } = self.state {
            self.state = SelectionState::Dragging {
                anchor,
                current: (x, y),
            };
        }
    }

    /// Ends the drag at `(x, y)` and finalizes against an image of `width` x `height`.
    ///
    /// Returns the new box, or `None` if there was no drag or the box has zero
    /// area after clamping. A rejected release leaves the previous selection in place.
    pub fn release(&mut self, x: f32, y: f32, width: u32, height: u32) -> Option<BoundingBox> {
        let SelectionState::Dragging { anchor, .. } = self.state else {
            return None;
        };

        match BoundingBox::from_corners(anchor, (x, y), width, height) {
            Some(bbox) => {
                self.state = SelectionState::Finalized(bbox);
                self.last_finalized = Some(bbox);
                Some(bbox)
            }
            None => {
                self.restore();
                None
            }
        }
    }

    /// The corner the pointer was last seen at during a drag.
    pub fn current_corner(&self) -> Option<(f32, f32)> {
        match self.state {
            SelectionState::Dragging { current, .. } => Some(current),
            _ => None,
        }
    }

    /// Rectangle to draw for the in-progress drag, normalized to (min, max) corners.
    pub fn live_rect(&self) -> Option<((f32, f32), (f32, f32))> {
        match self.state {
            SelectionState::Dragging { anchor, current } => Some((
                (anchor.0.min(current.0), anchor.1.min(current.1)),
                (anchor.0.max(current.0), anchor.1.max(current.1)),
            )),
            _ => None,
        }
    }

    /// Drops any selection, e.g. when a new image is loaded.
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
        self.last_finalized = None;
    }

    fn restore(&mut self) {
        self.state = match self.last_finalized {
            Some(bbox) => SelectionState::Finalized(bbox),
            None => SelectionState::Idle,
        };
    }
}
