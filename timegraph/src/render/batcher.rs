//! Primitive batcher and hit testing

use crate::domain::Color;
use timegraph_common::TimerInfo;

// =============================================================================
// Z ORDER
// =============================================================================

pub const Z_VALUE_TRACK: f32 = 0.1;
pub const Z_VALUE_EVENT: f32 = 0.2;
pub const Z_VALUE_BOX_INACTIVE: f32 = 0.3;
pub const Z_VALUE_BOX_ACTIVE: f32 = 0.4;
pub const Z_VALUE_OVERLAY: f32 = 0.5;
pub const Z_VALUE_TEXT: f32 = 0.6;

/// Half width of the hit area around a line, in world units.
const LINE_PICK_TOLERANCE: f64 = 0.5;

/// Why primitives are being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickingMode {
    /// Plain rendering
    #[default]
    None,
    /// Hover feedback
    Hover,
    /// Click selection
    Click,
}

impl PickingMode {
    #[must_use]
    pub fn is_picking(self) -> bool {
        self != PickingMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box { pos: Point, size: Point },
    Line { from: Point, to: Point },
    Text { pos: Point, text: String },
}

/// One draw command
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub color: Color,
    pub z: f32,
    /// Timer the primitive stands for, recorded only while picking
    pub timer: Option<TimerInfo>,
}

/// Per-frame primitive collector
#[derive(Debug, Default)]
pub struct Batcher {
    primitives: Vec<Primitive>,
    picking_mode: PickingMode,
}

impl Batcher {
    #[must_use]
    pub fn new(picking_mode: PickingMode) -> Self {
        Self { primitives: Vec::new(), picking_mode }
    }

    /// Drop the previous frame and switch mode
    pub fn start_new_frame(&mut self, picking_mode: PickingMode) {
        self.primitives.clear();
        self.picking_mode = picking_mode;
    }

    #[must_use]
    pub fn picking_mode(&self) -> PickingMode {
        self.picking_mode
    }

    pub fn add_box(
        &mut self,
        pos: Point,
        size: Point,
        z: f32,
        color: Color,
        timer: Option<&TimerInfo>,
    ) {
        self.push(Shape::Box { pos, size }, z, color, timer);
    }

    pub fn add_line(
        &mut self,
        from: Point,
        to: Point,
        z: f32,
        color: Color,
        timer: Option<&TimerInfo>,
    ) {
        self.push(Shape::Line { from, to }, z, color, timer);
    }

    /// Vertical line of `height` starting at `pos`
    pub fn add_vertical_line(&mut self, pos: Point, height: f64, z: f32, color: Color) {
        self.push(Shape::Line { from: pos, to: Point::new(pos.x, pos.y + height) }, z, color, None);
    }

    pub fn add_text(&mut self, pos: Point, z: f32, color: Color, text: impl Into<String>) {
        self.push(Shape::Text { pos, text: text.into() }, z, color, None);
    }

    fn push(&mut self, shape: Shape, z: f32, color: Color, timer: Option<&TimerInfo>) {
        let timer = if self.picking_mode.is_picking() { timer.copied() } else { None };
        self.primitives.push(Primitive { shape, color, z, timer });
    }

    #[must_use]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    #[must_use]
    pub fn num_boxes(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p.shape, Shape::Box { .. })).count()
    }

    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p.shape, Shape::Line { .. })).count()
    }

    /// Topmost pickable timer under a world position
    #[must_use]
    pub fn pick(&self, x: f64, y: f64) -> Option<&TimerInfo> {
        self.primitives
            .iter()
            .filter(|p| p.timer.is_some() && hit(&p.shape, x, y))
            .max_by(|a, b| a.z.total_cmp(&b.z))
            .and_then(|p| p.timer.as_ref())
    }
}

fn hit(shape: &Shape, x: f64, y: f64) -> bool {
    match shape {
        Shape::Box { pos, size } => {
            x >= pos.x && x <= pos.x + size.x && y >= pos.y && y <= pos.y + size.y
        }
        Shape::Line { from, to } => {
            let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
            let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
            x >= x0 - LINE_PICK_TOLERANCE
                && x <= x1 + LINE_PICK_TOLERANCE
                && y >= y0 - LINE_PICK_TOLERANCE
                && y <= y1 + LINE_PICK_TOLERANCE
        }
        Shape::Text { .. } => false,
    }
}
