//! Label data model: points, arity discipline, and the label itself.

/// Hit radius for selecting an existing point (in image pixels).
pub const POINT_HIT_RADIUS: f32 = 10.0;

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point. Cheap metric used for hit testing.
    pub fn manhattan(&self, other: Point) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Point-count discipline for a label.
///
/// `Fixed(n)` labels are complete once exactly `n` points have been placed;
/// `Flexible` labels define their count retroactively as "however many points
/// were added", which is what disk loading and shape-only detection produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Flexible,
}

/// One annotated shape: an ordered point sequence plus a class id.
///
/// A label is *complete* once both its point requirement and its class have
/// been satisfied; only complete labels are eligible for persistence.
#[derive(Debug, Clone)]
pub struct Label {
    points: Vec<Point>,
    class_id: u32,
    arity: Arity,
    has_points: bool,
    has_class: bool,
}

impl Label {
    /// Create an empty label under the given discipline.
    pub fn new(arity: Arity) -> Self {
        Self {
            points: Vec::new(),
            class_id: 0,
            arity,
            has_points: false,
            has_class: false,
        }
    }

    /// Append a point. Under `Fixed(n)`, points beyond `n` are rejected;
    /// under `Flexible`, every point is accepted and the label counts as
    /// having its points from the first one on.
    pub fn push_point(&mut self, p: Point) -> bool {
        match self.arity {
            Arity::Fixed(n) => {
                if self.points.len() >= n {
                    return false;
                }
                self.points.push(p);
                if self.points.len() == n {
                    self.has_points = true;
                }
                true
            }
            Arity::Flexible => {
                self.points.push(p);
                self.has_points = true;
                true
            }
        }
    }

    /// Remove the most recently added point. Returns false if there was none.
    /// Always clears the point flag: a fixed label drops below its count, and
    /// a flexible label's retroactive requirement was whatever it held.
    pub fn pop_point(&mut self) -> bool {
        if self.points.pop().is_none() {
            return false;
        }
        self.has_points = false;
        true
    }

    /// Assign a class id. Fails (no state change) until the point requirement
    /// is met; classifying an unfinished shape is a normal user action and is
    /// signaled only through the return value.
    pub fn set_class(&mut self, class_id: u32) -> bool {
        if !self.has_points {
            return false;
        }
        self.class_id = class_id;
        self.has_class = true;
        true
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mutable access to a point, for drag repositioning.
    pub fn point_mut(&mut self, index: usize) -> Option<&mut Point> {
        self.points.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the point requirement has been met.
    pub fn has_points(&self) -> bool {
        self.has_points
    }

    pub fn has_class(&self) -> bool {
        self.has_class
    }

    /// Whether a fixed-arity label holds its full point count.
    pub fn is_full(&self) -> bool {
        match self.arity {
            Arity::Fixed(n) => self.points.len() >= n,
            Arity::Flexible => false,
        }
    }

    /// Complete means both points and class are in place.
    pub fn is_complete(&self) -> bool {
        self.has_points && self.has_class
    }

    /// Clear points and flags, keeping the discipline.
    pub fn reset(&mut self) {
        self.points.clear();
        self.has_points = false;
        self.has_class = false;
    }

    /// Build a complete flexible-arity label from pre-validated parts, as
    /// produced by the disk codec and by detection materialization.
    pub fn from_parts(class_id: u32, points: Vec<Point>) -> Self {
        let has_points = !points.is_empty();
        Self {
            points,
            class_id,
            arity: Arity::Flexible,
            has_points,
            has_class: has_points,
        }
    }
}
