//! Per-image label store: committed labels plus one in-progress label.

use crate::model::label::{Arity, Label, POINT_HIT_RADIUS, Point};

/// Reference to a point inside the committed set, as returned by hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointRef {
    /// Index of the committed label.
    pub label: usize,
    /// Index of the point within that label.
    pub point: usize,
}

/// Holds the committed labels for the current image and the single label
/// being built. Committed order is z-order and the order used by
/// label-level undo. Reset whenever the active image or the work-mode's
/// point-count configuration changes.
#[derive(Debug, Clone)]
pub struct LabelStore {
    committed: Vec<Label>,
    in_progress: Label,
    arity: Arity,
    image_width: u32,
    image_height: u32,
}

impl LabelStore {
    pub fn new(arity: Arity) -> Self {
        Self {
            committed: Vec::new(),
            in_progress: Label::new(arity),
            arity,
            image_width: 0,
            image_height: 0,
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Replace the discipline, rebuilding the store from scratch. Committed
    /// labels belong to the previous configuration and are dropped along with
    /// the in-progress label; the image size is kept.
    pub fn set_arity(&mut self, arity: Arity) {
        self.arity = arity;
        self.committed.clear();
        self.in_progress = Label::new(arity);
    }

    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.image_width = width;
        self.image_height = height;
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn committed(&self) -> &[Label] {
        &self.committed
    }

    pub fn in_progress(&self) -> &Label {
        &self.in_progress
    }

    /// Append a point to the in-progress label. A full fixed-arity label is
    /// restarted first: overflow begins a new label rather than rejecting
    /// the click.
    pub fn add_point(&mut self, p: Point) -> bool {
        if self.in_progress.is_full() {
            self.in_progress.reset();
        }
        self.in_progress.push_point(p)
    }

    /// Assign a class to the in-progress label. No-op (false) until its
    /// point requirement is met. A label made complete by this call is moved
    /// into the committed set and a fresh in-progress label takes its place.
    pub fn assign_class(&mut self, class_id: u32) -> bool {
        if !self.in_progress.set_class(class_id) {
            return false;
        }
        if self.in_progress.is_complete() {
            let done = std::mem::replace(&mut self.in_progress, Label::new(self.arity));
            self.committed.push(done);
        }
        true
    }

    /// Reassign the class of an already committed label. False when the
    /// index is out of range.
    pub fn assign_class_at(&mut self, index: usize, class_id: u32) -> bool {
        match self.committed.get_mut(index) {
            Some(label) => label.set_class(class_id),
            None => false,
        }
    }

    /// Undo the most recently touched unit of work: one in-progress point if
    /// any, otherwise the last committed label.
    pub fn erase_last(&mut self) {
        if self.in_progress.pop_point() {
            return;
        }
        if self.committed.pop().is_some() {
            log::debug!("erased last committed label");
        }
    }

    /// Remove the committed label at `index`; silent no-op when out of range.
    pub fn erase_at(&mut self, index: usize) {
        if index < self.committed.len() {
            self.committed.remove(index);
        }
    }

    /// Reposition a committed point, for drag editing.
    pub fn move_point(&mut self, at: PointRef, p: Point) -> bool {
        match self
            .committed
            .get_mut(at.label)
            .and_then(|l| l.point_mut(at.point))
        {
            Some(target) => {
                *target = p;
                true
            }
            None => false,
        }
    }

    /// Find the committed point nearest to `query` within the hit radius,
    /// by manhattan distance. The radius both gates acceptance and tightens
    /// as closer candidates are found; equal distances keep the first match.
    pub fn find_nearest_point(&self, query: Point) -> Option<PointRef> {
        let mut best_dist = POINT_HIT_RADIUS;
        let mut best = None;
        for (li, label) in self.committed.iter().enumerate() {
            for (pi, point) in label.points().iter().enumerate() {
                let dist = point.manhattan(query);
                if dist < best_dist {
                    best_dist = dist;
                    best = Some(PointRef {
                        label: li,
                        point: pi,
                    });
                }
            }
        }
        best
    }

    /// Push a loaded, already-complete label straight into the committed set.
    pub fn push_committed(&mut self, label: Label) {
        self.committed.push(label);
    }

    /// Wholesale replacement of the committed set, as detection produces.
    /// The in-progress label is discarded along with the old contents.
    pub fn replace_committed(&mut self, labels: Vec<Label>) {
        self.committed = labels;
        self.in_progress = Label::new(self.arity);
    }

    /// Discard the in-progress label, keeping committed labels.
    pub fn cancel_in_progress(&mut self) {
        self.in_progress = Label::new(self.arity);
    }

    /// Clear everything; used on image change or configuration change.
    pub fn reset(&mut self) {
        self.committed.clear();
        self.in_progress = Label::new(self.arity);
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }
}
