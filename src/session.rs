//! Session controller: the state machine a GUI or CLI driver drives.
//!
//! Owns the label store, taxonomy, viewport transform, and detector, and
//! sequences every operation across them. Everything here is synchronous and
//! single-threaded; the batch detection driver processes one image per
//! [`Session::batch_step`] call so a surrounding event loop stays responsive.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{AppConfig, WorkModePreset};
use crate::data;
use crate::detect::{DetectError, Detector, DetectorConfig};
use crate::format::{FormatError, txt};
use crate::model::{Arity, Label, LabelStore, Point, PointRef, Taxonomy};
use crate::viewport::ViewportTransform;

/// Errors surfaced by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation requires a loaded image
    #[error("No image loaded")]
    NoImage,

    /// Image index outside the open folder's range
    #[error("Image index {0} out of range")]
    BadIndex(usize),

    /// Work-mode does not support detection
    #[error("Detection not available in work-mode '{0}'")]
    DetectionUnavailable(String),

    /// Persistence failure
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Detection failure
    #[error(transparent)]
    Detect(#[from] DetectError),
}

/// Pointer interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Drag moves existing points; no points are added.
    #[default]
    Navigate,
    /// Pointer release appends a point to the in-progress label.
    Add,
}

/// Progress report from one batch detection step.
#[derive(Debug)]
pub struct BatchProgress {
    /// Zero-based index of the image just processed.
    pub index: usize,
    /// Total images in the batch.
    pub total: usize,
    /// Labels written for this image, or what went wrong. A per-image
    /// failure does not stop the batch.
    pub result: Result<usize, SessionError>,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    at: PointRef,
    offset: Point,
}

/// The annotation session.
pub struct Session {
    config: AppConfig,
    mode: Mode,
    work_mode: usize,
    store: LabelStore,
    taxonomy: Taxonomy,
    viewport: ViewportTransform,
    detector: Detector,
    images: Vec<PathBuf>,
    current: Option<usize>,
    display_size: (f32, f32),
    drag: Option<DragState>,
    batch_next: Option<usize>,
}

impl Session {
    /// Create a session with work-mode 0 of the given configuration active.
    pub fn new(config: AppConfig) -> Self {
        let preset = config.work_modes.first().cloned().unwrap_or(WorkModePreset {
            name: "general".to_string(),
            point_count: 4,
            class_count: None,
            detection: false,
            apply_nms: false,
        });
        let store = LabelStore::new(Arity::Fixed(preset.point_count));
        let detector = Detector::new(detector_config(&preset, &config, 640, 640));
        Self {
            config,
            mode: Mode::Navigate,
            work_mode: 0,
            store,
            taxonomy: Taxonomy::new(),
            viewport: ViewportTransform::identity(),
            detector,
            images: Vec::new(),
            current: None,
            display_size: (800.0, 600.0),
            drag: None,
            batch_next: None,
        }
    }

    /// Tell the session how large the display area is. Takes effect on the
    /// next image load, when the fit-to-window transform is recomputed.
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.display_size = (width, height);
    }

    // ------------------------------------------------------------------
    // Image navigation
    // ------------------------------------------------------------------

    /// Open an image folder. Returns the number of images found; the driver
    /// picks which one to load.
    pub fn open_folder(&mut self, dir: &Path) -> Result<usize, SessionError> {
        self.images = data::scan_folder(dir)?;
        self.current = None;
        self.batch_next = None;
        Ok(self.images.len())
    }

    /// Switch to the image at `index`.
    ///
    /// With auto-save enabled the outgoing image is saved first; a save
    /// failure is reported in the log but never blocks the switch. The
    /// store, viewport, and label file state are then rebuilt for the new
    /// image.
    pub fn load_image(&mut self, index: usize) -> Result<(), SessionError> {
        let path = self
            .images
            .get(index)
            .cloned()
            .ok_or(SessionError::BadIndex(index))?;

        if self.config.auto_save && self.current.is_some() {
            if let Err(e) = self.save() {
                log::warn!("Auto-save failed: {}", e);
            }
        }

        let (width, height) = data::image_dimensions(&path)?;
        self.store.reset();
        self.store.set_image_size(width, height);
        self.viewport = ViewportTransform::fit(
            self.display_size.0,
            self.display_size.1,
            width,
            height,
        );
        self.drag = None;

        for label in txt::read_labels(&txt::label_path(&path), width, height)? {
            self.store.push_committed(label);
        }

        log::debug!(
            "Loaded image {:?} ({}x{}), {} labels",
            path,
            width,
            height,
            self.store.len()
        );
        self.current = Some(index);
        Ok(())
    }

    /// Load the next image in navigation order. Returns false at the end.
    pub fn next_image(&mut self) -> Result<bool, SessionError> {
        match self.current {
            Some(i) if i + 1 < self.images.len() => {
                self.load_image(i + 1)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Load the previous image in navigation order. Returns false at the start.
    pub fn prev_image(&mut self) -> Result<bool, SessionError> {
        match self.current {
            Some(i) if i > 0 => {
                self.load_image(i - 1)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Mode and work-mode
    // ------------------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch pointer mode. Entering Add discards any half-built label so
    /// the next clicks start a fresh shape.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Add {
            self.store.cancel_in_progress();
        }
        self.mode = mode;
        self.drag = None;
    }

    pub fn work_mode(&self) -> &WorkModePreset {
        &self.config.work_modes[self.work_mode]
    }

    pub fn work_mode_index(&self) -> usize {
        self.work_mode
    }

    /// Activate the work-mode preset at `index`. The label store is rebuilt
    /// under the new discipline, dropping committed and in-progress labels
    /// alike, and the detector's expected point and class counts are
    /// reconfigured. False when the index is out of range.
    pub fn set_work_mode(&mut self, index: usize) -> bool {
        let Some(preset) = self.config.work_modes.get(index).cloned() else {
            return false;
        };
        self.store.set_arity(Arity::Fixed(preset.point_count));
        let dims = (
            self.detector.config().input_width,
            self.detector.config().input_height,
        );
        *self.detector.config_mut() = detector_config(&preset, &self.config, dims.0, dims.1);
        self.work_mode = index;
        log::debug!("Switched to work-mode '{}'", preset.name);
        true
    }

    /// Override the required vertex count for the active discipline.
    /// Rejects zero. Rebuilds the label store; labels built under the
    /// previous count do not carry over.
    pub fn set_vertex_count(&mut self, count: usize) -> bool {
        if count == 0 {
            return false;
        }
        self.store.set_arity(Arity::Fixed(count));
        self.detector.config_mut().point_count = count;
        true
    }

    // ------------------------------------------------------------------
    // Pointer interaction (display space)
    // ------------------------------------------------------------------

    /// Pointer press. In Navigate mode this picks up the nearest committed
    /// point within the hit radius for dragging.
    pub fn pointer_press(&mut self, display: Point) {
        if self.mode != Mode::Navigate {
            return;
        }
        let image_point = self.viewport.to_image(display);
        if let Some(at) = self.store.find_nearest_point(image_point) {
            let grabbed = self.store.committed()[at.label].points()[at.point];
            self.drag = Some(DragState {
                at,
                offset: Point::new(image_point.x - grabbed.x, image_point.y - grabbed.y),
            });
        }
    }

    /// Pointer move while pressed; repositions the dragged point.
    pub fn pointer_drag(&mut self, display: Point) {
        if let Some(drag) = self.drag {
            let image_point = self.viewport.to_image(display);
            self.store.move_point(
                drag.at,
                Point::new(image_point.x - drag.offset.x, image_point.y - drag.offset.y),
            );
        }
    }

    /// Pointer release. In Add mode this places a point; once the fixed
    /// count is satisfied the session returns to Navigate.
    pub fn pointer_release(&mut self, display: Point) {
        if self.mode == Mode::Add {
            let image_point = self.viewport.to_image(display);
            self.store.add_point(image_point);
            if self.store.in_progress().is_full() {
                self.mode = Mode::Navigate;
            }
        }
        self.drag = None;
    }

    /// Zoom the viewport one step.
    pub fn zoom(&mut self, zoom_in: bool) {
        self.viewport.zoom(zoom_in);
    }

    /// Pan the viewport by a display-space delta.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.viewport.pan(dx, dy);
    }

    // ------------------------------------------------------------------
    // Label editing
    // ------------------------------------------------------------------

    /// Assign a class id to the in-progress label. Completes and commits it
    /// when the point requirement is already met; otherwise a silent no-op.
    pub fn assign_class(&mut self, class_id: u32) -> bool {
        self.store.assign_class(class_id)
    }

    /// Assign a class by taxonomy name.
    pub fn assign_class_name(&mut self, name: &str) -> bool {
        match self.taxonomy.id_of(name) {
            Some(id) => self.store.assign_class(id),
            None => false,
        }
    }

    /// Reassign the class of a committed ("focused") label.
    pub fn assign_class_at(&mut self, index: usize, class_id: u32) -> bool {
        self.store.assign_class_at(index, class_id)
    }

    /// Undo the most recent unit of work: an in-progress point if any,
    /// otherwise the last committed label.
    pub fn undo(&mut self) {
        self.store.erase_last();
    }

    /// Delete the committed label at `index`; no-op when out of range.
    pub fn delete_label(&mut self, index: usize) {
        self.store.erase_at(index);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save the current image's committed labels (or delete a stale label
    /// file when there are none).
    pub fn save(&mut self) -> Result<(), SessionError> {
        let path = self.current_image().ok_or(SessionError::NoImage)?;
        let (width, height) = self.store.image_size();
        txt::write_labels(
            &txt::label_path(path),
            self.store.committed(),
            width,
            height,
        )?;
        Ok(())
    }

    /// Load a class taxonomy. On failure the previous taxonomy stays in effect.
    pub fn load_taxonomy(&mut self, path: &Path) -> Result<(), SessionError> {
        self.taxonomy = txt::read_taxonomy(path)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Detection
    // ------------------------------------------------------------------

    /// Load an inference model. Only meaningful in a detection work-mode.
    pub fn load_model(&mut self, path: &Path) -> Result<(), SessionError> {
        if !self.work_mode().detection {
            return Err(SessionError::DetectionUnavailable(
                self.work_mode().name.clone(),
            ));
        }
        self.detector.load(path)?;
        Ok(())
    }

    /// Run detection over the current image and replace the committed set
    /// wholesale with the result. Any failure leaves the store untouched.
    /// Returns the number of materialized labels.
    pub fn run_detection(&mut self) -> Result<usize, SessionError> {
        if !self.work_mode().detection {
            return Err(SessionError::DetectionUnavailable(
                self.work_mode().name.clone(),
            ));
        }
        let path = self
            .current_image()
            .ok_or(SessionError::NoImage)?
            .to_path_buf();

        let candidates = self.detector.detect(&path)?;
        let labels: Vec<Label> = candidates
            .into_iter()
            .map(|c| Label::from_parts(c.class_id.unwrap_or(0), c.points))
            .collect();
        let count = labels.len();
        self.store.replace_committed(labels);
        Ok(count)
    }

    /// Arm the batch detection driver at the first image.
    pub fn start_batch(&mut self) {
        self.batch_next = if self.images.is_empty() { None } else { Some(0) };
    }

    /// Process one image of the armed batch: load, detect, save. Returns
    /// `None` once the batch is finished. Per-image failures are reported in
    /// the progress result and do not stop subsequent steps; the caller
    /// decides when to call again, so control returns to its event loop
    /// between images.
    pub fn batch_step(&mut self) -> Option<BatchProgress> {
        let index = self.batch_next?;
        if index >= self.images.len() {
            self.batch_next = None;
            return None;
        }
        self.batch_next = Some(index + 1);
        let result = self.batch_one(index);
        if let Err(e) = &result {
            log::warn!("Batch detection failed on image {}: {}", index, e);
        }
        Some(BatchProgress {
            index,
            total: self.images.len(),
            result,
        })
    }

    fn batch_one(&mut self, index: usize) -> Result<usize, SessionError> {
        self.load_image(index)?;
        let count = self.run_detection()?;
        self.save()?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    pub fn labels(&self) -> &[Label] {
        self.store.committed()
    }

    pub fn in_progress(&self) -> &Label {
        self.store.in_progress()
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.current.and_then(|i| self.images.get(i)).map(PathBuf::as_path)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn is_model_loaded(&self) -> bool {
        self.detector.is_loaded()
    }
}

/// Detector configuration for a work-mode preset, keeping whatever input
/// dimensions are already in effect (a loaded model may have set them).
fn detector_config(
    preset: &WorkModePreset,
    config: &AppConfig,
    input_width: u32,
    input_height: u32,
) -> DetectorConfig {
    DetectorConfig {
        point_count: preset.point_count,
        class_count: preset.class_count,
        input_width,
        input_height,
        conf_threshold: config.thresholds.confidence,
        nms_threshold: config.thresholds.nms,
        accept_threshold: config.thresholds.acceptance,
        apply_nms: preset.apply_nms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Folder with `count` tiny images named img0.png, img1.png, ...
    fn image_folder(count: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..count {
            let img = image::RgbImage::new(8, 8);
            img.save(dir.path().join(format!("img{}.png", i))).unwrap();
        }
        dir
    }

    fn session_with_folder(dir: &tempfile::TempDir) -> Session {
        let mut session = Session::new(AppConfig::default());
        session.set_display_size(80.0, 80.0);
        session.open_folder(dir.path()).unwrap();
        session
    }

    fn place_quad(session: &mut Session) {
        session.set_mode(Mode::Add);
        for (x, y) in [(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)] {
            session.pointer_release(Point::new(x, y));
        }
    }

    #[test]
    fn test_open_folder_and_load() {
        let dir = image_folder(3);
        let mut session = session_with_folder(&dir);
        assert_eq!(session.images().len(), 3);

        session.load_image(0).unwrap();
        assert_eq!(session.current_index(), Some(0));
        // 80x80 display over an 8x8 image: fit scale 10.
        assert_eq!(session.viewport().scale(), 10.0);

        assert!(session.next_image().unwrap());
        assert_eq!(session.current_index(), Some(1));
        assert!(session.prev_image().unwrap());
        assert!(!session.prev_image().unwrap());
    }

    #[test]
    fn test_load_image_bad_index() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        assert!(matches!(
            session.load_image(5),
            Err(SessionError::BadIndex(5))
        ));
    }

    #[test]
    fn test_add_mode_auto_returns_to_navigate() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();

        place_quad(&mut session);
        assert_eq!(session.mode(), Mode::Navigate);
        assert!(session.in_progress().has_points());
        assert_eq!(session.in_progress().len(), 4);
    }

    #[test]
    fn test_pointer_points_are_in_image_space() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();

        session.set_mode(Mode::Add);
        // Display (40, 40) at fit scale 10 is image (4, 4).
        session.pointer_release(Point::new(40.0, 40.0));
        assert_eq!(session.in_progress().points()[0], Point::new(4.0, 4.0));
    }

    #[test]
    fn test_assign_class_commits_and_saves() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();

        let tax_path = dir.path().join("classes.txt");
        std::fs::write(&tax_path, "car\nbike\n").unwrap();
        session.load_taxonomy(&tax_path).unwrap();

        place_quad(&mut session);
        assert!(session.assign_class_name("bike"));
        assert_eq!(session.labels().len(), 1);
        assert_eq!(session.labels()[0].class_id(), 1);

        session.save().unwrap();
        let label_file = dir.path().join("labels").join("img0.txt");
        assert!(label_file.exists());
        let content = std::fs::read_to_string(label_file).unwrap();
        assert!(content.starts_with("1 "));
    }

    #[test]
    fn test_labels_reload_on_image_switch() {
        let dir = image_folder(2);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();
        place_quad(&mut session);
        session.assign_class(0);
        session.save().unwrap();

        session.load_image(1).unwrap();
        assert!(session.labels().is_empty());

        session.load_image(0).unwrap();
        assert_eq!(session.labels().len(), 1);
        assert!(session.labels()[0].is_complete());
    }

    #[test]
    fn test_auto_save_on_switch() {
        let dir = image_folder(2);
        let mut config = AppConfig::default();
        config.auto_save = true;
        let mut session = Session::new(config);
        session.set_display_size(80.0, 80.0);
        session.open_folder(dir.path()).unwrap();

        session.load_image(0).unwrap();
        place_quad(&mut session);
        session.assign_class(2);

        // Switching away must persist before the new image's state loads.
        session.load_image(1).unwrap();
        assert!(dir.path().join("labels").join("img0.txt").exists());
    }

    #[test]
    fn test_undo_precedence_through_session() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();

        place_quad(&mut session);
        session.assign_class(0);
        session.set_mode(Mode::Add);
        session.pointer_release(Point::new(50.0, 50.0));

        session.undo();
        assert!(session.in_progress().is_empty());
        assert_eq!(session.labels().len(), 1);

        session.undo();
        assert!(session.labels().is_empty());
    }

    #[test]
    fn test_work_mode_switch_discards_in_progress() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();

        session.set_mode(Mode::Add);
        session.pointer_release(Point::new(10.0, 10.0));
        assert_eq!(session.in_progress().len(), 1);

        assert!(session.set_work_mode(1));
        assert!(session.in_progress().is_empty());
        assert_eq!(session.work_mode().name, "quad-16");
        assert!(!session.set_work_mode(9));
    }

    #[test]
    fn test_work_mode_switch_drops_committed_labels() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();
        place_quad(&mut session);
        session.assign_class(0);
        assert_eq!(session.labels().len(), 1);

        assert!(session.set_work_mode(1));
        assert!(session.labels().is_empty(), "labels from the previous work-mode must not survive");

        session.set_work_mode(0);
        place_quad(&mut session);
        session.assign_class(0);
        assert!(session.set_vertex_count(6));
        assert!(session.labels().is_empty());
    }

    #[test]
    fn test_drag_moves_committed_point() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();
        place_quad(&mut session);
        session.assign_class(0);

        // Grab the first point (image (1,1), display (10,10)) and drag it.
        session.pointer_press(Point::new(10.0, 10.0));
        session.pointer_drag(Point::new(30.0, 30.0));
        session.pointer_release(Point::new(30.0, 30.0));
        assert_eq!(session.labels()[0].points()[0], Point::new(3.0, 3.0));
    }

    #[test]
    fn test_detection_gated_by_work_mode() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);
        session.load_image(0).unwrap();

        assert!(matches!(
            session.run_detection(),
            Err(SessionError::DetectionUnavailable(_))
        ));

        session.set_work_mode(1);
        // Detection mode but no model loaded.
        assert!(matches!(
            session.run_detection(),
            Err(SessionError::Detect(DetectError::ModelNotLoaded))
        ));
        assert_eq!(session.labels().len(), 0);
    }

    #[test]
    fn test_batch_steps_once_per_image_and_terminates() {
        let dir = image_folder(3);
        let mut session = session_with_folder(&dir);
        session.set_work_mode(1);

        session.start_batch();
        let mut steps = 0;
        while let Some(progress) = session.batch_step() {
            assert_eq!(progress.index, steps);
            assert_eq!(progress.total, 3);
            // No model loaded: every step fails, the batch still advances.
            assert!(progress.result.is_err());
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert!(session.batch_step().is_none());
    }

    #[test]
    fn test_taxonomy_load_failure_keeps_previous() {
        let dir = image_folder(1);
        let mut session = session_with_folder(&dir);

        let tax_path = dir.path().join("classes.txt");
        std::fs::write(&tax_path, "car\nbike\n").unwrap();
        session.load_taxonomy(&tax_path).unwrap();
        assert_eq!(session.taxonomy().len(), 2);

        assert!(session.load_taxonomy(&dir.path().join("missing.txt")).is_err());
        assert_eq!(session.taxonomy().len(), 2);
    }
}
