//! Model loading and the per-image detection pipeline.

use std::path::Path;

use image::imageops::FilterType;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{Tensor, ValueType};

use crate::detect::{Candidate, DetectError, DetectorConfig, postprocess};

/// ONNX-backed detector.
///
/// Starts unloaded; [`Detector::load`] moves it to loaded and a failed load
/// leaves it unloaded. `detect` runs preprocess, inference, decode, optional
/// NMS, and the final acceptance filter for one image, returning candidates
/// with points already in original-image pixel coordinates. It never touches
/// label state; materialization is the session's job.
pub struct Detector {
    config: DetectorConfig,
    session: Option<Session>,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DetectorConfig {
        &mut self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Load a serialized model. On success the input tensor dimensions are
    /// taken from the model's declared input shape when it is static;
    /// otherwise the configured defaults stay in effect.
    pub fn load(&mut self, path: &Path) -> Result<(), DetectError> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)?;

        if let Some(input) = session.inputs.first()
            && let ValueType::Tensor { shape, .. } = &input.input_type
        {
            let dims: Vec<i64> = shape.iter().copied().collect();
            if dims.len() == 4 {
                // NCHW when the channel dim is 3, NHWC otherwise.
                let (h, w) = if dims[1] == 3 {
                    (dims[2], dims[3])
                } else {
                    (dims[1], dims[2])
                };
                if h > 0 && w > 0 {
                    self.config.input_height = h as u32;
                    self.config.input_width = w as u32;
                }
            }
        }

        log::info!(
            "Model loaded from {:?}, input {}x{}",
            path,
            self.config.input_width,
            self.config.input_height
        );
        self.session = Some(session);
        Ok(())
    }

    /// Run the full pipeline over one image.
    ///
    /// Any failure aborts the whole call; partial results are never returned.
    pub fn detect(&mut self, image_path: &Path) -> Result<Vec<Candidate>, DetectError> {
        let session = self.session.as_mut().ok_or(DetectError::ModelNotLoaded)?;

        let img = image::open(image_path)?.to_rgb8();
        let (orig_width, orig_height) = img.dimensions();
        let (in_width, in_height) = (self.config.input_width, self.config.input_height);

        // Resize, scale to [0,1], reorder HWC -> CHW, add batch dim.
        let resized = image::imageops::resize(&img, in_width, in_height, FilterType::Triangle);
        let mut input = Vec::with_capacity(3 * (in_width * in_height) as usize);
        for channel in 0..3 {
            for y in 0..in_height {
                for x in 0..in_width {
                    input.push(f32::from(resized.get_pixel(x, y)[channel]) / 255.0);
                }
            }
        }

        let tensor = Tensor::from_array((
            vec![1_i64, 3, i64::from(in_height), i64::from(in_width)],
            input,
        ))?;
        let outputs = session.run(ort::inputs![tensor])?;
        let (out_shape, out_data) = outputs[0].try_extract_tensor::<f32>()?;

        let scale_x = orig_width as f32 / in_width as f32;
        let scale_y = orig_height as f32 / in_height as f32;
        let mut candidates =
            postprocess::decode(out_data, out_shape, &self.config, scale_x, scale_y)?;

        if self.config.apply_nms {
            candidates = postprocess::non_max_suppression(candidates, self.config.nms_threshold);
        }
        candidates.retain(|c| c.confidence >= self.config.accept_threshold);

        log::info!(
            "Detected {} candidates in {:?}",
            candidates.len(),
            image_path
        );
        Ok(candidates)
    }
}
