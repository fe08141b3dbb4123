//! Decode and suppression stages of the detection pipeline.

use ndarray::ArrayView2;

use crate::detect::{Candidate, DetectError, DetectorConfig};
use crate::model::Point;

/// Distance at which two first points count as fully non-overlapping.
const OVERLAP_FALLOFF: f32 = 100.0;

/// Decode raw model output into candidates.
///
/// Accepts `[rows, row_len]` or batch-1 `[1, rows, row_len]` output. Each row
/// is confidence, an optional class id, then `point_count` (x, y) pairs in
/// input-tensor coordinates; `scale_x`/`scale_y` map them back to original
/// image pixels. Rows below the confidence threshold or too short for the
/// configured layout are dropped individually.
pub(crate) fn decode(
    data: &[f32],
    shape: &[i64],
    config: &DetectorConfig,
    scale_x: f32,
    scale_y: f32,
) -> Result<Vec<Candidate>, DetectError> {
    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    let (rows, row_len) = match dims.as_slice() {
        [n, len] => (*n, *len),
        [1, n, len] => (*n, *len),
        other => {
            return Err(DetectError::bad_output(format!(
                "unsupported output shape {:?}",
                other
            )));
        }
    };
    if rows * row_len != data.len() {
        return Err(DetectError::bad_output(format!(
            "shape {:?} does not match {} values",
            dims,
            data.len()
        )));
    }

    let view = ArrayView2::from_shape((rows, row_len), data)
        .map_err(|e| DetectError::bad_output(e.to_string()))?;

    let expected = config.row_len();
    let mut candidates = Vec::new();
    for row in view.rows() {
        if row.len() < expected {
            continue;
        }
        let confidence = row[0];
        if confidence < config.conf_threshold {
            continue;
        }

        let (class_id, point_base) = match config.class_count {
            Some(_) => (Some(row[1].round().max(0.0) as u32), 2),
            None => (None, 1),
        };

        let mut points = Vec::with_capacity(config.point_count);
        for i in 0..config.point_count {
            let x = row[point_base + i * 2] * scale_x;
            let y = row[point_base + i * 2 + 1] * scale_y;
            points.push(Point::new(x, y));
        }

        candidates.push(Candidate {
            confidence,
            points,
            class_id,
        });
    }
    Ok(candidates)
}

/// Overlap score between two candidates.
///
/// A cheap proxy rather than shape IoU: the Euclidean distance between the
/// candidates' first points, mapped to `max(0, 1 - distance/100)`. Zero means
/// far apart; the score approaches one as the first points coincide.
pub fn suppression_overlap(a: &Candidate, b: &Candidate) -> f32 {
    match (a.points.first(), b.points.first()) {
        (Some(pa), Some(pb)) => (1.0 - pa.distance(*pb) / OVERLAP_FALLOFF).max(0.0),
        _ => 0.0,
    }
}

/// Greedy non-max suppression.
///
/// Sorts by confidence descending, then keeps a candidate only if its overlap
/// score against every already-kept candidate stays at or below `threshold`.
/// Ties break by confidence order; equal-confidence candidates keep their
/// original relative order.
pub fn non_max_suppression(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| suppression_overlap(&candidate, k) > threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(confidence: f32, x: f32) -> Candidate {
        Candidate {
            confidence,
            points: vec![Point::new(x, 0.0)],
            class_id: None,
        }
    }

    fn shape_only_config() -> DetectorConfig {
        DetectorConfig {
            point_count: 2,
            class_count: None,
            conf_threshold: 0.6,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn test_decode_confidence_gate() {
        let config = shape_only_config();
        // Two rows: conf 0.55 (dropped) and 0.95 (kept).
        let data = [
            0.55, 10.0, 10.0, 20.0, 20.0, //
            0.95, 30.0, 30.0, 40.0, 40.0,
        ];
        let out = decode(&data, &[2, 5], &config, 1.0, 1.0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.95);
    }

    #[test]
    fn test_decode_rescales_to_image_pixels() {
        let config = shape_only_config();
        let data = [0.9, 320.0, 320.0, 640.0, 160.0];
        // Original image 1280x480 vs 640x640 input tensor.
        let out = decode(&data, &[1, 1, 5], &config, 2.0, 0.75).unwrap();
        assert_eq!(out[0].points[0], Point::new(640.0, 240.0));
        assert_eq!(out[0].points[1], Point::new(1280.0, 120.0));
    }

    #[test]
    fn test_decode_classifying_layout() {
        let config = DetectorConfig {
            point_count: 1,
            class_count: Some(16),
            conf_threshold: 0.5,
            ..DetectorConfig::default()
        };
        let data = [0.8, 3.0, 100.0, 50.0];
        let out = decode(&data, &[1, 4], &config, 1.0, 1.0).unwrap();
        assert_eq!(out[0].class_id, Some(3));
        assert_eq!(out[0].points[0], Point::new(100.0, 50.0));
    }

    #[test]
    fn test_decode_truncated_rows_skipped() {
        let config = shape_only_config();
        // Rows of length 3 cannot hold 2 points.
        let data = [0.9, 10.0, 10.0];
        let out = decode(&data, &[1, 3], &config, 1.0, 1.0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_bad_shape_errors() {
        let config = shape_only_config();
        assert!(decode(&[0.0; 8], &[2, 2, 2], &config, 1.0, 1.0).is_err());
        assert!(decode(&[0.0; 7], &[2, 5], &config, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_overlap_falloff() {
        let a = candidate(1.0, 0.0);
        assert_eq!(suppression_overlap(&a, &candidate(1.0, 0.0)), 1.0);
        assert!((suppression_overlap(&a, &candidate(1.0, 50.0)) - 0.5).abs() < 1e-6);
        assert_eq!(suppression_overlap(&a, &candidate(1.0, 200.0)), 0.0);
    }

    #[test]
    fn test_nms_suppresses_near_first_points() {
        // Distances from the top-confidence candidate: 0, 5, 200.
        // With threshold 0.3, anything closer than 70 px is suppressed.
        let candidates = vec![
            candidate(0.9, 0.0),
            candidate(0.8, 0.0),
            candidate(0.7, 5.0),
            candidate(0.6, 200.0),
        ];
        let kept = non_max_suppression(candidates, 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.6);
    }

    #[test]
    fn test_nms_orders_by_confidence() {
        let candidates = vec![candidate(0.5, 500.0), candidate(0.9, 0.0)];
        let kept = non_max_suppression(candidates, 0.3);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.5);
    }
}
