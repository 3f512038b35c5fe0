use std::path::Path;

use image::RgbImage;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::detector::{DetectError, PoseDetector, TimestampGuard, MIN_POSE_SCORE};
use super::landmark::Landmark;
use super::preprocess::{self, INPUT_SIZE};

/// Landmarks per pose the landmarker outputs. The first 33 are the body, the
/// rest are auxiliary points for its internal tracking.
const MODEL_LANDMARKS: usize = 39;
const FIELDS_PER_LANDMARK: usize = 5;

/// The newer of the two pose models. Stateful, it tracks the person from
/// frame to frame, which is why it insists on increasing timestamps.
pub struct Landmarker {
    session: Session,
    timestamps: TimestampGuard,
}

impl Landmarker {
    pub fn from_file(model_path: &Path) -> Result<Self, ort::Error> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        Ok(Self {
            session,
            timestamps: TimestampGuard::default(),
        })
    }
}

impl PoseDetector for Landmarker {
    fn detect(
        &mut self,
        frame: &RgbImage,
        timestamp_ms: i64,
    ) -> Result<Option<Vec<Landmark>>, DetectError> {
        self.timestamps.check(timestamp_ms)?;

        let input = Tensor::from_array(preprocess::nhwc_tensor(frame, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs!["image" => input])?;

        let score: ArrayViewD<f32> = outputs["pose_score"].try_extract_array()?;
        let Some(&score) = score.iter().next() else {
            return Err(DetectError::BadOutput("pose_score is empty".to_owned()));
        };
        if score < MIN_POSE_SCORE {
            return Ok(None);
        }

        // one flat tensor of (x, y, z, visibility, presence) per landmark,
        // coordinates in input pixels
        let raw: ArrayViewD<f32> = outputs["landmarks"].try_extract_array()?;
        let values: Vec<f32> = raw.iter().copied().collect();
        if values.len() != MODEL_LANDMARKS * FIELDS_PER_LANDMARK {
            return Err(DetectError::BadOutput(format!(
                "landmark tensor has {} values, expected {}",
                values.len(),
                MODEL_LANDMARKS * FIELDS_PER_LANDMARK,
            )));
        }

        let scale = INPUT_SIZE as f32;
        let landmarks = values
            .chunks_exact(FIELDS_PER_LANDMARK)
            .map(|fields| {
                Landmark::new(
                    fields[0] / scale,
                    fields[1] / scale,
                    fields[2] / scale,
                    preprocess::sigmoid(fields[3]),
                )
            })
            .collect();

        Ok(Some(landmarks))
    }
}
