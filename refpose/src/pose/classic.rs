use std::path::Path;

use image::RgbImage;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::detector::{DetectError, PoseDetector, MIN_POSE_SCORE};
use super::landmark::{Landmark, LANDMARKS_PER_POSE};
use super::preprocess::{self, INPUT_SIZE};

const FIELDS_PER_LANDMARK: usize = 3;

/// The older of the two pose models. Stateless, every frame is judged on its
/// own, and since it does not measure visibility all landmarks come out fully
/// visible.
pub struct ClassicPose {
    session: Session,
}

impl ClassicPose {
    pub fn from_file(model_path: &Path) -> Result<Self, ort::Error> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        Ok(Self { session })
    }
}

impl PoseDetector for ClassicPose {
    fn detect(
        &mut self,
        frame: &RgbImage,
        _timestamp_ms: i64,
    ) -> Result<Option<Vec<Landmark>>, DetectError> {
        let input = Tensor::from_array(preprocess::nchw_tensor(frame, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs!["input" => input])?;

        let flag: ArrayViewD<f32> = outputs["output_poseflag"].try_extract_array()?;
        let Some(&flag) = flag.iter().next() else {
            return Err(DetectError::BadOutput("output_poseflag is empty".to_owned()));
        };
        if flag < MIN_POSE_SCORE {
            return Ok(None);
        }

        // one flat tensor of (x, y, z) per landmark in input pixels
        let raw: ArrayViewD<f32> = outputs["ld_3d"].try_extract_array()?;
        let values: Vec<f32> = raw.iter().copied().collect();
        if values.len() != LANDMARKS_PER_POSE * FIELDS_PER_LANDMARK {
            return Err(DetectError::BadOutput(format!(
                "landmark tensor has {} values, expected {}",
                values.len(),
                LANDMARKS_PER_POSE * FIELDS_PER_LANDMARK,
            )));
        }

        let scale = INPUT_SIZE as f32;
        let landmarks = values
            .chunks_exact(FIELDS_PER_LANDMARK)
            .map(|fields| {
                Landmark::with_default_visibility(
                    fields[0] / scale,
                    fields[1] / scale,
                    fields[2] / scale,
                )
            })
            .collect();

        Ok(Some(landmarks))
    }
}
