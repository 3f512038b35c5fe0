/// How many landmarks make up a full body pose.
pub const LANDMARKS_PER_POSE: usize = 33;

/// One body landmark. `x` and `y` are normalized to the frame size, `z` is
/// depth relative to the hips on the same scale, `visibility` is the models
/// confidence in `[0, 1]` that the point is visible at all.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// For models that do not measure visibility, everything counts as fully
    /// visible.
    pub fn with_default_visibility(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 1.0)
    }
}

/// The full body pose of one person in one frame, always exactly
/// [`LANDMARKS_PER_POSE`] landmarks.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct FramePose(Vec<Landmark>);

impl FramePose {
    /// Keeps the first [`LANDMARKS_PER_POSE`] landmarks and throws away any
    /// auxiliary points after them. `None` if there are too few to make a
    /// whole body.
    pub fn from_landmarks(mut landmarks: Vec<Landmark>) -> Option<Self> {
        if landmarks.len() < LANDMARKS_PER_POSE {
            return None;
        }
        landmarks.truncate(LANDMARKS_PER_POSE);
        Some(Self(landmarks))
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.0
    }
}

/// The poses found in one video, in frame order.
pub type Sequence = Vec<FramePose>;
