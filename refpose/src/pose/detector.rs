use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

use super::classic::ClassicPose;
use super::landmark::Landmark;
use super::landmarker::Landmarker;

/// Filename of the newer landmarker model. Tracks the person across frames
/// and measures a visibility score per landmark.
pub const LANDMARKER_MODEL: &str = "pose_landmarker_lite.onnx";
/// Filename of the older full body model. Judges every frame on its own and
/// has no visibility measure.
pub const CLASSIC_MODEL: &str = "pose_landmark_full.onnx";

/// Poses scoring lower than this are treated as no person in frame.
pub const MIN_POSE_SCORE: f32 = 0.5;

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Inference(#[from] ort::Error),
    #[error("timestamps must increase, got {current}ms after {previous}ms")]
    NonMonotonicTimestamp { previous: i64, current: i64 },
    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

/// Finds the most prominent person in a frame and returns their landmarks, or
/// `None` if no one is there. At least [`LANDMARKS_PER_POSE`] landmarks are
/// returned when someone is found, possibly with auxiliary points after them.
///
/// [`LANDMARKS_PER_POSE`]: super::landmark::LANDMARKS_PER_POSE
pub trait PoseDetector {
    /// `timestamp_ms` must be strictly greater than in the previous call.
    /// Models that track across frames use it to order their input.
    fn detect(
        &mut self,
        frame: &RgbImage,
        timestamp_ms: i64,
    ) -> Result<Option<Vec<Landmark>>, DetectError>;
}

/// Rejects timestamps that do not strictly increase.
#[derive(Debug, Default)]
pub struct TimestampGuard {
    last: Option<i64>,
}

impl TimestampGuard {
    pub fn check(&mut self, timestamp_ms: i64) -> Result<(), DetectError> {
        match self.last {
            Some(previous) if timestamp_ms <= previous => {
                Err(DetectError::NonMonotonicTimestamp {
                    previous,
                    current: timestamp_ms,
                })
            }
            _ => {
                self.last = Some(timestamp_ms);
                Ok(())
            }
        }
    }
}

/// The directory where the pose models are expected to be.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The per-user cache directory, or the system temp dir on platforms
    /// without one.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("refpose")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, model: &str) -> PathBuf {
        self.dir.join(model)
    }

    pub fn has(&self, model: &str) -> bool {
        self.path_of(model).is_file()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SelectError {
    #[error(
        "no pose model found in {}, place {} or {} there",
        .dir.display(),
        LANDMARKER_MODEL,
        CLASSIC_MODEL
    )]
    NoModelAvailable { dir: PathBuf },
    #[error("{model} is missing from {}", .dir.display())]
    ModelMissing { model: &'static str, dir: PathBuf },
    #[error("failed to load {model}")]
    Load {
        model: &'static str,
        source: ort::Error,
    },
}

/// Which of the two pose models to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// The newer model, with measured per-landmark visibility.
    Landmarker,
    /// The older model, visibility always reported as full.
    Classic,
}

impl Backend {
    pub fn model_file(self) -> &'static str {
        match self {
            Backend::Landmarker => LANDMARKER_MODEL,
            Backend::Classic => CLASSIC_MODEL,
        }
    }

    /// The best backend whose model is on disk, landmarker preferred.
    pub fn probe(store: &ModelStore) -> Result<Backend, SelectError> {
        [Backend::Landmarker, Backend::Classic]
            .into_iter()
            .find(|backend| store.has(backend.model_file()))
            .ok_or_else(|| SelectError::NoModelAvailable {
                dir: store.dir().to_owned(),
            })
    }

    /// Load the model and wrap it up behind the common interface. The only
    /// place that branches on the backend, everything downstream sees the
    /// trait.
    pub fn open(self, store: &ModelStore) -> Result<Box<dyn PoseDetector>, SelectError> {
        let path = store.path_of(self.model_file());
        if !path.is_file() {
            return Err(SelectError::ModelMissing {
                model: self.model_file(),
                dir: store.dir().to_owned(),
            });
        }

        let load_failure = |source| SelectError::Load {
            model: self.model_file(),
            source,
        };
        let detector: Box<dyn PoseDetector> = match self {
            Backend::Landmarker => {
                Box::new(Landmarker::from_file(&path).map_err(load_failure)?)
            }
            Backend::Classic => {
                Box::new(ClassicPose::from_file(&path).map_err(load_failure)?)
            }
        };
        Ok(detector)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Landmarker => write!(f, "landmarker"),
            Backend::Classic => write!(f, "classic"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn touch(path: &Path) {
        std::fs::File::create(path).unwrap();
    }

    #[test]
    fn probe_prefers_the_landmarker() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        assert!(matches!(
            Backend::probe(&store),
            Err(SelectError::NoModelAvailable { .. })
        ));

        touch(&store.path_of(CLASSIC_MODEL));
        assert_eq!(Backend::Classic, Backend::probe(&store).unwrap());

        touch(&store.path_of(LANDMARKER_MODEL));
        assert_eq!(Backend::Landmarker, Backend::probe(&store).unwrap());
    }

    #[test]
    fn open_requires_the_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        assert!(matches!(
            Backend::Landmarker.open(&store),
            Err(SelectError::ModelMissing { .. })
        ));
    }

    #[test]
    fn missing_model_errors_name_the_fix() {
        let error = SelectError::NoModelAvailable {
            dir: PathBuf::from("/some/dir"),
        };
        let message = error.to_string();
        assert!(message.contains("/some/dir"));
        assert!(message.contains(LANDMARKER_MODEL));
        assert!(message.contains(CLASSIC_MODEL));
    }

    #[test]
    fn timestamps_must_strictly_increase() {
        let mut guard = TimestampGuard::default();
        assert!(guard.check(0).is_ok());
        assert!(guard.check(33).is_ok());
        assert!(matches!(
            guard.check(33),
            Err(DetectError::NonMonotonicTimestamp {
                previous: 33,
                current: 33,
            })
        ));
        assert!(matches!(
            guard.check(10),
            Err(DetectError::NonMonotonicTimestamp { .. })
        ));
        // a failed check does not move the guard forward
        assert!(guard.check(34).is_ok());
    }
}
