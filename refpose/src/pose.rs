pub mod classic;
pub mod detector;
pub mod landmark;
pub mod landmarker;
pub mod preprocess;
