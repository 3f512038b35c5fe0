pub mod document;
pub mod pose;
pub mod sampler;
pub mod sequence;
pub mod video;
