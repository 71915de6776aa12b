// Frame acquisition and digit recognition

pub mod camera;
pub mod extract;
pub mod frame_source;
pub mod preprocess;
pub mod recognizer;
