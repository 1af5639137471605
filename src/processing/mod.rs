pub mod color_controls;
pub mod gpu_pipeline;
pub mod pipeline;
pub mod scaling;
