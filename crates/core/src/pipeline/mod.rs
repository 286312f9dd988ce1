pub mod perception_pipeline;
pub mod pipeline_clock;
pub mod pipeline_config;
pub mod pipeline_logger;
pub mod session;
