pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod render;
pub mod shared;
