pub mod class_names;
pub mod coordinate_mapper;
pub mod detection;
pub mod detection_model;
pub mod input_geometry;
pub mod letterbox;
