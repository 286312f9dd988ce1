pub mod detector;
pub mod domain;
pub mod infrastructure;
