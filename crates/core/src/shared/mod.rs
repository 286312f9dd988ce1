pub mod constants;
pub mod frame;
pub mod latest_slot;
pub mod model_resolver;
