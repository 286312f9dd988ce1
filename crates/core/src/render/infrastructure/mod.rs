pub mod shared_display;
pub mod snapshot_sink;
