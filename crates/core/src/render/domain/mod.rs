pub mod display_sink;
pub mod glyphs;
pub mod overlay;
pub mod palette;
