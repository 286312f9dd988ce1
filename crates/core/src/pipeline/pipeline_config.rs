use std::time::Duration;

use crate::detection::domain::class_names::ClassNames;
use crate::shared::constants::{
    DEFAULT_LINE_THICKNESS, DEFAULT_REFRESH_MS, DEFAULT_SHUTDOWN_GRACE_MS,
};

/// Runtime settings for the three pipeline loops.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Period of the display clock.
    pub refresh_period: Duration,
    /// Box outline width in original-frame pixels.
    pub line_thickness: u32,
    /// How long shutdown waits for the loops to confirm they stopped.
    pub shutdown_grace: Duration,
    /// Pause between failed camera reads.
    pub capture_retry_delay: Duration,
    /// Pause when the detector has no new frame to work on.
    pub detector_idle_delay: Duration,
    pub class_names: ClassNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            refresh_period: Duration::from_millis(DEFAULT_REFRESH_MS),
            line_thickness: DEFAULT_LINE_THICKNESS,
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
            capture_retry_delay: Duration::from_millis(5),
            detector_idle_delay: Duration::from_millis(2),
            class_names: ClassNames::coco(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.refresh_period, Duration::from_millis(50));
        assert_eq!(config.line_thickness, 2);
        assert_eq!(config.shutdown_grace, Duration::from_secs(2));
        assert_eq!(config.class_names.len(), 80);
    }
}
