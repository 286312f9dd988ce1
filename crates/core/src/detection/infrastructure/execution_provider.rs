use std::fmt;

use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware backend the detection session asks ONNX Runtime for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accelerator {
    CoreMl,
    DirectMl,
    Cpu,
}

impl Accelerator {
    /// The accelerator this build targets.
    pub fn preferred() -> Self {
        if cfg!(target_os = "macos") {
            Accelerator::CoreMl
        } else if cfg!(target_os = "windows") {
            Accelerator::DirectMl
        } else {
            Accelerator::Cpu
        }
    }

    /// Providers to register, in order. ONNX Runtime falls back to CPU when
    /// none can be registered, so `Cpu` registers nothing.
    pub fn execution_providers(self) -> Vec<ExecutionProviderDispatch> {
        match self {
            #[cfg(target_os = "macos")]
            Accelerator::CoreMl => {
                vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
            }
            #[cfg(target_os = "windows")]
            Accelerator::DirectMl => {
                vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accelerator::CoreMl => write!(f, "CoreML"),
            Accelerator::DirectMl => write!(f, "DirectML"),
            Accelerator::Cpu => write!(f, "CPU"),
        }
    }
}
