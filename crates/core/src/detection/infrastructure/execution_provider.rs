use ort::execution_providers::ExecutionProviderDispatch;

/// Execution providers to try for the detection session, most preferred first.
///
/// ONNX Runtime falls back to CPU when none of them can be registered.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::new();

    #[cfg(feature = "cuda")]
    providers.push(ort::execution_providers::CUDAExecutionProvider::default().build());

    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());

    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());

    log::debug!("{} accelerated execution provider(s) requested", providers.len());
    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_only_build_requests_no_providers() {
        let providers = preferred_execution_providers();
        if cfg!(not(any(feature = "cuda", target_os = "macos", target_os = "windows"))) {
            assert!(providers.is_empty());
        } else {
            assert!(!providers.is_empty());
        }
    }
}
