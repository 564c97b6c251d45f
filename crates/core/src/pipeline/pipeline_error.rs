use std::fmt;

use thiserror::Error;

use super::pipeline_state::PipelineState;

/// Pipeline component an error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    Camera,
    Model,
    Renderer,
    Configuration,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Camera => "camera",
            Component::Model => "model",
            Component::Renderer => "renderer",
            Component::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Errors that end a pipeline run in `Failed`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Setup failed before the loop started.
    #[error("{component} {operation} failed while {state}: {source}")]
    FatalInit {
        component: Component,
        operation: &'static str,
        state: PipelineState,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The loop could not continue.
    #[error("{component} {operation} failed while {state}: {source}")]
    FatalRuntime {
        component: Component,
        operation: &'static str,
        state: PipelineState,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PipelineError {
    pub fn fatal_init(
        component: Component,
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PipelineError::FatalInit {
            component,
            operation,
            state: PipelineState::Starting,
            source: source.into(),
        }
    }

    pub fn fatal_runtime(
        component: Component,
        operation: &'static str,
        state: PipelineState,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PipelineError::FatalRuntime {
            component,
            operation,
            state,
            source: source.into(),
        }
    }

    pub fn component(&self) -> Component {
        match self {
            PipelineError::FatalInit { component, .. }
            | PipelineError::FatalRuntime { component, .. } => *component,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            PipelineError::FatalInit { operation, .. }
            | PipelineError::FatalRuntime { operation, .. } => operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::CaptureError;

    #[test]
    fn test_message_names_component_operation_and_state() {
        let err = PipelineError::fatal_runtime(
            Component::Camera,
            "next_frame",
            PipelineState::Running,
            CaptureError::Unavailable("timed out".into()),
        );
        let text = err.to_string();
        assert!(text.contains("camera next_frame"));
        assert!(text.contains("running"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn test_source_is_kept() {
        let err = PipelineError::fatal_init(Component::Model, "load", "weights missing");
        assert_eq!(err.component(), Component::Model);
        assert_eq!(err.operation(), "load");
        assert_eq!(
            std::error::Error::source(&err).map(|s| s.to_string()),
            Some("weights missing".to_string())
        );
    }
}
