use std::fmt;

/// Lifecycle of one pipeline run.
///
/// `Starting → Running → Draining → Stopped`, with `Failed` reachable from
/// every non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Starting,
    Running,
    Draining,
    Stopped,
    Failed,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Running, Draining)
                | (Draining, Stopped)
                | (Starting | Running | Draining, Failed)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Starting => "starting",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Stopped => "stopped",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use PipelineState::*;

    #[rstest]
    #[case(Starting, Running, true)]
    #[case(Running, Draining, true)]
    #[case(Draining, Stopped, true)]
    #[case(Starting, Failed, true)]
    #[case(Running, Failed, true)]
    #[case(Draining, Failed, true)]
    #[case(Starting, Stopped, false)]
    #[case(Stopped, Running, false)]
    #[case(Failed, Stopped, false)]
    #[case(Running, Starting, false)]
    fn test_transitions(
        #[case] from: PipelineState,
        #[case] to: PipelineState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }
}
