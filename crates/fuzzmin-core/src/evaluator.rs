use crate::program::Program;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
    Crashed,
    TimedOut,
}

/// Result of running one program. Never persisted by this crate beyond the
/// verification step that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub outcome: ExecutionOutcome,
    pub stdout: String,
    pub stderr: String,
    pub exec_time_ms: u64,
}

impl Execution {
    pub fn succeeded() -> Self {
        Execution {
            outcome: ExecutionOutcome::Succeeded,
            stdout: String::new(),
            stderr: String::new(),
            exec_time_ms: 0,
        }
    }
}

/// Oracle that runs programs and decides whether an execution still shows
/// the reference behavior. `has_aspects` is the sole source of truth for
/// accepting a reduction; the core never infers preservation from syntax.
pub trait Evaluator: Sync {
    type Aspects: Sync;

    fn execute(&self, program: &Program) -> Execution;
    fn has_aspects(&self, execution: &Execution, aspects: &Self::Aspects) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_serializes_with_snake_case_outcome() {
        let execution = Execution::succeeded();
        let json = serde_json::to_value(&execution).expect("json");
        assert_eq!(json["outcome"], "succeeded");
        assert_eq!(json["exec_time_ms"], 0);
    }
}
