use crate::benchmark::Benchmark;

/// Errors raised while building or talking to an environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("unknown benchmark `{0}`")]
    UnknownBenchmark(String),

    #[error("unknown {benchmark} environment `{name}` (available: {available:?})")]
    UnknownEnv {
        benchmark: Benchmark,
        name: String,
        available: Vec<String>,
    },

    #[error("action has {got} elements, expected {expected}")]
    ActionSize { expected: usize, got: usize },

    #[error("observation `{name}` has {got} elements, spec declares {expected}")]
    ObservationSize {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("discrete action spaces are not supported by the gaussian actor")]
    DiscreteActions,

    #[error("step called on an environment that needs a reset")]
    NeedsReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_env_lists_alternatives() {
        let err = EnvError::UnknownEnv {
            benchmark: Benchmark::Gym,
            name: "Hopper-v4".into(),
            available: vec!["Pendulum-v1".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown gym environment `Hopper-v4` (available: [\"Pendulum-v1\"])"
        );
    }

    #[test]
    fn action_size_display() {
        let err = EnvError::ActionSize {
            expected: 2,
            got: 3,
        };
        assert_eq!(err.to_string(), "action has 3 elements, expected 2");
    }
}
