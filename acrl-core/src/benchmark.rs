use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// The environment family an agent is trained against. The family decides how observations are
/// read (flat vectors vs. named timestep arrays) and how random test actions are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Benchmark {
    #[serde(rename = "dm_control")]
    DmControl,
    #[default]
    #[serde(rename = "gym")]
    Gym,
}

impl Benchmark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DmControl => "dm_control",
            Self::Gym => "gym",
        }
    }
}

impl Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Benchmark {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dm_control" => Ok(Self::DmControl),
            "gym" => Ok(Self::Gym),
            other => Err(EnvError::UnknownBenchmark(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_benchmarks() {
        assert_eq!("gym".parse::<Benchmark>().unwrap(), Benchmark::Gym);
        assert_eq!(
            "dm_control".parse::<Benchmark>().unwrap(),
            Benchmark::DmControl
        );
    }

    #[test]
    fn rejects_unknown_benchmark() {
        let err = "atari".parse::<Benchmark>().unwrap_err();
        assert_eq!(err.to_string(), "unknown benchmark `atari`");
    }

    #[test]
    fn display_matches_serde_name() {
        assert_eq!(Benchmark::DmControl.to_string(), "dm_control");
        assert_eq!(Benchmark::Gym.to_string(), "gym");
    }
}
