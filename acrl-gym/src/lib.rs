pub mod pendulum;
pub mod point_mass;
#[cfg(feature = "python")]
pub mod python;

use acrl_core::{
    benchmark::Benchmark,
    env::{Env, EnvironmentDescription, SnapShot, timestep::DmControlAdapter},
    error::EnvError,
};
use anyhow::Result;
use candle_core::Tensor;
use pendulum::Pendulum;
use point_mass::PointMass;
use tracing::info;

pub const GYM_ENVS: &[&str] = &["Pendulum-v1"];
pub const DM_CONTROL_ENVS: &[&str] = &["point_mass-easy"];

/// Names `make_env` resolves without Python.
pub fn builtin_envs(benchmark: Benchmark) -> &'static [&'static str] {
    match benchmark {
        Benchmark::Gym => GYM_ENVS,
        Benchmark::DmControl => DM_CONTROL_ENVS,
    }
}

pub enum EnvKind {
    Pendulum(Pendulum),
    PointMass(DmControlAdapter<PointMass>),
    #[cfg(feature = "python")]
    PyGym(python::PyGymEnv),
    #[cfg(feature = "python")]
    PyDmControl(DmControlAdapter<python::PyDmControlEnv>),
}

macro_rules! dispatch {
    ($self:ident, $env:ident => $body:expr) => {
        match $self {
            EnvKind::Pendulum($env) => $body,
            EnvKind::PointMass($env) => $body,
            #[cfg(feature = "python")]
            EnvKind::PyGym($env) => $body,
            #[cfg(feature = "python")]
            EnvKind::PyDmControl($env) => $body,
        }
    };
}

impl Env for EnvKind {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        dispatch!(self, env => env.reset(seed))
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        dispatch!(self, env => env.step(action))
    }

    fn env_description(&self) -> EnvironmentDescription {
        dispatch!(self, env => env.env_description())
    }

    fn benchmark(&self) -> Benchmark {
        dispatch!(self, env => env.benchmark())
    }

    fn render(&mut self) -> Result<()> {
        dispatch!(self, env => env.render())
    }
}

/// Resolves `name` within `benchmark`. Built-in environments are tried first; with the `python`
/// feature any other gymnasium id or `domain-task` dm_control name is loaded through Python.
pub fn make_env(benchmark: Benchmark, name: &str, render: bool, seed: u64) -> Result<EnvKind> {
    let env = match (benchmark, name) {
        (Benchmark::Gym, "Pendulum-v1") => EnvKind::Pendulum(Pendulum::default()),
        (Benchmark::DmControl, "point_mass-easy") => {
            EnvKind::PointMass(DmControlAdapter::new(PointMass::new(seed)))
        }
        _ => return make_bridged_env(benchmark, name, render, seed),
    };
    info!(%benchmark, name, "built-in environment");
    Ok(env)
}

#[cfg(feature = "python")]
fn make_bridged_env(benchmark: Benchmark, name: &str, render: bool, seed: u64) -> Result<EnvKind> {
    let env = match benchmark {
        Benchmark::Gym => {
            let render_mode = render.then_some("human");
            EnvKind::PyGym(python::PyGymEnv::new(name, render_mode)?)
        }
        Benchmark::DmControl => {
            let Some((domain, task)) = name.split_once('-') else {
                return Err(unknown_env(benchmark, name).into());
            };
            EnvKind::PyDmControl(DmControlAdapter::new(python::PyDmControlEnv::new(
                domain, task, seed,
            )?))
        }
    };
    info!(%benchmark, name, "python environment");
    Ok(env)
}

#[cfg(not(feature = "python"))]
fn make_bridged_env(benchmark: Benchmark, name: &str, _render: bool, _seed: u64) -> Result<EnvKind> {
    Err(unknown_env(benchmark, name).into())
}

fn unknown_env(benchmark: Benchmark, name: &str) -> EnvError {
    EnvError::UnknownEnv {
        benchmark,
        name: name.to_owned(),
        available: builtin_envs(benchmark)
            .iter()
            .map(|name| name.to_string())
            .collect(),
    }
}
