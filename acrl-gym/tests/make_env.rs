use acrl_core::{benchmark::Benchmark, env::Env, error::EnvError};
use acrl_gym::{EnvKind, builtin_envs, make_env};
use anyhow::Result;

#[test]
fn builtin_envs_resolve_for_their_benchmark() -> Result<()> {
    for benchmark in [Benchmark::Gym, Benchmark::DmControl] {
        for name in builtin_envs(benchmark) {
            let env = make_env(benchmark, name, false, 0)?;
            assert_eq!(env.benchmark(), benchmark);
        }
    }
    Ok(())
}

#[test]
fn pendulum_description() -> Result<()> {
    let env = make_env(Benchmark::Gym, "Pendulum-v1", false, 0)?;
    assert!(matches!(env, EnvKind::Pendulum(_)));
    let description = env.env_description();
    assert_eq!(description.observation_size(), 3);
    assert_eq!(description.action_size(), 1);
    Ok(())
}

#[test]
fn point_mass_state_dim_sums_observation_specs() -> Result<()> {
    let mut env = make_env(Benchmark::DmControl, "point_mass-easy", false, 4)?;
    assert_eq!(env.env_description().observation_size(), 4);
    assert_eq!(env.env_description().action_size(), 2);
    let state = env.reset(0)?;
    assert_eq!(state.dims(), &[4]);
    Ok(())
}

#[cfg(not(feature = "python"))]
#[test]
fn unknown_names_list_the_builtins() {
    let err = match make_env(Benchmark::Gym, "CartPole-v1", false, 0) {
        Ok(_) => panic!("CartPole-v1 is not built in"),
        Err(err) => err,
    };
    match err.downcast_ref::<EnvError>() {
        Some(EnvError::UnknownEnv { available, .. }) => {
            assert_eq!(available, &vec!["Pendulum-v1".to_string()])
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[cfg(not(feature = "python"))]
#[test]
fn names_do_not_cross_benchmarks() {
    assert!(make_env(Benchmark::DmControl, "Pendulum-v1", false, 0).is_err());
    assert!(make_env(Benchmark::Gym, "point_mass-easy", false, 0).is_err());
}
