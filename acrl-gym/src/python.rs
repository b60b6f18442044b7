use acrl_core::{
    benchmark::Benchmark,
    env::{
        Env, EnvironmentDescription, SnapShot, Space, action_values, state_tensor,
        timestep::{ArraySpec, BoundedArraySpec, DmEnv, Observation, StepType, TimeStep},
    },
    error::EnvError,
};
use anyhow::{Result, bail};
use candle_core::Tensor;
use pyo3::{
    Bound, PyAny, PyObject, PyResult, Python,
    types::{PyAnyMethods, PyDict},
};

/// A gymnasium environment driven through the embedded interpreter.
pub struct PyGymEnv {
    env: PyObject,
    action_space: Space,
    observation_space: Space,
}

impl PyGymEnv {
    pub fn new(name: &str, render_mode: Option<&str>) -> Result<Self> {
        let env = Python::with_gil(|py| {
            let gym = py.import("gymnasium")?;
            let kwargs = PyDict::new(py);
            if let Some(render_mode) = render_mode {
                kwargs.set_item("render_mode", render_mode)?;
            }
            let env = gym.getattr("make")?.call((name,), Some(&kwargs))?;
            let action_space = env.getattr("action_space")?;
            let gym_spaces = py.import("gymnasium.spaces")?;
            let action_space = if action_space.is_instance(&gym_spaces.getattr("Box")?)? {
                let low: Vec<f32> = action_space.getattr("low")?.extract()?;
                let high: Vec<f32> = action_space.getattr("high")?.extract()?;
                Some(Space::bounded(low, high))
            } else {
                None
            };
            let shape: Vec<usize> = env.getattr("observation_space")?.getattr("shape")?.extract()?;
            PyResult::Ok((env.unbind(), action_space, shape))
        })?;
        let (env, action_space, shape) = env;
        let Some(action_space) = action_space else {
            bail!(EnvError::DiscreteActions);
        };
        Ok(Self {
            env,
            action_space,
            observation_space: Space::continous_from_dims(&shape),
        })
    }
}

impl Env for PyGymEnv {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        let state: Vec<f32> = Python::with_gil(|py| {
            let kwargs = PyDict::new(py);
            kwargs.set_item("seed", seed)?;
            let state = self.env.call_method(py, "reset", (), Some(&kwargs))?;
            state.bind(py).get_item(0)?.extract()
        })?;
        state_tensor(state)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let mut action = action_values(action)?;
        if let Some((min, max)) = self.action_space.bounds() {
            for ((a, lo), hi) in action.iter_mut().zip(min).zip(max) {
                *a = a.clamp(*lo, *hi);
            }
        }
        let (state, reward, terminated, truncated) = Python::with_gil(|py| {
            let step = self.env.call_method(py, "step", (action,), None)?;
            let step = step.bind(py);
            let state: Vec<f32> = step.get_item(0)?.extract()?;
            let reward: f32 = step.get_item(1)?.extract()?;
            let terminated: bool = step.get_item(2)?.extract()?;
            let truncated: bool = step.get_item(3)?.extract()?;
            PyResult::Ok((state, reward, terminated, truncated))
        })?;
        Ok(SnapShot {
            state: state_tensor(state)?,
            reward,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(self.observation_space.clone(), self.action_space.clone())
    }

    fn benchmark(&self) -> Benchmark {
        Benchmark::Gym
    }

    fn render(&mut self) -> Result<()> {
        Python::with_gil(|py| self.env.call_method0(py, "render").map(|_| ()))?;
        Ok(())
    }
}

const FRAME_HEIGHT: usize = 480;
const FRAME_WIDTH: usize = 640;

/// A `dm_control.suite` task, e.g. `cartpole-swingup`.
pub struct PyDmControlEnv {
    env: PyObject,
    observation_spec: Vec<ArraySpec>,
    action_spec: BoundedArraySpec,
    /// The matplotlib image frames are drawn into, created on the first render.
    image: Option<PyObject>,
}

fn flat_f32(value: &Bound<'_, PyAny>) -> PyResult<Vec<f32>> {
    let np = value.py().import("numpy")?;
    np.call_method1("asarray", (value,))?
        .call_method1("astype", ("float32",))?
        .call_method0("ravel")?
        .call_method0("tolist")?
        .extract()
}

impl PyDmControlEnv {
    pub fn new(domain: &str, task: &str, seed: u64) -> Result<Self> {
        let env = Python::with_gil(|py| {
            let suite = py.import("dm_control.suite")?;
            let task_kwargs = PyDict::new(py);
            task_kwargs.set_item("random", seed)?;
            let kwargs = PyDict::new(py);
            kwargs.set_item("task_kwargs", task_kwargs)?;
            let env = suite.call_method("load", (domain, task), Some(&kwargs))?;
            let mut observation_spec = vec![];
            for item in env.call_method0("observation_spec")?.call_method0("items")?.try_iter()? {
                let item = item?;
                let name: String = item.get_item(0)?.extract()?;
                let shape: Vec<usize> = item.get_item(1)?.getattr("shape")?.extract()?;
                observation_spec.push(ArraySpec::new(name, shape));
            }
            let spec = env.call_method0("action_spec")?;
            let action_spec = BoundedArraySpec {
                shape: spec.getattr("shape")?.extract()?,
                minimum: flat_f32(&spec.getattr("minimum")?)?,
                maximum: flat_f32(&spec.getattr("maximum")?)?,
            };
            PyResult::Ok(Self {
                env: env.unbind(),
                observation_spec,
                action_spec,
                image: None,
            })
        })?;
        Ok(env)
    }

    fn time_step(time_step: &Bound<'_, PyAny>) -> PyResult<TimeStep> {
        let step_type = if time_step.call_method0("first")?.extract()? {
            StepType::First
        } else if time_step.call_method0("last")?.extract()? {
            StepType::Last
        } else {
            StepType::Mid
        };
        let reward: Option<f32> = time_step.getattr("reward")?.extract()?;
        let discount: Option<f32> = time_step.getattr("discount")?.extract()?;
        let items = time_step
            .getattr("observation")?
            .call_method0("items")?
            .try_iter()?;
        let mut observation: Observation = vec![];
        for item in items {
            let item = item?;
            let name: String = item.get_item(0)?.extract()?;
            observation.push((name, flat_f32(&item.get_item(1)?)?));
        }
        Ok(TimeStep {
            step_type,
            reward,
            discount,
            observation,
        })
    }
}

impl DmEnv for PyDmControlEnv {
    fn reset(&mut self) -> Result<TimeStep> {
        Ok(Python::with_gil(|py| {
            let time_step = self.env.call_method0(py, "reset")?;
            Self::time_step(time_step.bind(py))
        })?)
    }

    fn step(&mut self, action: &[f32]) -> Result<TimeStep> {
        Ok(Python::with_gil(|py| {
            let time_step = self.env.call_method1(py, "step", (action.to_vec(),))?;
            Self::time_step(time_step.bind(py))
        })?)
    }

    fn observation_spec(&self) -> Vec<ArraySpec> {
        self.observation_spec.clone()
    }

    fn action_spec(&self) -> BoundedArraySpec {
        self.action_spec.clone()
    }

    /// Shows cameras 0 and 1 side by side in a matplotlib window.
    fn render(&mut self) -> Result<()> {
        Python::with_gil(|py| {
            let physics = self.env.getattr(py, "physics")?;
            let frames = (0..2)
                .map(|camera_id| {
                    let kwargs = PyDict::new(py);
                    kwargs.set_item("camera_id", camera_id)?;
                    physics.call_method(py, "render", (FRAME_HEIGHT, FRAME_WIDTH), Some(&kwargs))
                })
                .collect::<PyResult<Vec<_>>>()?;
            let frame = py.import("numpy")?.call_method1("hstack", (frames,))?;
            let plt = py.import("matplotlib.pyplot")?;
            let image = match self.image.take() {
                Some(image) => {
                    image.call_method1(py, "set_data", (frame,))?;
                    image
                }
                None => plt.call_method1("imshow", (frame,))?.unbind(),
            };
            self.image = Some(image);
            // the harness paces frames; this only lets the window process events
            plt.call_method1("pause", (0.001,))?;
            PyResult::Ok(())
        })?;
        Ok(())
    }
}
