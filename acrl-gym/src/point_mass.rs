use acrl_core::{
    env::timestep::{ArraySpec, BoundedArraySpec, DmEnv, StepType, TimeStep},
    error::EnvError,
};
use anyhow::Result;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

const CONTROL_TIMESTEP: f32 = 0.02;
const ARENA: f32 = 0.3;
const TARGET_SIZE: f32 = 0.015;
const MASS: f32 = 0.3;
const DAMPING: f32 = 1.;
const GEAR: f32 = 0.1;

/// 20 seconds of control at 50Hz.
pub const POINT_MASS_MAX_STEPS: usize = 1000;

/// Value in [0, 1]: one inside `[lower, upper]`, decaying with a gaussian that reaches
/// `value_at_margin` at distance `margin` outside the bounds.
pub fn tolerance(x: f32, lower: f32, upper: f32, margin: f32, value_at_margin: f32) -> f32 {
    if (lower..=upper).contains(&x) {
        return 1.;
    }
    if margin <= 0. {
        return 0.;
    }
    let d = (if x < lower { lower - x } else { x - upper }) / margin;
    let scale = (-2. * value_at_margin.ln()).sqrt();
    (-0.5 * (d * scale).powi(2)).exp()
}

/// Quadratic tolerance that reaches zero at `margin`.
fn quadratic_tolerance(x: f32, margin: f32) -> f32 {
    let d = x.abs() / margin;
    if d < 1. { 1. - d * d } else { 0. }
}

/// A point mass in a walled plane that has to be pushed onto a target at the origin, after the
/// dm_control `point_mass` easy task.
pub struct PointMass {
    position: [f32; 2],
    velocity: [f32; 2],
    steps: usize,
    max_steps: usize,
    needs_reset: bool,
    rng: StdRng,
}

impl PointMass {
    pub fn new(seed: u64) -> Self {
        Self {
            position: [0.; 2],
            velocity: [0.; 2],
            steps: 0,
            max_steps: POINT_MASS_MAX_STEPS,
            needs_reset: true,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_max_steps(seed: u64, max_steps: usize) -> Self {
        Self {
            max_steps,
            ..Self::new(seed)
        }
    }

    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    pub fn set_state(&mut self, position: [f32; 2], velocity: [f32; 2]) {
        self.position = position;
        self.velocity = velocity;
        self.steps = 0;
        self.needs_reset = false;
    }

    fn observation(&self) -> Vec<(String, Vec<f32>)> {
        vec![
            ("position".into(), self.position.to_vec()),
            ("velocity".into(), self.velocity.to_vec()),
        ]
    }

    fn reward(&self, action: &[f32]) -> f32 {
        let distance = self.position.iter().map(|x| x * x).sum::<f32>().sqrt();
        let near_target = tolerance(distance, 0., TARGET_SIZE, TARGET_SIZE, 0.1);
        let control_reward =
            action.iter().map(|a| quadratic_tolerance(*a, 1.)).sum::<f32>() / action.len() as f32;
        let small_control = (4. + control_reward) / 5.;
        near_target * small_control
    }
}

impl DmEnv for PointMass {
    fn reset(&mut self) -> Result<TimeStep> {
        let position = [
            self.rng.random_range(-ARENA..=ARENA),
            self.rng.random_range(-ARENA..=ARENA),
        ];
        self.set_state(position, [0.; 2]);
        Ok(TimeStep::first(self.observation()))
    }

    fn step(&mut self, action: &[f32]) -> Result<TimeStep> {
        if self.needs_reset {
            return Err(EnvError::NeedsReset.into());
        }
        if action.len() != 2 {
            return Err(EnvError::ActionSize {
                expected: 2,
                got: action.len(),
            }
            .into());
        }
        for axis in 0..2 {
            let force = GEAR * action[axis].clamp(-1., 1.) - DAMPING * self.velocity[axis];
            self.velocity[axis] += force / MASS * CONTROL_TIMESTEP;
            self.position[axis] += self.velocity[axis] * CONTROL_TIMESTEP;
            if self.position[axis].abs() > ARENA {
                self.position[axis] = self.position[axis].clamp(-ARENA, ARENA);
                self.velocity[axis] = 0.;
            }
        }
        self.steps += 1;
        let reward = self.reward(action);
        let last = self.steps >= self.max_steps;
        self.needs_reset = last;
        Ok(TimeStep {
            step_type: if last { StepType::Last } else { StepType::Mid },
            reward: Some(reward),
            discount: Some(1.),
            observation: self.observation(),
        })
    }

    fn observation_spec(&self) -> Vec<ArraySpec> {
        vec![
            ArraySpec::new("position", vec![2]),
            ArraySpec::new("velocity", vec![2]),
        ]
    }

    fn action_spec(&self) -> BoundedArraySpec {
        BoundedArraySpec {
            shape: vec![2],
            minimum: vec![-1.; 2],
            maximum: vec![1.; 2],
        }
    }

    fn render(&mut self) -> Result<()> {
        debug!(
            x = self.position[0],
            y = self.position[1],
            step = self.steps,
            "point mass"
        );
        Ok(())
    }
}
