// src/pendulum.rs
// Damped simple pendulum: configuration, state, RK4 time stepping and the
// Cartesian bob position consumed by the rendering layer.

use serde::Deserialize;
use thiserror::Error;

/// Largest internal RK4 substep in seconds. Frame-sized `dt` values are
/// split into substeps no longer than this so the integrator operates well
/// inside its stable region.
const MAX_SUBSTEP: f64 = 1e-3;

fn default_initial_angle() -> f64 {
    60.0
}

fn default_initial_angular_velocity() -> f64 {
    100.0
}

fn default_length() -> f64 {
    1.0
}

fn default_damping() -> f64 {
    1.0
}

fn default_gravity() -> f64 {
    9.8
}

/// Immutable simulation parameters. Angles and angular velocities are given
/// in degrees and converted to radians when the state is constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct PendulumConfig {
    /// Initial angular displacement from the vertical, degrees.
    #[serde(default = "default_initial_angle")]
    pub initial_angle: f64,
    /// Initial angular velocity, degrees per second.
    #[serde(default = "default_initial_angular_velocity")]
    pub initial_angular_velocity: f64,
    /// Stem length in meters. Must be positive.
    #[serde(default = "default_length")]
    pub length: f64,
    /// Velocity-proportional damping coefficient. Must be non-negative.
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Gravitational acceleration, m/s^2.
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Fixed pivot coordinate `(x, y)`.
    #[serde(default)]
    pub pivot: (f64, f64),
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            initial_angle: default_initial_angle(),
            initial_angular_velocity: default_initial_angular_velocity(),
            length: default_length(),
            damping: default_damping(),
            gravity: default_gravity(),
            pivot: (0.0, 0.0),
        }
    }
}

/// One intermediate integrator observation, recorded per substep.
#[derive(Debug, Clone, Copy)]
pub struct TraceSample {
    pub time: f64,
    pub alpha: f64,
    pub omega: f64,
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("integration produced a non-finite state (alpha={alpha}, omega={omega})")]
    NonFinite { alpha: f64, omega: f64 },
}

/// Time derivative of the state. Named fields rather than a positional
/// pair, so the angle and velocity slots cannot be swapped silently.
#[derive(Debug, Clone, Copy)]
struct Derivative {
    d_alpha: f64,
    d_omega: f64,
}

/// Current pendulum state. `alpha` is the unwrapped angular displacement in
/// radians; it is never reduced modulo 2π and may grow without bound.
#[derive(Debug, Clone)]
pub struct PendulumState {
    pub alpha: f64,
    pub omega: f64,
    pub length: f64,
    pub damping: f64,
    pub gravity: f64,
    pub pivot: (f64, f64),
    /// Accumulated simulated time in seconds.
    pub elapsed: f64,
}

impl PendulumState {
    pub fn new(config: &PendulumConfig) -> Self {
        Self {
            alpha: config.initial_angle.to_radians(),
            omega: config.initial_angular_velocity.to_radians(),
            length: config.length,
            damping: config.damping,
            gravity: config.gravity,
            pivot: config.pivot,
            elapsed: 0.0,
        }
    }

    /// d(alpha)/dt = omega
    /// d(omega)/dt = -(g / length) * sin(alpha) - damping * omega
    fn derivative(&self, alpha: f64, omega: f64) -> Derivative {
        Derivative {
            d_alpha: omega,
            d_omega: -(self.gravity / self.length) * alpha.sin() - self.damping * omega,
        }
    }

    /// Classical fourth-order Runge-Kutta over one substep of width `h`.
    fn rk4_substep(&self, alpha: f64, omega: f64, h: f64) -> (f64, f64) {
        let k1 = self.derivative(alpha, omega);
        let k2 = self.derivative(alpha + 0.5 * h * k1.d_alpha, omega + 0.5 * h * k1.d_omega);
        let k3 = self.derivative(alpha + 0.5 * h * k2.d_alpha, omega + 0.5 * h * k2.d_omega);
        let k4 = self.derivative(alpha + h * k3.d_alpha, omega + h * k3.d_omega);
        (
            alpha + (h / 6.0) * (k1.d_alpha + 2.0 * k2.d_alpha + 2.0 * k3.d_alpha + k4.d_alpha),
            omega + (h / 6.0) * (k1.d_omega + 2.0 * k2.d_omega + 2.0 * k3.d_omega + k4.d_omega),
        )
    }

    /// Advance the state by `dt` seconds.
    pub fn step(&mut self, dt: f64) -> Result<(), StepError> {
        self.step_traced(dt, &mut |_| {})
    }

    /// Advance the state by `dt` seconds, invoking `observe` once per
    /// internal substep with the intermediate `(time, alpha, omega)`.
    /// Correctness does not depend on the observer; it exists so a caller
    /// can accumulate a plotting trace without reaching into the solver.
    pub fn step_traced(
        &mut self,
        dt: f64,
        observe: &mut dyn FnMut(TraceSample),
    ) -> Result<(), StepError> {
        let substeps = (dt / MAX_SUBSTEP).ceil().max(1.0) as usize;
        let h = dt / substeps as f64;
        let mut alpha = self.alpha;
        let mut omega = self.omega;
        for i in 0..substeps {
            (alpha, omega) = self.rk4_substep(alpha, omega, h);
            if !alpha.is_finite() || !omega.is_finite() {
                // Surface the blow-up instead of keeping a stale state.
                return Err(StepError::NonFinite { alpha, omega });
            }
            observe(TraceSample {
                time: self.elapsed + (i + 1) as f64 * h,
                alpha,
                omega,
            });
        }
        self.alpha = alpha;
        self.omega = omega;
        self.elapsed += dt;
        Ok(())
    }

    /// Cartesian bob position:
    /// `x = pivot.x + length * sin(alpha)`, `y = pivot.y - length * cos(alpha)`.
    pub fn position(&self) -> (f64, f64) {
        (
            self.pivot.0 + self.length * self.alpha.sin(),
            self.pivot.1 - self.length * self.alpha.cos(),
        )
    }

    /// Specific energy `0.5*omega^2 - (g/length)*cos(alpha)`. Conserved by
    /// the undamped system, so drift measures integrator quality.
    pub fn energy(&self) -> f64 {
        0.5 * self.omega * self.omega - (self.gravity / self.length) * self.alpha.cos()
    }
}
