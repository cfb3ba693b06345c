//! Cart-pole simulator connected to the brain service.
//!
//! ```bash
//! cargo run --example cartpole_sim -- --workspace <id> --accesskey <key>
//! ```

extern crate bonsai_common;
extern crate clap;
extern crate ctrlc;
extern crate rand;
extern crate serde;

use bonsai_common::*;
use clap::Parser;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::process::ExitCode;
use tracing::{error, info, warn};

const GRAVITY: f64 = 9.8;
const CART_MASS: f64 = 0.31;
const POLE_MASS: f64 = 0.055;
const POLE_HALF_LENGTH: f64 = 0.4 / 2.;
const FORCE_MAG: f64 = 1.0;
const STEP_DURATION: f64 = 0.02;
const TRACK_HALF_WIDTH: f64 = 1.5;
const MAX_POLE_ANGLE: f64 = 12. * std::f64::consts::PI / 180.;

#[derive(Debug, Clone, Default, Serialize)]
struct CartPoleState {
    cart_position: f64,
    cart_velocity: f64,
    pole_angle: f64,
    pole_angular_velocity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct CartPoleConfig {
    #[serde(default)]
    initial_cart_position: f64,
    #[serde(default)]
    initial_pole_angle: f64,
}

#[derive(Debug, Deserialize)]
struct CartPoleAction {
    /// -1 pushes left, 1 pushes right.
    command: f64,
}

#[derive(Debug, Default)]
struct CartPole {
    state: CartPoleState,
    iteration: usize,
}

impl CartPole {
    fn reset(&mut self, config: CartPoleConfig) {
        let mut rng = rand::thread_rng();
        self.state = CartPoleState {
            cart_position: config.initial_cart_position,
            cart_velocity: 0.,
            pole_angle: config.initial_pole_angle + rng.gen_range(-0.05..0.05),
            pole_angular_velocity: 0.,
        };
        self.iteration = 0;
    }

    fn step(&mut self, command: f64) {
        let s = &mut self.state;
        let force = FORCE_MAG * command.clamp(-1., 1.);
        let total_mass = CART_MASS + POLE_MASS;
        let (sin, cos) = s.pole_angle.sin_cos();

        let temp = (force + POLE_MASS * POLE_HALF_LENGTH * s.pole_angular_velocity.powi(2) * sin)
            / total_mass;
        let angular_accel = (GRAVITY * sin - cos * temp)
            / (POLE_HALF_LENGTH * (4. / 3. - POLE_MASS * cos.powi(2) / total_mass));
        let linear_accel = temp - POLE_MASS * POLE_HALF_LENGTH * angular_accel * cos / total_mass;

        s.cart_position += STEP_DURATION * s.cart_velocity;
        s.cart_velocity += STEP_DURATION * linear_accel;
        s.pole_angle += STEP_DURATION * s.pole_angular_velocity;
        s.pole_angular_velocity += STEP_DURATION * angular_accel;
        self.iteration += 1;
    }
}

impl Simulator for CartPole {
    fn get_state(&self) -> Result<Schema> {
        to_schema(&self.state)
    }

    fn get_interface(&self) -> Result<SimulatorInterface> {
        Ok(SimulatorInterface::new("Cartpole")
            .with_timeout(60.)
            .with_description(json!({
                "state": ["cart_position", "cart_velocity", "pole_angle", "pole_angular_velocity"],
                "action": ["command"],
                "config": ["initial_cart_position", "initial_pole_angle"],
            })))
    }

    fn halted(&self) -> Result<bool> {
        Ok(self.state.cart_position.abs() > TRACK_HALF_WIDTH
            || self.state.pole_angle.abs() > MAX_POLE_ANGLE)
    }

    fn episode_start(&mut self, config: &Schema) -> Result<()> {
        self.reset(from_schema(config)?);
        Ok(())
    }

    fn episode_step(&mut self, action: &Schema) -> Result<()> {
        let action: CartPoleAction = from_schema(action)?;
        self.step(action.command);
        Ok(())
    }

    fn episode_finish(&mut self, reason: &str) {
        info!(iterations = self.iteration, reason, "episode finished");
    }
}

/// Cart-pole simulator for the Bonsai platform.
#[derive(Parser, Debug)]
#[command(name = "cartpole-sim")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    sim: SimulatorArgs,
}

fn main() -> ExitCode {
    logging::init();

    let config = match Args::parse().sim.into_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = match SimulatorSession::new(config, CartPole::default()) {
        Ok(session) => session,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-C and SIGTERM unregister the session before exiting.
    let stop = session.stop_handle();
    if let Err(err) = ctrlc::set_handler(move || stop.stop()) {
        warn!("Could not install the signal handler: {err}");
    }

    loop {
        match session.run() {
            Ok(true) => continue,
            Ok(false) => return ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }
}
