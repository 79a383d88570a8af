//! Tele-operation simulator
//!
//! Runs a controller and a robot on one executor, linked through the in-memory
//! transport. The controller replays a scripted drive around a square with the
//! horn and the light bar thrown in; every few seconds the link is dropped to
//! show the fail-stop and reconnect. Hardware writes go to the log.
//!
//! `RUST_LOG=debug cargo run --features sim` for state transitions.

use embassy_executor::Spawner;
use embassy_futures::join::join3;
use embassy_time::{Duration, Timer};
use log::{info, warn};
use tilt_teleop::system::config::{ControllerConfig, RobotConfig};
use tilt_teleop::system::event::OverlayGates;
use tilt_teleop::system::hardware::{
    Buttons, Indicator, MotionSample, MotionSource, PixelStrip, Rgb, StatusLed, Tone, Wheels,
};
use tilt_teleop::system::loopback::Air;
use tilt_teleop::system::schema::Schema;
use tilt_teleop::task::scheduler::{run_controller, run_robot};
use tracing_subscriber::EnvFilter;

/// Pixels on the robot's light bar
const STRIP_LEN: usize = 8;

/// Time between simulated radio dropouts
const DROPOUT_EVERY: Duration = Duration::from_secs(12);

/// Wheel driver and status colour of the robot
struct ConsoleRobot;

impl Wheels for ConsoleRobot {
    fn set_wheel_speeds(&mut self, left: f32, right: f32) {
        info!("wheels: left {:.1} right {:.1}", left, right);
    }
}

impl Indicator for ConsoleRobot {
    fn set_indicator_color(&mut self, color: Rgb) {
        info!("indicator: ({}, {}, {})", color.r, color.g, color.b);
    }
}

struct ConsoleBuzzer;

impl Tone for ConsoleBuzzer {
    fn play_note(&mut self, pitch: u16) {
        if pitch != 0 {
            log::debug!("buzzer: {} Hz", pitch);
        }
    }
}

/// Light bar rendered as a row of characters
struct ConsoleStrip {
    pixels: [Rgb; STRIP_LEN],
}

impl PixelStrip for ConsoleStrip {
    fn len(&self) -> usize {
        STRIP_LEN
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(p) = self.pixels.get_mut(index) {
            *p = color;
        }
    }

    fn clear_all(&mut self) {
        self.pixels = [Rgb::OFF; STRIP_LEN];
    }

    fn show(&mut self) {
        let mut row = [b'.'; STRIP_LEN];
        for (c, p) in row.iter_mut().zip(self.pixels.iter()) {
            if *p != Rgb::OFF {
                *c = b'#';
            }
        }
        log::trace!("pixels: [{}]", core::str::from_utf8(&row).unwrap_or("?"));
    }
}

struct ConsoleLed;

impl StatusLed for ConsoleLed {
    fn set(&mut self, on: bool) {
        info!("controller led: {}", if on { "on" } else { "off" });
    }
}

/// Tilt and button phases, each held for a number of samples
const SCRIPT: [(MotionSample, u32); 6] = [
    (sample(0.0, 0.0, false, false), 10),
    (sample(0.0, 1.5, false, false), 20),
    (sample(0.6, 1.0, false, false), 10),
    (sample(0.0, 1.5, true, false), 5),
    (sample(0.0, 0.0, false, true), 5),
    (sample(-0.6, -1.0, false, false), 10),
];

const fn sample(tilt_x: f32, tilt_y: f32, horn: bool, pixels: bool) -> MotionSample {
    MotionSample {
        tilt_x,
        tilt_y,
        buttons: Buttons { horn, pixels },
    }
}

/// Walks the script in a loop, one step per sample
#[derive(Default)]
struct ScriptedTilt {
    phase: usize,
    held: u32,
}

impl MotionSource for ScriptedTilt {
    fn sample(&mut self) -> MotionSample {
        let (sample, hold) = SCRIPT[self.phase];
        self.held += 1;
        if self.held >= hold {
            self.held = 0;
            self.phase = (self.phase + 1) % SCRIPT.len();
        }
        sample
    }
}

async fn dropouts(air: &Air) {
    loop {
        Timer::after(DROPOUT_EVERY).await;
        if air.is_connected() {
            warn!(
                "simulating radio dropout after {} notifications",
                air.notifications()
            );
            air.drop_link();
        }
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let air = Air::new(Schema::FULL);
    let gates = OverlayGates::new();
    let robot_config = RobotConfig::DEFAULT;
    let controller_config = ControllerConfig::DEFAULT;

    info!("starting controller and robot");
    join3(
        run_robot(
            air.central(),
            ConsoleRobot,
            ConsoleBuzzer,
            ConsoleStrip {
                pixels: [Rgb::OFF; STRIP_LEN],
            },
            &gates,
            &robot_config,
        ),
        run_controller(
            air.peripheral(),
            air.store(),
            ScriptedTilt::default(),
            ConsoleLed,
            &controller_config,
        ),
        dropouts(&air),
    )
    .await;
}
