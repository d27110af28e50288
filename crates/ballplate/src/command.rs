//! Text command protocol and the handler that owns the tunable state.
//!
//! Requests are one line each: a verb followed by whitespace-separated
//! arguments.
//!
//! | request | reply |
//! |---|---|
//! | `set <name> <value>` | `1` on success, `0` when the value is rejected |
//! | `get <name>` | the value, or six values for `get offset` |
//! | `init <preset>` / `init offset` | `1` / `0` |
//! | `start`, `stop` | `1` / `0` |
//!
//! Anything malformed replies `-1`.

use std::fmt;
use std::sync::Arc;

use ballplate_control::{
    preset_plan, Limb, LifecycleCommand, LifecycleError, MotionPlan, PlateLimits, ARM_JOINTS,
    ARM_JOINT_X, ARM_JOINT_Y, CONTROL_REF_SPEED, PRESET_REF_SPEED,
};
use ballplate_vision::ThresholdBound;
use tokio::sync::{mpsc, watch};

use crate::collab::{require_joints, Actuator};
use crate::error::CommandError;
use crate::tuning::TuningSnapshot;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown verb `{0}`")]
    UnknownVerb(String),
    #[error("`{verb}` takes {expected} argument(s), got {got}")]
    ArgumentCount {
        verb: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gain {
    Kp,
    Kd,
    Ki,
    /// Output filter bandwidth.
    Bandwidth,
}

/// A runtime-tunable scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parameter {
    Gain(Gain),
    Threshold(ThresholdBound),
}

impl Parameter {
    pub fn from_name(name: &str) -> Option<Self> {
        let gain = match name {
            "kp" | "k_p" => Gain::Kp,
            "kd" | "k_d" => Gain::Kd,
            "ki" | "k_i" => Gain::Ki,
            "w_b" | "wb" => Gain::Bandwidth,
            _ => return ThresholdBound::from_name(name).map(Parameter::Threshold),
        };
        Some(Parameter::Gain(gain))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query {
    Parameter(Parameter),
    /// Offsets and soft limits of both axes.
    Offset,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Set { parameter: Parameter, value: f64 },
    Get(Query),
    Lifecycle(LifecycleCommand),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandParseError::Empty)?;
        let args: Vec<&str> = words.collect();

        let arity = |verb: &'static str, expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(CommandParseError::ArgumentCount {
                    verb,
                    expected,
                    got: args.len(),
                })
            }
        };
        let parameter = |name: &str| {
            Parameter::from_name(name).ok_or_else(|| CommandParseError::UnknownName(name.into()))
        };

        match verb {
            "set" => {
                arity("set", 2)?;
                let value = args[1]
                    .parse::<f64>()
                    .map_err(|_| CommandParseError::InvalidNumber(args[1].into()))?;
                Ok(Command::Set {
                    parameter: parameter(args[0])?,
                    value,
                })
            }
            "get" => {
                arity("get", 1)?;
                if args[0] == "offset" {
                    return Ok(Command::Get(Query::Offset));
                }
                Ok(Command::Get(Query::Parameter(parameter(args[0])?)))
            }
            "init" => {
                arity("init", 1)?;
                LifecycleCommand::from_init_name(args[0])
                    .map(Command::Lifecycle)
                    .ok_or_else(|| CommandParseError::UnknownName(args[0].into()))
            }
            "start" => {
                arity("start", 0)?;
                Ok(Command::Lifecycle(LifecycleCommand::Start))
            }
            "stop" => {
                arity("stop", 0)?;
                Ok(Command::Lifecycle(LifecycleCommand::Stop))
            }
            other => Err(CommandParseError::UnknownVerb(other.into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Ack(bool),
    Values(Vec<f64>),
    /// Sentinel for requests that could not be parsed.
    Failure,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ack(true) => f.write_str("1"),
            Reply::Ack(false) => f.write_str("0"),
            Reply::Failure => f.write_str("-1"),
            Reply::Values(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
        }
    }
}

/// Sole writer of the [`TuningSnapshot`].
///
/// Every accepted change is republished to the worker through a `watch`
/// channel. Preset motions are handed to the worker as [`MotionPlan`]s.
pub struct ControlPanel {
    snapshot: TuningSnapshot,
    publisher: watch::Sender<TuningSnapshot>,
    head: Arc<dyn Actuator>,
    arm: Arc<dyn Actuator>,
    motions: mpsc::UnboundedSender<MotionPlan>,
}

impl ControlPanel {
    pub fn new(
        initial: TuningSnapshot,
        head: Arc<dyn Actuator>,
        arm: Arc<dyn Actuator>,
        motions: mpsc::UnboundedSender<MotionPlan>,
    ) -> Self {
        let (publisher, _) = watch::channel(initial);
        Self {
            snapshot: initial,
            publisher,
            head,
            arm,
            motions,
        }
    }

    pub fn snapshot(&self) -> &TuningSnapshot {
        &self.snapshot
    }

    pub fn subscribe(&self) -> watch::Receiver<TuningSnapshot> {
        self.publisher.subscribe()
    }

    pub fn handle_line(&mut self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(cmd) => self.handle(cmd),
            Err(e) => {
                log::warn!("rejected command {line:?}: {e}");
                Reply::Failure
            }
        }
    }

    pub fn handle(&mut self, cmd: Command) -> Reply {
        match cmd {
            Command::Set { parameter, value } => Reply::Ack(self.set(parameter, value)),
            Command::Get(query) => Reply::Values(self.get(query)),
            Command::Lifecycle(cmd) => match self.run_lifecycle(cmd) {
                Ok(()) => Reply::Ack(true),
                Err(CommandError::Lifecycle(e)) => {
                    log::warn!("{} refused: {e}", cmd.name());
                    Reply::Ack(false)
                }
                Err(e) => {
                    log::error!("{} failed: {e}", cmd.name());
                    Reply::Ack(false)
                }
            },
        }
    }

    fn set(&mut self, parameter: Parameter, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match parameter {
            Parameter::Gain(gain) => {
                let gains = &mut self.snapshot.gains;
                match gain {
                    Gain::Kp => gains.kp = value,
                    Gain::Kd => gains.kd = value,
                    Gain::Ki => gains.ki = value,
                    Gain::Bandwidth if value > 0.0 => gains.w_b = value,
                    Gain::Bandwidth => return false,
                }
            }
            Parameter::Threshold(bound) => {
                if !(0.0..=255.0).contains(&value) {
                    return false;
                }
                self.snapshot.thresholds.set(bound, value.trunc() as u8);
            }
        }
        log::debug!("set {parameter:?} = {value}");
        self.publish();
        true
    }

    fn get(&self, query: Query) -> Vec<f64> {
        let s = &self.snapshot;
        match query {
            Query::Offset => s.limits.offset_report().to_vec(),
            Query::Parameter(Parameter::Gain(gain)) => vec![match gain {
                Gain::Kp => s.gains.kp,
                Gain::Kd => s.gains.kd,
                Gain::Ki => s.gains.ki,
                Gain::Bandwidth => s.gains.w_b,
            }],
            Query::Parameter(Parameter::Threshold(bound)) => {
                vec![f64::from(s.thresholds.get(bound))]
            }
        }
    }

    fn actuator(&self, limb: Limb) -> &Arc<dyn Actuator> {
        match limb {
            Limb::Head => &self.head,
            Limb::RightArm => &self.arm,
        }
    }

    fn run_lifecycle(&mut self, cmd: LifecycleCommand) -> Result<(), CommandError> {
        self.snapshot.session.check(cmd)?;
        match cmd {
            LifecycleCommand::Preset(preset) => {
                let limb = preset.limb();
                require_joints(self.actuator(limb).as_ref(), limb.joint_count())?;
                let plan = preset_plan(preset, &self.snapshot.limits);
                self.motions
                    .send(plan)
                    .map_err(|_| CommandError::WorkerGone)?;
            }
            LifecycleCommand::Offset => {
                require_joints(self.arm.as_ref(), ARM_JOINTS)?;
                let enc = self.arm.encoders()?;
                let needed = ARM_JOINT_Y + 1;
                if enc.len() < needed {
                    return Err(LifecycleError::MissingEncoder {
                        needed,
                        got: enc.len(),
                    }
                    .into());
                }
                let limits = &self.snapshot.limits;
                self.snapshot.limits = PlateLimits {
                    x: limits.x.recentred(enc[ARM_JOINT_X]),
                    y: limits.y.recentred(enc[ARM_JOINT_Y]),
                };
                log::info!(
                    "offsets recomputed: {:?}",
                    self.snapshot.limits.offset_report()
                );
            }
            LifecycleCommand::Start => {
                require_joints(self.arm.as_ref(), ARM_JOINTS)?;
                self.arm.set_reference_accelerations(0.0)?;
                self.arm.set_reference_speeds(CONTROL_REF_SPEED)?;
            }
            LifecycleCommand::Stop => {
                // stopping never waits on the device
                self.commit(cmd);
                self.arm.set_reference_accelerations(0.0)?;
                self.arm.set_reference_speeds(PRESET_REF_SPEED)?;
                return Ok(());
            }
        }
        self.commit(cmd);
        Ok(())
    }

    fn commit(&mut self, cmd: LifecycleCommand) {
        self.snapshot.session.commit(cmd);
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot);
    }
}
