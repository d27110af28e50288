//! Session lifecycle: which presets and control transitions are allowed.
//!
//! Two flags gate everything: whether the control loop runs and whether the
//! hand holds the plate. The [`SessionStage`] is informational and tracks the
//! last successful transition.

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::presets::Preset;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    #[default]
    Idle,
    HeadPositioned,
    ArmPositioned,
    HandClosingStage1,
    HandClosingStage2,
    HandClosed,
    ControlRunning,
    ControlStopped,
    HandOpen,
}

/// A request that changes the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCommand {
    Preset(Preset),
    /// Recompute tilt offsets and soft limits from the arm encoders.
    Offset,
    Start,
    Stop,
}

impl LifecycleCommand {
    /// Parse an `init` target name.
    pub fn from_init_name(name: &str) -> Option<Self> {
        let preset = match name {
            "head" => Preset::Head,
            "right_arm" => Preset::RightArm,
            "hand_close1" => Preset::HandClose1,
            "hand_close2" => Preset::HandClose2,
            "hand_close3" => Preset::HandClose3,
            "hand_open" => Preset::HandOpen,
            "offset" => return Some(LifecycleCommand::Offset),
            _ => return None,
        };
        Some(LifecycleCommand::Preset(preset))
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleCommand::Preset(p) => p.name(),
            LifecycleCommand::Offset => "offset",
            LifecycleCommand::Start => "start",
            LifecycleCommand::Stop => "stop",
        }
    }
}

/// Lifecycle flags shared between the command handler and the worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub control_running: bool,
    pub hand_closed: bool,
    pub stage: SessionStage,
    /// Incremented by every successful stop.
    pub stop_epoch: u64,
}

impl Session {
    /// Check the guard for `cmd` without changing anything.
    pub fn check(&self, cmd: LifecycleCommand) -> Result<(), LifecycleError> {
        use LifecycleCommand as C;
        match cmd {
            C::Stop => {
                if !self.control_running {
                    return Err(LifecycleError::ControlNotRunning);
                }
            }
            _ if self.control_running => return Err(LifecycleError::ControlRunning),
            C::Start => {
                if !self.hand_closed {
                    return Err(LifecycleError::HandNotClosed);
                }
            }
            C::Preset(Preset::RightArm | Preset::HandClose1 | Preset::HandClose2) => {
                if self.hand_closed {
                    return Err(LifecycleError::HandClosed);
                }
            }
            C::Preset(_) | C::Offset => {}
        }
        Ok(())
    }

    /// Record a transition whose side effects succeeded.
    pub fn commit(&mut self, cmd: LifecycleCommand) {
        use LifecycleCommand as C;
        let stage = match cmd {
            C::Preset(Preset::Head) => SessionStage::HeadPositioned,
            C::Preset(Preset::RightArm) => SessionStage::ArmPositioned,
            C::Preset(Preset::HandClose1) => SessionStage::HandClosingStage1,
            C::Preset(Preset::HandClose2) => SessionStage::HandClosingStage2,
            C::Preset(Preset::HandClose3) => {
                self.hand_closed = true;
                SessionStage::HandClosed
            }
            C::Preset(Preset::HandOpen) => {
                self.hand_closed = false;
                SessionStage::HandOpen
            }
            C::Offset => self.stage,
            C::Start => {
                self.control_running = true;
                SessionStage::ControlRunning
            }
            C::Stop => {
                self.control_running = false;
                self.stop_epoch += 1;
                SessionStage::ControlStopped
            }
        };
        if stage != self.stage {
            log::info!("session {:?} -> {:?} ({})", self.stage, stage, cmd.name());
        }
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed() -> Session {
        let mut s = Session::default();
        for p in [
            Preset::Head,
            Preset::RightArm,
            Preset::HandClose1,
            Preset::HandClose2,
            Preset::HandClose3,
        ] {
            let cmd = LifecycleCommand::Preset(p);
            s.check(cmd).unwrap();
            s.commit(cmd);
        }
        s
    }

    #[test]
    fn full_session_walk() {
        let mut s = closed();
        assert!(s.hand_closed);
        assert_eq!(s.stage, SessionStage::HandClosed);

        s.check(LifecycleCommand::Start).unwrap();
        s.commit(LifecycleCommand::Start);
        assert!(s.control_running);

        s.check(LifecycleCommand::Stop).unwrap();
        s.commit(LifecycleCommand::Stop);
        assert!(!s.control_running);
        assert_eq!(s.stop_epoch, 1);

        s.commit(LifecycleCommand::Preset(Preset::HandOpen));
        assert!(!s.hand_closed);
        assert_eq!(s.stage, SessionStage::HandOpen);
    }

    #[test]
    fn stop_requires_running() {
        let s = Session::default();
        assert_eq!(
            s.check(LifecycleCommand::Stop),
            Err(LifecycleError::ControlNotRunning)
        );
    }

    #[test]
    fn start_requires_closed_hand() {
        assert_eq!(
            Session::default().check(LifecycleCommand::Start),
            Err(LifecycleError::HandNotClosed)
        );
    }

    #[test]
    fn presets_blocked_while_running() {
        let mut s = closed();
        s.commit(LifecycleCommand::Start);
        for cmd in [
            LifecycleCommand::Preset(Preset::Head),
            LifecycleCommand::Preset(Preset::HandOpen),
            LifecycleCommand::Offset,
            LifecycleCommand::Start,
        ] {
            assert_eq!(s.check(cmd), Err(LifecycleError::ControlRunning));
        }
    }

    #[test]
    fn arm_presets_blocked_with_closed_hand() {
        let s = closed();
        assert_eq!(
            s.check(LifecycleCommand::Preset(Preset::RightArm)),
            Err(LifecycleError::HandClosed)
        );
        assert!(s.check(LifecycleCommand::Preset(Preset::HandClose3)).is_ok());
        assert!(s.check(LifecycleCommand::Preset(Preset::Head)).is_ok());
    }

    #[test]
    fn init_names() {
        assert_eq!(
            LifecycleCommand::from_init_name("hand_close2"),
            Some(LifecycleCommand::Preset(Preset::HandClose2))
        );
        assert_eq!(
            LifecycleCommand::from_init_name("offset"),
            Some(LifecycleCommand::Offset)
        );
        assert_eq!(LifecycleCommand::from_init_name("start"), None);
    }
}
