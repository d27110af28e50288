//! Periodic worker, motion sequencer and command server.
//!
//! [`Runtime::start`] spawns two tasks: a fixed-period worker that polls the
//! frame source and runs one cycle per tick, and a command server that owns
//! the [`ControlPanel`]. The panel publishes tuning snapshots over a `watch`
//! channel and hands preset motions to the worker over an `mpsc` channel.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use ballplate_control::{Limb, MotionPlan, PlanCursor, ARM_JOINTS, HEAD_JOINTS, PRESET_REF_SPEED};
use ballplate_core::PlatformPosition;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::collab::{require_joints, Actuator, FrameSource, HeadKinematics, PoseService};
use crate::command::{ControlPanel, Reply};
use crate::config::RuntimeConfig;
use crate::cycle::{CycleOrchestrator, CycleOutcome, CycleState, PerceptionGap};
use crate::error::RuntimeError;
use crate::pose::{resolve_pose, StereoGeometry};
use crate::tuning::TuningSnapshot;

const COMMAND_QUEUE: usize = 16;

/// Devices and services the runtime drives.
pub struct Collaborators {
    pub frames: Box<dyn FrameSource>,
    /// Direct pose query; head angles from `frames` are the fallback.
    pub pose: Option<Box<dyn PoseService>>,
    pub kinematics: Arc<dyn HeadKinematics>,
    pub head: Arc<dyn Actuator>,
    pub arm: Arc<dyn Actuator>,
}

/// Counters published by the worker after every tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorkerStats {
    pub ticks: u64,
    pub frame_pairs: u64,
    /// Cycles that produced a platform position.
    pub positions: u64,
    pub control_steps: u64,
    pub setpoints_sent: u64,
    /// Control steps whose setpoints were withheld because a preset ran.
    pub setpoints_held: u64,
    pub waypoints_issued: u64,
    /// Skipped frame-pair cycles by reason.
    pub gaps: BTreeMap<String, u64>,
    pub last_position: Option<PlatformPosition>,
    pub last_grid_bin: Option<(usize, usize)>,
}

/// Runs queued motion plans one waypoint at a time.
#[derive(Default)]
struct MotionSequencer {
    queue: VecDeque<MotionPlan>,
    active: Option<PlanCursor>,
}

impl MotionSequencer {
    fn push(&mut self, plan: MotionPlan) {
        log::info!(
            "queued {} plan, {} waypoints over {:?}",
            plan.preset.name(),
            plan.waypoints.len(),
            plan.duration()
        );
        self.queue.push_back(plan);
    }

    fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    /// Issue at most one waypoint. Returns `true` when one was sent.
    fn advance(&mut self, now: Duration, head: &dyn Actuator, arm: &dyn Actuator) -> bool {
        if let Some(cursor) = &self.active {
            if cursor.is_finished(now) {
                log::info!("{} plan finished", cursor.plan().preset.name());
                self.active = None;
            }
        }
        if self.active.is_none() {
            self.active = self.queue.pop_front().map(PlanCursor::new);
        }
        let Some(cursor) = self.active.as_mut() else {
            return false;
        };

        let actuator = match cursor.plan().limb {
            Limb::Head => head,
            Limb::RightArm => arm,
        };
        let preset = cursor.plan().preset.name();
        if cursor.is_pending() {
            if let Some(speed) = cursor.plan().ref_speed {
                if let Err(e) = actuator.set_reference_speeds(speed) {
                    log::error!("{preset} plan aborted: {e}");
                    self.active = None;
                    return false;
                }
            }
        }
        let Some(waypoint) = cursor.poll(now) else {
            return false;
        };
        match actuator.position_move(&waypoint.setpoints) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{preset} plan aborted: {e}");
                self.active = None;
                false
            }
        }
    }
}

struct Worker {
    orchestrator: CycleOrchestrator,
    frames: Box<dyn FrameSource>,
    pose: Option<Box<dyn PoseService>>,
    kinematics: Arc<dyn HeadKinematics>,
    head: Arc<dyn Actuator>,
    arm: Arc<dyn Actuator>,
    snapshots: watch::Receiver<TuningSnapshot>,
    motions: mpsc::UnboundedReceiver<MotionPlan>,
    sequencer: MotionSequencer,
    state: CycleState,
    stats: WorkerStats,
    publish: watch::Sender<WorkerStats>,
    started: Instant,
}

impl Worker {
    async fn run(mut self, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => self.tick(),
            }
        }
        self.frames.release();
        log::info!("worker stopped after {} ticks", self.stats.ticks);
    }

    fn tick(&mut self) {
        let now = self.started.elapsed();
        let snapshot = *self.snapshots.borrow_and_update();
        ballplate_core::set_cycle_context(self.state.cycles + 1, snapshot.session.control_running);

        while let Ok(plan) = self.motions.try_recv() {
            self.sequencer.push(plan);
        }
        if self
            .sequencer
            .advance(now, self.head.as_ref(), self.arm.as_ref())
        {
            self.stats.waypoints_issued += 1;
        }

        let pair = self.frames.try_read();
        let pose = if pair.is_some() {
            let angles = self.frames.head_angles();
            let service = self
                .pose
                .as_mut()
                .map(|p| &mut **p as &mut dyn PoseService);
            resolve_pose(service, angles.as_deref(), self.kinematics.as_ref())
        } else {
            None
        };

        let (state, outcome) = self
            .orchestrator
            .run_cycle(&self.state, &snapshot, pair.as_ref(), pose);
        self.state = state;
        self.record(&outcome);

        if let Some(setpoints) = outcome.setpoints() {
            if self.sequencer.is_idle() {
                match self.arm.position_move(setpoints) {
                    Ok(()) => self.stats.setpoints_sent += 1,
                    Err(e) => log::error!("control move failed: {e}"),
                }
            } else {
                self.stats.setpoints_held += 1;
            }
        }
        self.publish.send_replace(self.stats.clone());
    }

    fn record(&mut self, outcome: &CycleOutcome) {
        let stats = &mut self.stats;
        stats.ticks += 1;
        match &outcome.gap {
            Some(PerceptionGap::NoFramePair) => {}
            Some(gap) => {
                stats.frame_pairs += 1;
                *stats.gaps.entry(gap.kind().to_string()).or_default() += 1;
            }
            None => stats.frame_pairs += 1,
        }
        if let Some(p) = outcome.position {
            stats.positions += 1;
            stats.last_position = Some(p);
            stats.last_grid_bin = outcome.grid_bin;
        }
        if outcome.control.is_some() {
            stats.control_steps += 1;
        }
    }
}

struct CommandRequest {
    line: String,
    reply: oneshot::Sender<Reply>,
}

async fn serve_commands(mut panel: ControlPanel, mut requests: mpsc::Receiver<CommandRequest>) {
    while let Some(request) = requests.recv().await {
        let reply = panel.handle_line(&request.line);
        log::debug!("{:?} -> {reply}", request.line);
        let _ = request.reply.send(reply);
    }
}

/// Cloneable handle for sending protocol lines to a running [`Runtime`].
#[derive(Clone)]
pub struct CommandClient {
    requests: mpsc::Sender<CommandRequest>,
}

impl CommandClient {
    pub async fn send(&self, line: impl Into<String>) -> Result<Reply, RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(CommandRequest {
                line: line.into(),
                reply,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        response.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

/// A running ball-on-plate session.
pub struct Runtime {
    client: CommandClient,
    snapshots: watch::Receiver<TuningSnapshot>,
    stats: watch::Receiver<WorkerStats>,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
    server: JoinHandle<()>,
    head: Arc<dyn Actuator>,
    arm: Arc<dyn Actuator>,
}

impl Runtime {
    /// Validate the devices and spawn the worker and command server.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: RuntimeConfig, collab: Collaborators) -> Result<Self, RuntimeError> {
        config.validate()?;
        require_joints(collab.head.as_ref(), HEAD_JOINTS)?;
        require_joints(collab.arm.as_ref(), ARM_JOINTS)?;
        for actuator in [&collab.head, &collab.arm] {
            actuator.set_reference_accelerations(0.0)?;
            actuator.set_reference_speeds(PRESET_REF_SPEED)?;
        }
        let geometry =
            StereoGeometry::new(&config.calibration.extrinsics, collab.kinematics.as_ref())?;

        let (motion_tx, motion_rx) = mpsc::unbounded_channel();
        let panel = ControlPanel::new(
            TuningSnapshot::from_config(&config),
            Arc::clone(&collab.head),
            Arc::clone(&collab.arm),
            motion_tx,
        );
        let snapshots = panel.subscribe();
        let (stats_tx, stats_rx) = watch::channel(WorkerStats::default());

        let (request_tx, request_rx) = mpsc::channel(COMMAND_QUEUE);
        let server = tokio::spawn(serve_commands(panel, request_rx));

        let period = Duration::from_millis(config.timing.tick_period_ms);
        let worker = Worker {
            orchestrator: CycleOrchestrator::new(&config, geometry),
            frames: collab.frames,
            pose: collab.pose,
            kinematics: collab.kinematics,
            head: Arc::clone(&collab.head),
            arm: Arc::clone(&collab.arm),
            snapshots: snapshots.clone(),
            motions: motion_rx,
            sequencer: MotionSequencer::default(),
            state: CycleState::default(),
            stats: WorkerStats::default(),
            publish: stats_tx,
            started: Instant::now(),
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(worker.run(period, shutdown_rx));
        log::info!("{}: runtime started, tick {:?}", config.name, period);

        Ok(Self {
            client: CommandClient {
                requests: request_tx,
            },
            snapshots,
            stats: stats_rx,
            shutdown: shutdown_tx,
            worker,
            server,
            head: collab.head,
            arm: collab.arm,
        })
    }

    pub fn client(&self) -> CommandClient {
        self.client.clone()
    }

    /// Latest published tuning snapshot.
    pub fn snapshot(&self) -> TuningSnapshot {
        *self.snapshots.borrow()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.borrow().clone()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<WorkerStats> {
        self.stats.clone()
    }

    /// Stop the worker, then release the frame source and both actuators.
    pub async fn shutdown(self) -> Result<WorkerStats, RuntimeError> {
        let _ = self.shutdown.send(());
        let joined = self.worker.await;
        self.server.abort();
        let _ = self.server.await;
        self.head.release();
        self.arm.release();
        joined?;
        let stats = self.stats.borrow().clone();
        log::info!(
            "runtime shut down: {} ticks, {} setpoints sent",
            stats.ticks,
            stats.setpoints_sent
        );
        Ok(stats)
    }
}
