mod common;

use approx::assert_relative_eq;
use ballplate::control::{AxisState, ARM_JOINTS, ARM_JOINT_X, ARM_JOINT_Y};
use ballplate::sim::{RecordingActuator, StaticEyes};
use ballplate::{
    Actuator, CameraPose, CycleOrchestrator, CycleOutcome, CycleState, FramePair, PerceptionGap,
    StereoGeometry, TuningSnapshot,
};
use common::{config, plate_canvas, Canvas};
use nalgebra::Matrix4;

fn orchestrator() -> CycleOrchestrator {
    let config = config();
    let geometry = StereoGeometry::new(&config.calibration.extrinsics, &StaticEyes::identity())
        .expect("geometry");
    CycleOrchestrator::new(&config, geometry)
}

fn pose() -> Option<CameraPose> {
    Some(CameraPose {
        left: Matrix4::identity(),
        right: Matrix4::identity(),
    })
}

fn pair(canvas: &Canvas, stamp: f64) -> FramePair {
    FramePair {
        left: canvas.frame(stamp),
        right: canvas.frame(stamp),
    }
}

/// Corner markers with the north-east one missing and no target.
fn three_corner_canvas() -> Canvas {
    let mut c = Canvas::new();
    c.rect(2, 112, 8, 5).rect(48, 2, 7, 5).rect(104, 2, 6, 5);
    c
}

/// Send every control output to `arm`, as the worker does.
fn forward(arm: &RecordingActuator, outs: &[CycleOutcome]) {
    for sp in outs.iter().filter_map(CycleOutcome::setpoints) {
        arm.position_move(sp).expect("arm move");
    }
}

fn axis_bits(a: &AxisState) -> [u64; 5] {
    [a.position, a.derivative, a.integral, a.filtered, a.raw].map(f64::to_bits)
}

/// Run `canvas` at 5 ms spacing for `n` cycles starting from `state`.
fn run(
    orch: &CycleOrchestrator,
    mut state: CycleState,
    snapshot: &TuningSnapshot,
    canvas: &Canvas,
    n: usize,
) -> (CycleState, Vec<CycleOutcome>) {
    let start = state.clock.last_stamp().unwrap_or(-0.005);
    let mut outcomes = Vec::with_capacity(n);
    for i in 1..=n {
        let p = pair(canvas, start + i as f64 * 0.005);
        let (next, out) = orch.run_cycle(&state, snapshot, Some(&p), pose());
        state = next;
        outcomes.push(out);
    }
    (state, outcomes)
}

#[test]
fn idle_cycles_track_the_ball_without_setpoints() {
    let orch = orchestrator();
    let snapshot = TuningSnapshot::from_config(&config());
    let (state, outs) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(78), 3);

    assert_eq!(outs[0].gap, Some(PerceptionGap::NoClock));
    assert!(outs[0].position.is_some());
    for out in &outs[1..] {
        assert_eq!(out.gap, None);
        assert!(out.control.is_none());
        assert!(out.relative_transform.is_some());
        let p = out.position.expect("position");
        assert!(p.valid);
        assert!(p.x.abs() < 10.0 && p.y.abs() < 10.0, "p = {p:?}");
        assert_eq!(out.grid_bin, Some(p.grid_bin()));
    }
    assert_eq!(state.cycles, 3);
    assert_eq!(state.controller.x.integral, 0.0);
}

#[test]
fn running_control_emits_grip_setpoints() {
    let orch = orchestrator();
    let mut snapshot = TuningSnapshot::from_config(&config());
    snapshot.session.control_running = true;
    let (_, outs) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(78), 4);

    assert!(outs[0].control.is_none());
    for out in &outs[1..] {
        let sp = out.setpoints().expect("setpoints");
        assert_eq!(sp.len(), ARM_JOINTS);
        assert_eq!(sp[15], 145.0);
        let limits = &snapshot.limits;
        assert!(sp[ARM_JOINT_X] >= limits.x.soft[0] && sp[ARM_JOINT_X] <= limits.x.soft[1]);
        assert!(sp[ARM_JOINT_Y] >= limits.y.soft[0] && sp[ARM_JOINT_Y] <= limits.y.soft[1]);
    }
}

#[test]
fn target_moving_east_increases_x() {
    let orch = orchestrator();
    let snapshot = TuningSnapshot::from_config(&config());
    let (_, west) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(55), 1);
    let (_, east) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(100), 1);

    let xw = west[0].position.expect("west").x;
    let xe = east[0].position.expect("east").x;
    assert!(xw < 0.0 && xe > 0.0, "west {xw}, east {xe}");
}

#[test]
fn stop_resets_control_terms_once() {
    let orch = orchestrator();
    let mut snapshot = TuningSnapshot::from_config(&config());
    snapshot.session.control_running = true;
    let canvas = plate_canvas(100);
    let (state, _) = run(&orch, CycleState::default(), &snapshot, &canvas, 10);
    assert!(state.controller.x.integral > 0.0);

    snapshot.session.control_running = false;
    snapshot.session.stop_epoch = 1;
    let (stopped, outs) = run(&orch, state, &snapshot, &canvas, 1);
    assert!(outs[0].control.is_none());
    assert_eq!(stopped.stop_epoch, 1);
    assert_eq!(stopped.controller.x.integral, 0.0);
    assert_eq!(stopped.controller.x.filtered, 0.0);
    // measurement baseline survives the reset
    assert_eq!(stopped.controller.x.position, state.controller.x.position);
}

#[test]
fn missing_corner_keeps_previous_position() {
    let orch = orchestrator();
    let snapshot = TuningSnapshot::from_config(&config());
    let (state, _) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(100), 2);

    let (next, outs) = run(&orch, state, &snapshot, &three_corner_canvas(), 1);
    assert_eq!(
        outs[0].gap,
        Some(PerceptionGap::InsufficientCorners { found: 3 })
    );
    assert!(outs[0].position.is_none());
    assert_eq!(next.position, state.position);
    // the clock still advanced on the accepted pair
    assert!(outs[0].dt.is_some());
}

#[test]
fn lost_corner_freezes_a_running_controller() {
    let orch = orchestrator();
    let mut snapshot = TuningSnapshot::from_config(&config());
    snapshot.session.control_running = true;
    let arm = RecordingActuator::new("right_arm", ARM_JOINTS);

    let (state, outs) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(100), 5);
    forward(&arm, &outs);
    let sent = arm.moves().len();
    assert_eq!(sent, 4);
    assert!(state.controller.x.integral != 0.0);

    let (next, outs) = run(&orch, state, &snapshot, &three_corner_canvas(), 3);
    forward(&arm, &outs);
    for out in &outs {
        assert_eq!(out.gap, Some(PerceptionGap::InsufficientCorners { found: 3 }));
        assert!(out.control.is_none());
    }
    assert_eq!(arm.moves().len(), sent);
    assert_eq!(axis_bits(&next.controller.x), axis_bits(&state.controller.x));
    assert_eq!(axis_bits(&next.controller.y), axis_bits(&state.controller.y));
    assert_eq!(next.position, state.position);
}

#[test]
fn derivative_after_dropout_spans_one_step() {
    let orch = orchestrator();
    let mut snapshot = TuningSnapshot::from_config(&config());
    snapshot.session.control_running = true;

    let (state, _) = run(&orch, CycleState::default(), &snapshot, &plate_canvas(55), 3);
    let (state, _) = run(&orch, state, &snapshot, &three_corner_canvas(), 2);
    let (next, outs) = run(&orch, state, &snapshot, &plate_canvas(100), 1);

    // the whole west-to-east jump is divided by a single cycle step
    let dt = outs[0].dt.expect("dt");
    assert_relative_eq!(dt, 0.005, epsilon = 1e-9);
    let x = outs[0].position.expect("position").x;
    assert_relative_eq!(
        next.controller.x.derivative,
        (x - state.controller.x.position) / dt,
        epsilon = 1e-9
    );
    assert!(next.controller.x.derivative > 0.0);
}

#[test]
fn missing_pose_skips_detection() {
    let orch = orchestrator();
    let snapshot = TuningSnapshot::from_config(&config());
    let p = pair(&plate_canvas(78), 0.0);
    let (next, out) = orch.run_cycle(&CycleState::default(), &snapshot, Some(&p), None);
    assert_eq!(out.gap, Some(PerceptionGap::NoPose));
    assert!(out.observation.is_none());
    assert_eq!(next.clock.last_stamp(), Some(0.0));
}
