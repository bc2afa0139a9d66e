use std::{
    sync::{atomic::Ordering, mpsc},
    thread,
    time::Duration,
};

use approx::assert_abs_diff_eq;
use drone_flight_core::{
    communication_interfaces::commands::CommandHandler,
    config::{
        constants::{ARM_RATE_HZ, STORAGE_IDENTITY, STORAGE_PAGE_CAPACITY},
        parameters::{ControlConfiguration, SharedConfiguration},
        store::{ControlParameterStore, MemoryParameterStorage, CONTROLLER_GAINS_KEY},
    },
    control::{
        arming::{ArmingGate, EstimateWatchdog},
        control_loops::{start_flight_controllers, AttitudeEstimate, MainControlLoopOutCommands},
    },
    output::mixer::quadcopter_x_mixer,
    shared_core_values::{AtomicArmState, AtomicControllerInput, AtomicTelemetry, SharedCoreValues},
    telemetry::{ActuatorTelemetry, TelemetrySink},
    threads::{arming_step, parameter_save_thread},
};
use shared_definitions::{
    commands::{CoreCommand, FORCE_DISARM_KEY},
    controller::{ArmStickDirection, ControllerInput},
    tuning::{
        ArmSettings, ControlLimits, PIGains, PitchRollLimit, PitchRollYawLimit, OUTPUT_CHANNELS,
    },
};

struct TestCore {
    controller_input: AtomicControllerInput,
    arm_state: AtomicArmState,
    config: SharedConfiguration,
    telemetry: AtomicTelemetry,
}

impl TestCore {
    fn new(config: ControlConfiguration) -> Self {
        Self {
            controller_input: AtomicControllerInput::new(),
            arm_state: AtomicArmState::new(),
            config: SharedConfiguration::new(config),
            telemetry: AtomicTelemetry::new(),
        }
    }

    fn shared(&self) -> SharedCoreValues<'_> {
        SharedCoreValues {
            controller_input: &self.controller_input,
            arm_state: &self.arm_state,
            config: &self.config,
            telemetry: &self.telemetry,
        }
    }
}

fn quad_configuration() -> ControlConfiguration {
    let mut config = ControlConfiguration {
        arm_settings: ArmSettings {
            stick_threshold: 0.1,
            armed_min_throttle: 0.05,
            stick_direction: ArmStickDirection::YawMax,
            arm_stick_time: 1,
            arm_zero_throttle_timeout: 0,
        },
        limits: ControlLimits {
            max_angle: PitchRollLimit {
                pitch: 30.0,
                roll: 30.0,
            },
            max_rate: PitchRollYawLimit {
                pitch: 200.0,
                roll: 200.0,
                yaw: 90.0,
            },
            max_rate_attitude: PitchRollLimit {
                pitch: 150.0,
                roll: 150.0,
            },
        },
        mixer: quadcopter_x_mixer(),
        ..Default::default()
    };
    config.gains.attitude = [PIGains::symmetric(4.0, 0.5, 10.0); 3];
    config.gains.rate = [PIGains::symmetric(0.2, 0.05, 1.0); 3];
    config
}

fn arm_gesture() -> ControllerInput {
    ControllerInput {
        throttle: 0.0,
        yaw: 1.0,
        aux1: 1.0,
        link_active: true,
        ..Default::default()
    }
}

#[derive(Default)]
struct RecordingSink {
    received: Vec<ActuatorTelemetry>,
}

impl TelemetrySink for RecordingSink {
    fn send(&mut self, telemetry: &ActuatorTelemetry) {
        self.received.push(*telemetry);
    }
}

#[test]
fn yaw_gesture_arms_after_one_second_at_fifty_hertz() {
    let core = TestCore::new(quad_configuration());
    let shared = core.shared();
    let mut gate = ArmingGate::new(shared.arm_state, ARM_RATE_HZ);
    let watchdog = EstimateWatchdog::new(u64::MAX);

    core.controller_input.store(&arm_gesture());
    for _ in 0..ARM_RATE_HZ - 1 {
        assert!(!arming_step(&mut gate, &watchdog, shared, 0));
    }

    // One tick with the stick released starts the count again
    core.controller_input.store(&ControllerInput {
        yaw: 0.0,
        ..arm_gesture()
    });
    assert!(!arming_step(&mut gate, &watchdog, shared, 0));
    assert_eq!(gate.timers().arm_time, 0);

    core.controller_input.store(&arm_gesture());
    for _ in 0..ARM_RATE_HZ - 1 {
        assert!(!arming_step(&mut gate, &watchdog, shared, 0));
    }
    assert!(arming_step(&mut gate, &watchdog, shared, 0));
    assert!(core.telemetry.armed.load(Ordering::Relaxed));
}

#[test]
fn stale_estimates_disarm_armed_core() {
    let core = TestCore::new(quad_configuration());
    let shared = core.shared();
    let mut gate = ArmingGate::new(shared.arm_state, ARM_RATE_HZ);
    let watchdog = EstimateWatchdog::new(100_000);

    core.controller_input.store(&ControllerInput {
        throttle: 0.5,
        ..arm_gesture()
    });
    core.arm_state.set_armed(true);
    core.telemetry
        .last_estimate_us
        .store(1_000_000, Ordering::Relaxed);

    assert!(arming_step(&mut gate, &watchdog, shared, 1_050_000));
    assert!(!arming_step(&mut gate, &watchdog, shared, 1_200_000));
    assert!(!core.telemetry.armed.load(Ordering::Relaxed));
}

#[test]
fn flight_loop_drives_outputs_and_stops_on_disarm() {
    let core = TestCore::new(quad_configuration());
    let shared = core.shared();
    let (estimates, receiver) = mpsc::channel();
    let mut sink = RecordingSink::default();
    let mut commands = Vec::new();

    core.controller_input.store(&ControllerInput {
        throttle: 0.4,
        pitch: 0.5,
        aux1: 1.0,
        link_active: true,
        ..Default::default()
    });
    core.arm_state.set_armed(true);

    let estimate = AttitudeEstimate {
        dt: 0.002,
        ..Default::default()
    };
    for _ in 0..82 {
        estimates.send(estimate).unwrap();
    }
    drop(estimates);

    start_flight_controllers(shared, receiver, Some(&mut sink), |command| {
        commands.push(command)
    });

    assert_eq!(commands.len(), 82);
    assert!(commands
        .iter()
        .all(|command| matches!(command, MainControlLoopOutCommands::UpdateOutputs(_))));
    assert_eq!(sink.received.len(), 2);
    assert_eq!(sink.received[1].counter, 1);
    assert!(sink.received[0].actuator_desired[1] > 0);
    assert_abs_diff_eq!(core.telemetry.throttle.load(Ordering::Relaxed), 0.4);
    assert!(core.telemetry.channel_outputs()[..4]
        .iter()
        .all(|output| *output > 0.0));

    // Forced disarm from the command interface kills the outputs next cycle
    let (save_sender, _save_receiver) = mpsc::channel();
    let handler = CommandHandler::new(&core.config, &core.arm_state, save_sender);
    assert!(handler.handle(CoreCommand::ForceDisarm {
        key: FORCE_DISARM_KEY
    }));

    let (estimates, receiver) = mpsc::channel();
    estimates.send(estimate).unwrap();
    drop(estimates);
    let mut commands = Vec::new();
    start_flight_controllers(shared, receiver, None, |command| commands.push(command));

    assert_eq!(commands, vec![MainControlLoopOutCommands::KillMotors]);
    assert_eq!(
        core.telemetry.channel_outputs(),
        [0.0; OUTPUT_CHANNELS]
    );
}

#[test]
fn stalled_estimator_stops_motors() {
    let core = TestCore::new(quad_configuration());
    let shared = core.shared();
    let (estimates, receiver) = mpsc::channel();
    let mut commands = Vec::new();

    core.controller_input.store(&ControllerInput {
        throttle: 0.6,
        aux1: 1.0,
        link_active: true,
        ..Default::default()
    });
    core.arm_state.set_armed(true);

    thread::scope(|scope| {
        scope.spawn(move || {
            estimates
                .send(AttitudeEstimate {
                    dt: 0.002,
                    ..Default::default()
                })
                .unwrap();
            // Estimator hangs for longer than the staleness timeout
            thread::sleep(Duration::from_millis(250));
        });
        start_flight_controllers(shared, receiver, None, |command| commands.push(command));
    });

    assert!(matches!(
        commands.first(),
        Some(MainControlLoopOutCommands::UpdateOutputs(_))
    ));
    assert_eq!(commands.last(), Some(&MainControlLoopOutCommands::KillMotors));
    assert!(commands.len() >= 2);
}

#[test]
fn save_request_persists_live_configuration() {
    let core = TestCore::new(ControlConfiguration::default());
    let storage = MemoryParameterStorage::new(STORAGE_IDENTITY, STORAGE_PAGE_CAPACITY);
    let mut store = ControlParameterStore::open(storage, STORAGE_IDENTITY).unwrap();
    let (save_sender, save_receiver) = mpsc::channel();
    let handler = CommandHandler::new(&core.config, &core.arm_state, save_sender);

    let tuned = quad_configuration();
    handler.handle(CoreCommand::SetArmSettings(tuned.arm_settings));
    handler.handle(CoreCommand::SetControllerGains(tuned.gains));
    handler.handle(CoreCommand::SetControlLimits(tuned.limits));
    handler.handle(CoreCommand::SetOutputMixer(tuned.mixer));
    handler.handle(CoreCommand::SaveParameters);
    drop(handler);

    // Returns once the request queue is drained and every sender is gone
    parameter_save_thread(&mut store, &core.config, save_receiver);
    assert!(store.storage().raw_record(CONTROLLER_GAINS_KEY).is_some());

    let mut loaded = ControlConfiguration::default();
    store.load_into(&mut loaded);
    assert_eq!(loaded.arm_settings, tuned.arm_settings);
    assert_eq!(loaded.gains, tuned.gains);
    assert_eq!(loaded.limits, tuned.limits);
    assert_eq!(loaded.mixer, tuned.mixer);
}
