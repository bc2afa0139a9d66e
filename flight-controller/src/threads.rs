use std::sync::{atomic::Ordering, mpsc::Receiver};

use embedded_hal::pwm::SetDutyCycle;

use crate::{
    communication_interfaces::commands::SaveRequest,
    config::{
        constants::{ARM_RATE_HZ, ESTIMATE_STALE_TIMEOUT_US},
        parameters::SharedConfiguration,
        store::{ControlParameterStore, ParameterStorage},
    },
    control::{
        arming::{ArmingGate, EstimateWatchdog},
        control_loops::{start_flight_controllers, AttitudeEstimate, MainControlLoopOutCommands},
    },
    output::motors_state_manager::MotorsStateManager,
    shared_core_values::SharedCoreValues,
    telemetry::TelemetrySink,
    util::{
        error::{system_halt, AppError},
        time::{delay_ms, get_current_system_time_us},
    },
};

/// One arming evaluation: stick gesture, then the stale-estimate watchdog.
/// Returns the armed state it leaves behind.
pub fn arming_step(
    gate: &mut ArmingGate<'_>,
    watchdog: &EstimateWatchdog,
    shared: SharedCoreValues<'_>,
    now_us: u64,
) -> bool {
    let input = shared.controller_input.snapshot();
    let settings = shared.config.arm_settings();
    gate.tick(&input, &settings);

    watchdog.check(
        shared.arm_state,
        now_us,
        shared.telemetry.last_estimate_us.load(Ordering::Acquire),
    );

    let armed = shared.arm_state.is_armed();
    shared.telemetry.armed.store(armed, Ordering::Relaxed);
    armed
}

pub fn arming_thread(shared: SharedCoreValues<'_>) -> ! {
    let mut gate = ArmingGate::new(shared.arm_state, ARM_RATE_HZ);
    let watchdog = EstimateWatchdog::new(ESTIMATE_STALE_TIMEOUT_US);
    log::info!("Arming task started at {} Hz", ARM_RATE_HZ);

    loop {
        arming_step(&mut gate, &watchdog, shared, get_current_system_time_us());
        delay_ms(1000 / ARM_RATE_HZ);
    }
}

pub fn flight_thread<P: SetDutyCycle>(
    shared: SharedCoreValues<'_>,
    estimates: Receiver<AttitudeEstimate>,
    mut motors_manager: MotorsStateManager<P>,
    telemetry_sink: Option<&mut dyn TelemetrySink>,
) {
    log::info!("Flight task started");

    let output_handler = move |command: MainControlLoopOutCommands| match command {
        MainControlLoopOutCommands::KillMotors => motors_manager.kill_motors(),
        MainControlLoopOutCommands::UpdateOutputs(outputs) => motors_manager.set_outputs(&outputs),
    };

    start_flight_controllers(shared, estimates, telemetry_sink, output_handler);
}

/// Persists the configuration once per request until every requester is gone.
pub fn parameter_save_thread<S: ParameterStorage>(
    store: &mut ControlParameterStore<S>,
    config: &SharedConfiguration,
    requests: Receiver<SaveRequest>,
) {
    log::info!("Parameter save task started");

    for _ in requests.iter() {
        match store.save(&config.snapshot()) {
            Ok(()) => {}
            Err(error @ AppError::WriteTooLarge { .. }) => system_halt(&error),
            Err(error) => log::warn!("Saving control parameters failed: {}", error),
        }
    }
}
