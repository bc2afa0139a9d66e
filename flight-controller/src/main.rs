use std::{
    io::BufRead,
    sync::mpsc::{self, Sender},
};

use drone_flight_core::{
    communication_interfaces::commands::CommandHandler,
    config::{
        constants::{ESTIMATION_DT, RC_OUTPUT_PERIOD_US, STORAGE_IDENTITY, STORAGE_PAGE_CAPACITY},
        store::{ControlParameterStore, MemoryParameterStorage},
    },
    control::control_loops::AttitudeEstimate,
    output::{
        motor_controller::{PulseTiming, SimulatedPwmChannel},
        motors_state_manager::MotorsStateManager,
    },
    shared_core_values::SharedCoreValues,
    telemetry::start_telemetry_thread,
    threads::{arming_thread, flight_thread, parameter_save_thread},
    util::{
        error::{system_halt, AppError},
        time::delay_ms,
    },
};
use shared_definitions::{
    commands::{CoreCommand, FORCE_DISARM_KEY},
    controller::{ControllerInput, FlightMode},
    tuning::OUTPUT_CHANNELS,
};

#[cfg(target_os = "espidf")]
fn init_logger() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
}

#[cfg(not(target_os = "espidf"))]
fn init_logger() {
    use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

    if let Err(error) = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Logger init failed: {}", error);
    }
}

fn spawn_task<F>(name: &str, stack_size: usize, task: F)
where
    F: FnOnce() + Send + 'static,
{
    if let Err(error) = std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_size)
        .spawn(task)
    {
        system_halt(&AppError::Io(error));
    }
}

/// Bench console: `disarm`, `save`, `mode <name>`.
fn parse_bench_command(line: &str) -> Option<CoreCommand> {
    let mut words = line.split_whitespace();
    match (words.next()?, words.next()) {
        ("disarm", None) => Some(CoreCommand::ForceDisarm {
            key: FORCE_DISARM_KEY,
        }),
        ("save", None) => Some(CoreCommand::SaveParameters),
        ("mode", Some(mode)) => {
            let mode = match mode {
                "pwm" => FlightMode::DirectPwm,
                "direct" => FlightMode::DirectControl,
                "rate" => FlightMode::Rate,
                "attitude" => FlightMode::Attitude,
                "velocity" => FlightMode::Velocity,
                "position" => FlightMode::Position,
                _ => return None,
            };
            Some(CoreCommand::SetFlightMode(mode))
        }
        _ => None,
    }
}

fn start_bench_console(handler: CommandHandler<'static>) {
    spawn_task("console", 4096, move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            match parse_bench_command(&line) {
                Some(command) => {
                    handler.handle(command);
                }
                None => log::warn!("Unknown command: {}", line.trim()),
            }
        }
    });
}

fn run_estimate_source(estimates: Sender<AttitudeEstimate>) {
    // Level and motionless at the estimator rate
    let period_ms = ((ESTIMATION_DT * 1000.0) as u32).max(1);
    let estimate = AttitudeEstimate {
        dt: ESTIMATION_DT,
        ..Default::default()
    };
    while estimates.send(estimate).is_ok() {
        delay_ms(period_ms);
    }
    log::error!("Flight task stopped");
}

fn main() {
    init_logger();
    log::info!("Running");

    let shared = SharedCoreValues::global();

    let storage = MemoryParameterStorage::new(STORAGE_IDENTITY, STORAGE_PAGE_CAPACITY);
    let mut store = ControlParameterStore::open(storage, STORAGE_IDENTITY)
        .unwrap_or_else(|error| system_halt(&error));
    let mut config = shared.config.snapshot();
    store.load_into(&mut config);
    shared.config.replace(config);

    let motors_manager = MotorsStateManager::new(
        [SimulatedPwmChannel::new(RC_OUTPUT_PERIOD_US); OUTPUT_CHANNELS],
        PulseTiming::default(),
    )
    .unwrap_or_else(|error| system_halt(&error));

    let (save_sender, save_receiver) = mpsc::channel();
    let (estimate_sender, estimate_receiver) = mpsc::channel();

    spawn_task("arming", 4096, move || arming_thread(shared));
    spawn_task("flight", 8192, move || {
        flight_thread(shared, estimate_receiver, motors_manager, None)
    });
    spawn_task("param-save", 4096, move || {
        parameter_save_thread(&mut store, shared.config, save_receiver)
    });
    start_telemetry_thread(shared.telemetry);
    start_bench_console(CommandHandler::new(
        shared.config,
        shared.arm_state,
        save_sender,
    ));

    // Bench receiver: link up, emergency stop released, sticks centered
    shared.controller_input.store(&ControllerInput {
        aux1: 1.0,
        link_active: true,
        ..Default::default()
    });

    run_estimate_source(estimate_sender);
}
