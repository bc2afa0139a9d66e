use std::sync::atomic::Ordering;

use crate::{
    config::constants::TELEMETRY_LOG_PERIOD_MS,
    control::{control_loops::AttitudeEstimate, reference::ControlReference},
    shared_core_values::AtomicTelemetry,
    util::{
        math::{bound, vectors::RotationVector3D},
        time::delay_ms,
    },
};

/// Compact snapshot of the last actuator command for the downlink.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ActuatorTelemetry {
    pub counter: u8,
    /// Throttle, pitch, roll, yaw demand in percent.
    pub actuator_desired: [i8; 4],
    pub rotation_rate: RotationVector3D,
}

pub trait TelemetrySink {
    fn send(&mut self, telemetry: &ActuatorTelemetry);
}

/// Produces a telemetry snapshot every `divider` control cycles.
pub struct TelemetryHook {
    divider: u32,
    cycle: u32,
    counter: u8,
}

impl TelemetryHook {
    pub fn new(divider: u32) -> Self {
        Self {
            divider: divider.max(1),
            cycle: 0,
            counter: 0,
        }
    }

    pub fn on_cycle(
        &mut self,
        reference: &ControlReference,
        estimate: &AttitudeEstimate,
    ) -> Option<ActuatorTelemetry> {
        self.cycle += 1;
        if self.cycle < self.divider {
            return None;
        }
        self.cycle = 0;

        let percent = |value: f32| bound(value * 100.0, -100.0, 100.0) as i8;
        let demand = reference.actuator_desired;
        let telemetry = ActuatorTelemetry {
            counter: self.counter,
            actuator_desired: [
                percent(demand.throttle),
                percent(demand.pitch),
                percent(demand.roll),
                percent(demand.yaw),
            ],
            rotation_rate: body_rates(estimate),
        };
        self.counter = self.counter.wrapping_add(1);
        Some(telemetry)
    }
}

fn body_rates(estimate: &AttitudeEstimate) -> RotationVector3D {
    RotationVector3D {
        pitch: estimate.rotation_rate.y,
        roll: estimate.rotation_rate.x,
        yaw: estimate.rotation_rate.z,
    }
}

/// Store telemetry data of one control cycle.
pub fn publish_cycle(
    telemetry_data: &AtomicTelemetry,
    reference: &ControlReference,
    estimate: &AttitudeEstimate,
    loop_exec_time_us: u64,
    current_time_us: u64,
) {
    telemetry_data
        .loop_exec_time_us
        .store(loop_exec_time_us.min(i32::MAX as u64) as i32, Ordering::Relaxed);
    telemetry_data
        .last_estimate_us
        .store(current_time_us, Ordering::Release);
    telemetry_data.rotation_rate.store(body_rates(estimate));
    telemetry_data
        .throttle
        .store(reference.actuator_desired.throttle, Ordering::Relaxed);
    for (shared, output) in telemetry_data
        .channel_outputs
        .iter()
        .zip(reference.pwm_out.iter())
    {
        shared.store(*output, Ordering::Relaxed);
    }
}

pub fn start_telemetry_thread(telemetry_data: &'static AtomicTelemetry) {
    // Print telemetry values, for debugging purposes.
    let spawned = std::thread::Builder::new()
        .name("telemetry".into())
        .stack_size(4096)
        .spawn(move || loop {
            log::info!(
                "
                    Armed: {}
                    Iteration Time: {:?}
                    Rotation rate {:?}
                    Outputs {:?}
                    Throttle {:?}",
                telemetry_data.armed.load(Ordering::Relaxed),
                telemetry_data.loop_exec_time_us.load(Ordering::Relaxed),
                telemetry_data.rotation_rate.read(),
                telemetry_data.channel_outputs(),
                telemetry_data.throttle.load(Ordering::Relaxed),
            );
            delay_ms(TELEMETRY_LOG_PERIOD_MS);
        });
    if let Err(error) = spawned {
        log::warn!("Telemetry thread not started: {}", error);
    }
}
