// Arming
pub const ARM_RATE_HZ: u32 = 50;
pub const EMERGENCY_STOP_LEVEL: f32 = 0.5;

// Control loop
pub const ESTIMATION_DT: f32 = 0.002; // 500 Hz estimator
pub const RATE_FILTER_ALPHA: f32 = 0.2;
pub const ACTUATOR_LIMIT: f32 = 1.0;
pub const ESTIMATE_STALE_TIMEOUT_US: u64 = 100_000;

// RC outputs, 400 Hz period with standard ESC pulse widths
pub const RC_OUTPUT_PERIOD_US: u16 = 2500;
pub const RC_OUTPUT_MIN_PULSE_US: u16 = 1000;
pub const RC_OUTPUT_MAX_PULSE_US: u16 = 2000;

// Parameter storage
pub const STORAGE_PAGE_CAPACITY: usize = 256;
pub const STORAGE_IDENTITY: u32 = 0x00EF_4018;
pub const RECORD_VERSION: u8 = 1;

// Telemetry
pub const TELEMETRY_CYCLE_DIVIDER: u32 = 41;
pub const TELEMETRY_LOG_PERIOD_MS: u32 = 250;
