use std::time::Instant;

use once_cell::sync::Lazy;

static BOOT_INSTANT: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_current_system_time_us() -> u64 {
    BOOT_INSTANT.elapsed().as_micros() as u64
}

#[cfg(target_os = "espidf")]
pub fn delay_ms(ms: u32) {
    esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
}

#[cfg(not(target_os = "espidf"))]
pub fn delay_ms(ms: u32) {
    std::thread::sleep(std::time::Duration::from_millis(ms as u64));
}
