//! Audio input diagnostics.
//!
//! Lists every capture device cpal can see along with its default format,
//! which is usually enough to tell why a microphone will not open.

use cpal::traits::{DeviceTrait, HostTrait};

pub fn log_audio_info() {
    println!("\n=== Audio Input Diagnostics ===\n");

    let host = cpal::default_host();
    println!("Host: {:?}", host.id());

    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    match &default_name {
        Some(name) => println!("Default input: {}", name),
        None => println!("Default input: (none)"),
    }

    println!("\n--- Input Devices ---");
    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            println!("  (failed to enumerate: {})", e);
            return;
        }
    };

    let mut found = false;
    for (idx, device) in devices.enumerate() {
        found = true;
        let name = device.name().unwrap_or_else(|_| "(unnamed)".to_string());
        match device.default_input_config() {
            Ok(config) => println!(
                "  [{}] {} - {} ch, {} Hz, {:?}",
                idx,
                name,
                config.channels(),
                config.sample_rate().0,
                config.sample_format()
            ),
            Err(e) => println!("  [{}] {} - no default config ({})", idx, name, e),
        }
    }
    if !found {
        println!("  (none found - check microphone permissions)");
    }

    println!("\n=== End Diagnostics ===\n");
}
