//! Check system capabilities.

use rawcam_common::config::AppConfig;
use rawcam_platform_core::DisplayServer;
use rawcam_platform_linux::permissions::{check_capabilities, print_capability_report};
use rawcam_platform_linux::{detect_display_server, detect_monitors, enumerate_devices};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Rawcam System Check");
    println!("{}", "=".repeat(50));

    match detect_display_server() {
        DisplayServer::Wayland => println!("[OK] Display server: Wayland"),
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        DisplayServer::Unknown => println!("[WARN] Display server: Unknown"),
    }

    let monitors = detect_monitors(&config.platform.sysfs_root)?;
    println!("[OK] Monitors detected: {}", monitors.len());
    for m in &monitors {
        println!(
            "     {} {}x{} {}",
            m.name,
            m.width,
            m.height,
            if m.primary { "(primary)" } else { "" }
        );
    }

    let devices = enumerate_devices(&config.platform.sysfs_root)?;
    println!("[OK] Capture devices found: {}", devices.len());

    let capabilities = check_capabilities(&devices);
    println!();
    print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. Rawcam is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
