//! List discovered camera+microphone pairs.

use std::sync::Arc;

use rawcam_capture_engine::{event_bus, DeviceDiscovery, DeviceGroupSelector, LinuxBackend};
use rawcam_common::config::AppConfig;

pub async fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let backend = Arc::new(LinuxBackend::new(&config.platform, event_bus()));
    let groups = DeviceDiscovery::new(backend).discover().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No camera with a built-in microphone was found.");
        return Ok(());
    }

    let selector = DeviceGroupSelector::new(groups);
    println!("Capture devices:");
    for group in selector.groups() {
        let marker = if group.group_id == selector.selected_group_id() {
            "*"
        } else {
            " "
        };
        println!(" {marker} {}", group.label);
        println!("     group: {}", group.group_id);
        println!("     video: {} ({})", group.video.id, group.video.label);
        println!("     audio: {} ({})", group.audio.id, group.audio.label);
    }
    println!();
    println!("* default selection; pass --group <group> to `rawcam preview` to choose another");
    Ok(())
}
