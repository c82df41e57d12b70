//! Stream the selected pair into a full-screen preview window.

use std::sync::Arc;

use anyhow::bail;
use rawcam_capture_engine::{
    event_bus, CaptureController, EventSender, LinuxBackend, PreviewWindow, SessionState,
};
use rawcam_common::config::AppConfig;
use rawcam_platform_core::DisplayEvent;

pub async fn run(config: AppConfig, group: Option<String>) -> anyhow::Result<()> {
    let events = event_bus();
    let backend = Arc::new(LinuxBackend::new(&config.platform, events.clone()));
    let window = PreviewWindow::new(events.clone());
    let host = Arc::new(window.host());
    let mut controller =
        CaptureController::new(backend, Box::new(window), host, config.session.clone());

    if controller.discover().await?.is_empty() {
        println!("No camera with a built-in microphone was found.");
        return Ok(());
    }
    if let Some(group) = group {
        controller.set_selection(group);
    }

    stream(&mut controller, &events).await?;
    println!("Preview stopped.");
    Ok(())
}

/// Start the selected pair and block until the session returns to idle.
/// The binder is shut down and joined on every path.
async fn stream(controller: &mut CaptureController, events: &EventSender) -> anyhow::Result<()> {
    let (binder, shutdown) = controller.binder();
    let binder_task = tokio::spawn(binder.run(shutdown));

    let outcome = watch_session(controller, events).await;

    while let Some(notice) = controller.try_next_notice() {
        eprintln!("{}", notice.text);
    }
    controller.shutdown();
    binder_task.await?;
    outcome
}

async fn watch_session(
    controller: &mut CaptureController,
    events: &EventSender,
) -> anyhow::Result<()> {
    let mut states = controller.session().subscribe();

    if !controller.start().await? {
        bail!(
            "No capture pair with group id '{}'. Run `rawcam devices` to list them.",
            controller.selected_group_id()
        );
    }

    println!("Streaming. Press Ctrl+C or leave full-screen to stop...");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Interrupt received; pausing preview");
                let _ = events.send(DisplayEvent::MediaPaused);
            }
            changed = states.changed() => {
                if changed.is_err() || *states.borrow_and_update() == SessionState::Idle {
                    return Ok(());
                }
            }
            Some(notice) = controller.next_notice() => {
                eprintln!("{}", notice.text);
            }
        }
    }
}
