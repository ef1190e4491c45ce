//! Renders install progress events.
//!
//! All display state lives on this side of the event channel; the core
//! scheduler emits structured events and never touches the terminal.

use dalkey_core::pkg::InstallEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Consume events until the scheduler drops its sender.
pub async fn render(mut events: UnboundedReceiver<InstallEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            InstallEvent::Started { .. } => {}
            InstallEvent::Completed {
                name,
                version,
                from_cache,
            } => {
                let source = if from_cache { "cached" } else { "downloaded" };
                println!("+ {name}@{version} ({source})");
            }
            InstallEvent::Failed { name, message } => {
                eprintln!("! {name}: {message}");
            }
            InstallEvent::DepWarning { name, dep, message } => {
                eprintln!("  warn: dependency {dep} of {name}: {message}");
            }
        }
    }
}
