//! Desktop notification shell-out.
//!
//! Best-effort: the notification is spawned concurrently with queued
//! voice work and failures are logged at debug level, never surfaced.

use tokio::process::Command;
use tracing::debug;

/// Fire a desktop notification without blocking the caller.
pub fn send_desktop_notification(title: &str, message: &str) {
    let title = title.to_string();
    let message = message.to_string();
    tokio::spawn(async move {
        if let Err(e) = notify(&title, &message).await {
            debug!(error = %e, "Desktop notification failed");
        }
    });
}

#[cfg(target_os = "macos")]
async fn notify(title: &str, message: &str) -> std::io::Result<()> {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(message),
        applescript_escape(title)
    );
    Command::new("osascript")
        .arg("-e")
        .arg(script)
        .status()
        .await
        .map(|_| ())
}

#[cfg(target_os = "macos")]
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(not(target_os = "macos"))]
async fn notify(title: &str, message: &str) -> std::io::Result<()> {
    Command::new("notify-send")
        .arg(title)
        .arg(message)
        .status()
        .await
        .map(|_| ())
}
