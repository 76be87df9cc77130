//! Human-readable rendering of runtime events.

use a3s_app_core::{AppEvent, EventEmitter, EventPayload, PlatformDescriptor};
use a3s_app_runtime::PublishResult;
use tokio::task::JoinHandle;

/// Render an event as progress lines. Events with no console form yield `None`.
pub fn render_event(event: &AppEvent) -> Option<String> {
    match &event.payload {
        EventPayload::ServicePinning { service, image } => {
            Some(format!("Pinning {}({})", service, image))
        }
        EventPayload::ServicePinned {
            platforms, pinned, ..
        } => {
            let mut out = String::new();
            if !platforms.is_empty() {
                out.push_str(&format!("  | {}\n", format_platforms(platforms)));
            }
            out.push_str(&format!("  |-> {}", pinned));
            Some(out)
        }
        EventPayload::PatternIgnored { pattern, .. } => {
            Some(format!("  |-> ignoring: {}", pattern))
        }
        EventPayload::BlobUploaded { digest, .. } => Some(format!("  |-> app: {}", digest)),
        EventPayload::ManifestPushed { digest, .. } => {
            Some(format!("  |-> manifest: {}", digest))
        }
        EventPayload::EntryArchived { .. } => None,
    }
}

/// Comma-joined platform list, e.g. `amd64, armv7, arm64`.
pub fn format_platforms(platforms: &[PlatformDescriptor]) -> String {
    platforms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Closing line of `a3s-app publish`.
pub fn publish_summary(result: &PublishResult) -> String {
    format!(
        "Published {} ({} entries, {})",
        result.reference,
        result.entries,
        format_bytes(result.blob_size)
    )
}

/// Print rendered events until every emitter clone is dropped.
///
/// With `to_stderr` progress goes to stderr, leaving stdout for YAML output.
pub fn spawn_printer(events: &EventEmitter, to_stderr: bool) -> JoinHandle<()> {
    let mut rx = events.subscribe_unbounded();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = render_event(&event) {
                if to_stderr {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
        }
    })
}
