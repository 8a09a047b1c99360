use crate::runtime::AppEvent;
use crate::state::SessionId;
use serde::Deserialize;
use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info, warn};

/// Commands the renderer writes back, one JSON object per line.
#[derive(Deserialize)]
#[serde(tag = "event")]
enum RendererCommand {
    #[serde(rename = "popup:closed")]
    PopupClosed {
        #[serde(default)]
        session: Option<SessionId>,
    },
    #[serde(rename = "repair:submit")]
    RepairSubmit { key: String },
    #[serde(rename = "popup:copy-chinese")]
    CopyChinese,
    #[serde(rename = "app:quit")]
    Quit,
}

impl From<RendererCommand> for AppEvent {
    fn from(command: RendererCommand) -> Self {
        match command {
            RendererCommand::PopupClosed { session } => AppEvent::PopupClosed(session),
            RendererCommand::RepairSubmit { key } => AppEvent::SubmitCredential(key),
            RendererCommand::CopyChinese => AppEvent::CopyChinese,
            RendererCommand::Quit => AppEvent::Quit,
        }
    }
}

pub fn parse_line(line: &str) -> Option<AppEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<RendererCommand>(line) {
        Ok(command) => Some(command.into()),
        Err(e) => {
            // the line may carry a key, keep it out of the log
            warn!("Ignoring renderer line ({} bytes): {}", line.len(), e);
            None
        }
    }
}

/// Forwards parsed lines until EOF, then asks the loop to stop. Returns
/// early if the loop is gone.
pub fn forward_lines<R: BufRead>(reader: R, events: &Sender<AppEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Renderer input error: {}", e);
                break;
            }
        };
        if let Some(event) = parse_line(&line) {
            if events.send(event).is_err() {
                debug!("Event loop gone, stopping renderer bridge");
                return;
            }
        }
    }
    info!("Renderer input closed");
    let _ = events.send(AppEvent::Quit);
}

pub fn spawn_stdin_bridge(events: Sender<AppEvent>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("renderer-bridge".to_string())
        .spawn(move || forward_lines(io::stdin().lock(), &events))
}
