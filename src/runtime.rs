use crate::session::{Completion, Orchestrator, PendingRequest};
use crate::state::SessionId;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use tracing::{debug, info, warn};

/// Everything that can wake the loop: host input and finished requests.
pub enum AppEvent {
    TranslateHotkey,
    RepairHotkey,
    /// Carries the session id of the closed translation popup, if any.
    PopupClosed(Option<SessionId>),
    SubmitCredential(String),
    CopyChinese,
    TranslationFinished(Completion),
    Quit,
}

impl AppEvent {
    fn name(&self) -> &'static str {
        match self {
            AppEvent::TranslateHotkey => "translate-hotkey",
            AppEvent::RepairHotkey => "repair-hotkey",
            AppEvent::PopupClosed(_) => "popup-closed",
            AppEvent::SubmitCredential(_) => "submit-credential",
            AppEvent::CopyChinese => "copy-chinese",
            AppEvent::TranslationFinished(_) => "translation-finished",
            AppEvent::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Runs a request somewhere off the loop and reports back as an event.
pub trait Dispatcher {
    fn dispatch(&self, request: PendingRequest);
}

pub struct ThreadDispatcher {
    events: Sender<AppEvent>,
}

impl ThreadDispatcher {
    pub fn new(events: Sender<AppEvent>) -> Self {
        Self { events }
    }
}

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, request: PendingRequest) {
        let events = self.events.clone();
        let id = request.id;
        let spawned = thread::Builder::new()
            .name(format!("translate-{}", id.0))
            .spawn(move || {
                let completion = request.execute();
                if events.send(AppEvent::TranslationFinished(completion)).is_err() {
                    debug!("Event loop gone before session {} finished", id.0);
                }
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn translation worker: {}", e);
        }
    }
}

/// Owns the orchestrator; the only place session state is touched.
pub struct EventLoop<D: Dispatcher> {
    orchestrator: Orchestrator,
    dispatcher: D,
    events: Receiver<AppEvent>,
}

impl<D: Dispatcher> EventLoop<D> {
    pub fn new(orchestrator: Orchestrator, dispatcher: D, events: Receiver<AppEvent>) -> Self {
        Self {
            orchestrator,
            dispatcher,
            events,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn handle(&mut self, event: AppEvent) -> LoopControl {
        debug!("Event: {}", event.name());
        match event {
            AppEvent::TranslateHotkey => {
                if let Some(request) = self.orchestrator.on_translate_hotkey() {
                    self.dispatcher.dispatch(request);
                }
            }
            AppEvent::RepairHotkey => self.orchestrator.open_repair(),
            AppEvent::PopupClosed(session) => self.orchestrator.on_popup_closed(session),
            AppEvent::SubmitCredential(raw) => {
                // rejection is already shown inline in the form
                let _ = self.orchestrator.submit_credential(&raw);
            }
            AppEvent::CopyChinese => {
                self.orchestrator.copy_chinese();
            }
            AppEvent::TranslationFinished(completion) => self.orchestrator.complete(completion),
            AppEvent::Quit => return LoopControl::Stop,
        }
        LoopControl::Continue
    }

    /// Blocks until `Quit` or until every sender is gone.
    pub fn run(mut self) {
        info!("Event loop running");
        while let Ok(event) = self.events.recv() {
            if self.handle(event) == LoopControl::Stop {
                break;
            }
        }
        info!("Event loop stopped");
    }
}
