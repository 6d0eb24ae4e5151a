//! Out-of-band messages pushed to whoever is listening.

use models::{CoreMessage, UiMessage};

use log::debug;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Non-blocking fan-out of [`CoreMessage`]s. Posting with no subscriber is
/// not an error.
#[derive(Clone)]
pub struct EventSink {
    sender: broadcast::Sender<CoreMessage>,
}

impl EventSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn post(&self, id: u64, device: Option<&str>, message: UiMessage) {
        let event = message.event;
        let core_message = CoreMessage {
            id,
            device: device.map(str::to_string),
            message,
        };
        if self.sender.send(core_message).is_err() {
            debug!("No subscriber for {} (call {})", event, id);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreMessage> {
        self.sender.subscribe()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
