use tokio::sync::mpsc;

/// Events pushed by the Missive host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// The set of selected conversations changed
  ConversationsChanged(Vec<String>),
  /// The user picked one of the offered addresses
  EmailSelected(String),
}

/// Sending half handed to whatever bridges the host into the process
#[derive(Debug, Clone)]
pub struct EventSender {
  tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
  /// Queue an event. Returns false once the handler is gone.
  pub fn send(&self, event: Event) -> bool {
    self.tx.send(event).is_ok()
  }
}

/// Event handler that yields host events in arrival order
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a connected sender/handler pair
  pub fn channel() -> (EventSender, Self) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, Self { rx })
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
