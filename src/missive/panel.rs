//! Sidebar panel logic driven by Missive conversation events.
//!
//! The panel lists the addresses found on the selected conversation and,
//! once one is chosen, resolves it to a board item.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::monday::resolver::{EmailMatch, EmailResolver};
use crate::monday::types::BoardItem;

use super::event::{Event, EventHandler, EventSender};

/// How many times to look for the host before giving up
pub const MAX_ATTACH_ATTEMPTS: u32 = 10;
/// Delay between host lookups
pub const ATTACH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum HostError {
  #[error("Missive API not available. Please make sure this is loaded within Missive.")]
  Unavailable,
  #[error("Error fetching conversation data: {0}")]
  Fetch(String),
}

/// Address as reported by the host: either a bare string or an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmailAddress {
  Plain(String),
  Detailed {
    email: Option<String>,
    address: Option<String>,
  },
}

impl EmailAddress {
  pub fn as_address(&self) -> Option<&str> {
    match self {
      Self::Plain(s) => Some(s),
      Self::Detailed { email, address } => email.as_deref().or(address.as_deref()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMessage {
  pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
  pub id: String,
  #[serde(default)]
  pub email_addresses: Vec<EmailAddress>,
  pub latest_message: Option<LatestMessage>,
}

/// The email client hosting the panel
#[async_trait]
pub trait MissiveHost: Send + Sync {
  /// Whether the host API is reachable yet
  fn is_available(&self) -> bool;

  async fn fetch_conversations(&self, ids: &[String]) -> Result<Vec<Conversation>, HostError>;
}

/// Host bridged over HTTP: the browser-side script posts its current
/// selection, and the host counts as available once it has posted anything.
#[derive(Default)]
pub struct BridgeHost {
  conversations: Mutex<HashMap<String, Conversation>>,
  connected: AtomicBool,
}

impl BridgeHost {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mark the browser side as reachable
  pub fn connect(&self) {
    self.connected.store(true, Ordering::SeqCst);
  }

  /// Replace the known conversations with the latest snapshot
  pub fn record(&self, conversations: Vec<Conversation>) {
    let snapshot: HashMap<_, _> = conversations
      .into_iter()
      .map(|c| (c.id.clone(), c))
      .collect();
    match self.conversations.lock() {
      Ok(mut known) => *known = snapshot,
      Err(poisoned) => *poisoned.into_inner() = snapshot,
    }
  }
}

#[async_trait]
impl MissiveHost for BridgeHost {
  fn is_available(&self) -> bool {
    self.connected.load(Ordering::SeqCst)
  }

  async fn fetch_conversations(&self, ids: &[String]) -> Result<Vec<Conversation>, HostError> {
    let known = self
      .conversations
      .lock()
      .map_err(|_| HostError::Fetch("conversation snapshot lock poisoned".to_string()))?;
    Ok(ids.iter().filter_map(|id| known.get(id).cloned()).collect())
  }
}

/// What the panel should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelState {
  Connecting,
  HostUnavailable { message: String },
  NoSelection,
  MultipleSelected,
  NoEmails,
  EmailOptions {
    emails: Vec<String>,
    subject: Option<String>,
  },
  Matched { item: BoardItem },
  Unmatched { message: String },
  Failed { message: String },
}

/// Wait for the host to come up, checking a bounded number of times.
pub async fn attach(
  host: &dyn MissiveHost,
  attempts: u32,
  interval: Duration,
) -> Result<(), HostError> {
  for attempt in 1..=attempts {
    debug!(attempt, attempts, "looking for Missive host");
    if host.is_available() {
      info!(attempt, "Missive host found");
      return Ok(());
    }
    if attempt < attempts {
      tokio::time::sleep(interval).await;
    }
  }

  warn!(attempts, "Missive host never became available");
  Err(HostError::Unavailable)
}

/// Unique addresses in first-seen order
fn unique_addresses(conversation: &Conversation) -> Vec<String> {
  let mut emails: Vec<String> = Vec::new();
  for address in conversation
    .email_addresses
    .iter()
    .filter_map(EmailAddress::as_address)
  {
    if !emails.iter().any(|e| e == address) {
      emails.push(address.to_string());
    }
  }
  emails
}

/// Turns host events into panel states
pub struct PanelController {
  host: Arc<dyn MissiveHost>,
  resolver: EmailResolver,
}

impl PanelController {
  pub fn new(host: Arc<dyn MissiveHost>, resolver: EmailResolver) -> Self {
    Self { host, resolver }
  }

  pub async fn handle(&self, event: Event) -> PanelState {
    match event {
      Event::ConversationsChanged(ids) => self.conversations_changed(&ids).await,
      Event::EmailSelected(email) => self.email_selected(&email).await,
    }
  }

  async fn conversations_changed(&self, ids: &[String]) -> PanelState {
    match ids.len() {
      0 => return PanelState::NoSelection,
      1 => {}
      _ => return PanelState::MultipleSelected,
    }

    let conversations = match self.host.fetch_conversations(ids).await {
      Ok(c) => c,
      Err(e) => {
        warn!(error = %e, "failed to fetch conversation");
        return PanelState::Failed {
          message: e.to_string(),
        };
      }
    };

    let [conversation] = conversations.as_slice() else {
      return PanelState::Failed {
        message: "Could not fetch unique conversation details.".to_string(),
      };
    };

    let emails = unique_addresses(conversation);
    if emails.is_empty() {
      return PanelState::NoEmails;
    }

    let subject = conversation
      .latest_message
      .as_ref()
      .and_then(|m| m.subject.as_deref())
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from);

    PanelState::EmailOptions { emails, subject }
  }

  async fn email_selected(&self, email: &str) -> PanelState {
    match self.resolver.find_item_by_email(email).await {
      Ok(EmailMatch::Found(item)) => PanelState::Matched { item },
      Ok(EmailMatch::NotFound { message }) => PanelState::Unmatched { message },
      Err(e) => PanelState::Failed {
        message: e.to_string(),
      },
    }
  }

  /// Wait for the first event, attach to the host, then process events one
  /// at a time until the sender side is dropped. `states` should start out as
  /// [`PanelState::Connecting`]; every later state is published on it.
  pub async fn run(self, mut events: EventHandler, states: watch::Sender<PanelState>) {
    let Some(first) = events.next().await else {
      return;
    };

    if let Err(e) = attach(self.host.as_ref(), MAX_ATTACH_ATTEMPTS, ATTACH_INTERVAL).await {
      states.send_replace(PanelState::HostUnavailable {
        message: e.to_string(),
      });
      return;
    }

    let mut next = Some(first);
    while let Some(event) = next {
      let state = self.handle(event).await;
      states.send_replace(state);
      next = events.next().await;
    }
  }
}

/// Running panel shared by HTTP handlers.
///
/// Owns the bridge host and the sending side of the controller's event
/// stream. Requests are serialized so each caller reads the state produced by
/// its own event.
pub struct PanelHandle {
  host: Arc<BridgeHost>,
  events: EventSender,
  states: AsyncMutex<watch::Receiver<PanelState>>,
}

impl PanelHandle {
  /// Spawn the controller task on the current runtime.
  pub fn spawn(resolver: EmailResolver) -> Arc<Self> {
    let host = Arc::new(BridgeHost::new());
    let (events, handler) = EventHandler::channel();
    let (states_tx, states_rx) = watch::channel(PanelState::Connecting);

    let controller = PanelController::new(host.clone(), resolver);
    tokio::spawn(controller.run(handler, states_tx));

    Arc::new(Self {
      host,
      events,
      states: AsyncMutex::new(states_rx),
    })
  }

  pub async fn conversations_changed(
    &self,
    ids: Vec<String>,
    conversations: Vec<Conversation>,
  ) -> PanelState {
    let mut states = self.states.lock().await;
    self.host.record(conversations);
    self.dispatch(&mut states, Event::ConversationsChanged(ids)).await
  }

  pub async fn email_selected(&self, email: String) -> PanelState {
    let mut states = self.states.lock().await;
    self.dispatch(&mut states, Event::EmailSelected(email)).await
  }

  async fn dispatch(&self, states: &mut watch::Receiver<PanelState>, event: Event) -> PanelState {
    self.host.connect();
    states.borrow_and_update();

    if !self.events.send(event) {
      warn!("panel controller has stopped");
      return states.borrow().clone();
    }
    if states.changed().await.is_err() {
      warn!("panel controller stopped before answering");
    }
    states.borrow_and_update().clone()
  }
}
