use serde::Serialize;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Deferred notifications delivered on the store's event channel.
///
/// Everything else the store does is answered synchronously on the calling
/// operation; only work that outlives a call (the disconnect grace timer)
/// reports through here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// A seated player stayed disconnected for the whole grace period; the
    /// game was finished with reason `timeout`.
    GraceExpired {
        game_id: String,
        abandoned_by: Option<String>,
        winner: Option<String>,
    },
}
