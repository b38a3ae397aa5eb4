use tokio::sync::broadcast;

use crate::consent::ConsentRecord;

const CHANNEL_CAPACITY: usize = 16;

/// Application-wide consent-changed notifications. Collaborators such as
/// conditional script loaders subscribe; the banner and modal publish a
/// copy of the full resulting record after every accept, reject, or save.
#[derive(Clone)]
pub struct ConsentEvents {
    tx: broadcast::Sender<ConsentRecord>,
}

impl ConsentEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        ConsentEvents { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsentRecord> {
        self.tx.subscribe()
    }

    /// Broadcasts the record. Having no subscribers is not an error.
    pub fn emit(&self, record: ConsentRecord) {
        let _ = self.tx.send(record);
    }
}

impl Default for ConsentEvents {
    fn default() -> Self {
        Self::new()
    }
}
