use serde_json::Value;
use tokio::sync::watch;

/// Most recently decoded payload, shared with observers.
///
/// A payload that fails to decode leaves the previous value in place.
pub struct LatestPayload {
    tx: watch::Sender<Option<Value>>,
}

impl LatestPayload {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Decode a text frame and publish it
    pub fn apply_text(&self, raw: &str) -> Result<(), serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        self.tx.send_replace(Some(value));
        Ok(())
    }

    /// Decode a binary frame and publish it
    pub fn apply_bytes(&self, raw: &[u8]) -> Result<(), serde_json::Error> {
        let value: Value = serde_json::from_slice(raw)?;
        self.tx.send_replace(Some(value));
        Ok(())
    }

    pub fn get(&self) -> Option<Value> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Value>> {
        self.tx.subscribe()
    }
}

impl Default for LatestPayload {
    fn default() -> Self {
        Self::new()
    }
}
