// Feed and dashboard data types
//
// The backend pushes JSON envelopes `{"type", "data", "timestamp"}` over the
// stream and serves a dashboard snapshot over HTTP. Neither is validated
// beyond being JSON; these types are a best-effort typed view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a pushed update
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedKind {
    /// Federated learning training metrics
    FlUpdate,
    /// Intrusion detection metrics
    IdsUpdate,
    /// Threat feed record
    Threat,
    Other(String),
}

impl From<String> for FeedKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "fl_update" => FeedKind::FlUpdate,
            "ids_update" => FeedKind::IdsUpdate,
            "threat" | "threat_detected" => FeedKind::Threat,
            _ => FeedKind::Other(s),
        }
    }
}

impl From<FeedKind> for String {
    fn from(kind: FeedKind) -> Self {
        match kind {
            FeedKind::FlUpdate => "fl_update".to_string(),
            FeedKind::IdsUpdate => "ids_update".to_string(),
            FeedKind::Threat => "threat".to_string(),
            FeedKind::Other(s) => s,
        }
    }
}

/// Envelope of a pushed update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    #[serde(rename = "type")]
    pub kind: FeedKind,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl FeedMessage {
    /// Typed view over a decoded payload; `None` if it is not an envelope
    pub fn from_payload(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Numeric field of `data`
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }
}

/// Headline numbers of the dashboard
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overview {
    pub system_health: f64,
    pub security_score: f64,
    pub fl_accuracy: f64,
    pub active_threats: u64,
    pub uptime_hours: f64,
}

/// Response of `GET /api/dashboard`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSnapshot {
    pub overview: Overview,
    pub system: Value,
    pub federated_learning: Value,
    pub intrusion_detection: Value,
    pub timestamp: Option<String>,
    pub version: Option<String>,
    pub environment: Option<String>,
}

/// Badge level derived from a 0-100 score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Severity::Healthy
        } else if score >= 50.0 {
            Severity::Warning
        } else {
            Severity::Critical
        }
    }
}

impl DashboardSnapshot {
    pub fn health(&self) -> Severity {
        Severity::from_score(self.overview.system_health)
    }

    pub fn security(&self) -> Severity {
        Severity::from_score(self.overview.security_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_message_from_backend_envelope() {
        let payload = json!({
            "type": "fl_update",
            "data": {"accuracy": 0.91, "round": 12},
            "timestamp": "2026-10-16T08:30:00+00:00"
        });
        let msg = FeedMessage::from_payload(&payload).unwrap();
        assert_eq!(msg.kind, FeedKind::FlUpdate);
        assert_eq!(msg.metric("accuracy"), Some(0.91));
        assert_eq!(msg.metric("missing"), None);
        assert_eq!(
            msg.timestamp().unwrap().to_rfc3339(),
            "2026-10-16T08:30:00+00:00"
        );
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let msg = FeedMessage::from_payload(&json!({"type": "heartbeat"})).unwrap();
        assert_eq!(msg.kind, FeedKind::Other("heartbeat".to_string()));
        assert_eq!(msg.data, Value::Null);
        assert_eq!(msg.timestamp(), None);

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["type"], "heartbeat");
    }

    #[test]
    fn test_non_envelope_payload() {
        assert!(FeedMessage::from_payload(&json!([1, 2])).is_none());
        assert!(FeedMessage::from_payload(&json!({"data": {}})).is_none());
    }

    #[test]
    fn test_dashboard_snapshot_tolerates_partial_body() {
        let snap: DashboardSnapshot = serde_json::from_value(json!({
            "overview": {"system_health": 95, "security_score": 42, "active_threats": 3},
            "intrusion_detection": {"recent_threats": []},
            "version": "2.0.0"
        }))
        .unwrap();
        assert_eq!(snap.overview.active_threats, 3);
        assert_eq!(snap.overview.fl_accuracy, 0.0);
        assert_eq!(snap.health(), Severity::Healthy);
        assert_eq!(snap.security(), Severity::Critical);
        assert_eq!(snap.version.as_deref(), Some("2.0.0"));
        assert_eq!(snap.system, Value::Null);
    }
}
