// Terminal rendering of the dashboard
//
// Pure formatting: every function takes what the client hands it and returns
// lines to print.

use agisfl_core::{
    DashboardSnapshot, FeedKind, FeedMessage, Severity, StreamStatus, Theme, View,
};
use serde_json::Value;

/// Map a typed command to a shell channel name
pub fn parse_command(line: &str) -> Option<String> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let channel = match cmd {
        "quit" | "q" | "exit" => "app:quit".to_string(),
        "theme" => "theme:toggle".to_string(),
        "reload" | "r" => "app:reload".to_string(),
        "navigate" | "go" => format!("navigate:{}", parts.next()?),
        other if other.contains(':') => other.to_string(),
        _ => return None,
    };
    Some(channel)
}

pub struct Renderer {
    theme: Theme,
    view: View,
}

impl Renderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            view: View::Dashboard,
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn navigate(&mut self, view: View) -> String {
        self.view = view;
        self.heading(&format!("view: {}", view))
    }

    fn paint(&self, code: &str, text: &str) -> String {
        match self.theme {
            Theme::Dark => format!("\x1b[{}m{}\x1b[0m", code, text),
            Theme::Light => text.to_string(),
        }
    }

    fn heading(&self, text: &str) -> String {
        match self.theme {
            Theme::Dark => self.paint("1;36", &format!("== {} ==", text)),
            Theme::Light => format!("== {} ==", text),
        }
    }

    fn badge(&self, severity: Severity) -> String {
        match severity {
            Severity::Healthy => self.paint("32", "[OK]"),
            Severity::Warning => self.paint("33", "[WARN]"),
            Severity::Critical => self.paint("31", "[CRIT]"),
        }
    }

    pub fn status_line(&self, status: &StreamStatus) -> String {
        let indicator = if status.is_connected() {
            self.paint("32", "● live")
        } else {
            self.paint("31", "○ disconnected")
        };
        let detail = if status.exhausted {
            " (gave up reconnecting)".to_string()
        } else if let Some(delay) = status.next_retry {
            format!(
                " (retry {} in {}ms)",
                status.attempt,
                delay.as_millis()
            )
        } else {
            String::new()
        };
        format!(
            "{}{} msgs={} bad={}",
            indicator, detail, status.messages_received, status.decode_failures
        )
    }

    fn shows(&self, kind: &FeedKind) -> bool {
        match self.view {
            View::Dashboard => true,
            View::Threats | View::Network => {
                matches!(kind, FeedKind::IdsUpdate | FeedKind::Threat)
            }
            View::FederatedLearning => matches!(kind, FeedKind::FlUpdate),
            View::Settings => false,
        }
    }

    /// One line for a pushed payload, or `None` if the current view hides it
    pub fn feed_line(&self, payload: &Value) -> Option<String> {
        let Some(msg) = FeedMessage::from_payload(payload) else {
            return match self.view {
                View::Dashboard => Some(format!("update {}", payload)),
                _ => None,
            };
        };
        if !self.shows(&msg.kind) {
            return None;
        }
        let when = msg
            .timestamp()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        let line = match &msg.kind {
            FeedKind::FlUpdate => format!(
                "{} FL accuracy={} round={}",
                when,
                fmt_metric(msg.metric("accuracy")),
                fmt_metric(msg.metric("round"))
            ),
            FeedKind::IdsUpdate => format!(
                "{} IDS threats={} packets={}",
                when,
                fmt_metric(msg.metric("active_threats")),
                fmt_metric(msg.metric("packets_analyzed"))
            ),
            FeedKind::Threat => {
                let severity = msg
                    .data
                    .get("severity")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                let kind = msg
                    .data
                    .get("threat_type")
                    .and_then(Value::as_str)
                    .unwrap_or("threat");
                format!("{} {} {}", when, self.paint("31", kind), severity)
            }
            FeedKind::Other(kind) => format!("{} {} {}", when, kind, msg.data),
        };
        Some(line)
    }

    pub fn snapshot_lines(&self, snap: &DashboardSnapshot) -> Vec<String> {
        let o = &snap.overview;
        let mut lines = vec![self.heading("AgisFL overview")];
        lines.push(format!(
            "{} system health {:.0}",
            self.badge(snap.health()),
            o.system_health
        ));
        lines.push(format!(
            "{} security score {:.0}",
            self.badge(snap.security()),
            o.security_score
        ));
        lines.push(format!("FL accuracy {:.2}", o.fl_accuracy));
        lines.push(format!("active threats {}", o.active_threats));
        lines.push(format!("uptime {:.1}h", o.uptime_hours));
        if let Some(version) = &snap.version {
            lines.push(format!(
                "backend {} ({})",
                version,
                snap.environment.as_deref().unwrap_or("unknown")
            ));
        }
        lines
    }
}

fn fmt_metric(v: Option<f64>) -> String {
    match v {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{:.3}", v),
        None => "-".to_string(),
    }
}
