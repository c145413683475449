// Shell command channel
//
// Menu actions reach views as events on fixed channel names, broadcast to
// every subscriber.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Dashboard views reachable from the menu
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Dashboard,
    Threats,
    FederatedLearning,
    Network,
    Settings,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Dashboard,
        View::Threats,
        View::FederatedLearning,
        View::Network,
        View::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Threats => "threats",
            View::FederatedLearning => "federated-learning",
            View::Network => "network",
            View::Settings => "settings",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        View::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event sent from the shell to views
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "view", rename_all = "snake_case")]
pub enum ShellEvent {
    Navigate(View),
    ToggleTheme,
    Reload,
    Quit,
}

impl ShellEvent {
    /// Fixed channel name of the event
    pub fn channel(&self) -> String {
        match self {
            ShellEvent::Navigate(view) => format!("navigate:{}", view),
            ShellEvent::ToggleTheme => "theme:toggle".to_string(),
            ShellEvent::Reload => "app:reload".to_string(),
            ShellEvent::Quit => "app:quit".to_string(),
        }
    }

    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "theme:toggle" => Some(ShellEvent::ToggleTheme),
            "app:reload" => Some(ShellEvent::Reload),
            "app:quit" => Some(ShellEvent::Quit),
            other => other
                .strip_prefix("navigate:")
                .and_then(View::parse)
                .map(ShellEvent::Navigate),
        }
    }
}

/// Broadcasts shell events to every subscribed view
#[derive(Clone)]
pub struct ShellChannel {
    sender: broadcast::Sender<ShellEvent>,
}

impl ShellChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event; dropped silently when nobody listens
    pub fn send(&self, event: ShellEvent) {
        let _ = self.sender.send(event);
    }

    /// Send by channel name; returns the parsed event if the name is known
    pub fn send_channel(&self, channel: &str) -> Option<ShellEvent> {
        let event = ShellEvent::from_channel(channel)?;
        self.send(event);
        Some(event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ShellChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_round_trip() {
        let mut events: Vec<ShellEvent> = View::ALL.into_iter().map(ShellEvent::Navigate).collect();
        events.extend([ShellEvent::ToggleTheme, ShellEvent::Reload, ShellEvent::Quit]);

        for event in events {
            assert_eq!(ShellEvent::from_channel(&event.channel()), Some(event));
        }
        assert_eq!(
            ShellEvent::Navigate(View::FederatedLearning).channel(),
            "navigate:federated-learning"
        );
    }

    #[test]
    fn test_unknown_channels_are_rejected() {
        assert_eq!(ShellEvent::from_channel("navigate:billing"), None);
        assert_eq!(ShellEvent::from_channel("app:restart"), None);
        assert_eq!(ShellEvent::from_channel(""), None);
    }

    #[tokio::test]
    async fn test_events_reach_all_subscribers() {
        let shell = ShellChannel::new(8);
        let mut a = shell.subscribe();
        let mut b = shell.subscribe();
        assert_eq!(shell.subscriber_count(), 2);

        assert_eq!(
            shell.send_channel("navigate:threats"),
            Some(ShellEvent::Navigate(View::Threats))
        );
        assert_eq!(a.recv().await.unwrap(), ShellEvent::Navigate(View::Threats));
        assert_eq!(b.recv().await.unwrap(), ShellEvent::Navigate(View::Threats));

        assert_eq!(shell.send_channel("bogus"), None);
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_send_without_subscribers() {
        let shell = ShellChannel::default();
        shell.send(ShellEvent::Quit);
        assert_eq!(shell.subscriber_count(), 0);
    }
}
