// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Messages pushed from the manager to the web application.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Asynchronous notifications for the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageToWebApp {
    /// Sent once per successful start. `url` is `None` when no LAN address resolved.
    HomeServerStarted { url: Option<String> },
}

/// Delivery side of the UI boundary. Delivery is fire-and-forget.
pub trait UiNotifier: Send + Sync {
    fn notify(&self, message: MessageToWebApp);
}

/// [`UiNotifier`] feeding an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<MessageToWebApp>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::UnboundedSender<MessageToWebApp>) -> Self {
        Self { sender }
    }

    /// Create a notifier together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MessageToWebApp>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl UiNotifier for ChannelNotifier {
    fn notify(&self, message: MessageToWebApp) {
        if let Err(e) = self.sender.send(message) {
            warn!(notification = ?e.0, "UI channel closed, dropping notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_message_wire_format() {
        let message = MessageToWebApp::HomeServerStarted {
            url: Some("http://10.0.0.2:3127".into()),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(
            json,
            r#"{"type":"home-server-started","url":"http://10.0.0.2:3127"}"#
        );

        let unresolved = serde_json::to_value(MessageToWebApp::HomeServerStarted { url: None }).unwrap();
        assert!(unresolved["url"].is_null());
    }

    #[tokio::test]
    async fn channel_notifier_delivers() {
        let (notifier, mut receiver) = ChannelNotifier::channel();
        notifier.notify(MessageToWebApp::HomeServerStarted { url: None });
        assert_eq!(
            receiver.recv().await,
            Some(MessageToWebApp::HomeServerStarted { url: None })
        );
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (notifier, receiver) = ChannelNotifier::channel();
        drop(receiver);
        notifier.notify(MessageToWebApp::HomeServerStarted { url: None });
    }
}
