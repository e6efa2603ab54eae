use crate::error::NotifierResult;

pub mod actions;
pub mod api;
pub mod blocks;
pub mod client;
pub mod constants;
pub mod manager;
pub mod message;
pub mod notifier;
pub mod responses;
pub mod webhook;
pub mod worker;

/// Optional pair of destinations for routine and failure notifications.
#[derive(Debug, Clone)]
pub struct SlackClients {
    pub info: Option<client::SlackClient>,
    pub errors: Option<client::SlackClient>,
}

impl SlackClients {
    pub fn new(info: Option<client::SlackClient>, errors: Option<client::SlackClient>) -> Self {
        Self { info, errors }
    }

    /// Sends an informational message to the info channel.
    pub async fn send_info(&self, text: String) -> NotifierResult<()> {
        if let Some(info_client) = &self.info {
            return info_client.send_message(text).await;
        }
        Ok(())
    }

    /// Sends an error message to the errors channel.
    pub async fn send_error(&self, text: String) -> NotifierResult<()> {
        if let Some(errors_client) = &self.errors {
            return errors_client.send_message(text).await;
        }
        Ok(())
    }
}

/// Spawns a manager for `notifier` and returns clients for the two channels.
///
/// A channel left as `None` disables that side. When the notifier has no
/// token, both sides fall back to the webhook.
pub fn spawn_clients(
    notifier: notifier::SlackNotifier,
    info_channel: Option<String>,
    errors_channel: Option<String>,
) -> (SlackClients, tokio::task::JoinHandle<NotifierResult<()>>) {
    let use_api = notifier.has_token();
    let (manager, sender) = manager::SlackManager::channel(notifier);
    let make = |channel: Option<String>| {
        channel.map(|channel| {
            let destination = if use_api {
                client::Destination::Api(channel)
            } else {
                client::Destination::Webhook(Some(channel))
            };
            client::SlackClient::new(sender.clone(), destination)
        })
    };
    let clients = SlackClients::new(make(info_channel), make(errors_channel));
    let handle = tokio::spawn(manager.run());
    (clients, handle)
}

#[cfg(test)]
pub mod tests {
    use super::{actions::SlackAction, client::SlackClient, *};
    use crate::tests::MockSlack;
    use std::time::Duration;

    pub fn get_mock_slack() -> (tokio::sync::mpsc::Receiver<SlackAction>, SlackClient) {
        let (sender, receiver) = tokio::sync::mpsc::channel::<SlackAction>(1000);
        let client = SlackClient::for_channel(sender, "mock_channel");
        (receiver, client)
    }

    #[tokio::test]
    async fn test_absent_clients_are_noops() {
        let clients = SlackClients::new(None, None);
        assert!(clients.send_info("info".to_string()).await.is_ok());
        assert!(clients.send_error("error".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_info_and_errors_route_separately() {
        let (mut info_rx, info_client) = get_mock_slack();
        let (mut errors_rx, errors_client) = get_mock_slack();
        let clients = SlackClients::new(Some(info_client), Some(errors_client));

        clients.send_info("all good".to_string()).await.unwrap();
        clients.send_error("on fire".to_string()).await.unwrap();

        assert!(matches!(
            info_rx.recv().await,
            Some(SlackAction::SendApi(m)) if m.text == "all good"
        ));
        assert!(matches!(
            errors_rx.recv().await,
            Some(SlackAction::SendApi(m)) if m.text == "on fire"
        ));
    }

    #[tokio::test]
    async fn test_spawn_clients_end_to_end() {
        let mock = MockSlack::start(vec![]).await;
        let mut config = mock.config();
        config.token = None;
        let notifier = notifier::SlackNotifier::new(config).unwrap();

        let (clients, handle) = spawn_clients(notifier, Some("#info".into()), None);
        clients.send_info("deployed".to_string()).await.unwrap();
        clients.send_error("ignored".to_string()).await.unwrap();
        drop(clients);

        let _ = handle.await;
        let requests = mock.wait_for_requests(1, Duration::from_secs(2)).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].json()["channel"], "#info");
        assert_eq!(requests[0].json()["text"], "deployed");
    }
}
