//! Open pages (clients) and which generation controls them.

use std::collections::BTreeMap;

use tokio::sync::RwLock;
use url::Url;

/// An open page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub url: Url,
    /// Store name of the generation controlling this page, if any.
    pub controller: Option<String>,
}

/// Registry of open pages.
#[derive(Debug, Default)]
pub struct Clients {
    clients: RwLock<BTreeMap<String, Client>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened page. It starts uncontrolled.
    pub async fn register(&self, id: impl Into<String>, url: Url) {
        let id = id.into();
        self.clients.write().await.insert(
            id.clone(),
            Client {
                id,
                url,
                controller: None,
            },
        );
    }

    /// Forget a closed page.
    pub async fn unregister(&self, id: &str) -> bool {
        self.clients.write().await.remove(id).is_some()
    }

    /// Make `controller` the controller of every open page.
    ///
    /// Returns how many pages changed controller.
    pub async fn claim(&self, controller: &str) -> usize {
        let mut clients = self.clients.write().await;
        let mut claimed = 0;
        for client in clients.values_mut() {
            if client.controller.as_deref() != Some(controller) {
                client.controller = Some(controller.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    pub async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Client> {
        self.clients.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://app.example/mint/").unwrap()
    }

    #[tokio::test]
    async fn test_claim_takes_every_open_page() {
        let clients = Clients::new();
        clients.register("tab-1", page()).await;
        clients.register("tab-2", page()).await;

        assert_eq!(clients.claim("sundai-v6").await, 2);
        assert!(clients
            .list()
            .await
            .iter()
            .all(|c| c.controller.as_deref() == Some("sundai-v6")));

        // Already controlled pages are not counted again
        assert_eq!(clients.claim("sundai-v6").await, 0);
        assert_eq!(clients.claim("sundai-v7").await, 2);
    }

    #[tokio::test]
    async fn test_unregister() {
        let clients = Clients::new();
        clients.register("tab-1", page()).await;
        assert!(clients.unregister("tab-1").await);
        assert!(!clients.unregister("tab-1").await);
        assert!(clients.get("tab-1").await.is_none());
    }
}
