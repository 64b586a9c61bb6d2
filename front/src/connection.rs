use crate::sender::SharedSender;
use log::info;
use tonnerre_common::{address::Address, tokio::sync::watch};

// Current wallet connection, shared between the app and whoever connects a wallet
pub struct WalletConnection {
    sender: watch::Sender<Option<SharedSender>>,
    manifest_url: String,
}

impl WalletConnection {
    pub fn new<S: ToString>(manifest_url: S) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            manifest_url: manifest_url.to_string(),
        }
    }

    pub fn get_manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn connect(&self, sender: SharedSender) {
        if log::log_enabled!(log::Level::Info) {
            match sender.address() {
                Some(address) => info!("Wallet {} connected", address),
                None => info!("Wallet connected"),
            }
        }
        self.sender.send_replace(Some(sender));
    }

    pub fn disconnect(&self) {
        if self.sender.send_replace(None).is_some() {
            info!("Wallet disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.sender.borrow().is_some()
    }

    pub fn sender(&self) -> Option<SharedSender> {
        self.sender.borrow().clone()
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.sender.borrow().as_ref().and_then(|sender| sender.address())
    }

    // Notified on each connect or disconnect
    pub fn subscribe(&self) -> watch::Receiver<Option<SharedSender>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::DeeplinkSender;
    use std::sync::Arc;
    use tonnerre_common::network::Network;

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let connection = WalletConnection::new("https://example.com/manifest.json");
        let mut receiver = connection.subscribe();
        assert!(!connection.is_connected());
        assert!(connection.sender().is_none());

        let wallet = Address::new(0, [5u8; 32]);
        connection.connect(Arc::new(DeeplinkSender::new(
            Some(wallet),
            Network::Testnet,
            Arc::new(|_: &str| {}),
        )));
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().is_some());
        assert!(connection.is_connected());
        assert_eq!(connection.wallet_address(), Some(wallet));

        connection.disconnect();
        receiver.changed().await.unwrap();
        assert!(receiver.borrow().is_none());
        assert!(!connection.is_connected());
    }
}
