use crate::{
    config::{INCREMENT_BY, INCREMENT_VALUE, POLL_INTERVAL},
    connection::WalletConnection,
    contract::{IncreaseOptions, OpenedContract, TonnerreContract},
    poller::{ContractPoller, ContractSnapshot, PollerError, SharedContractPoller},
    provider::{ContractClient, ProviderError},
    retry::{Retrier, RetryingContract},
    view::ViewModel,
};
use log::{debug, info, trace};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tonnerre_common::{
    address::{Address, AddressError},
    coins::{to_nano, CoinsError},
    tokio::{
        select,
        sync::{watch, Mutex, RwLock},
    },
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no wallet connected")]
    NotConnected,
    #[error("no contract opened")]
    NotOpened,
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Coins(#[from] CoinsError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Poller(#[from] PollerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSettings {
    pub retrier: Retrier,
    pub poll_interval: Duration,
    // nanoton attached to each increment
    pub increment_value: u128,
    pub increment_by: u32,
}

impl AppSettings {
    pub fn new(retrier: Retrier, poll_interval: Duration) -> Result<Self, AppError> {
        Ok(Self {
            retrier,
            poll_interval,
            increment_value: to_nano(INCREMENT_VALUE)?,
            increment_by: INCREMENT_BY,
        })
    }

    pub fn with_defaults() -> Result<Self, AppError> {
        Self::new(Retrier::default(), Duration::from_secs(POLL_INTERVAL))
    }
}

// Contract state for the dashboard and the actions available on it
pub struct TonnerreApp {
    client: Arc<dyn ContractClient>,
    connection: Arc<WalletConnection>,
    settings: AppSettings,
    contract: RwLock<Option<Arc<RetryingContract>>>,
    poller: Mutex<Option<SharedContractPoller>>,
}

impl TonnerreApp {
    pub fn new(
        client: Arc<dyn ContractClient>,
        connection: Arc<WalletConnection>,
        settings: AppSettings,
    ) -> Self {
        Self {
            client,
            connection,
            settings,
            contract: RwLock::new(None),
            poller: Mutex::new(None),
        }
    }

    pub fn get_connection(&self) -> &Arc<WalletConnection> {
        &self.connection
    }

    pub fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    // Bind a contract to a provider, calls are retried
    pub fn open_contract(&self, contract: TonnerreContract) -> Arc<RetryingContract> {
        let provider = self
            .client
            .provider(*contract.address(), contract.init().cloned());
        Arc::new(RetryingContract::new(
            OpenedContract::new(contract, provider),
            self.settings.retrier,
        ))
    }

    // Open the contract at this address, it becomes the one polled and incremented
    pub async fn open(&self, address: Address) -> Arc<RetryingContract> {
        let mut current = self.contract.write().await;
        if let Some(contract) = current.as_ref().filter(|c| *c.address() == address) {
            trace!("Contract {} already opened", address);
            return Arc::clone(contract);
        }

        let contract = self.open_contract(TonnerreContract::create_from_address(address));
        if log::log_enabled!(log::Level::Info) {
            info!("Contract {} opened", address);
        }
        *current = Some(Arc::clone(&contract));
        contract
    }

    pub async fn get_contract(&self) -> Option<Arc<RetryingContract>> {
        self.contract.read().await.clone()
    }

    pub async fn contract_address(&self) -> Option<String> {
        self.contract
            .read()
            .await
            .as_ref()
            .map(|contract| contract.address().to_string())
    }

    // Start polling the opened contract
    pub async fn start_polling(&self) -> Result<SharedContractPoller, AppError> {
        let contract = self.get_contract().await.ok_or(AppError::NotOpened)?;
        let mut lock = self.poller.lock().await;
        if let Some(poller) = lock.as_ref() {
            if poller.is_running().await && poller.get_contract().address() == contract.address()
            {
                return Ok(Arc::clone(poller));
            }
        }

        // replace a poller of a previous contract
        if let Some(previous) = lock.take() {
            if let Err(e) = previous.stop().await {
                debug!("Previous poller ended with: {}", e);
            }
        }

        let poller = ContractPoller::new(contract, self.settings.poll_interval);
        poller.start().await?;
        *lock = Some(Arc::clone(&poller));
        Ok(poller)
    }

    pub async fn stop_polling(&self) -> Result<(), AppError> {
        match self.poller.lock().await.take() {
            Some(poller) => Ok(poller.stop().await?),
            None => Ok(()),
        }
    }

    pub async fn snapshot(&self) -> Option<ContractSnapshot> {
        self.poller
            .lock()
            .await
            .as_ref()
            .and_then(|poller| poller.current())
    }

    pub async fn subscribe(&self) -> Option<watch::Receiver<Option<ContractSnapshot>>> {
        self.poller
            .lock()
            .await
            .as_ref()
            .map(|poller| poller.subscribe())
    }

    // Returns false when no contract is opened yet
    pub async fn send_increment(&self) -> Result<bool, AppError> {
        let Some(contract) = self.get_contract().await else {
            debug!("No contract opened, increment ignored");
            return Ok(false);
        };
        let sender = self.connection.sender().ok_or(AppError::NotConnected)?;

        contract
            .send_increase(
                sender.as_ref(),
                IncreaseOptions {
                    increase_by: self.settings.increment_by,
                    value: self.settings.increment_value,
                    query_id: None,
                },
            )
            .await?;
        Ok(true)
    }

    // Poll the opened contract and hand a view model to `on_update` on each change.
    // Returns once a complete snapshot was shown with `once`, or when the poller
    // ends, with the error that ended it.
    pub async fn run_dashboard<F>(
        &self,
        platform: &str,
        once: bool,
        mut on_update: F,
    ) -> Result<(), AppError>
    where
        F: FnMut(&ViewModel),
    {
        let poller = self.start_polling().await?;
        let mut receiver = poller.subscribe();

        loop {
            select! {
                biased;
                _ = poller.finished() => {
                    debug!("Contract poller ended, leaving the dashboard");
                    break;
                }
                changed = receiver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let complete = receiver.borrow_and_update().is_some();
                    on_update(&self.view_model(platform).await);
                    if once && complete {
                        break;
                    }
                }
            }
        }

        self.stop_polling().await
    }

    pub async fn view_model(&self, platform: &str) -> ViewModel {
        ViewModel {
            platform: platform.to_owned(),
            contract_address: self.contract_address().await,
            snapshot: self.snapshot().await,
            connected: self.connection.is_connected(),
        }
    }
}
