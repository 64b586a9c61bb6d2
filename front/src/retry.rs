use crate::{
    config::{RETRY_COUNT, RETRY_DELAY_MS},
    contract::{ContractData, IncreaseOptions, OpenedContract},
    provider::ProviderError,
    sender::Sender,
};
use log::{debug, error, warn};
use std::{
    fmt::{Debug, Display},
    future::Future,
    time::Duration,
};
use tonnerre_common::{address::Address, state_init::StateInit, tokio::time::sleep};

// Re-run a failing call a fixed number of times with a fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retrier {
    retries: u32,
    delay: Duration,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(RETRY_COUNT, Duration::from_millis(RETRY_DELAY_MS))
    }
}

impl Retrier {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn get_retries(&self) -> u32 {
        self.retries
    }

    pub fn get_delay(&self) -> Duration {
        self.delay
    }

    // At most retries + 1 attempts, the last error is returned as is
    pub async fn run<T, E, F, Fut>(&self, name: &str, mut call: F) -> Result<T, E>
    where
        T: Debug,
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retries_left = self.retries;
        loop {
            match call().await {
                Ok(result) => {
                    if log::log_enabled!(log::Level::Debug) {
                        debug!(
                            "Call of {}/{} successful: {:?}",
                            name, retries_left, result
                        );
                    }
                    return Ok(result);
                }
                Err(e) if retries_left == 0 => {
                    if log::log_enabled!(log::Level::Error) {
                        error!("No more retry trials for {}, forwarding error: {}", name, e);
                    }
                    return Err(e);
                }
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!(
                            "Error in call of {}, retrying, {} tentatives left: {}",
                            name, retries_left, e
                        );
                    }
                    retries_left -= 1;
                    sleep(self.delay).await;
                }
            }
        }
    }
}

// Opened contract whose operations all go through a Retrier
#[derive(Clone)]
pub struct RetryingContract {
    inner: OpenedContract,
    retrier: Retrier,
}

impl RetryingContract {
    pub fn new(inner: OpenedContract, retrier: Retrier) -> Self {
        Self { inner, retrier }
    }

    pub fn address(&self) -> &Address {
        self.inner.address()
    }

    pub fn init(&self) -> Option<&StateInit> {
        self.inner.init()
    }

    pub fn get_retrier(&self) -> &Retrier {
        &self.retrier
    }

    pub async fn send_deploy(&self, via: &dyn Sender, value: u128) -> Result<(), ProviderError> {
        debug!("Calling: send_deploy with value {}", value);
        self.retrier
            .run("send_deploy", || self.inner.send_deploy(via, value))
            .await
    }

    pub async fn send_deposit(&self, via: &dyn Sender, value: u128) -> Result<(), ProviderError> {
        debug!("Calling: send_deposit with value {}", value);
        self.retrier
            .run("send_deposit", || self.inner.send_deposit(via, value))
            .await
    }

    pub async fn send_no_code_deposit(
        &self,
        via: &dyn Sender,
        value: u128,
    ) -> Result<(), ProviderError> {
        debug!("Calling: send_no_code_deposit with value {}", value);
        self.retrier
            .run("send_no_code_deposit", || {
                self.inner.send_no_code_deposit(via, value)
            })
            .await
    }

    pub async fn send_withdrawal_request(
        &self,
        via: &dyn Sender,
        value: u128,
        amount: u128,
    ) -> Result<(), ProviderError> {
        debug!(
            "Calling: send_withdrawal_request with value {} amount {}",
            value, amount
        );
        self.retrier
            .run("send_withdrawal_request", || {
                self.inner.send_withdrawal_request(via, value, amount)
            })
            .await
    }

    pub async fn send_increase(
        &self,
        via: &dyn Sender,
        opts: IncreaseOptions,
    ) -> Result<(), ProviderError> {
        debug!("Calling: send_increase with {:?}", opts);
        self.retrier
            .run("send_increase", || self.inner.send_increase(via, opts))
            .await
    }

    pub async fn send_store(&self, via: &dyn Sender, value: u128) -> Result<(), ProviderError> {
        debug!("Calling: send_store with value {}", value);
        self.retrier
            .run("send_store", || self.inner.send_store(via, value))
            .await
    }

    pub async fn get_data(&self) -> Result<ContractData, ProviderError> {
        debug!("Calling: get_data");
        self.retrier.run("get_data", || self.inner.get_data()).await
    }

    pub async fn get_counter(&self) -> Result<i64, ProviderError> {
        debug!("Calling: get_counter");
        self.retrier
            .run("get_counter", || self.inner.get_counter())
            .await
    }

    pub async fn get_id(&self) -> Result<i64, ProviderError> {
        debug!("Calling: get_id");
        self.retrier.run("get_id", || self.inner.get_id()).await
    }

    pub async fn get_balance(&self) -> Result<i64, ProviderError> {
        debug!("Calling: get_balance");
        self.retrier
            .run("get_balance", || self.inner.get_balance())
            .await
    }
}
