use crate::{provider::ProviderError, retry::RetryingContract};
use log::{debug, error, info, trace};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tonnerre_common::{
    address::Address,
    tokio::{
        select, spawn_task,
        sync::{watch, Mutex},
        task::{JoinError, JoinHandle},
        time::sleep,
    },
};

// ContractPoller must be behind a Arc to be shared between the app and its tokio task
pub type SharedContractPoller = Arc<ContractPoller>;

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("contract poller is already running")]
    AlreadyRunning,
    #[error("contract poller is not running")]
    NotRunning,
    #[error(transparent)]
    TaskError(#[from] JoinError),
    #[error(transparent)]
    Fetch(#[from] ProviderError),
}

// Everything read from the contract during one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub recent_sender: Address,
    pub owner_address: Address,
    // nanoton
    pub balance: i64,
    pub counter: i64,
}

struct PollerTask {
    handle: JoinHandle<Result<(), PollerError>>,
    stop: watch::Sender<bool>,
}

pub struct ContractPoller {
    // tokio task and its stop signal
    task: Mutex<Option<PollerTask>>,
    contract: Arc<RetryingContract>,
    // None while a cycle is loading
    snapshot: watch::Sender<Option<ContractSnapshot>>,
    // set once the task has ended, for any reason
    finished: watch::Sender<bool>,
    interval: Duration,
}

impl ContractPoller {
    pub fn new(contract: Arc<RetryingContract>, interval: Duration) -> SharedContractPoller {
        let (snapshot, _) = watch::channel(None);
        let (finished, _) = watch::channel(false);
        Arc::new(Self {
            task: Mutex::new(None),
            contract,
            snapshot,
            finished,
            interval,
        })
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), PollerError> {
        trace!("Starting contract poller");

        if self.is_running().await {
            return Err(PollerError::AlreadyRunning);
        }

        let (stop, stop_receiver) = watch::channel(false);
        self.finished.send_replace(false);
        let zelf = Arc::clone(self);
        let handle = spawn_task("contract-poller", async move {
            let res = Arc::clone(&zelf).run(stop_receiver).await;
            zelf.finished.send_replace(true);
            res
        });
        *self.task.lock().await = Some(PollerTask { handle, stop });

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Polling contract {} every {}s",
                self.contract.address(),
                self.interval.as_secs()
            );
        }
        Ok(())
    }

    // Signal the task and wait for it, returning the error that ended it if any
    pub async fn stop(&self) -> Result<(), PollerError> {
        trace!("Stopping contract poller");
        let task = self
            .task
            .lock()
            .await
            .take()
            .ok_or(PollerError::NotRunning)?;

        if task.handle.is_finished() {
            debug!("Contract poller is already finished");
        } else {
            debug!("Contract poller is running, stopping it");
            // task may already be gone
            let _ = task.stop.send(true);
        }
        task.handle.await??;
        Ok(())
    }

    // check if the poller is running (that we have a task and its not finished)
    pub async fn is_running(&self) -> bool {
        let task = self.task.lock().await;
        if let Some(task) = task.as_ref() {
            !task.handle.is_finished()
        } else {
            false
        }
    }

    // Resolves once the task has ended, stop() then returns how it ended
    pub async fn finished(&self) {
        let mut receiver = self.finished.subscribe();
        // sender lives as long as self
        let _ = receiver.wait_for(|finished| *finished).await;
    }

    pub fn get_contract(&self) -> &Arc<RetryingContract> {
        &self.contract
    }

    pub fn get_interval(&self) -> Duration {
        self.interval
    }

    pub fn current(&self) -> Option<ContractSnapshot> {
        *self.snapshot.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ContractSnapshot>> {
        self.snapshot.subscribe()
    }

    async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) -> Result<(), PollerError> {
        loop {
            let res = select! {
                biased;
                _ = stop.changed() => break,
                res = self.fetch() => res,
            };
            if let Err(e) = res {
                if log::log_enabled!(log::Level::Error) {
                    error!("Error while polling contract: {}", e);
                }
                return Err(e.into());
            }

            select! {
                biased;
                _ = stop.changed() => break,
                _ = sleep(self.interval) => {}
            }
        }

        debug!("Contract poller stopped");
        Ok(())
    }

    // One cycle: clear, read everything, then publish
    async fn fetch(&self) -> Result<(), ProviderError> {
        self.snapshot.send_replace(None);

        let data = self.contract.get_data().await?;
        let balance = self.contract.get_balance().await?;
        let counter = self.contract.get_counter().await?;

        let snapshot = ContractSnapshot {
            recent_sender: data.recent_sender,
            owner_address: data.owner_address,
            balance,
            counter,
        };
        if log::log_enabled!(log::Level::Debug) {
            debug!("New contract snapshot: {:?}", snapshot);
        }
        self.snapshot.send_replace(Some(snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contract::{
            OpenedContract, TonnerreContract, GET_BALANCE, GET_COUNTER, GET_STORAGE_DATA,
        },
        provider::{ContractProvider, InternalMessage},
        retry::Retrier,
        sender::Sender,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Mutex as StdMutex,
    };
    use tonnerre_common::{
        api::{StackError, StackItem, TupleReader},
        cell::CellBuilder,
    };

    fn address_item(address: &Address) -> StackItem {
        StackItem::Slice(Arc::new(
            CellBuilder::new()
                .store_address(Some(address))
                .unwrap()
                .build()
                .unwrap(),
        ))
    }

    struct CounterProvider {
        counter: AtomicI64,
        failing: AtomicBool,
        calls: StdMutex<Vec<String>>,
    }

    impl CounterProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                counter: AtomicI64::new(0),
                failing: AtomicBool::new(false),
                calls: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ContractProvider for CounterProvider {
        async fn get(&self, method: &str) -> Result<TupleReader, ProviderError> {
            self.calls.lock().unwrap().push(method.to_owned());
            // network round trip
            sleep(Duration::from_millis(10)).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(StackError::ExitCode(11).into());
            }
            let items = match method {
                GET_STORAGE_DATA => vec![
                    address_item(&Address::new(0, [1u8; 32])),
                    address_item(&Address::new(0, [2u8; 32])),
                ],
                GET_BALANCE => vec![StackItem::Int(2_000_000_000)],
                GET_COUNTER => vec![StackItem::Int(
                    self.counter.fetch_add(3, Ordering::SeqCst) as i128 + 3,
                )],
                _ => Vec::new(),
            };
            Ok(TupleReader::new(items))
        }

        async fn internal(&self, _: &dyn Sender, _: InternalMessage) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn poller(provider: Arc<CounterProvider>, retrier: Retrier) -> SharedContractPoller {
        let opened = OpenedContract::new(
            TonnerreContract::create_from_address(Address::new(0, [9u8; 32])),
            provider,
        );
        ContractPoller::new(
            Arc::new(RetryingContract::new(opened, retrier)),
            Duration::from_secs(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_publish_snapshots() {
        let provider = CounterProvider::new();
        let poller = poller(provider.clone(), Retrier::default());
        let mut receiver = poller.subscribe();
        assert_eq!(poller.current(), None);

        poller.start().await.unwrap();
        assert!(poller.is_running().await);
        assert!(matches!(poller.start().await, Err(PollerError::AlreadyRunning)));

        receiver
            .wait_for(|snapshot| snapshot.is_some())
            .await
            .unwrap();
        let first = poller.current().unwrap();
        assert_eq!(first.counter, 3);
        assert_eq!(first.balance, 2_000_000_000);
        assert_eq!(first.recent_sender, Address::new(0, [1u8; 32]));
        assert_eq!(first.owner_address, Address::new(0, [2u8; 32]));

        // next cycle starts by clearing the snapshot
        receiver.wait_for(|snapshot| snapshot.is_none()).await.unwrap();
        receiver
            .wait_for(|snapshot| snapshot.is_some())
            .await
            .unwrap();
        assert_eq!(poller.current().unwrap().counter, 6);

        poller.stop().await.unwrap();
        assert!(!poller.is_running().await);
        assert!(matches!(poller.stop().await, Err(PollerError::NotRunning)));

        let calls = provider.calls.lock().unwrap();
        assert_eq!(
            calls[..3],
            [GET_STORAGE_DATA, GET_BALANCE, GET_COUNTER]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_end_the_task() {
        let provider = CounterProvider::new();
        provider.failing.store(true, Ordering::SeqCst);
        let poller = poller(provider.clone(), Retrier::new(2, Duration::from_secs(1)));

        poller.start().await.unwrap();
        poller.finished().await;
        assert!(!poller.is_running().await);
        assert!(matches!(
            poller.stop().await,
            Err(PollerError::Fetch(ProviderError::Stack(StackError::ExitCode(11))))
        ));
        // get_data tried 3 times, nothing else
        assert_eq!(provider.calls.lock().unwrap().len(), 3);
        assert_eq!(poller.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_sleeping() {
        let poller = poller(CounterProvider::new(), Retrier::default());
        let mut receiver = poller.subscribe();
        poller.start().await.unwrap();
        receiver
            .wait_for(|snapshot| snapshot.is_some())
            .await
            .unwrap();

        poller.stop().await.unwrap();
        // last snapshot stays available
        assert!(poller.current().is_some());
        poller.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_is_reset_on_restart() {
        let provider = CounterProvider::new();
        provider.failing.store(true, Ordering::SeqCst);
        let poller = poller(provider.clone(), Retrier::new(0, Duration::from_secs(1)));

        poller.start().await.unwrap();
        poller.finished().await;
        assert!(poller.stop().await.is_err());

        provider.failing.store(false, Ordering::SeqCst);
        let mut receiver = poller.subscribe();
        poller.start().await.unwrap();
        receiver
            .wait_for(|snapshot| snapshot.is_some())
            .await
            .unwrap();
        // still polling, finished must not resolve
        let waited = tonnerre_common::tokio::time::timeout(
            Duration::from_secs(30),
            poller.finished(),
        )
        .await;
        assert!(waited.is_err());
        assert!(poller.is_running().await);
        poller.stop().await.unwrap();
    }
}
