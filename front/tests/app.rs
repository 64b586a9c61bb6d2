use async_trait::async_trait;
use std::{
    sync::{
        atomic::{AtomicI64, AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tonnerre_common::{
    address::Address,
    api::{StackError, StackItem, TupleReader},
    cell::CellBuilder,
    state_init::StateInit,
};
use tonnerre_front::{
    app::{AppError, AppSettings, TonnerreApp},
    poller::PollerError,
    connection::WalletConnection,
    contract::{Opcodes, GET_BALANCE, GET_COUNTER, GET_STORAGE_DATA},
    provider::{ContractClient, ContractProvider, InternalMessage, ProviderError},
    retry::Retrier,
    sender::{SendMode, Sender, SenderArguments, SenderError},
    view::render,
};

const CONTRACT: &str = "0QCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybU2A";

fn address_item(address: &Address) -> StackItem {
    StackItem::Slice(Arc::new(
        CellBuilder::new()
            .store_address(Some(address))
            .unwrap()
            .build()
            .unwrap(),
    ))
}

// Chain with a single counter contract, failing the first get calls when asked to
struct MockChain {
    counter: AtomicI64,
    failures_left: AtomicU32,
}

struct MockProvider {
    chain: Arc<MockChain>,
    address: Address,
}

#[async_trait]
impl ContractProvider for MockProvider {
    async fn get(&self, method: &str) -> Result<TupleReader, ProviderError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let failing = self
            .chain
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StackError::ExitCode(-14).into());
        }

        let items = match method {
            GET_STORAGE_DATA => vec![
                address_item(&Address::new(0, [4u8; 32])),
                address_item(&self.address),
            ],
            GET_BALANCE => vec![StackItem::Int(750_000_000)],
            GET_COUNTER => vec![StackItem::Int(self.chain.counter.load(Ordering::SeqCst) as i128)],
            _ => Vec::new(),
        };
        Ok(TupleReader::new(items))
    }

    async fn internal(
        &self,
        via: &dyn Sender,
        message: InternalMessage,
    ) -> Result<(), ProviderError> {
        via.send(SenderArguments {
            to: self.address,
            value: message.value,
            bounce: message.bounce.unwrap_or(true),
            send_mode: message.send_mode,
            init: None,
            body: Some(message.body),
        })
        .await?;
        Ok(())
    }
}

struct MockClient(Arc<MockChain>);

impl ContractClient for MockClient {
    fn provider(&self, address: Address, _: Option<StateInit>) -> Arc<dyn ContractProvider> {
        Arc::new(MockProvider {
            chain: Arc::clone(&self.0),
            address,
        })
    }
}

// Wallet applying increments straight to the mock chain
struct MockWallet {
    chain: Arc<MockChain>,
    sent: Mutex<Vec<SenderArguments>>,
}

#[async_trait]
impl Sender for MockWallet {
    fn address(&self) -> Option<Address> {
        Some(Address::new(0, [4u8; 32]))
    }

    async fn send(&self, args: SenderArguments) -> Result<(), SenderError> {
        if let Some(body) = args.body.as_ref() {
            let mut slice = body.parse();
            if slice.load_uint(32)? == Opcodes::INCREASE as u64 {
                slice.load_uint(64)?;
                let by = slice.load_uint(32)? as i64;
                self.chain.counter.fetch_add(by, Ordering::SeqCst);
            }
        }
        self.sent.lock().unwrap().push(args);
        Ok(())
    }
}

fn setup(failures: u32) -> (Arc<MockChain>, Arc<WalletConnection>, TonnerreApp) {
    setup_with(failures, Retrier::default())
}

fn setup_with(
    failures: u32,
    retrier: Retrier,
) -> (Arc<MockChain>, Arc<WalletConnection>, TonnerreApp) {
    let chain = Arc::new(MockChain {
        counter: AtomicI64::new(0),
        failures_left: AtomicU32::new(failures),
    });
    let connection = Arc::new(WalletConnection::new("https://example.com/manifest.json"));
    let settings = AppSettings::new(retrier, Duration::from_secs(10)).unwrap();
    let app = TonnerreApp::new(
        Arc::new(MockClient(chain.clone())),
        connection.clone(),
        settings,
    );
    (chain, connection, app)
}

#[tokio::test(start_paused = true)]
async fn test_increment_is_polled_back() {
    let (chain, connection, app) = setup(0);
    let wallet = Arc::new(MockWallet {
        chain: chain.clone(),
        sent: Mutex::new(Vec::new()),
    });
    connection.connect(wallet.clone());

    let address: Address = CONTRACT.parse().unwrap();
    app.open(address).await;
    assert_eq!(
        app.contract_address().await.as_deref(),
        Some("EQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybavP")
    );

    let poller = app.start_polling().await.unwrap();
    let mut receiver = poller.subscribe();
    receiver.wait_for(|s| s.is_some()).await.unwrap();
    let snapshot = app.snapshot().await.unwrap();
    assert_eq!(snapshot.counter, 0);
    assert_eq!(snapshot.balance, 750_000_000);
    assert_eq!(snapshot.owner_address, address);

    assert!(app.send_increment().await.unwrap());
    {
        let sent = wallet.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, address);
        assert_eq!(sent[0].value, 50_000_000);
        assert!(sent[0].bounce);
        assert_eq!(sent[0].send_mode, SendMode::PAY_GAS_SEPARATELY);
    }

    // the next cycle reads the increased counter
    receiver
        .wait_for(|s| s.map(|s| s.counter) == Some(3))
        .await
        .unwrap();

    let view = render(&app.view_model("linux").await);
    assert!(view.contains("Counter\n3\n"));
    assert!(view.contains("Our contract Balance\n0.75 TON\n"));
    assert!(view.ends_with("[Increment]\n"));

    app.stop_polling().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let (_, _, app) = setup(4);
    app.open(CONTRACT.parse().unwrap()).await;
    let poller = app.start_polling().await.unwrap();
    let mut receiver = poller.subscribe();
    receiver.wait_for(|s| s.is_some()).await.unwrap();
    assert!(poller.is_running().await);
    app.stop_polling().await.unwrap();
}

#[tokio::test]
async fn test_increment_without_contract_or_wallet() {
    let (_, connection, app) = setup(0);
    // nothing opened yet
    assert!(!app.send_increment().await.unwrap());
    assert!(matches!(
        app.start_polling().await,
        Err(AppError::NotOpened)
    ));

    app.open(CONTRACT.parse().unwrap()).await;
    assert!(!connection.is_connected());
    assert!(matches!(
        app.send_increment().await,
        Err(AppError::NotConnected)
    ));
    assert!(!render(&app.view_model("linux").await).contains("[Increment]"));
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_ends_when_reads_keep_failing() {
    let (_, _, app) = setup_with(u32::MAX, Retrier::new(1, Duration::from_secs(1)));
    app.open(CONTRACT.parse().unwrap()).await;

    let mut updates = Vec::new();
    let res = tokio::time::timeout(
        Duration::from_secs(3600),
        app.run_dashboard("linux", false, |model| updates.push(model.clone())),
    )
    .await
    .expect("dashboard must end with the poller");

    assert!(matches!(
        res,
        Err(AppError::Poller(PollerError::Fetch(ProviderError::Stack(
            StackError::ExitCode(-14)
        ))))
    ));
    assert!(updates.iter().all(|model| model.snapshot.is_none()));
    assert!(app.snapshot().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_once_stops_after_complete_snapshot() {
    let (_, _, app) = setup(2);
    app.open(CONTRACT.parse().unwrap()).await;

    let mut updates = Vec::new();
    app.run_dashboard("linux", true, |model| updates.push(model.clone()))
        .await
        .unwrap();

    let last = updates.last().unwrap();
    assert_eq!(last.snapshot.map(|s| s.balance), Some(750_000_000));
    assert!(render(last).contains("Counter\n0\n"));
}
