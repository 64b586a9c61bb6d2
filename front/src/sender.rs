use async_trait::async_trait;
use log::{debug, info};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tonnerre_common::{
    address::{Address, AddressFlags},
    cell::{Cell, CellError},
    network::Network,
    state_init::StateInit,
};

pub type SharedSender = Arc<dyn Sender>;

// Outbound message send mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendMode(u8);

impl SendMode {
    pub const NONE: SendMode = SendMode(0);
    pub const PAY_GAS_SEPARATELY: SendMode = SendMode(1);
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    pub const CARRY_ALL_REMAINING_INCOMING_VALUE: SendMode = SendMode(64);
    pub const CARRY_ALL_REMAINING_BALANCE: SendMode = SendMode(128);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: SendMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: SendMode) -> SendMode {
        SendMode(self.0 | rhs.0)
    }
}

// Everything a wallet needs to emit an internal message
#[derive(Debug, Clone)]
pub struct SenderArguments {
    pub to: Address,
    // nanoton
    pub value: u128,
    pub bounce: bool,
    pub send_mode: SendMode,
    pub init: Option<StateInit>,
    pub body: Option<Cell>,
}

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("no wallet connected")]
    NotConnected,
    #[error("message rejected by the wallet: {}", _0)]
    Rejected(String),
    #[error(transparent)]
    Cell(#[from] CellError),
}

// A connected wallet able to sign and broadcast messages
#[async_trait]
pub trait Sender: Send + Sync {
    fn address(&self) -> Option<Address>;

    async fn send(&self, args: SenderArguments) -> Result<(), SenderError>;
}

pub type LinkSink = Arc<dyn Fn(&str) + Send + Sync>;

// Sender handing each message to the user as a ton:// transfer link,
// to be opened with any TON wallet
pub struct DeeplinkSender {
    address: Option<Address>,
    network: Network,
    sink: LinkSink,
}

impl DeeplinkSender {
    pub fn new(address: Option<Address>, network: Network, sink: LinkSink) -> Self {
        Self {
            address,
            network,
            sink,
        }
    }

    // Print links on stdout
    pub fn stdout(address: Option<Address>, network: Network) -> Self {
        Self::new(
            address,
            network,
            Arc::new(|link: &str| println!("Open in your wallet: {}", link)),
        )
    }

    pub fn transfer_link(&self, args: &SenderArguments) -> Result<String, SenderError> {
        let destination = args.to.to_friendly(AddressFlags {
            bounceable: args.bounce,
            test_only: !self.network.is_mainnet(),
            url_safe: true,
        });

        let mut link = format!("ton://transfer/{}?amount={}", destination, args.value);
        if let Some(body) = args.body.as_ref() {
            link.push_str("&bin=");
            link.push_str(&urlencoding::encode(&body.to_boc_base64_url()));
        }
        if let Some(init) = args.init.as_ref() {
            link.push_str("&init=");
            link.push_str(&urlencoding::encode(&init.to_cell()?.to_boc_base64_url()));
        }
        Ok(link)
    }
}

impl fmt::Debug for DeeplinkSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeeplinkSender")
            .field("address", &self.address)
            .field("network", &self.network)
            .finish()
    }
}

#[async_trait]
impl Sender for DeeplinkSender {
    fn address(&self) -> Option<Address> {
        self.address
    }

    async fn send(&self, args: SenderArguments) -> Result<(), SenderError> {
        // wallets pick their own mode for links, pay gas separately is their default
        if !args.send_mode.contains(SendMode::PAY_GAS_SEPARATELY) {
            debug!(
                "Send mode {} is not expressible in a transfer link",
                args.send_mode.bits()
            );
        }

        let link = self.transfer_link(&args)?;
        if log::log_enabled!(log::Level::Info) {
            info!("Transfer of {} nanoton to {} ready", args.value, args.to);
        }
        (self.sink)(&link);
        Ok(())
    }
}
