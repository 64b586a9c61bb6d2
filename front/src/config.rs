#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use tonnerre_common::{
    config::VERSION,
    logger::{default_logs_datetime_format, LogLevel},
    network::Network,
};

// Counter contract watched by default
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0QCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybU2A";
// Interval in seconds between two polls of the contract
pub const POLL_INTERVAL: u64 = 10;
// Retries after a first failed call
pub const RETRY_COUNT: u32 = 12;
pub const RETRY_DELAY_MS: u64 = 1000;
// Attached to each increment, in TON
pub const INCREMENT_VALUE: &str = "0.05";
pub const INCREMENT_BY: u32 = 3;
// Value in TON sent with the other operations when not specified
pub const DEFAULT_MESSAGE_VALUE: &str = "0.05";
pub const MANIFEST_URL: &str = "https://cvdsfif.github.io/tonnerre-front/manifest.json";
// Timeout in seconds of a single RPC request
pub const RPC_TIMEOUT: u64 = 15;

// Functions Helpers
#[cfg(feature = "cli")]
fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.to_owned()
}

#[cfg(feature = "cli")]
fn default_poll_interval() -> u64 {
    POLL_INTERVAL
}

#[cfg(feature = "cli")]
fn default_retries() -> u32 {
    RETRY_COUNT
}

#[cfg(feature = "cli")]
fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY_MS
}

#[cfg(feature = "cli")]
fn default_rpc_timeout() -> u64 {
    RPC_TIMEOUT
}

#[cfg(feature = "cli")]
fn default_manifest_url() -> String {
    MANIFEST_URL.to_owned()
}

#[cfg(feature = "cli")]
fn default_log_filename() -> String {
    String::from("tonnerre.log")
}

#[cfg(feature = "cli")]
fn default_logs_path() -> String {
    String::from("logs/")
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network to connect to
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub network: Network,
    /// toncenter v2 JSON-RPC endpoint to use
    /// By default, a healthy node is picked from the ton-access gateway.
    #[clap(long)]
    pub endpoint: Option<String>,
    /// API key sent with each RPC request
    #[clap(long)]
    pub api_key: Option<String>,
    /// Timeout in seconds of a RPC request
    #[clap(long, default_value_t = RPC_TIMEOUT)]
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout: u64,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Address of the counter contract
    #[clap(long, default_value_t = default_contract_address())]
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    /// Interval in seconds between two polls of the contract
    #[clap(long, default_value_t = POLL_INTERVAL)]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// How many times a failed contract call is retried
    #[clap(long, default_value_t = RETRY_COUNT)]
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay in milliseconds before retrying a failed call
    #[clap(long, default_value_t = RETRY_DELAY_MS)]
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Address of the wallet sending messages
    /// Messages are printed as ton:// transfer links to open in this wallet.
    #[clap(long)]
    pub wallet_address: Option<String>,
    /// Manifest describing this application to wallets
    #[clap(long, default_value_t = default_manifest_url())]
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct LogConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[clap(long, value_enum)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[clap(long)]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the log filename date based
    /// If disabled, the log file will be named tonnerre.log instead of YYYY-MM-DD.tonnerre.log
    #[clap(long)]
    #[serde(default)]
    pub disable_file_log_date_based: bool,
    /// Disable the usage of colors in log
    #[clap(long)]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Log filename
    ///
    /// By default filename is tonnerre.log.
    /// File will be stored in logs directory, this is only the filename, not the full path.
    #[clap(long, default_value_t = default_log_filename())]
    #[serde(default = "default_log_filename")]
    pub filename_log: String,
    /// Logs directory
    ///
    /// By default it will be logs/ of the current directory.
    #[clap(long, default_value_t = default_logs_path())]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Change the datetime format used by the logger
    #[clap(long, default_value_t = default_logs_datetime_format())]
    #[serde(default = "default_logs_datetime_format")]
    pub datetime_format: String,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the contract dashboard, refreshed at each poll (default)
    Watch {
        /// Print the first complete snapshot and exit
        #[clap(long)]
        once: bool,
    },
    /// Increase the counter by 3, sending 0.05 TON
    Increment,
    /// Deploy a new counter contract
    Deploy {
        /// Contract code as a BoC file, binary or base64
        #[clap(long)]
        code: String,
        /// Contract id
        #[clap(long)]
        id: u32,
        /// Initial counter value
        #[clap(long, default_value_t = 0)]
        counter: u32,
        /// Owner of the contract, the connected wallet by default
        #[clap(long)]
        owner: Option<String>,
        /// Initial recent sender, the owner by default
        #[clap(long)]
        recent_sender: Option<String>,
        /// Value in TON attached to the deployment
        #[clap(long, default_value = DEFAULT_MESSAGE_VALUE)]
        value: String,
    },
    /// Deposit TON on the contract
    Deposit {
        /// Value in TON
        #[clap(long, default_value = DEFAULT_MESSAGE_VALUE)]
        value: String,
    },
    /// Send TON to the contract without any opcode
    NoCodeDeposit {
        /// Value in TON
        #[clap(long, default_value = DEFAULT_MESSAGE_VALUE)]
        value: String,
    },
    /// Ask the contract to send back TON to its owner
    Withdraw {
        /// Amount in TON to withdraw
        #[clap(long)]
        amount: String,
        /// Value in TON attached to pay the fees
        #[clap(long, default_value = DEFAULT_MESSAGE_VALUE)]
        value: String,
    },
    /// Send the store operation
    Store {
        /// Value in TON
        #[clap(long, default_value = DEFAULT_MESSAGE_VALUE)]
        value: String,
    },
    /// Read the contract state once
    Info,
}

#[cfg(feature = "cli")]
#[derive(Parser, Serialize, Deserialize, Clone)]
#[clap(
    version = VERSION,
    about = "Tonnerre - Watch and drive the Tonnerre counter contract on TON",
    long_about = r#"Tonnerre - Watch and drive the Tonnerre counter contract on TON

Without command, the contract dashboard is displayed and refreshed every poll.
Messages to the contract are never signed locally: each one is printed as a
ton://transfer link to open with the wallet given by --wallet-address.

Examples:
  tonnerre --network testnet
  tonnerre --wallet-address <address> increment
  tonnerre --wallet-address <address> withdraw --amount 0.5
"#
)]
#[command(styles = tonnerre_common::get_cli_styles())]
pub struct Config {
    /// Network configuration
    #[clap(flatten)]
    pub network: NetworkConfig,
    /// Contract configuration
    #[clap(flatten)]
    pub contract: ContractConfig,
    /// Wallet configuration
    #[clap(flatten)]
    pub wallet: WalletConfig,
    /// Log configuration
    #[clap(flatten)]
    pub log: LogConfig,
    /// JSON File to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub generate_config_template: bool,
    /// Command to execute
    #[clap(subcommand)]
    #[serde(skip)]
    #[serde(default)]
    pub command: Option<Command>,
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["tonnerre"]);
        assert_eq!(config.network.network, Network::Testnet);
        assert_eq!(config.contract.contract_address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(config.contract.poll_interval, 10);
        assert_eq!(config.contract.retries, 12);
        assert_eq!(config.wallet.manifest_url, MANIFEST_URL);
        assert!(config.command.is_none());
    }

    #[test]
    fn test_subcommand() {
        let config = Config::parse_from([
            "tonnerre",
            "--wallet-address",
            "EQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybavP",
            "withdraw",
            "--amount",
            "1.5",
        ]);
        match config.command {
            Some(Command::Withdraw { amount, value }) => {
                assert_eq!(amount, "1.5");
                assert_eq!(value, DEFAULT_MESSAGE_VALUE);
            }
            _ => panic!("expected withdraw"),
        }
    }

    #[test]
    fn test_config_file_defaults() {
        let config: Config = serde_json::from_str(r#"{
            "network": { "network": "mainnet" },
            "contract": {},
            "wallet": {},
            "log": {}
        }"#)
        .unwrap();
        assert_eq!(config.network.network, Network::Mainnet);
        assert_eq!(config.contract.retry_delay_ms, RETRY_DELAY_MS);
        assert_eq!(config.log.filename_log, "tonnerre.log");
    }
}
