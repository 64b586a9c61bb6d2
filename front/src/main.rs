use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::{fs, fs::File, io::Write, path::Path, sync::Arc, time::Duration};
use tonnerre_common::{
    access::get_http_endpoint,
    address::Address,
    cell::{Cell, BOC_MAGIC},
    coins::{format_ton, to_nano},
    logger::{setup_logger, LoggerSettings},
    state_init::BASE_WORKCHAIN,
    tokio::{self, select, signal},
};
use tonnerre_front::{
    app::{AppSettings, TonnerreApp},
    config::{Command, Config},
    connection::WalletConnection,
    contract::{TonnerreConfig, TonnerreContract},
    manifest::fetch_manifest,
    retry::{Retrier, RetryingContract},
    sender::{DeeplinkSender, Sender},
    toncenter_api::ToncenterAPI,
    view::render,
};

// Modules too verbose for the console below warn
const QUIET_MODULES: [&str; 4] = ["reqwest", "hyper", "rustls", "h2"];

#[tokio::main]
async fn main() -> Result<()> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let command = config.command.take();
        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
        config.command = command;
    } else if config.generate_config_template {
        eprintln!(
            "Provided config file path is required to generate the template with --config-file"
        );
        return Ok(());
    }

    let log_config = &config.log;
    setup_logger(LoggerSettings {
        level: log_config.log_level,
        file_level: log_config.file_log_level,
        disable_file_logging: log_config.disable_file_logging,
        disable_file_log_date_based: log_config.disable_file_log_date_based,
        disable_log_color: log_config.disable_log_color,
        filename_log: &log_config.filename_log,
        logs_path: &log_config.logs_path,
        datetime_format: &log_config.datetime_format,
        quiet_modules: &QUIET_MODULES,
    })?;

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let network = config.network.network;
    let endpoint = match config.network.endpoint.as_ref() {
        Some(endpoint) => endpoint.clone(),
        None => get_http_endpoint(network)
            .await
            .context("Error while resolving the RPC endpoint")?,
    };
    info!("Using {} endpoint {}", network, endpoint);

    let api = Arc::new(
        ToncenterAPI::with(
            &endpoint,
            Duration::from_secs(config.network.rpc_timeout),
            config.network.api_key.as_deref(),
        )
        .context("Error while creating the RPC client")?,
    );
    // check that we can reach the endpoint
    let info = api
        .get_masterchain_info()
        .await
        .context("Error while contacting the RPC endpoint")?;
    info!("Connected, last masterchain block is #{}", info.last.seqno);

    let connection = Arc::new(WalletConnection::new(&config.wallet.manifest_url));
    if let Some(wallet) = config.wallet.wallet_address.as_ref() {
        let address: Address = wallet.parse().context("Invalid wallet address")?;
        match fetch_manifest(connection.get_manifest_url()).await {
            Ok(manifest) => info!("Connecting {} to wallet {}", manifest.name, address),
            Err(e) => warn!("Unable to load the app manifest: {}", e),
        }
        connection.connect(Arc::new(DeeplinkSender::stdout(Some(address), network)));
    }

    let retrier = Retrier::new(
        config.contract.retries,
        Duration::from_millis(config.contract.retry_delay_ms),
    );
    let settings = AppSettings::new(retrier, Duration::from_secs(config.contract.poll_interval))?;
    let app = TonnerreApp::new(Arc::new(api.clone()), connection, settings);
    let contract_address: Address = config
        .contract
        .contract_address
        .parse()
        .context("Invalid contract address")?;

    match config.command.unwrap_or(Command::Watch { once: false }) {
        Command::Watch { once } => watch(&app, contract_address, once).await,
        Command::Increment => {
            app.open(contract_address).await;
            if app.send_increment().await? {
                println!("Increment sent to {}", contract_address);
            }
            Ok(())
        }
        Command::Deploy {
            code,
            id,
            counter,
            owner,
            recent_sender,
            value,
        } => {
            let sender = require_sender(&app)?;
            let owner_address = match owner {
                Some(owner) => owner.parse().context("Invalid owner address")?,
                None => sender
                    .address()
                    .context("Owner address is required with this wallet")?,
            };
            let address = match recent_sender {
                Some(address) => address.parse().context("Invalid recent sender address")?,
                None => owner_address,
            };
            let contract = TonnerreContract::create_from_config(
                &TonnerreConfig {
                    id,
                    counter,
                    address,
                    owner_address,
                    code: load_code(&code)?,
                },
                BASE_WORKCHAIN,
            )?;
            let contract = app.open_contract(contract);
            contract
                .send_deploy(sender.as_ref(), to_nano(&value)?)
                .await?;
            println!("Contract deployment sent to {}", contract.address());
            Ok(())
        }
        Command::Deposit { value } => {
            let (contract, sender) = open_for_send(&app, contract_address).await?;
            contract.send_deposit(sender.as_ref(), to_nano(&value)?).await?;
            Ok(())
        }
        Command::NoCodeDeposit { value } => {
            let (contract, sender) = open_for_send(&app, contract_address).await?;
            contract
                .send_no_code_deposit(sender.as_ref(), to_nano(&value)?)
                .await?;
            Ok(())
        }
        Command::Withdraw { amount, value } => {
            let (contract, sender) = open_for_send(&app, contract_address).await?;
            contract
                .send_withdrawal_request(sender.as_ref(), to_nano(&value)?, to_nano(&amount)?)
                .await?;
            Ok(())
        }
        Command::Store { value } => {
            let (contract, sender) = open_for_send(&app, contract_address).await?;
            contract.send_store(sender.as_ref(), to_nano(&value)?).await?;
            Ok(())
        }
        Command::Info => {
            let contract = app.open(contract_address).await;
            let data = contract.get_data().await?;
            println!("Address: {}", contract.address());
            println!("Id: {}", contract.get_id().await?);
            println!("Counter: {}", contract.get_counter().await?);
            println!("Owner: {}", data.owner_address);
            println!("Recent sender: {}", data.recent_sender);
            println!(
                "Balance: {} TON",
                format_ton(contract.get_balance().await?.max(0) as u128)
            );
            let account = api.get_address_balance(contract.address()).await?;
            println!("Account balance: {} TON", format_ton(account));
            Ok(())
        }
    }
}

fn require_sender(app: &TonnerreApp) -> Result<Arc<dyn Sender>> {
    app.get_connection()
        .sender()
        .context("A wallet is required, use --wallet-address")
}

async fn open_for_send(
    app: &TonnerreApp,
    address: Address,
) -> Result<(Arc<RetryingContract>, Arc<dyn Sender>)> {
    let sender = require_sender(app)?;
    Ok((app.open(address).await, sender))
}

// BoC file, binary or base64 text
fn load_code(path: &str) -> Result<Cell> {
    let bytes = fs::read(path).with_context(|| format!("Error while reading {}", path))?;
    let code = if bytes.starts_with(&BOC_MAGIC) {
        Cell::from_boc(&bytes)
    } else {
        let text = String::from_utf8(bytes).context("Contract code is not a BoC")?;
        Cell::from_boc_base64(&text)
    };
    code.with_context(|| format!("Invalid contract code in {}", path))
}

async fn watch(app: &TonnerreApp, address: Address, once: bool) -> Result<()> {
    app.open(address).await;
    let platform = std::env::consts::OS;

    select! {
        biased;
        _ = signal::ctrl_c() => {
            info!("Exiting");
            app.stop_polling().await?;
        }
        res = app.run_dashboard(platform, once, |model| println!("{}", render(model))) => res?,
    }
    Ok(())
}
