// curve-node/src/main.rs
use clap::{Parser, Subcommand};
use curve_core::{Amount, Role};
use curve_crypto::Address;
use curve_node::{ExchangeService, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "curve-node")]
#[command(about = "Bonding-Curve Exchange", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "./data/config.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory with a config and an empty exchange
    Init {
        /// Data directory
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Admin address (hex)
        #[arg(short, long)]
        admin: String,

        /// Price increment per unit of supply
        #[arg(long, default_value = "0.01")]
        price_increment: String,

        /// Seconds between sells by one account
        #[arg(long, default_value = "60")]
        cooldown: u64,
    },

    /// Show supply, price and treasury
    Status,

    /// Price a trade at the current supply
    Quote {
        #[command(subcommand)]
        side: QuoteCommands,
    },

    /// Buy units, paying up to the given bound
    Buy {
        /// Buyer address (hex)
        #[arg(short, long)]
        account: String,

        /// Units to buy
        #[arg(short, long)]
        quantity: u64,

        /// Highest acceptable cost
        #[arg(long)]
        max_cost: String,

        /// Currency attached; defaults to the cost bound
        #[arg(long)]
        payment: Option<String>,
    },

    /// Sell units back to the curve
    Sell {
        /// Seller address (hex)
        #[arg(short, long)]
        account: String,

        /// Units to sell
        #[arg(short, long)]
        quantity: u64,

        /// Lowest acceptable revenue
        #[arg(long, default_value = "0")]
        min_revenue: String,
    },

    /// Drain the treasury to an admin
    Withdraw {
        /// Admin address (hex)
        #[arg(short, long)]
        account: String,
    },

    /// Grant a role to an account
    Grant {
        /// Admin address (hex)
        #[arg(long)]
        granter: String,

        /// Grantee address (hex)
        #[arg(long)]
        account: String,

        /// Role name
        #[arg(long, default_value = "ADMIN")]
        role: String,
    },
}

#[derive(Subcommand)]
enum QuoteCommands {
    /// Cost of buying
    Buy { quantity: u64 },
    /// Revenue from selling
    Sell { quantity: u64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("curve_node={0},bonding_curve={0},curve_core={0}", log_level).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { data_dir, admin, price_increment, cooldown } => {
            init_exchange(&cli.config, data_dir, admin, price_increment, cooldown).await?;
        }
        command => {
            let config = NodeConfig::from_file(&cli.config)?;
            let service = ExchangeService::open(&config)?;
            run_command(&service, command).await?;
        }
    }

    Ok(())
}

async fn init_exchange(
    config_path: &str,
    data_dir: String,
    admin: String,
    price_increment: String,
    cooldown_seconds: u64,
) -> anyhow::Result<()> {
    tracing::info!("Initializing exchange at {}", data_dir);

    let mut config = NodeConfig { data_dir, admin, ..Default::default() };
    config.curve.price_increment = price_increment;
    config.curve.cooldown_seconds = cooldown_seconds;

    // Fail before touching disk on a bad admin or increment
    config.admin_address()?;
    config.curve_config()?;

    if config.state_path().exists() {
        anyhow::bail!("{} already holds an exchange", config.data_dir);
    }

    std::fs::create_dir_all(&config.data_dir)?;
    if let Some(parent) = std::path::Path::new(config_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.to_file(config_path)?;

    let service = ExchangeService::open(&config)?;
    service.save().await?;

    tracing::info!("Exchange initialized, config written to {}", config_path);
    Ok(())
}

async fn run_command(service: &ExchangeService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { .. } => anyhow::bail!("init runs before an exchange is opened"),
        Commands::Status => {
            let status = service.status().await?;
            tracing::info!("Supply:          {}", status.total_supply);
            tracing::info!("Holders:         {}", status.holders);
            tracing::info!("Next unit price: {}", status.spot_price.to_decimal_string());
            tracing::info!("Price increment: {}", status.price_increment.to_decimal_string());
            tracing::info!("Sell cooldown:   {}s", status.cooldown_seconds);
            tracing::info!("Treasury:        {}", status.treasury.balance.to_decimal_string());
            tracing::info!("  deposited:     {}", status.treasury.total_deposited.to_decimal_string());
            tracing::info!("  paid out:      {}", status.treasury.total_paid_out.to_decimal_string());
            tracing::info!("  withdrawn:     {}", status.treasury.total_withdrawn.to_decimal_string());
            return Ok(());
        }
        Commands::Quote { side } => {
            match side {
                QuoteCommands::Buy { quantity } => {
                    let cost = service.quote_buy(&Amount::from_u64(quantity)).await?;
                    tracing::info!("Buying {} costs {}", quantity, cost.to_decimal_string());
                }
                QuoteCommands::Sell { quantity } => {
                    let revenue = service.quote_sell(&Amount::from_u64(quantity)).await?;
                    tracing::info!("Selling {} returns {}", quantity, revenue.to_decimal_string());
                }
            }
            return Ok(());
        }
        Commands::Buy { account, quantity, max_cost, payment } => {
            let max_cost = Amount::from_decimal_str(&max_cost)?;
            let payment = match payment {
                Some(p) => Amount::from_decimal_str(&p)?,
                None => max_cost.clone(),
            };
            let receipt = service
                .buy(parse_address(&account)?, &Amount::from_u64(quantity), &max_cost, &payment)
                .await?;
            tracing::info!(
                "Bought {} for {} (refund {}), supply now {}",
                receipt.minted,
                receipt.cost.to_decimal_string(),
                receipt.refund.to_decimal_string(),
                receipt.supply_after
            );
        }
        Commands::Sell { account, quantity, min_revenue } => {
            let min_revenue = Amount::from_decimal_str(&min_revenue)?;
            let receipt = service
                .sell(parse_address(&account)?, &Amount::from_u64(quantity), &min_revenue)
                .await?;
            tracing::info!(
                "Sold {} for {}, supply now {}",
                receipt.burned,
                receipt.payout.to_decimal_string(),
                receipt.supply_after
            );
        }
        Commands::Withdraw { account } => {
            let amount = service.withdraw(parse_address(&account)?).await?;
            tracing::info!("Withdrew {}", amount.to_decimal_string());
        }
        Commands::Grant { granter, account, role } => {
            let role = parse_role(&role);
            let granted = service
                .grant_role(parse_address(&granter)?, parse_address(&account)?, role)
                .await?;
            if granted {
                tracing::info!("Granted {} to {}", role, account);
            } else {
                tracing::info!("{} already holds {}", account, role);
            }
        }
    }

    service.save().await
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    Ok(Address::from_hex(s)?)
}

fn parse_role(name: &str) -> Role {
    if name.eq_ignore_ascii_case("admin") {
        Role::ADMIN
    } else {
        Role::named(name)
    }
}
