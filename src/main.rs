use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use ezcasino::{
    app,
    config::{
        AppConfig,
        Args,
    },
    logging,
    wallet::keystore::{
        KeystoreWallet,
        find_wallet,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; everything has a flag or a default.
    let _ = dotenvy::dotenv();
    let config = AppConfig::try_from(Args::parse()).wrap_err("invalid configuration")?;
    let _log_guard = logging::init_tracing(&config.log_dir)
        .wrap_err_with(|| format!("failed to open log dir {}", config.log_dir.display()))?;
    tracing::info!("starting ezcasino client");

    let descriptor = find_wallet(&config.wallet_dir, &config.wallet)?;
    let wallet = KeystoreWallet::unlock(descriptor).wrap_err("failed to unlock wallet")?;
    app::run_app(config, wallet).await
}
