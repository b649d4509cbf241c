mod config;
mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{
    DisabledNotifier, EmployeeApi, EmployeeNotifier, EmployeeService, SeaOrmEmployeeStore,
    TgBotClient, Traced,
};
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Organization employee service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    let _obs = init_tracing(ObsConfig {
        service_name: app_config.service_name.clone(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        environment: app_config.environment.clone(),
        env_filter: None,
        otlp_endpoint: app_config.otlp_endpoint.clone(),
    })?;
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env()?;
    Ok(connect(&settings).await?)
}

fn build_employee_api(pool: &DbPool, config: &AppConfig) -> Result<Arc<dyn EmployeeApi>> {
    let store = Arc::new(SeaOrmEmployeeStore::new(pool.clone()));
    let notifier: Arc<dyn EmployeeNotifier> = match &config.tg_bot {
        Some(bot) => {
            let client = TgBotClient::new(&bot.base_url, bot.secret.clone(), bot.timeout)
                .context("invalid TG_BOT_URL")?;
            info!(endpoint = %client.endpoint(), "employee-added notifications enabled");
            Arc::new(client)
        }
        None => Arc::new(DisabledNotifier),
    };
    Ok(Arc::new(Traced::new(EmployeeService::new(store, notifier))))
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let employees = build_employee_api(&pool, &config)?;
    let state = AppState {
        pool,
        employees,
        config,
    };
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `employee-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}
