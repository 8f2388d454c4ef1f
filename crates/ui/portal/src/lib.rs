pub mod action;
pub mod app;
pub mod cli;
pub mod clipboard;
pub mod components;
pub mod config;
pub mod core;
pub mod errors;
pub mod layers;
pub mod pages;
pub mod pagination;
pub mod router;
pub mod session;
pub mod style;
pub mod tui;
pub mod validation;

use std::sync::Arc;

use ::app::{AppBuilder, Application, ConsoleLogging};
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use pki_api::{ApiClient, ApiError, FileTokenStore, MemoryTokenStore, TokenStore};
use tracing::info;

use crate::{
    app::App,
    cli::{Cli, Command},
    config::Config,
    router::Route,
};

pub struct Portal;

impl Application for Portal {
    const APP_ID: &'static str = "portal";
}

pub async fn run() -> Result<()> {
    errors::init()?;
    let cli = Cli::parse();
    let command = cli.command();

    let console = match command {
        Command::Run { .. } => ConsoleLogging::Disabled,
        _ => ConsoleLogging::Enabled,
    };
    let context = AppBuilder::<Portal>::new(env!("CARGO_PKG_VERSION"))
        .console(console)
        .build()
        .map_err(|err| eyre!("failed to initialise the portal: {err}"))?;
    let paths = context.path_context().clone();

    let config = Config::load(&paths.config_dir(), cli.api_url.as_deref())?;
    let tokens: Arc<dyn TokenStore> = if cli.ephemeral {
        Arc::new(MemoryTokenStore::new())
    } else {
        Arc::new(FileTokenStore::open(paths.session_file()))
    };
    let client = ApiClient::new(&config.client_config(), tokens)?;
    info!(api = client.base_url(), command = ?command, "portal starting");

    match command {
        Command::Run { route } => {
            let mut app = App::new(config, client, paths);
            app.start(Route::parse(&route))?;
            app.run().await
        }
        Command::Whoami { json } => whoami(&client, json).await,
        Command::Logout => {
            client.clear_session()?;
            println!("session cleared");
            Ok(())
        }
    }
}

async fn whoami(client: &ApiClient, json: bool) -> Result<()> {
    if !client.has_session_token() {
        println!("not logged in");
        return Ok(());
    }
    match client.me().await {
        Ok(user) if json => println!("{}", serde_json::to_string_pretty(&user)?),
        Ok(user) => println!("{} <{}> ({})", user.full_name(), user.email, user.role),
        Err(ApiError::Unauthorized { .. }) => println!("not logged in"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
