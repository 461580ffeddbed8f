//! fintrack - command-line client for the Expense Tracker API.
//!
//! Thin frontend over the `fintrack` library: it wires the session store
//! and auth flow together, runs one command per invocation, and acts on
//! the redirect each auth transition returns.

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fintrack::auth::{AuthFlow, CallbackParams, Credentials, Redirect};
use fintrack::models::net_balance;
use fintrack::{ApiClient, Config, SessionStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

const USAGE: &str = "\
usage: fintrack <command>

commands:
  login           log in with FINTRACK_USERNAME / FINTRACK_PASSWORD
  login-sso       print the identity-provider login URL
  callback <url>  capture the redirect URL from a third-party login
  status          show session state and the signed-in user
  transactions    list transactions and the net balance
  categories      list categories
  report          show the current month's report
  logout          clear the stored session
";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::load()?;
    let api = ApiClient::new(config.base_url())?;
    let store = SessionStore::new(config.cache_dir()?);
    let mut flow = AuthFlow::new(api, store);

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("");

    match command {
        "login" => login(&mut flow, config).await,
        "login-sso" => {
            let url = flow.initiate_third_party_login();
            println!("Open this URL to log in:");
            println!("  {}", url);
            println!("then run: fintrack callback '<redirected url>'");
            Ok(())
        }
        "callback" => {
            let url = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("callback requires the redirect URL"))?;
            match flow.receive_callback(CallbackParams::from_url(url)) {
                Redirect::Dashboard => println!("Logged in."),
                Redirect::Login => println!("Not logged in."),
            }
            Ok(())
        }
        "status" => status(&mut flow).await,
        "transactions" => transactions(&mut flow).await,
        "categories" => categories(&mut flow).await,
        "report" => report(&mut flow).await,
        "logout" => {
            flow.logout();
            println!("Logged out.");
            Ok(())
        }
        _ => {
            eprint!("{}", USAGE);
            Ok(())
        }
    }
}

async fn login(flow: &mut AuthFlow, mut config: Config) -> Result<()> {
    let username = std::env::var("FINTRACK_USERNAME")
        .ok()
        .or(config.last_username.clone())
        .ok_or_else(|| anyhow::anyhow!("Set FINTRACK_USERNAME (and FINTRACK_PASSWORD)"))?;
    let password = std::env::var("FINTRACK_PASSWORD")
        .map_err(|_| anyhow::anyhow!("Set FINTRACK_PASSWORD"))?;

    let creds = Credentials { username, password };
    match flow.submit_credentials(&creds).await {
        // Ok is always the dashboard redirect
        Ok(_) => {
            config.last_username = Some(creds.username.clone());
            config.save()?;
            info!(username = %creds.username, "Login succeeded");
            println!("Logged in as {}.", creds.username);
            Ok(())
        }
        Err(e) => {
            eprintln!("Login failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn status(flow: &mut AuthFlow) -> Result<()> {
    if !flow.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    match flow.api().fetch_profile().await {
        Ok(profile) => {
            println!("Logged in as {} ({})", profile.display_name(), profile.email);
            Ok(())
        }
        Err(e) => back_to_login(flow, e),
    }
}

async fn transactions(flow: &mut AuthFlow) -> Result<()> {
    match flow.api().fetch_dashboard().await {
        Ok((transactions, categories)) => {
            for tx in &transactions {
                let category = tx
                    .category_name
                    .clone()
                    .or_else(|| {
                        categories
                            .iter()
                            .find(|c| Some(&c.id) == tx.category.as_ref())
                            .map(|c| c.name.clone())
                    })
                    .unwrap_or_else(|| "Uncategorized".to_string());
                println!(
                    "{}  {:>10.2}  {:<12}  {}",
                    tx.date.format("%Y-%m-%d"),
                    tx.signed_amount(),
                    category,
                    tx.description
                );
            }
            println!("net balance: {:.2}", net_balance(&transactions));
            Ok(())
        }
        Err(e) => back_to_login(flow, e),
    }
}

async fn categories(flow: &mut AuthFlow) -> Result<()> {
    match flow.api().fetch_categories().await {
        Ok(categories) => {
            for cat in categories {
                let marker = if cat.is_default { " (default)" } else { "" };
                println!("{}{}", cat.name, marker);
            }
            Ok(())
        }
        Err(e) => back_to_login(flow, e),
    }
}

async fn report(flow: &mut AuthFlow) -> Result<()> {
    match flow.api().fetch_monthly_report().await {
        Ok(report) => {
            println!("income:  {:>10.2}", report.total_income);
            println!("expense: {:>10.2}", report.total_expense);
            println!("balance: {:>10.2}", report.total_balance);
            for (name, total) in &report.category_summary {
                println!("  {:<20} {:>10.2}", name, total);
            }
            Ok(())
        }
        Err(e) => back_to_login(flow, e),
    }
}

/// The one place a refused protected call turns into the login redirect.
fn back_to_login(flow: &mut AuthFlow, err: anyhow::Error) -> Result<()> {
    if flow.recover(&err).is_some() {
        eprintln!("Session expired - please run: fintrack login");
        std::process::exit(1);
    }
    Err(err)
}
