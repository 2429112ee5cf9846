use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use hbdl::{Client, ClientConfig, Credentials, LoginOutcome};

#[derive(Debug, Parser)]
#[command(name = "hbdl", version, about = "Humble Bundle library client")]
struct Cli {
    /// Site root to talk to.
    #[arg(long, global = true, env = "HBDL_BASE_URL")]
    base_url: Option<String>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and save the session cookies.
    Login {
        #[arg(long, default_value = "cookies.json")]
        cookies: PathBuf,
    },
    /// Print the gamekey of every purchase, one per line.
    Gamekeys {
        #[arg(long, default_value = "cookies.json")]
        cookies: PathBuf,
    },
    /// Print one order as JSON.
    Order {
        gamekey: String,
        #[arg(long, default_value = "cookies.json")]
        cookies: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut builder = ClientConfig::builder();
    if let Some(url) = cli.base_url {
        builder = builder.base_url(url);
    }
    let config = builder.build().context("invalid configuration")?;
    let mut client = Client::new(config)?;

    match cli.command {
        Command::Login { cookies } => login(&mut client, cookies).await,
        Command::Gamekeys { cookies } => {
            load_session(&mut client, &cookies)?;
            for key in client.gamekeys().await? {
                println!("{key}");
            }
            Ok(())
        }
        Command::Order { gamekey, cookies } => {
            load_session(&mut client, &cookies)?;
            let order = client.order(&gamekey).await?;
            println!("{}", serde_json::to_string_pretty(&order)?);
            Ok(())
        }
    }
}

fn load_session(client: &mut Client, path: &Path) -> anyhow::Result<()> {
    let n = client
        .load_session(path)
        .with_context(|| format!("loading session from {} (run `hbdl login` first)", path.display()))?;
    log::info!("loaded {n} cookies from {}", path.display());
    Ok(())
}

async fn login(client: &mut Client, cookies: PathBuf) -> anyhow::Result<()> {
    let username = prompt("Username: ")?;
    let password = rpassword::prompt_password_stdout("Password: ").context("reading password")?;
    let credentials = Credentials::new(username, password);

    let mut outcome = client.attempt_login(&credentials).await?;
    let retry = match &outcome {
        LoginOutcome::GuardRequired => {
            println!("Enter the code sent to your email address to verify your account.");
            Some(credentials.with_guard(prompt("Code: ")?))
        }
        LoginOutcome::TwoFactorRequired { kind } => {
            match kind {
                Some(kind) => println!("Enter the code from your two-factor authenticator ({kind}) to verify your account."),
                None => println!("Enter the code from your two-factor authenticator to verify your account."),
            }
            Some(credentials.with_second_factor(prompt("Code: ")?))
        }
        _ => None,
    };
    if let Some(credentials) = retry {
        outcome = client.attempt_login(&credentials).await?;
    }

    outcome.into_result()?;

    client
        .save_session(&cookies)
        .with_context(|| format!("saving session to {}", cookies.display()))?;
    println!("Logged in; session saved to {}", cookies.display());
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("unexpected end of input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
