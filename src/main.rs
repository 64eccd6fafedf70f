//! Binary entrypoint for the mucbot CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `check` - validate the configuration and print a summary
//! - `console [--from <jid>]` - run the bot against stdin/stdout; each input line is
//!   a chat message from `--from` and every outbound message body is printed
//!
//! See the library crate docs for module-level details: `mucbot::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use mucbot::bot::Bot;
use mucbot::config::Config;
use mucbot::protocol::{ChannelClient, Event, Jid, Message, Roster};

#[derive(Parser)]
#[command(name = "mucbot")]
#[command(about = "A command bot for multi-user chat rooms")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Validate the configuration and print a summary
    Check,
    /// Run the bot with stdin/stdout standing in for the network
    Console {
        /// Sender address for typed lines (defaults to the first master user)
        #[arg(short, long)]
        from: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init has no config to read yet
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new mucbot configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let result = config.validate();
            let payload = serde_json::json!({
                "status": if result.is_ok() { "ok" } else { "invalid" },
                "error": result.as_ref().err().map(|e| e.to_string()),
                "jid": config.bot.jid,
                "server": config.server_address().ok().map(|s| s.to_string()),
                "rooms": config.bot.rooms,
                "users": config.bot.users,
                "resource": config.bot.resource,
                "command_prefix": config.bot.effective_command_prefix().to_string(),
                "idle_interval_secs": config.bot.idle_interval_secs,
                "join_timeout_secs": config.bot.join_timeout_secs,
            });
            println!("{}", payload);
            std::process::exit(if result.is_ok() { 0 } else { 1 });
        }
        Commands::Console { from } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            run_console(&config, from.as_deref()).await?;
        }
    }

    Ok(())
}

async fn run_console(config: &Config, from: Option<&str>) -> Result<()> {
    let users = config.master_users()?;
    let sender: Jid = match from {
        Some(s) => s.parse().map_err(|e| anyhow!("Invalid --from address {}: {}", s, e))?,
        None => match users.first() {
            Some(u) => u.with_resource("console"),
            None => Jid::new(Some("console"), "localhost", Some("console"))?,
        },
    };

    // Master users start out privileged; there is no server to complete the handshake.
    let mut roster = Roster::new();
    for user in &users {
        roster.authorize(user);
    }
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel();
    let client = ChannelClient::new(outgoing_tx).with_roster(roster);
    let mut bot = Bot::from_config(config, client)?;

    let printer = tokio::spawn(async move {
        while let Some(stanza) = outgoing_rx.recv().await {
            match stanza.body() {
                Some(body) => println!("{}", body),
                None => debug!("console transport dropped {:?}", stanza),
            }
        }
    });

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let event = Event::Message(Message::chat(sender.clone(), &line));
            if events_tx.send(event).is_err() {
                break;
            }
        }
    });

    info!("Starting mucbot v{} in console mode", env!("CARGO_PKG_VERSION"));
    bot.start(events_rx).await?;
    reader.abort();
    drop(bot);
    let _ = printer.await;
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());
    let log_file = file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Mirror to the console only when attached to a terminal
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if record.target() == "security" {
                    if let Some(ref sec_path) = security_path {
                        if let Ok(mut sf) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(sec_path)
                        {
                            let _ = writeln!(sf, "{}", line);
                        }
                    }
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
