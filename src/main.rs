//! Taringa - FX30 boot launcher and SMS command controller

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use taringa::actions::ActionDispatcher;
use taringa::boot;
use taringa::command::Command;
use taringa::config::Config;
use taringa::process::SystemRunner;
use taringa::sms::outbound;
use taringa::sms::SmsController;
use taringa::shutdown;
use taringa::spool::{self, SpoolSmsService};
use taringa::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Taringa - FX30 gateway services
#[derive(Parser)]
#[command(name = "taringa")]
#[command(about = "Boot launcher and SMS command controller for the Smart-Buoy FX30")]
struct Cli {
    /// JSON config file (defaults are used for missing keys)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the boot script; exits non-zero if it fails
    Boot,

    /// Run the SMS command controller
    Run {
        /// Handle whatever is in the inbox once, then exit
        #[arg(long)]
        once: bool,
    },

    /// Send one SMS
    Send {
        /// Destination phone number
        destination: String,

        /// Message text
        text: String,
    },

    /// Show the reply and action an SMS body would produce, without running anything
    Parse {
        /// SMS body
        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Boot => cmd_boot(&config),
        Commands::Run { once } => cmd_run(&config, once),
        Commands::Send { destination, text } => cmd_send(&config, &destination, &text),
        Commands::Parse { text } => cmd_parse(&config, &text),
    }
}

fn cmd_boot(config: &Config) -> Result<()> {
    match boot::run_configured(&SystemRunner, config) {
        Ok(()) => {
            info!("Boot script completed");
            Ok(())
        }
        Err(fatal) => {
            error!("FATAL: {}", fatal);
            std::process::exit(1);
        }
    }
}

fn cmd_run(config: &Config, once: bool) -> Result<()> {
    info!("SMS controller starting");

    let stop = Arc::new(AtomicBool::new(false));
    if !once {
        shutdown::stop_on_signal(stop.clone())?;
    }

    let mut service = SpoolSmsService::open(config)?;
    let mut controller = SmsController::new(ActionDispatcher::new(config, SystemRunner));
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    spool::serve(&mut service, &mut controller, poll_interval, &stop, once)?;

    info!("SMS controller stopped");
    Ok(())
}

fn cmd_send(config: &Config, destination: &str, text: &str) -> Result<()> {
    let mut service = SpoolSmsService::open(config)?;
    outbound::send_message(&mut service, destination, text)?;
    println!("Queued SMS to {}", destination);
    Ok(())
}

fn cmd_parse(config: &Config, text: &str) -> Result<()> {
    let command = Command::parse(text);
    let dispatcher = ActionDispatcher::new(config, SystemRunner);

    println!("command: {:?}", command);
    println!("reply: {}", command.reply_text());
    match dispatcher.action_for(&command) {
        Some(action) => println!(
            "action: {} (in {})",
            action.invocation,
            action.dir.display()
        ),
        None => println!("action: none"),
    }
    Ok(())
}
