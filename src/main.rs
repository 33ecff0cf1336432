//! Entry point: become the primary instance, or hand our startup arguments to the primary
use anyhow::Context;
use app_instance::common::{install_logger, APP_NAME};
use app_instance::{AppEnvironment, AppInstance, StartupMessage, StartupSettings};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
    /// Also write the log to the local data directory
    #[arg(long)]
    log_to_disk: bool,
    /// Override the application name the instance lock is keyed on
    #[arg(long)]
    app_name: Option<String>,
    /// Override the title of the window receiving startup messages
    #[arg(long)]
    window_title: Option<String>,
    /// Override the directory holding session wide state
    #[arg(long)]
    session_dir: Option<PathBuf>,
    /// Run as the packaged (store) variant of the application
    #[arg(long)]
    packaged: bool,
    #[command(flatten)]
    startup: StartupSettings,
}

enum UserEvent {
    // Another instance was launched
    Startup(StartupMessage),
    // Ctrl-C was pressed, the application should exit
    Exit,
}

fn environment(args: &Args) -> AppEnvironment {
    let mut environment = AppEnvironment::current();
    if let Some(name) = &args.app_name {
        environment = environment.with_application_name(name.as_str());
    }
    if let Some(title) = &args.window_title {
        environment = environment.with_main_window_title(title.as_str());
    }
    if let Some(dir) = &args.session_dir {
        environment = environment.with_session_dir(dir);
    }
    if args.packaged {
        environment = environment.packaged(true);
    }
    environment
}

fn print_message(message: &StartupMessage) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(message)?);
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    log::info!("Starting {}, version: {}", APP_NAME, env!("CARGO_PKG_VERSION"));
    let environment = environment(&args);
    log::debug!("{:?}", environment);

    let mut instance = AppInstance::new(&environment)
        .context("Unable to check if the application is already running")?;

    if !instance.is_owned() {
        log::info!("{} is already running, forwarding startup arguments", APP_NAME);
        instance
            .notify_owner(&args.startup)
            .context("Unable to notify the running instance")?;
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    instance
        .listen(move |m| {
            tx2.send(UserEvent::Startup(m)).ok();
        })
        .context("Unable to listen for startup messages")?;
    ctrlc::set_handler(move || {
        tx.send(UserEvent::Exit).ok();
    })
    .context("Error setting Ctrl-C handler")?;

    print_message(&StartupMessage::from(&args.startup))?;
    for event in rx {
        match event {
            UserEvent::Startup(message) => print_message(&message)?,
            UserEvent::Exit => break,
        }
    }
    log::info!("Program exiting gracefully");
    instance.dispose();
    Ok(())
}

fn main() {
    let args: Args = Args::parse();

    // Setup logging
    if let Err(e) = install_logger(args.debug, args.log_to_disk) {
        eprintln!("Unable to install logger: {:#}", e);
        std::process::exit(1);
    }
    // Run the application logic
    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
