//! Flutter Pilot - supervises a `flutter run` subprocess
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use flutter_pilot::config::{add_profile, rename_profile, ProfileStore, RunProfile};
use flutter_pilot::host::ConsoleHost;
use flutter_pilot::prelude::*;
use flutter_pilot::project::ProjectResolver;
use flutter_pilot::session::RunController;
use flutter_pilot::supervisor::{Supervisor, UserCommand};
use flutter_pilot::logging;
use flutter_pilot::watcher::SaveWatcher;

/// Flutter Pilot - run, reload and supervise a Flutter app
#[derive(Parser, Debug)]
#[command(name = "fpilot")]
#[command(about = "Run, reload and supervise a Flutter app", long_about = None)]
struct Args {
    /// Path to the workspace or Flutter project
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Target device id (e.g. chrome, web-server, emulator-5554)
    #[arg(long, short = 'd')]
    device: Option<String>,

    /// Run profile to activate for this session
    #[arg(long, short = 'p')]
    profile: Option<String>,

    /// Run a web device in a browser tab (requires a web-class device)
    #[arg(long)]
    web_tab: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage run profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// List configured profiles
    List,
    /// Add a new profile
    Add {
        name: String,
        #[arg(long)]
        entrypoint: Option<String>,
        #[arg(long)]
        flavor: Option<String>,
    },
    /// Rename a profile
    Rename { old_name: String, new_name: String },
    /// Delete a profile
    Delete { name: String },
    /// Set the active profile
    Use { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let base_path = args
        .path
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut resolver = ProjectResolver::new();
    let Some(project) = resolver.resolve(&[base_path.clone()], None) else {
        eprintln!(
            "No Flutter project found in: {}\n\
             A Flutter project has a pubspec.yaml declaring a flutter dependency.\n\
             Hint: run fpilot from a Flutter app directory, or pass the path:\n\
             fpilot /path/to/flutter/app",
            base_path.display()
        );
        std::process::exit(1);
    };

    let store = ProfileStore::new(&project);

    if let Some(Command::Profile { action }) = args.command {
        return run_profile_command(&store, action);
    }

    logging::init()?;
    eprintln!("Project: {}", project.display());
    eprintln!("Keys: g=run  r=reload  R=restart  s=stop  d=devtools  w=web tab  q=quit");

    if let Some(name) = &args.profile {
        if let Err(err) = store.set_active(name) {
            eprintln!("warning: {}", err);
        }
    }

    let host = Arc::new(ConsoleHost::new(args.device.clone()));

    let (event_tx, event_rx) = mpsc::channel(256);
    let (save_tx, save_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);

    let _watcher = SaveWatcher::start(project.clone(), save_tx);
    spawn_key_reader(cmd_tx.clone());

    // Start running immediately, like `flutter run`
    let initial = if args.web_tab {
        UserCommand::RunWebTab
    } else {
        UserCommand::Run
    };
    cmd_tx
        .send(initial)
        .await
        .map_err(|_| Error::channel_send("command channel closed"))?;

    let controller = RunController::new(host, store, vec![base_path], event_tx);
    let mut supervisor = Supervisor::new(controller, event_rx, save_rx, cmd_rx);
    supervisor.run_loop().await;

    Ok(())
}

/// Forward single-key commands from stdin to the supervisor
fn spawn_key_reader(cmd_tx: mpsc::Sender<UserCommand>) {
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let command = match line.trim() {
                "g" => UserCommand::Run,
                "r" => UserCommand::HotReload,
                "R" => UserCommand::HotRestart,
                "s" => UserCommand::Stop,
                "d" => UserCommand::OpenDevTools,
                "w" => UserCommand::RunWebTab,
                "q" => UserCommand::Quit,
                "" => continue,
                other => {
                    eprintln!("unknown key: {:?}", other);
                    continue;
                }
            };
            if cmd_tx.send(command).await.is_err() {
                break;
            }
        }
    });
}

fn run_profile_command(store: &ProfileStore, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::List => {
            let active = store.active()?;
            for profile in store.list()? {
                let marker = if profile.name == active.name { "*" } else { " " };
                let flavor = profile.flavor().to_string();
                if flavor.is_empty() {
                    println!("{} {}  ({})", marker, profile.name, profile.entrypoint());
                } else {
                    println!(
                        "{} {}  ({}, flavor {})",
                        marker,
                        profile.name,
                        profile.entrypoint(),
                        flavor
                    );
                }
            }
        }
        ProfileAction::Add {
            name,
            entrypoint,
            flavor,
        } => {
            let mut profile = RunProfile::new(&name);
            profile.dart_entrypoint = entrypoint;
            profile.flavor = flavor;
            add_profile(store, profile)?;
            println!("Added profile '{}'", name);
        }
        ProfileAction::Rename { old_name, new_name } => {
            rename_profile(store, &old_name, &new_name)?;
            println!("Renamed '{}' to '{}'", old_name, new_name);
        }
        ProfileAction::Delete { name } => {
            store.delete(&name)?;
            println!("Deleted profile '{}'", name);
        }
        ProfileAction::Use { name } => {
            store.set_active(&name)?;
            println!("Active profile: {}", name);
        }
    }
    Ok(())
}
