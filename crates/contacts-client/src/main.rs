//! # contacts
//!
//! Interactive contact list. Reads commands from stdin, keeps working when
//! the server is unreachable and syncs queued changes when it comes back.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::EnvFilter;

use contacts_client::config::ClientConfig;
use contacts_client::view::{self, Command};
use contacts_client::{ClientError, ContactService, WriteOutcome};
use contacts_shared::constants::APP_NAME;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they do not interleave with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("contacts_client=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {APP_NAME} client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let service = ContactService::from_config(&config)?;
    let recovered = service.controller().recover_provisional().await?;
    if recovered > 0 {
        info!(recovered, "Re-queued unsynced contacts from a previous session");
    }

    let mut notices = service.notices();
    let printer = tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => println!("* {}", notice.message()),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped sync notices")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
    let background = service.start(config.probe_interval);

    println!("{APP_NAME} ({}). Type 'help' for commands.", config.api_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(&service, command).await {
            println!("Error: {e}");
        }
    }

    let pending = service.pending().await.len();
    if pending > 0 {
        println!("{pending} change(s) not yet synced; they are kept locally.");
    }
    for task in background {
        task.abort();
    }
    printer.abort();
    Ok(())
}

async fn execute(service: &ContactService, command: Command) -> Result<(), ClientError> {
    match command {
        Command::List => {
            let contacts = service.list().await?;
            println!("{}", view::render_list(&contacts));
        }
        Command::Search(term) => {
            let contacts = service.search(&term).await?;
            println!("{}", view::render_list(&contacts));
        }
        Command::Show(id) => match service.get(&id).await? {
            Some(contact) => println!("{}", view::render_contact(&contact)),
            None => println!("Contact not found: {id}"),
        },
        Command::Add(input) => match service.create(input).await? {
            WriteOutcome::Synced(c) => println!("Contact added ({}).", c.id),
            WriteOutcome::Queued(c) => println!("Contact saved offline ({}).", c.id),
        },
        Command::Edit(id, input) => match service.update(&id, input).await? {
            WriteOutcome::Synced(c) => println!("Contact updated ({}).", c.id),
            WriteOutcome::Queued(c) => println!("Update saved offline ({}).", c.id),
        },
        Command::Remove(id) => match service.delete(&id).await? {
            WriteOutcome::Synced(()) => println!("Contact deleted."),
            WriteOutcome::Queued(()) => println!("Delete saved offline."),
        },
        Command::Sync => {
            let report = service.sync().await;
            println!("{}", view::render_report(&report));
        }
        Command::Queue => {
            let pending = service.pending().await;
            println!("{}", view::render_queue(&pending));
        }
        Command::Discard => match service.discard().await? {
            Some(op) => println!("Discarded {} {}.", op.kind(), op.target()),
            None => println!("No pending changes."),
        },
        Command::Offline => {
            service.set_offline(true);
            println!("Offline mode on.");
        }
        Command::Online => {
            service.set_offline(false);
            println!("Offline mode off.");
        }
        Command::Help => println!("{}", view::HELP),
        Command::Quit => {}
    }
    Ok(())
}
