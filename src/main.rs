mod api;
mod config;
mod console;
mod notification;

use std::sync::Arc;

use chrono::Utc;
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::api::client::HttpNotificationApi;
use crate::config::AppConfig;
use crate::console::{render, Command, HELP};
use crate::notification::dispatch::LogNavigator;
use crate::notification::poller::NotificationPoller;
use crate::notification::service::{MarkRead, NotificationService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    tracing_subscriber::fmt::init();

    // Load .env file if it exists
    dotenv().ok();

    let config = AppConfig::from_env()?;
    let api = Arc::new(HttpNotificationApi::new(&config)?);
    let service = Arc::new(NotificationService::new(api));
    let navigator = LogNavigator;

    let poller = NotificationPoller::spawn(service.clone(), config.poll_interval());
    let mut updates = service.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("🐾 Watching notifications at {}", config.api_base_url);
    println!("{}", HELP);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                print!("{}", render(&view, Utc::now()));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match Command::parse(&line) {
                    Command::List => print!("{}", render(&service.view(), Utc::now())),
                    Command::Open(id) => match service.open(id, &navigator) {
                        Ok(Some(route)) => println!("-> {}", route),
                        Ok(None) => println!("Notification {} has nowhere to go", id),
                        Err(e) => println!("{}", e),
                    },
                    Command::Read(id) => match service.mark_as_read(id) {
                        Ok(MarkRead::AlreadyRead) => println!("Notification {} is already read", id),
                        Ok(MarkRead::Pending(_)) => println!("Notification {} marked as read", id),
                        Err(e) => println!("{}", e),
                    },
                    Command::Refresh => service.request_refresh(),
                    Command::Help => println!("{}", HELP),
                    Command::Quit => break,
                    Command::Invalid(message) => println!("{}\n{}", message, HELP),
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down notification watcher");
    poller.stop().await;
    Ok(())
}
