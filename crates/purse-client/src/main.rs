//! Interactive terminal client for the Purse server.
//!
//! Drives the three transports from a numbered menu and prints every
//! donation broadcast as it arrives on the feed.

mod cli;
mod menu;

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use purse_transport::websocket::FeedReceiver;
use purse_transport::{datagram, stream, FeedConnection, TransportError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::cli::Cli;
use crate::menu::{build_donation, Choice, MENU};

type Input = Lines<BufReader<Stdin>>;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let mut feed = match FeedConnection::connect(&cli.feed).await {
        Ok(conn) => {
            println!("Connected to donation feed");
            let (sender, receiver) = conn.split();
            tokio::spawn(print_feed(receiver));
            Some(sender)
        }
        Err(e) => {
            println!("Error connecting to donation feed: {}", e);
            None
        }
    };

    loop {
        println!("{}", MENU);
        let Some(option) = prompt(&mut input, "Select option: ").await? else {
            break;
        };

        match Choice::parse(&option) {
            Some(Choice::TopUp) => {
                let Some(request) =
                    prompt(&mut input, "Enter username and top-up amount (username:amount): ")
                        .await?
                else {
                    break;
                };
                match stream::top_up(cli.topup.as_str(), &request).await {
                    Ok(reply) => println!("{}", reply.trim_end()),
                    Err(e) => println!("Error talking to top-up server: {}", e),
                }
            }
            Some(Choice::CheckBalance) => {
                let Some(username) = prompt(&mut input, "Enter username to check: ").await? else {
                    break;
                };
                match datagram::check_balance(cli.balance.as_str(), &username, cli.timeout()).await
                {
                    Ok(reply) => println!("{}", reply),
                    Err(e) => println!("Error talking to balance server: {}", e),
                }
            }
            Some(Choice::Donate) => {
                let Some(sender) = feed.as_mut() else {
                    println!("Donation feed is not connected");
                    continue;
                };
                let Some(name) = prompt(&mut input, "Your name: ").await? else {
                    break;
                };
                let Some(amount) = prompt(&mut input, "Amount: ").await? else {
                    break;
                };
                let Some(message) = prompt(&mut input, "Message: ").await? else {
                    break;
                };

                match build_donation(&name, &amount, &message) {
                    Ok(event) => {
                        if let Err(e) = sender.send(&event).await {
                            println!("Error sending donation: {}", e);
                        }
                    }
                    Err(reason) => println!("Invalid donation: {}", reason),
                }
            }
            Some(Choice::Exit) => break,
            None => println!("Choose a valid option (1/2/3/4)"),
        }
    }

    if let Some(mut sender) = feed {
        if let Err(e) = sender.close().await {
            warn!(error = %e, "Failed to close donation feed");
        }
    }

    Ok(())
}

/// Print a prompt and read one line. Returns `None` at end of input.
async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

async fn print_feed(mut receiver: FeedReceiver) {
    loop {
        match receiver.recv().await {
            Ok(Some(event)) => println!("\n[feed] {}", event.summary()),
            Ok(None) => {
                println!("\n[feed] closed by server");
                break;
            }
            Err(TransportError::Protocol(e)) => warn!(error = %e, "Undecodable feed frame"),
            Err(e) => {
                println!("\n[feed] {}", e);
                break;
            }
        }
    }
}
