use url::Url;

use crate::scheduler::MonitorScheduler;

/// A chat command, already parsed from message text. Each variant maps 1:1
/// onto a scheduler operation; the transport carrying the text is out of
/// scope here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { url: String },
    Cancel { url: String },
    ListActive,
}

/// Parses a chat message into a command. Unknown or malformed messages
/// yield None and should be ignored by the caller.
pub fn parse(text: &str) -> Option<Command> {
    let mut parts = text.split_whitespace();
    match parts.next()? {
        "/watch" => parts.next().map(|url| Command::Register {
            url: url.to_string(),
        }),
        "/unwatch" => parts.next().map(|url| Command::Cancel {
            url: url.to_string(),
        }),
        "/list" => Some(Command::ListActive),
        _ => None,
    }
}

/// Executes a command against the scheduler and produces the reply text.
/// Each user action gets exactly one reply; the chat layer delivers it.
pub async fn dispatch(
    scheduler: &MonitorScheduler,
    command: Command,
    destination: &str,
) -> String {
    match command {
        Command::Register { url } => {
            if Url::parse(&url).is_err() {
                return format!("Invalid URL: {}", url);
            }
            match scheduler.register(&url, destination).await {
                Ok(_) => format!("Now monitoring {}", url),
                Err(e) => {
                    tracing::error!("Failed to register {}: {}", url, e);
                    format!("Could not register {}: {}", url, e)
                }
            }
        }
        Command::Cancel { url } => match scheduler.cancel(&url).await {
            Ok(true) => format!("Stopped monitoring {}", url),
            Ok(false) => format!("No active monitor for {}", url),
            Err(e) => {
                tracing::error!("Failed to cancel {}: {}", url, e);
                format!("Could not cancel {}: {}", url, e)
            }
        },
        Command::ListActive => {
            let urls = scheduler.list_active().await;
            if urls.is_empty() {
                "No links are being monitored.".to_string()
            } else {
                urls.join("\n")
            }
        }
    }
}
