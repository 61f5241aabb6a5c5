use std::sync::Arc;

use {
    anyhow::Result,
    parley_channels::ConsoleOutbound,
    parley_common::{Attachment, InboundMessage, Participant},
    parley_config::ParleyConfig,
    parley_dialogs::{DialogError, DialogStatus, user_profile_runner},
    parley_sessions::MemoryStorage,
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::debug,
};

const DEFAULT_CONVERSATION: &str = "console";
const RESTARTED: &str = "Sorry, something went wrong and this conversation has to start over.";
const RETRY: &str = "Sorry, something went wrong. Please send that again.";

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    /// `@conv text` or plain text for the current conversation.
    Say {
        conversation: Option<String>,
        text: String,
    },
    /// `/attach <content-type> [url]`
    Attach(Attachment),
    /// `/quit`
    Quit,
    Empty,
    Invalid(String),
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.split_whitespace();
        return match (parts.next(), parts.next(), parts.next()) {
            (Some("quit" | "exit"), None, None) => Input::Quit,
            (Some("attach"), Some(content_type), url) => {
                let attachment = Attachment::new(content_type);
                Input::Attach(match url {
                    Some(url) => attachment.with_url(url),
                    None => attachment,
                })
            },
            (Some("attach"), None, _) => Input::Invalid("usage: /attach <content-type> [url]".into()),
            _ => Input::Invalid(format!("unknown command: /{rest}")),
        };
    }

    if let Some(rest) = line.strip_prefix('@') {
        let (conversation, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if conversation.is_empty() {
            return Input::Invalid("usage: @<conversation> <text>".into());
        }
        return Input::Say {
            conversation: Some(conversation.to_string()),
            text: text.trim().to_string(),
        };
    }

    Input::Say {
        conversation: None,
        text: line.to_string(),
    }
}

/// What to tell the user after a failed turn. Structural errors drop the
/// run, anything else leaves the pending question in place.
fn apology(error: &DialogError) -> &'static str {
    if error.is_structural() {
        RESTARTED
    } else {
        RETRY
    }
}

/// Read messages from stdin and print the bot's replies.
pub async fn run_chat(config: &ParleyConfig, channel: &str) -> Result<()> {
    let runner = user_profile_runner(config, Arc::new(MemoryStorage::new()));
    let outbound = ConsoleOutbound::stdout(channel, &config.channels.get(channel));

    println!(
        "parley chat on '{channel}' ({} strategy). Type '@<conversation> <text>' to switch \
         conversation, '/attach <content-type> [url]' to attach, '/quit' to leave.",
        config.dialog.strategy
    );

    let mut conversation = DEFAULT_CONVERSATION.to_string();
    let mut pending = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let text = match parse_line(&line) {
            Input::Quit => break,
            Input::Empty => continue,
            Input::Invalid(msg) => {
                eprintln!("{msg}");
                continue;
            },
            Input::Attach(attachment) => {
                println!("(attachment {} queued)", attachment.content_type);
                pending.push(attachment);
                continue;
            },
            Input::Say {
                conversation: target,
                text,
            } => {
                if let Some(target) = target {
                    conversation = target;
                }
                text
            },
        };

        let mut message = InboundMessage::text(
            channel,
            conversation.as_str(),
            Participant::new(format!("user-{conversation}"), conversation.as_str()),
            text,
        );
        message.attachments = std::mem::take(&mut pending);
        debug!(conversation = %conversation, "routing console message");

        match runner.on_turn(&message, &outbound).await {
            Ok(outcome) if outcome.status == DialogStatus::Complete => {
                println!("(conversation '{conversation}' finished)");
            },
            Ok(_) => {},
            // Already logged by the runner.
            Err(e) => println!("[{conversation}] {}", apology(&e)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, parley_channels::ChannelError};

    #[test]
    fn plain_text_goes_to_current_conversation() {
        assert_eq!(parse_line("  Car "), Input::Say {
            conversation: None,
            text: "Car".into(),
        });
    }

    #[test]
    fn at_prefix_switches_conversation() {
        assert_eq!(parse_line("@batman-conv Bus"), Input::Say {
            conversation: Some("batman-conv".into()),
            text: "Bus".into(),
        });
        assert_eq!(parse_line("@alfred-conv"), Input::Say {
            conversation: Some("alfred-conv".into()),
            text: String::new(),
        });
        assert!(matches!(parse_line("@ hi"), Input::Invalid(_)));
    }

    #[test]
    fn commands() {
        assert_eq!(parse_line("/quit"), Input::Quit);
        assert_eq!(
            parse_line("/attach image/png https://example.test/me.png"),
            Input::Attach(Attachment::new("image/png").with_url("https://example.test/me.png"))
        );
        assert_eq!(parse_line("/attach image/jpeg"), Input::Attach(Attachment::new("image/jpeg")));
        assert!(matches!(parse_line("/attach"), Input::Invalid(_)));
        assert!(matches!(parse_line("/dance"), Input::Invalid(_)));
        assert_eq!(parse_line("   "), Input::Empty);
    }

    #[test]
    fn apology_matches_what_the_runner_did() {
        let missing = DialogError::MissingProfileField {
            field: "transport",
            profile: "{}".into(),
        };
        assert_eq!(apology(&missing), RESTARTED);

        let delivery = DialogError::Channel(ChannelError::Delivery {
            recipient: "alfred".into(),
            reason: "closed".into(),
        });
        assert_eq!(apology(&delivery), RETRY);
    }
}
