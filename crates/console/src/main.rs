use std::path::PathBuf;
use std::time::Duration;

use rcb_widget::chat::{MessageContent, Sender};
use rcb_widget::flow::{Block, Flow};
use rcb_widget::{ChatBot, SettingsStore};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const TOAST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Snafu)]
enum ConsoleError {
    #[snafu(display("failed to read stdin on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("widget failed on `{stage}`: {source}"))]
    Widget {
        stage: &'static str,
        source: rcb_widget::WidgetError,
    },
}

fn demo_flow() -> Flow {
    Flow::from([
        (
            "start".to_string(),
            Block::new()
                .with_message("Hi! What should I call you?")
                .with_path("password"),
        ),
        (
            "password".to_string(),
            Block::new()
                .with_message("Pick a password of at least 4 characters.")
                .sensitive()
                .with_dynamic_path(|params| {
                    let next = if params.user_input.chars().count() >= 4 {
                        "done"
                    } else {
                        "password"
                    };
                    Some(next.to_string())
                }),
        ),
        (
            "done".to_string(),
            Block::new()
                .with_message("All set. Say anything to start over.")
                .with_path("start"),
        ),
    ])
}

fn render(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Rich(value) => value.to_string(),
    }
}

fn print_new_messages(bot: &ChatBot, printed: &mut usize) {
    let messages = bot.messages().messages();
    for message in messages.iter().skip(*printed) {
        let label = match &message.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
            other => other.as_str(),
        };
        println!("{label}> {}", render(&message.content));
    }
    *printed = messages.len();
}

async fn run(bot: &ChatBot) -> Result<(), ConsoleError> {
    let mut printed = 0;
    bot.chat_window().toggle_chat_window(Some(true)).await;
    bot.start("start").await.context(WidgetSnafu {
        stage: "start-flow",
    })?;
    print_new_messages(bot, &mut printed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context(ReadInputSnafu {
        stage: "read-console-line",
    })? {
        match line.trim() {
            "/quit" => break,
            "/open" => bot.chat_window().toggle_chat_window(Some(true)).await,
            "/close" => bot.chat_window().toggle_chat_window(Some(false)).await,
            "/stream" => {
                bot.update_settings(|settings| {
                    settings.bot_bubble.simulate_stream = !settings.bot_bubble.simulate_stream;
                })
                .context(WidgetSnafu {
                    stage: "toggle-bot-stream",
                })?;
            }
            _ => {
                if let Err(error) = bot.handle_submit_text(Some(&line)).await {
                    tracing::warn!(error = %error, "submission failed");
                    bot.toasts()
                        .show_toast(error.to_string(), Some(TOAST_TIMEOUT))
                        .await;
                }
            }
        }

        let flags = bot.view_state().subscribe().borrow().clone();
        if flags.is_chat_window_open {
            print_new_messages(bot, &mut printed);
        } else {
            println!("(chat closed, {} unread)", flags.unread_count);
        }
        for toast in bot.toasts().toasts() {
            println!("! {}", toast.message);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => SettingsStore::new(PathBuf::from(path)),
        None => SettingsStore::load(),
    };
    tracing::info!(config_path = ?settings.config_path(), "loaded settings");

    let bot = ChatBot::builder(settings, demo_flow()).build();
    if let Err(error) = run(&bot).await {
        tracing::error!(error = %error, "console exited with an error");
        std::process::exit(1);
    }
}
