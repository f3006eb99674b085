//! CLI `chat` command: the interactive conversation loop.

use anyhow::Result;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;

use super::{print_with_typing_effect, thinking_spinner, unless_interrupted};
use crate::config::{self, AstraConfig};
use crate::llm;
use crate::memory::forget::ForgetOutcome;
use crate::memory::MemoryStore;
use crate::rate_limit::RateLimiter;
use crate::session::{parse_command, Command, Session, TurnOutcome};

const FORGET_REPLIES: &[&str] = &[
    "Alright, forgetting that for you.",
    "Got it. I've erased that memory.",
    "No problem, I've forgotten it.",
    "Consider it gone!",
];

type InputLines = Lines<BufReader<Stdin>>;

/// Why the input prompt returned.
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Listen for Ctrl-C for the rest of the session. The flag stays set once
/// raised, so a press during output is still seen at the next prompt.
fn spawn_interrupt_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for ctrl-c"),
        }
        // Keep the sender alive so receivers never see a closed channel.
        std::future::pending::<()>().await;
    });
    rx
}

struct Shell {
    session: Session,
    name: String,
    typing: Duration,
    forget_count: usize,
    interrupt: watch::Receiver<bool>,
}

impl Shell {
    /// Type out a line. Ctrl-C cuts it short; the next prompt then ends the
    /// session.
    async fn say(&self, text: &str) -> Result<()> {
        let line = format!("{}: {text}", self.name);
        match unless_interrupted(&self.interrupt, print_with_typing_effect(&line, self.typing)).await {
            Some(result) => result,
            None => {
                println!();
                Ok(())
            }
        }
    }

    async fn read_line(&self, lines: &mut InputLines) -> Result<Input> {
        print!("\nYou: ");
        std::io::stdout().flush()?;
        Ok(match unless_interrupted(&self.interrupt, lines.next_line()).await {
            Some(line) => match line? {
                Some(l) => Input::Line(l),
                None => Input::Eof,
            },
            None => Input::Interrupted,
        })
    }

    fn farewell_interrupted(&self) {
        println!("\n{}: Session ended manually. Take care!", self.name);
    }

    /// Greet a returning user, or ask a new one for their name.
    async fn identify(&mut self, lines: &mut InputLines) -> Result<Option<String>> {
        if let Some(user) = self.session.existing_user() {
            self.say(&format!("Welcome back, {user}!")).await?;
            return Ok(Some(user));
        }

        self.say(&format!(
            "Hello! I'm {}, your personal assistant. I'm here to listen, remember important \
             things for you, and help you with anything you need.\nFirst things first, what's your name?",
            self.name
        ))
        .await?;

        loop {
            match self.read_line(lines).await? {
                Input::Line(raw) if raw.trim().is_empty() => continue,
                Input::Line(raw) => {
                    let user = self.session.register_user(&raw)?;
                    self.say(&format!("Nice to meet you, {user}!")).await?;
                    return Ok(Some(user));
                }
                Input::Eof => return Ok(None),
                Input::Interrupted => {
                    self.farewell_interrupted();
                    return Ok(None);
                }
            }
        }
    }

    async fn forget(&mut self, user: &str, keyword: &str) -> Result<()> {
        match self.session.forget(user, keyword)? {
            ForgetOutcome::EmptyKeyword => {
                self.say("Please tell me what you want me to forget.").await
            }
            ForgetOutcome::Forgotten { .. } => {
                let reply = FORGET_REPLIES[self.forget_count % FORGET_REPLIES.len()];
                self.forget_count += 1;
                self.say(reply).await
            }
            ForgetOutcome::Failed => {
                self.say("Sorry, I couldn't reach my memory just now. Try again in a moment.")
                    .await
            }
        }
    }

    /// Returns `false` when the session should end.
    async fn chat_turn(&self, user: &str, prompt: &str) -> Result<bool> {
        let spinner = thinking_spinner(&self.name);
        let Some(outcome) = unless_interrupted(&self.interrupt, self.session.respond(user, prompt)).await
        else {
            spinner.finish_and_clear();
            self.farewell_interrupted();
            return Ok(false);
        };
        spinner.finish_and_clear();

        match outcome {
            Ok(TurnOutcome::Reply { text, .. }) => {
                println!();
                self.say(&text).await?;
            }
            Ok(TurnOutcome::RateLimited { retry_after_secs }) => {
                self.say(&format!(
                    "Let's slow down a little. Try again in {retry_after_secs} seconds."
                ))
                .await?;
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "model call failed");
                eprintln!("\nError: {e:#}");
            }
        }
        Ok(true)
    }

    async fn run(&mut self, lines: &mut InputLines) -> Result<()> {
        let Some(user) = self.identify(lines).await? else {
            return Ok(());
        };

        loop {
            let line = match self.read_line(lines).await? {
                Input::Line(l) => l,
                Input::Eof => {
                    println!();
                    self.say("Goodbye! I'll remember you fondly.").await?;
                    break;
                }
                Input::Interrupted => {
                    self.farewell_interrupted();
                    break;
                }
            };

            match parse_command(&line) {
                Command::Empty => continue,
                Command::Exit => {
                    self.say("Goodbye! I'll remember you fondly.").await?;
                    break;
                }
                Command::Forget(keyword) => {
                    println!();
                    self.forget(&user, &keyword).await?;
                }
                Command::Chat(prompt) => {
                    if !self.chat_turn(&user, &prompt).await? {
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Start an interactive session against the configured store and model.
pub async fn chat(config: &AstraConfig) -> Result<()> {
    let api_key = config::load_api_key()?;
    let model = llm::create_model(&config.model, api_key)?;

    let db_path = config.resolved_db_path();
    let store = MemoryStore::open(&db_path, &config.memory)?;
    let limiter = (config.rate_limit.max_requests > 0)
        .then(|| RateLimiter::new(&db_path, config.rate_limit.clone()));

    tracing::info!(db = %db_path.display(), model = %model.name(), "chat session starting");

    let session = Session::new(store, model, limiter, config);
    let mut shell = Shell {
        name: session.assistant_name().to_string(),
        session,
        typing: Duration::from_millis(config.chat.typing_speed_ms),
        forget_count: 0,
        interrupt: spawn_interrupt_listener(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    shell.run(&mut lines).await
}
