pub mod browse;
pub mod chat;
pub mod maintenance;
pub mod stats;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;

/// Print `text` one character at a time, then a newline.
pub async fn print_with_typing_effect(text: &str, delay: Duration) -> Result<()> {
    let mut stdout = std::io::stdout();
    if delay.is_zero() {
        writeln!(stdout, "{text}")?;
        return Ok(());
    }
    for ch in text.chars() {
        write!(stdout, "{ch}")?;
        stdout.flush()?;
        tokio::time::sleep(delay).await;
    }
    writeln!(stdout)?;
    Ok(())
}

/// Spinner shown while waiting on the model.
pub fn thinking_spinner(assistant_name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("{assistant_name} is thinking..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Resolves once `flag` is raised, immediately if it already was.
pub async fn interrupted(flag: &watch::Receiver<bool>) {
    let mut rx = flag.clone();
    if rx.wait_for(|&hit| hit).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Drive `fut` unless `flag` is raised first. `None` means interrupted.
pub async fn unless_interrupted<F: Future>(flag: &watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = interrupted(flag) => None,
        out = fut => Some(out),
    }
}
