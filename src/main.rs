use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use camcast::capture::{CaptureLoop, TestPattern};
use camcast::cli::{Cli, Commands};
use camcast::config::Settings;
use camcast::controller::{Command, SessionController};
use camcast::server::FrameSink;
use camcast::transport::ConnectionState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Stream {
            host,
            port,
            name,
            quality,
            width,
            height,
            fps,
            config,
            standby,
        } => {
            let path = expand_path(&config);
            let mut settings = Settings::load_or_default(&path);
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(name) = name {
                settings.name = name;
            }
            if let Some(quality) = quality {
                settings.quality = quality;
            }
            if let Some(width) = width {
                settings.width = width;
            }
            if let Some(height) = height {
                settings.height = height;
            }
            if let Some(fps) = fps {
                settings.frame_rate = fps;
            }
            if let Err(e) = settings.save(&path) {
                tracing::warn!(error = %e, "could not save settings");
            }
            run_stream(settings, standby).await?;
        }
        Commands::Serve { addr } => {
            println!("📡 camcast frame sink");
            println!("Listening on: {}", addr);
            println!();
            FrameSink::new(addr).run().await?;
        }
    }

    Ok(())
}

async fn run_stream(settings: Settings, standby: bool) -> Result<()> {
    let endpoint = settings.endpoint();

    println!(
        "🎥 camcast — {}x{} @ {} fps, quality {}",
        settings.width, settings.height, settings.frame_rate, settings.quality
    );
    println!("➡️  Endpoint: {}", endpoint);
    println!("Commands: connect, disconnect, privacy, quality <1-100>, stats, quit");
    println!();

    let controller = SessionController::new(settings.quality);
    let metrics = controller.metrics();
    let mut state_rx = controller.state_watch();

    let mut capture = CaptureLoop::new();
    let frame_rx = capture
        .start(TestPattern::new(
            settings.width,
            settings.height,
            settings.frame_rate,
        ))
        .context("capture loop already running")?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let controller_task = tokio::spawn(controller.run(frame_rx, cmd_rx));

    // Echo state transitions as they happen.
    let state_task = tokio::spawn(async move {
        let mut last = *state_rx.borrow();
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow();
            if state.connection != last.connection {
                match state.connection {
                    ConnectionState::Connected => println!("🔗 Connected"),
                    ConnectionState::Disconnected => println!("🔌 Disconnected"),
                }
            }
            if state.privacy != last.privacy {
                println!(
                    "🕶️  Privacy {}",
                    if state.privacy { "on" } else { "off" }
                );
            }
            last = state;
        }
    });

    if !standby {
        let _ = cmd_tx.send(Command::Connect(endpoint.clone()));
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        match cmd {
            "" => {}
            "connect" => {
                let _ = cmd_tx.send(Command::Connect(endpoint.clone()));
            }
            "disconnect" => {
                let _ = cmd_tx.send(Command::Disconnect);
            }
            "privacy" => {
                let _ = cmd_tx.send(Command::TogglePrivacy);
            }
            "quality" => match arg.trim().parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => {
                    let _ = cmd_tx.send(Command::SetQuality(q));
                    println!("Quality set to {}", q);
                }
                _ => println!("Usage: quality <1-100>"),
            },
            "stats" => {
                use std::sync::atomic::Ordering;
                println!(
                    "Frames: {} in, {} sent, {} dropped; {} inbound messages",
                    metrics.frames_in.load(Ordering::Relaxed),
                    metrics.frames_sent.load(Ordering::Relaxed),
                    metrics.frames_dropped.load(Ordering::Relaxed),
                    metrics.messages_in.load(Ordering::Relaxed),
                );
            }
            "quit" | "exit" | "q" => break,
            _ => println!("Unknown command: {}", line),
        }
    }

    capture.stop();
    let _ = cmd_tx.send(Command::Shutdown);
    let _ = controller_task.await;
    state_task.abort();
    println!("👋 Stopped");

    Ok(())
}

fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut buf = PathBuf::from(home);
            buf.push(stripped);
            return buf;
        }
    }
    PathBuf::from(path)
}
