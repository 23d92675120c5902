use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "camcast")]
#[command(about = "🎥 Stream live video frames to a WebSocket endpoint as JPEG", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture frames and stream them to a receiver
    Stream {
        /// Receiver host or IP address
        #[arg(long)]
        host: Option<String>,

        /// Receiver port
        #[arg(short, long)]
        port: Option<u16>,

        /// Session name (path component of the connection URL)
        #[arg(short, long)]
        name: Option<String>,

        /// JPEG quality, 1-100
        #[arg(short, long)]
        quality: Option<u8>,

        /// Capture width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Capture height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Capture rate in frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Settings file; flags override file values
        #[arg(short, long, default_value = "~/.camcast/settings.json")]
        config: String,

        /// Do not connect on startup; wait for the `connect` console command
        #[arg(long)]
        standby: bool,
    },

    /// Run a receiver that accepts streams and logs received frames
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
