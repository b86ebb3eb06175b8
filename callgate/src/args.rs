use std::path::PathBuf;

use clap::Parser;

/// Callgate VoIP integration gateway
#[derive(Debug, Parser)]
#[command(name = "callgate", about = "Gateway for Sippy billing, ElevenLabs speech, and Issabel PBX APIs")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "callgate.toml", env = "CALLGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "CALLGATE_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
