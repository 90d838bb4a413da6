use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_ADDR: &str = "127.0.0.1:50051";

#[derive(Parser)]
#[command(
    name = "blobd",
    about = "Content-addressed blob service",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the blob server
    Serve(ServeArgs),
    /// Upload a file under a reverse index
    Put(PutArgs),
    /// Download the blob bound to a reverse index
    Get(GetArgs),
    /// Print the content hash of a file
    Hash(HashArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub admin: Option<SocketAddr>,
    #[arg(long)]
    pub bucket: Option<String>,
    #[arg(long)]
    pub max_connections: Option<usize>,
}

#[derive(Args)]
pub struct PutArgs {
    pub reverse_index: String,
    pub file: PathBuf,
    /// Declared content hash; computed from the file when omitted
    #[arg(long)]
    pub hash: Option<String>,
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub reverse_index: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,
}

#[derive(Args)]
pub struct HashArgs {
    pub file: PathBuf,
}
