use std::io::Read;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tracing::warn;

use blob_crypto::ContentHasher;
use blob_protocol::BlobClient;
use blob_server::{BlobServer, InMemoryBackends, ServerConfig};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Put(args) => cmd_put(args).await,
        Command::Get(args) => cmd_get(args).await,
        Command::Hash(args) => cmd_hash(args),
    }
}

fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(admin) = args.admin {
        config.admin_addr = admin;
    }
    if let Some(bucket) = &args.bucket {
        config.bucket = bucket.clone();
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    println!(
        "{} blob service on {} (admin {}, bucket {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.admin_addr,
        config.bucket.cyan()
    );
    warn!("using in-memory stores; blobs are lost on exit");
    let backends = InMemoryBackends::new(&config);
    BlobServer::new(backends.context(config)).serve().await?;
    Ok(())
}

async fn cmd_put(args: PutArgs) -> anyhow::Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let hash = args.hash.unwrap_or_else(|| ContentHasher::hash_hex(&data));
    let mut client = BlobClient::connect(&args.addr)
        .await
        .with_context(|| format!("connecting to {}", args.addr))?;
    client.put(&args.reverse_index, &hash, &data).await?;
    println!("{} Stored {}", "✓".green().bold(), args.reverse_index.yellow());
    println!("  Size: {} bytes", data.len());
    println!("  Hash: {}", hash.dimmed());
    Ok(())
}

async fn cmd_get(args: GetArgs) -> anyhow::Result<()> {
    let mut client = BlobClient::connect(&args.addr)
        .await
        .with_context(|| format!("connecting to {}", args.addr))?;
    match &args.output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
            let bytes = client.get_into(&args.reverse_index, &mut file).await?;
            println!(
                "{} Wrote {} bytes to {}",
                "✓".green().bold(),
                bytes,
                path.display().to_string().bold()
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            client.get_into(&args.reverse_index, &mut stdout).await?;
        }
    }
    Ok(())
}

fn cmd_hash(args: HashArgs) -> anyhow::Result<()> {
    let hash = hash_file(&args.file)?;
    println!("{}  {}", hash, args.file.display());
    Ok(())
}

fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}
