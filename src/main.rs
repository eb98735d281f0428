use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linksummary::{
    app::{build_services, init_tracing},
    config::Config,
    entities::{ContentItem, ContentKind, ItemId, ItemStatus},
};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linksummary", about = "Scan content for remote links and render summaries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one content item. Reads the body from stdin unless --file is given.
    Scan {
        #[arg(long)]
        id: String,
        /// Post type of the entry.
        #[arg(long, default_value = "post")]
        kind: String,
        /// Treat the item as a reply to an entry of this post type.
        #[arg(long)]
        reply_to: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the rendered summary for an item.
    Render {
        #[arg(long)]
        id: String,
    },
    /// Clear scan state so the item is scanned again.
    Reset {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let services = build_services(&config).await?;

    match cli.command {
        Command::Scan {
            id,
            kind,
            reply_to,
            file,
        } => {
            let body = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut body = String::new();
                    std::io::stdin()
                        .read_to_string(&mut body)
                        .context("failed to read stdin")?;
                    body
                }
            };
            let kind = match reply_to {
                Some(parent_post_type) => ContentKind::Reply { parent_post_type },
                None => ContentKind::Entry { post_type: kind },
            };
            let item = ContentItem {
                id: ItemId::new(id),
                kind,
                status: ItemStatus::Published,
                body,
            };
            let outcome = services.controller.on_content_finalized(&item).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Render { id } => {
            println!("{}", services.renderer.render_item(&ItemId::new(id)).await);
        }
        Command::Reset { id } => {
            services.controller.reset(&ItemId::new(id)).await?;
        }
    }

    Ok(())
}
