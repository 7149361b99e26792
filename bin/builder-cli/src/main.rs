//! builder-cli – entry point.
//!
//! Startup order:
//! 1. Parse the command line and configuration from environment variables.
//! 2. Initialise structured tracing (JSON when `BUILDER_LOG_JSON` is set).
//! 3. Run the requested command: import an upload into a saved item, or
//!    print the `asset.json` schema.

mod saver;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use builder_core::{
    Collaborators, Config, CreateItemSession, DroppedFile, GltfInspector, SessionMetadata,
    Sha256Hasher, SubmitOutcome,
};
use builder_item_pack::AssetManifest;
use builder_types::{BodyShapeType, EmotePlayMode, ItemCategory, ItemRecord, Rarity};

use crate::saver::{DirectorySaver, StaticWallet};

#[derive(Parser)]
#[command(name = "builder-cli")]
#[command(version, about = "Create wearables and emotes from model files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a .glb/.gltf/.vrm/.png file or a .zip bundle and save the item
    Import(ImportArgs),

    /// Print the JSON schema of asset.json
    Schema,
}

#[derive(Args)]
struct ImportArgs {
    /// File to import
    file: PathBuf,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Wearable or emote category, e.g. `hat` or `dance`
    #[arg(long)]
    category: Option<ItemCategory>,

    #[arg(long)]
    rarity: Option<Rarity>,

    /// `male`, `female` or `both`
    #[arg(long)]
    body_shape: Option<BodyShapeType>,

    /// `simple` or `loop` (emotes only)
    #[arg(long)]
    play_mode: Option<EmotePlayMode>,

    /// PNG to use instead of the generated thumbnail
    #[arg(long)]
    thumbnail: Option<PathBuf>,

    #[arg(long)]
    collection_id: Option<String>,

    /// URN of the owning collection; third-party URNs get an item URN
    #[arg(long)]
    collection_urn: Option<String>,

    /// Existing item.json to extend or edit
    #[arg(long)]
    item: Option<PathBuf>,

    /// Add the missing body shape to `--item`
    #[arg(long, requires = "item", conflicts_with = "change_file")]
    add_representation: bool,

    /// Replace the model file of `--item`
    #[arg(long, requires = "item")]
    change_file: bool,

    /// Address recorded as the item owner
    #[arg(long, default_value = "0x0000000000000000000000000000000000000000")]
    owner: String,

    /// Emote price; without it the pricing step is skipped
    #[arg(long, requires = "beneficiary")]
    price: Option<String>,

    #[arg(long)]
    beneficiary: Option<String>,

    /// Output directory
    #[arg(long, default_value = "items")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cli = Cli::parse();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: BUILDER_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "builder-cli starting");

    // ── 3. Command ─────────────────────────────────────────────────────────────
    match cli.command {
        Command::Import(args) => {
            let item = import(cfg, args).await?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        Command::Schema => {
            let schema = schemars::schema_for!(AssetManifest);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}

async fn import(cfg: Config, args: ImportArgs) -> anyhow::Result<ItemRecord> {
    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("'{}' has no file name", args.file.display()))?
        .to_owned();
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let existing = match &args.item {
        Some(path) => {
            let raw = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(serde_json::from_slice::<ItemRecord>(&raw).context("invalid item.json")?)
        }
        None => None,
    };

    let metadata = SessionMetadata {
        collection_id: args
            .collection_id
            .or_else(|| existing.as_ref().and_then(|i| i.collection_id.clone())),
        collection_urn: args.collection_urn,
        item: existing,
        add_representation: args.add_representation,
        change_item_file: args.change_file,
    };
    let collaborators = Collaborators {
        renderer: Arc::new(GltfInspector),
        hasher: Arc::new(Sha256Hasher),
        saver: Arc::new(DirectorySaver::new(&args.out)),
        wallet: Arc::new(StaticWallet(args.owner)),
    };
    let mut session = CreateItemSession::new(cfg, metadata, collaborators);

    session
        .handle_drop(DroppedFile::new(file_name, bytes))
        .await?;

    if let Some(name) = &args.name {
        session.set_name(name);
    }
    if let Some(description) = args.description {
        session.set_description(description);
    }
    if let Some(body_shape) = args.body_shape {
        session.set_body_shape(body_shape);
    }
    if let Some(category) = args.category {
        session.set_category(category).await?;
    }
    if let Some(rarity) = args.rarity {
        session.set_rarity(rarity);
    }
    if let Some(play_mode) = args.play_mode {
        session.set_play_mode(play_mode);
    }
    if let Some(path) = &args.thumbnail {
        let png = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        session.set_custom_thumbnail(Bytes::from(png)).await?;
    }

    let outcome = match session.submit().await? {
        SubmitOutcome::AwaitingPrice => match (args.price, args.beneficiary) {
            (Some(price), Some(beneficiary)) => session.confirm_price(price, beneficiary).await?,
            _ => session.skip_price().await?,
        },
        saved => saved,
    };
    match outcome {
        SubmitOutcome::Saved(item) => Ok(item),
        SubmitOutcome::AwaitingPrice => anyhow::bail!("the item was not saved"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_typed_import_flags() {
        let cli = Cli::try_parse_from([
            "builder-cli",
            "import",
            "hat.glb",
            "--category",
            "hat",
            "--rarity",
            "epic",
            "--body-shape",
            "both",
        ])
        .unwrap();
        let Command::Import(args) = cli.command else {
            panic!("expected the import command");
        };
        assert_eq!(args.category, Some(ItemCategory::Wearable(builder_types::WearableCategory::Hat)));
        assert_eq!(args.rarity, Some(Rarity::Epic));
        assert_eq!(args.body_shape, Some(BodyShapeType::Both));
        assert_eq!(args.out, PathBuf::from("items"));
    }

    #[test]
    fn representation_flags_need_an_item() {
        assert!(Cli::try_parse_from(["builder-cli", "import", "hat.glb", "--add-representation"]).is_err());
        assert!(Cli::try_parse_from(["builder-cli", "import", "a.glb", "--price", "10"]).is_err());
    }
}
