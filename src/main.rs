use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use remedex::{build_state, run_ingest, ServiceConfig};
use remedex_api::RestApi;
use remedex_ranking::{EmbedderConfig, EmbedderKind, ScoringKind};

/// Symptom-to-remedy search service
#[derive(Parser, Debug)]
#[command(name = "remedex")]
#[command(about = "Rank candidate remedies for free-text symptoms", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API over a catalog snapshot
    Serve(ServeArgs),
    /// Embed a raw dataset and write a catalog snapshot
    Ingest(IngestArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to the catalog snapshot
    #[arg(short, long, default_value = "./data/catalog.snapshot")]
    data: PathBuf,

    /// HTTP API port
    #[arg(long, default_value_t = 6480)]
    http_port: u16,

    /// JSON service configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scoring strategy: weighted-diversity or linear-blend
    #[arg(long)]
    strategy: Option<ScoringKind>,

    /// Ranked solutions per response
    #[arg(long)]
    max_results: Option<usize>,

    /// Use the HNSW index instead of an exact scan
    #[arg(long)]
    use_hnsw: bool,

    #[command(flatten)]
    embedder: EmbedderArgs,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Raw dataset (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Snapshot to write; `.json` is written uncompressed
    #[arg(short, long, default_value = "./data/catalog.snapshot")]
    output: PathBuf,

    /// JSON service configuration, only the embedder section is used
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    embedder: EmbedderArgs,
}

#[derive(Args, Debug)]
struct EmbedderArgs {
    /// Embedder backend: hashing or remote
    #[arg(long)]
    embedder: Option<EmbedderKind>,

    /// OpenAI-compatible embeddings endpoint
    #[arg(long, env = "REMEDEX_EMBEDDING_URL")]
    embedding_url: Option<String>,

    /// Model name sent to the embeddings endpoint
    #[arg(long)]
    embedding_model: Option<String>,

    /// Embedding dimension
    #[arg(long)]
    embedding_dim: Option<usize>,

    /// Bearer token for the embeddings endpoint
    #[arg(long, env = "REMEDEX_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,
}

impl EmbedderArgs {
    fn apply(self, config: &mut EmbedderConfig) {
        if let Some(kind) = self.embedder {
            config.kind = kind;
        }
        if let Some(url) = self.embedding_url {
            config.url = Some(url);
        }
        if let Some(model) = self.embedding_model {
            config.model = model;
        }
        if let Some(dim) = self.embedding_dim {
            config.dim = dim;
        }
        if let Some(key) = self.embedding_api_key {
            config.api_key = Some(key);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::load(path),
        None => Ok(ServiceConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Remedex v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Ingest(args) => {
            let mut config = load_config(args.config.as_ref())?;
            args.embedder.apply(&mut config.embedder);
            let (input, output) = (args.input, args.output);
            tokio::task::spawn_blocking(move || run_ingest(&input, &output, &config.embedder))
                .await??;
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(strategy) = args.strategy {
        config.search.scoring.strategy = strategy;
    }
    if let Some(max_results) = args.max_results {
        config.search.max_results = max_results;
    }
    if args.use_hnsw {
        config.index.use_hnsw = true;
    }
    args.embedder.apply(&mut config.embedder);
    config.validate()?;

    info!("Catalog snapshot: {:?}", args.data);
    info!("HTTP API port: {}", args.http_port);
    info!("Scoring strategy: {}", config.search.scoring.strategy);

    let data = args.data;
    let http_port = args.http_port;
    // The catalog and any blocking embedding client live on the HTTP thread
    let http_handle = std::thread::spawn(move || -> anyhow::Result<()> {
        let state = build_state(&config, &data)?;
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(RestApi::start(state, http_port))?;
        Ok(())
    });

    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        joined = tokio::task::spawn_blocking(move || http_handle.join()) => {
            match joined {
                Ok(Ok(result)) => result?,
                _ => anyhow::bail!("HTTP server thread panicked"),
            }
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
