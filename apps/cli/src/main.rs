use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use storyframe_core::{Config, Provider, ProviderSettings, Session, parse_timestamp};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod pipeline;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gemini,
    Openai,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
        }
    }
}

#[derive(Parser)]
#[command(name = "storyframe")]
#[command(
    about = "Tag video timestamps, export the frames, and turn them into AI storyboards and captions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON config file (proxy, domain lists, capture settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the CORS proxy base, e.g. "https://corsproxy.io/?"
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Seconds to wait for a seek before capturing anyway
    #[arg(long, global = true)]
    seek_timeout: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Find the playable media URL in a pasted link or share text
    Resolve {
        /// Text containing the link
        text: String,
    },

    /// Capture the tagged frames and save them as a zip archive
    Capture(CaptureArgs),

    /// Capture the tagged frames and generate a storyboard (plus captions and a cover) from them
    Storyboard(StoryboardArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Local video file, direct media URL, or text containing a video page link
    source: String,

    /// Tag a timestamp: SS, MM:SS or HH:MM:SS, optionally followed by =LABEL
    #[arg(long = "at", required = true, value_name = "TIME[=LABEL]")]
    at: Vec<String>,

    /// Treat the URL as direct media and skip link resolution
    #[arg(long)]
    direct: bool,
}

#[derive(Args)]
struct CaptureArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output archive path. Defaults to the download directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct StoryboardArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// AI provider for generation
    #[arg(short, long, default_value = "gemini")]
    provider: CliProvider,

    /// API key. Falls back to GEMINI_API_KEY / OPENAI_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// Custom API base URL for the provider
    #[arg(long)]
    base_url: Option<String>,

    /// Enable the provider's thinking / reasoning mode
    #[arg(long)]
    thinking: bool,

    /// Also generate social media captions
    #[arg(long)]
    captions: bool,

    /// Generate a cover titled after caption N (1-based) once captions are written
    #[arg(
        long,
        value_name = "N",
        requires = "captions",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    cover: Option<u64>,

    /// Caption language (e.g., "en", "zh-CN")
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Platform the captions are written for
    #[arg(long, default_value = "Xiaohongshu")]
    platform: String,

    /// Replace the default storyboard instruction
    #[arg(long)]
    instruction: Option<String>,

    /// Directory for the generated files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyframe=warn,storyframe_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };

    if let Some(proxy) = &cli.proxy {
        config.resolver.proxy_base = proxy.clone();
    }
    if let Some(secs) = cli.seek_timeout {
        config.capture.seek_timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid --seek-timeout {}", secs))?;
    }

    tracing::debug!(?config, "Config loaded");
    Ok(config)
}

fn build_session(source: &SourceArgs, provider: ProviderSettings) -> Result<Session> {
    let mut session = Session::new(provider);
    for spec in &source.at {
        let (time, label) = match spec.split_once('=') {
            Some((time, label)) => (time, Some(label.to_string())),
            None => (spec.as_str(), None),
        };
        let timestamp = parse_timestamp(time)?;
        session.add_tag(timestamp, label)?;
    }
    Ok(session)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;

    println!(
        "\n{}  {}\n",
        style("storyframe").cyan().bold(),
        style("Frame Studio").dim()
    );

    match cli.command {
        Command::Resolve { text } => {
            let source = pipeline::resolve(&config, &text).await?;
            println!("{}", source.url);
            if let Some(duration) = source.duration {
                println!(
                    "{} {}",
                    style("Duration:").dim(),
                    storyframe_core::format_time(duration, false)
                );
            }
        }
        Command::Capture(args) => {
            let session = build_session(&args.source, ProviderSettings::default())?;
            pipeline::export_frames(
                &config,
                &session,
                &args.source.source,
                args.source.direct,
                args.output,
            )
            .await?;
        }
        Command::Storyboard(args) => {
            let settings = ProviderSettings {
                provider: args.provider.clone().into(),
                api_key: args.api_key.clone(),
                base_url: args.base_url.clone(),
                use_thinking: args.thinking,
            };

            // Validate API key early
            settings.api_key()?;

            let session = build_session(&args.source, settings)?;
            pipeline::storyboard(
                &config,
                &session,
                &args.source.source,
                args.source.direct,
                pipeline::StoryboardOptions {
                    captions: args.captions,
                    cover: args.cover.map(|n| n as usize),
                    lang: args.lang,
                    platform: args.platform,
                    instruction: args.instruction,
                    output_dir: args.output,
                },
            )
            .await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
