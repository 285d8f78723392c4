//! CLI for GenFrame - exact-size AI image generation.

use clap::{Args, Parser, Subcommand};
use genframe::presets::{self, DimensionPreset, PresetCategory};
use genframe::{
    validate_prompt, Config, GenerationRequest, ProviderFamily, ProviderRegistry, Studio,
    DEFAULT_PROVIDER_ID,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genframe")]
#[command(about = "Generate images at an exact size, falling back across providers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate(GenerateArgs),

    /// Check which provider families are reachable
    Probe,

    /// List available providers
    Providers,

    /// List dimension presets
    Presets(PresetArgs),

    /// Check a prompt without generating
    Validate {
        /// The prompt to check
        prompt: String,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Provider id (see `genframe providers`)
    #[arg(short, long, default_value = DEFAULT_PROVIDER_ID)]
    provider: String,

    /// Image width in pixels
    #[arg(long, requires = "height", conflicts_with = "preset")]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long, requires = "width", conflicts_with = "preset")]
    height: Option<u32>,

    /// Named size, e.g. "Full HD Desktop" (alternative to width/height)
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Args)]
struct PresetArgs {
    /// Only show one category (Mobile, Tablet, Desktop, TV, Social, Print, Square)
    #[arg(short, long)]
    category: Option<String>,

    /// Filter by label, description or category
    #[arg(short, long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genframe=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Probe => probe(cli.json).await?,
        Commands::Providers => list_providers(cli.json)?,
        Commands::Presets(args) => list_presets(args, cli.json)?,
        Commands::Validate { prompt } => validate(&prompt, cli.json)?,
    }

    Ok(())
}

fn resolve_size(args: &GenerateArgs) -> anyhow::Result<(u32, u32)> {
    if let (Some(w), Some(h)) = (args.width, args.height) {
        return Ok((w, h));
    }
    let preset = match &args.preset {
        Some(label) => presets::find(label)
            .ok_or_else(|| anyhow::anyhow!("unknown preset: {label} (see `genframe presets`)"))?,
        None => presets::default_preset(),
    };
    Ok((preset.width, preset.height))
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let (width, height) = resolve_size(&args)?;
    let studio = Studio::new(&Config::from_env())?;
    let request = GenerationRequest::new(&args.prompt, &args.provider).with_size(width, height);

    let (tx, rx) = watch::channel(0u8);
    let reporter = (!json_output).then(|| tokio::spawn(report_progress(rx)));

    let result = studio.request_generation_with_progress(&request, tx).await;
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }
    let result = result?;

    result.image.save(&args.output)?;

    if json_output {
        let summary = serde_json::json!({
            "type": "image",
            "success": true,
            "output": args.output.display().to_string(),
            "size_bytes": result.image.size(),
            "width": result.dimensions.width,
            "height": result.dimensions.height,
            "provider": result.provider_id,
            "created_at": result.created_at,
            "metadata": result.metadata,
            "recommendation": result.recommendation,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Generated image: {} ({} bytes, {}) via {}",
            args.output.display(),
            result.image.size(),
            result.dimensions,
            result.metadata.strategy
        );
        if let Some(model) = &result.metadata.model {
            println!("Model: {model}");
        }
        println!(
            "Attempts: {}, duration: {}ms",
            result.metadata.attempts, result.metadata.duration_ms
        );
        if result.is_placeholder() {
            println!("Every provider failed; saved a placeholder instead.");
        }
        if let Some(id) = &result.recommendation {
            println!("Tip: '{}' failed, try --provider {id} next time.", result.provider_id);
        }
    }

    Ok(())
}

async fn report_progress(mut rx: watch::Receiver<u8>) {
    let mut stderr = std::io::stderr();
    while rx.changed().await.is_ok() {
        let percent = *rx.borrow_and_update();
        let _ = write!(stderr, "\rGenerating... {percent:>3}%");
        let _ = stderr.flush();
    }
    let _ = writeln!(stderr);
}

async fn probe(json_output: bool) -> anyhow::Result<()> {
    let studio = Studio::new(&Config::from_env())?;
    let report = studio.probe_availability().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (family, up) in report.iter() {
            let status = if up { "✓" } else { "✗" };
            println!("  {status} {family}");
        }
    }

    Ok(())
}

fn list_providers(json_output: bool) -> anyhow::Result<()> {
    let providers = ProviderRegistry::all();

    if json_output {
        println!("{}", serde_json::to_string_pretty(providers)?);
        return Ok(());
    }

    let has_tokens = !Config::from_env().api_tokens.is_empty();
    println!("Available providers:\n");
    for family in [ProviderFamily::NativeRasterizer, ProviderFamily::InferenceEndpoint] {
        println!("{}:", family.as_str().to_uppercase());
        for p in ProviderRegistry::by_family(family) {
            let default = if p.id == DEFAULT_PROVIDER_ID { " [default]" } else { "" };
            println!("  {} - {}{}", p.id, p.display_name, default);
            println!("    {}", p.description);
        }
        if family == ProviderFamily::InferenceEndpoint {
            let status = if has_tokens { "✓" } else { "✗" };
            println!("  {status} API key: HF_API_TOKENS");
        }
        println!();
    }

    Ok(())
}

fn list_presets(args: PresetArgs, json_output: bool) -> anyhow::Result<()> {
    let mut selected: Vec<&DimensionPreset> = match &args.search {
        Some(query) => presets::search(query),
        None => presets::all().iter().collect(),
    };
    if let Some(name) = &args.category {
        let category = PresetCategory::parse(name)
            .ok_or_else(|| anyhow::anyhow!("unknown category: {name}"))?;
        selected.retain(|p| p.category == category);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    for category in PresetCategory::ALL {
        let group: Vec<_> = selected.iter().filter(|p| p.category == category).collect();
        if group.is_empty() {
            continue;
        }
        println!("{category}:");
        for p in group {
            println!("  {:<28} {:>5} x {:<5} {}", p.label, p.width, p.height, p.description);
        }
    }

    Ok(())
}

fn validate(prompt: &str, json_output: bool) -> anyhow::Result<()> {
    let outcome = validate_prompt(prompt);

    if json_output {
        let result = serde_json::json!({
            "valid": outcome.is_ok(),
            "reason": outcome.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    match outcome {
        Ok(()) => {
            if !json_output {
                println!("Prompt is valid ({} characters)", prompt.chars().count());
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("invalid prompt: {e}"),
    }
}
