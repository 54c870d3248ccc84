//! Command-line front end for the image-to-prompt workflow.
//!
//! Usage:
//!   prompt_cli photo.jpg [--options lighting,colors] [--generate] [--edit "warmer"]...
//!              [--relay-url http://localhost:3000] [--out ./renders]
//!
//! Without `--relay-url` the relays run in-process against the AI gateway
//! configured through the same environment variables as the `api` server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use api_lib::adapters::{GatewayAdapter, HttpRelayClient};
use api_lib::config::Config;
use clap::Parser;
use image_prompt_core::image::DataUrl;
use image_prompt_core::ports::RelayService;
use image_prompt_core::{
    ImageAnalyzer, ImageGenerator, Language, LocalRelay, PromptSchema, RenderedImage,
    WorkflowController,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "prompt_cli",
    about = "Turn an image into a bilingual prompt, then optionally render and edit a new image",
    version
)]
struct Args {
    /// Image file to analyze
    image: PathBuf,

    /// Comma-separated option ids to enable (defaults to the catalog defaults)
    #[arg(long, value_delimiter = ',')]
    options: Option<Vec<String>>,

    /// Analysis model id
    #[arg(long)]
    analysis_model: Option<String>,

    /// Image model id for generation and edits
    #[arg(long)]
    image_model: Option<String>,

    /// Render a new image from the English prompt
    #[arg(long, default_value = "false")]
    generate: bool,

    /// Edit instruction applied to the generated image; repeat for several edits
    #[arg(long = "edit")]
    edits: Vec<String>,

    /// Directory for rendered images
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Base URL of a running relay; the relays run in-process when absent
    #[arg(long, env = "RELAY_URL")]
    relay_url: Option<String>,

    /// Analysis response shape the relay is deployed with
    #[arg(long, env = "PROMPT_SCHEMA", default_value = "structured")]
    schema: PromptSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    if !args.edits.is_empty() && !args.generate {
        bail!("--edit needs --generate: edits apply to the generated image");
    }

    // 1. Read the image
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let data_url = match DataUrl::from_bytes(&bytes) {
        Some(url) => url,
        None => bail!("{} is not a recognized image", args.image.display()),
    };

    // 2. Pick the relay
    let http = reqwest::Client::new();
    let relay: Arc<dyn RelayService> = match &args.relay_url {
        Some(url) => {
            info!(%url, "Using remote relay");
            Arc::new(HttpRelayClient::new(http.clone(), url, args.schema))
        }
        None => {
            let config = Config::from_env().context("Failed to load gateway configuration")?;
            let gateway = Arc::new(GatewayAdapter::new(
                http.clone(),
                &config.gateway_url,
                config.gateway_api_key.clone(),
            ));
            Arc::new(LocalRelay::new(
                ImageAnalyzer::new(gateway.clone(), args.schema, config.analysis_model.clone()),
                ImageGenerator::new(gateway, config.image_model.clone()),
            ))
        }
    };

    // 3. Set up the session
    let workflow = WorkflowController::new(relay);
    workflow.upload(data_url.to_string()).await;
    if let Some(wanted) = &args.options {
        for option in workflow.snapshot().await.options {
            if option.enabled != wanted.contains(&option.id) {
                workflow.toggle_option(&option.id).await;
            }
        }
        for id in wanted {
            if !workflow.snapshot().await.options.iter().any(|o| &o.id == id) {
                bail!("Unknown option id: {}", id);
            }
        }
    }
    if let Some(model) = args.analysis_model.clone() {
        workflow.set_analysis_model(model).await;
    }
    if let Some(model) = args.image_model.clone() {
        workflow.set_image_model(model).await;
    }

    // 4. Analyze
    let prompt = workflow.analyze().await?;
    println!("{}\n", prompt.full_text(Language::Arabic));
    println!("{}", prompt.full_text(Language::English));

    if !args.generate {
        return Ok(());
    }

    // 5. Generate, then edit
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;
    let generated = workflow.generate_image().await?;
    let path = save_image(&http, &generated, &args.out, "generated-image").await?;
    println!("\nGenerated image saved to {}", path.display());

    for instruction in &args.edits {
        workflow.set_edit_instruction(instruction.clone()).await;
        let edited = workflow.edit_image().await?;
        let path = save_image(&http, &edited, &args.out, "edited-image").await?;
        println!("Edited image saved to {}", path.display());
        if !edited.text.is_empty() {
            println!("{}", edited.text);
        }
    }

    Ok(())
}

/// Writes a rendered image to `<dir>/<prefix>-<timestamp>.<ext>`.
///
/// Data URLs are decoded in place; anything else is fetched.
async fn save_image(
    http: &reqwest::Client,
    rendered: &RenderedImage,
    dir: &Path,
    prefix: &str,
) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%3f");
    let (bytes, extension) = match DataUrl::parse(&rendered.image) {
        Ok(url) => (url.decode()?.to_vec(), url.file_extension().to_string()),
        Err(_) => {
            let bytes = http
                .get(&rendered.image)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .context("Failed to download the rendered image")?
                .bytes()
                .await?;
            let extension = DataUrl::from_bytes(&bytes)
                .map(|url| url.file_extension().to_string())
                .unwrap_or_else(|| "png".to_string());
            (bytes.to_vec(), extension)
        }
    };
    let path = dir.join(format!("{}-{}.{}", prefix, stamp, extension));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
