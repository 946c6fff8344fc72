use anyhow::{Context, Result, anyhow};
use clap::Parser;
use imagegen::constants::{
    API_KEY_ENV_VAR, DEFAULT_API_BASE, DEFAULT_API_KEY_FILE, DEFAULT_DATABASE_PATH,
    DEFAULT_IMAGE_DIR, DEFAULT_MODEL, SAMPLE_PROMPTS,
};
use imagegen::error::ImagegenError;
use imagegen::gemini::GeminiClient;
use imagegen::keys::KeyLoader;
use imagegen::store::ImageStore;
use sea_orm_migration::MigratorTrait;
use std::path::PathBuf;

/// Generate one Gemini image from the command line.
///
/// Minimal UX:
///   generate_image "A steampunk robot in Victorian London"
#[derive(Parser, Debug)]
#[command(name = "generate_image")]
#[command(about = "Generate an image with Gemini and add it to the gallery")]
struct Args {
    /// Prompt to send, defaults to the first sample prompt
    prompt: Option<String>,

    /// Key file read when GEMINI_API_KEY is unset
    #[arg(long, default_value = DEFAULT_API_KEY_FILE, env = "IMAGEGEN_API_KEY_FILE")]
    api_key_file: PathBuf,

    /// Output directory
    #[arg(long, default_value = DEFAULT_IMAGE_DIR, env = "IMAGEGEN_IMAGE_DIR")]
    image_dir: PathBuf,

    /// Metadata database
    #[arg(long, default_value = DEFAULT_DATABASE_PATH, env = "IMAGEGEN_DATABASE_PATH")]
    database_path: String,

    /// Gemini API base URL
    #[arg(long, default_value = DEFAULT_API_BASE, env = "IMAGEGEN_API_BASE")]
    api_base: String,

    /// Image model
    #[arg(long, default_value = DEFAULT_MODEL, env = "IMAGEGEN_MODEL")]
    model: String,

    /// Enable debug logging
    #[arg(long, env = "IMAGEGEN_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    imagegen::config::setup_logging(args.debug)
        .map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    let prompt = match args.prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        Some(_) => return Err(anyhow!("Prompt must not be empty")),
        None => SAMPLE_PROMPTS
            .first()
            .map(|prompt| prompt.to_string())
            .ok_or_else(|| anyhow!("No sample prompts available"))?,
    };

    let api_key = KeyLoader::new(&args.api_key_file).load().ok_or_else(|| {
        anyhow!(
            "No API key found. Set {API_KEY_ENV_VAR} or create {}",
            args.api_key_file.display()
        )
    })?;

    let db = imagegen::db::connect_db(&args.database_path)
        .await
        .with_context(|| format!("Failed to open {}", args.database_path))?;
    imagegen::db::migrations::Migrator::up(&db, None)
        .await
        .context("Database migration failed")?;

    let client = GeminiClient::new(&args.api_base, &args.model)
        .with_context(|| format!("Invalid API base {}", args.api_base))?;
    eprintln!("Generating image with {}...", args.model);
    let image = match client.generate(&prompt, &api_key).await {
        Ok(image) => image,
        Err(ImagegenError::UnexpectedResponse { message, raw }) => {
            eprintln!(
                "Response: {}",
                serde_json::to_string_pretty(&raw).unwrap_or_default()
            );
            return Err(anyhow!(message));
        }
        Err(err) => return Err(err).context("Image generation failed"),
    };

    let store = ImageStore::new(db, &args.image_dir);
    let record = store
        .save(&image, &prompt)
        .await
        .context("Failed to store image")?;

    eprintln!(
        "Saved: {} ({}x{}, {} bytes)",
        store.image_path(&record.filename).display(),
        record.width,
        record.height,
        record.file_size
    );
    Ok(())
}
