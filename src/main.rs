use clap::Parser;
use imagegen::config::setup_logging;
use imagegen::gemini::GeminiClient;
use imagegen::keys::KeyLoader;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = imagegen::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    if let Err(err) = tokio::fs::create_dir_all(&cli.image_dir).await {
        error!(
            "Failed to create image directory {}: {}",
            cli.image_dir.display(),
            err
        );
        return;
    }

    let db = match imagegen::db::connect_db(&cli.database_path).await {
        Ok(db) => db,
        Err(err) => {
            error!("Database connection error: {}", err);
            return;
        }
    };

    if let Err(err) = imagegen::db::migrations::Migrator::up(&db, None).await {
        error!("Database migration error: {}", err);
        return;
    }

    let gemini = match GeminiClient::new(&cli.api_base, &cli.model) {
        Ok(client) => client,
        Err(err) => {
            error!("Invalid Gemini API base {}: {}", cli.api_base, err);
            return;
        }
    };
    info!("Generating with {}", gemini.endpoint());

    let keys = KeyLoader::new(&cli.api_key_file);
    if keys.load().is_none() {
        warn!(
            "No API key in GEMINI_API_KEY or {}; the UI will ask for one",
            cli.api_key_file.display()
        );
    }

    let state = imagegen::web::AppState::new(db, &cli.image_dir, gemini, keys);
    if let Err(err) = imagegen::web::setup_server(&cli.listen_address, cli.port, state).await {
        error!("Application error: {}", err);
    }
}
