//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_API_KEY_FILE, DEFAULT_DATABASE_PATH, DEFAULT_IMAGE_DIR,
    DEFAULT_MODEL,
};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "IMAGEGEN_DEBUG")]
    /// Enable debug logging. Env: IMAGEGEN_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "5001", env = "IMAGEGEN_PORT")]
    /// http listener, defaults to `5001`.
    /// Env: IMAGEGEN_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "IMAGEGEN_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: IMAGEGEN_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, short, default_value = DEFAULT_IMAGE_DIR, env = "IMAGEGEN_IMAGE_DIR")]
    /// Where generated images are written, defaults to `./PNG`.
    /// Env: IMAGEGEN_IMAGE_DIR
    pub image_dir: PathBuf,

    #[clap(long, short, default_value = DEFAULT_DATABASE_PATH, env = "IMAGEGEN_DATABASE_PATH")]
    /// Path to the metadata database file, eg `/data/image_metadata.sqlite`.
    /// Env: IMAGEGEN_DATABASE_PATH
    pub database_path: String,

    #[clap(long, default_value = DEFAULT_API_KEY_FILE, env = "IMAGEGEN_API_KEY_FILE")]
    /// Plaintext file holding the Gemini API key, used when `GEMINI_API_KEY` is unset.
    /// Env: IMAGEGEN_API_KEY_FILE
    pub api_key_file: PathBuf,

    #[clap(long, default_value = DEFAULT_API_BASE, env = "IMAGEGEN_API_BASE")]
    /// Base URL of the Gemini API.
    /// Env: IMAGEGEN_API_BASE
    pub api_base: String,

    #[clap(long, default_value = DEFAULT_MODEL, env = "IMAGEGEN_MODEL")]
    /// Gemini model used for generation.
    /// Env: IMAGEGEN_MODEL
    pub model: String,
}
