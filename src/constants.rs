//! Shared constants/setters for things
//!

use std::sync::LazyLock;

/// The default place we put images
pub const DEFAULT_IMAGE_DIR: &str = "PNG";

/// Default metadata database location
pub const DEFAULT_DATABASE_PATH: &str = "image_metadata.sqlite";

/// Environment variable that overrides the key file
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Default plaintext key file
pub const DEFAULT_API_KEY_FILE: &str = "API_key.txt";

/// Gemini API base URL
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Image-capable Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Header carrying the API key on Gemini requests
pub const X_GOOG_API_KEY: &str = "x-goog-api-key";

/// Prefix of every generated filename
pub const FILENAME_PREFIX: &str = "gemini_generated";

/// Extension of stored images
pub const IMAGE_EXTENSION: &str = "png";

/// Prompts offered on the home page
pub const SAMPLE_PROMPTS: &[&str] = &[
    "Create a picture of a nano banana dish in a fancy restaurant with a Gemini theme",
    "A futuristic city with flying cars and neon lights",
    "A magical forest with glowing mushrooms and fairy lights",
    "A space station orbiting Earth with astronauts",
    "A steampunk robot in Victorian London",
    "A cyberpunk street market in Seoul at night",
    "A floating island in the sky with waterfalls",
    "A crystal cave with bioluminescent creatures",
    "서울 경복궁에서 한복을 예쁘게 입고 셀피를 찍는 20대 남여 커플",
];

/// Max age (in seconds) for image cache entries.
pub const IMAGE_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60;

/// Cache-Control value for image responses.
pub static IMAGE_CACHE_CONTROL: LazyLock<String> =
    LazyLock::new(|| format!("private, max-age={}", IMAGE_CACHE_MAX_AGE_SECONDS));
