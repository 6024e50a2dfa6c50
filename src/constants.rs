/// Constants used throughout choucroute
/// Defaults here are the values used when neither the config file nor the CLI sets them

/// Image extensions picked up by the scanner (compared lowercase, without the dot)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg",
    "jpeg",
    "png",
    "gif",
    "bmp",
    "webp",
    "tiff",
    "tif",
];

/// Extensions whose container carries an EXIF block we know how to rewrite
pub const EXIF_WRITABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default vision model
pub const DEFAULT_MODEL: &str = "gemma3:4b";

/// Default number of keywords requested per image
pub const DEFAULT_TAG_COUNT: usize = 8;

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "choucroute-cosmique";

/// Default category vocabulary file
pub const DEFAULT_CATEGORIES_FILE: &str = "categories.txt";

/// Default worker pool size
pub const DEFAULT_WORKERS: usize = 4;

/// Default wait for a single LLM call, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Pause between the first LLM attempt and its single retry
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Sampling temperature sent with every request
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Keyword used to pad a response that yields fewer keywords than requested
pub const FALLBACK_KEYWORD: &str = "Divers";

/// Reserved category used when the model's first keyword is not in the vocabulary.
/// When the vocabulary does not list it, its first entry is used instead.
pub const RESERVED_FALLBACK_CATEGORY: &str = "Autres";

/// Maximum number of extra tags appended to a filename
pub const DEFAULT_MAX_TAGS_IN_FILENAME: usize = 5;

/// Maximum length (in characters) of one sanitized filename segment
pub const MAX_SEGMENT_LEN: usize = 200;

/// Separator between keywords in the EXIF ImageDescription field
pub const METADATA_TAG_SEPARATOR: &str = "; ";

/// Folder used when no category survives sanitization
pub const UNCATEGORIZED_DIR: &str = "Sans_categorie";

/// Byte budget for a generated filename, kept under common filesystem limits
pub const MAX_FILENAME_BYTES: usize = 240;
