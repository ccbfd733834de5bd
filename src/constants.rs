//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Narrative generation and retry constants
pub mod generation {
    /// Default number of provider calls before giving up
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Maximum delay between retries (milliseconds)
    pub const MAX_DELAY_MS: u64 = 30_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Upper bound honored for a server `Retry-After` hint (seconds)
    pub const MAX_RETRY_AFTER_SECS: u64 = 120;

    /// Model name recorded for template narratives
    pub const FALLBACK_MODEL: &str = "template";
}

/// Fact validation constants
pub mod validation {
    /// Default relative tolerance for figure comparison (percent)
    pub const DEFAULT_TOLERANCE_PCT: f64 = 2.0;

    /// Default minimum narrative length (words)
    pub const DEFAULT_MIN_NARRATIVE_WORDS: usize = 5;

    /// Absolute tolerance used when the expected value is zero
    pub const ZERO_ABS_TOLERANCE: f64 = 1e-6;

    /// Words inspected before a figure when matching metric keywords
    pub const CONTEXT_WORDS_BEFORE: usize = 5;

    /// Words inspected after a figure when matching metric keywords
    pub const CONTEXT_WORDS_AFTER: usize = 3;

    /// Integers up to this value are treated as ordinals when unmatched
    pub const SMALL_ORDINAL_MAX: f64 = 12.0;

    /// Plausible calendar years are treated as dates when unmatched
    pub const YEAR_MIN: f64 = 1900.0;
    pub const YEAR_MAX: f64 = 2100.0;

    /// Weight applied to keywords that follow the figure
    pub const TRAILING_KEYWORD_WEIGHT: f64 = 0.9;
}

/// Prompt construction constants
pub mod prompt {
    /// Default prompt budget (characters)
    pub const DEFAULT_MAX_CHARS: usize = 12_000;

    /// Smallest budget a configuration may request
    pub const MIN_MAX_CHARS: usize = 500;

    /// Marker appended to shortened sections
    pub const ELLIPSIS: &str = "…";
}

/// Network constants
pub mod network {
    /// Default provider request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Maximum tokens requested for one narrative
    pub const MAX_OUTPUT_TOKENS: u32 = 4096;

    /// Default Gemini REST endpoint
    pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default OpenAI-compatible endpoint
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
}

/// Progress milestones reported to observers (percent)
pub mod progress {
    pub const QUEUED: i32 = 0;
    pub const STARTED: i32 = 5;
    pub const PROMPT_BUILT: i32 = 20;
    pub const GENERATING: i32 = 40;
    pub const VALIDATING: i32 = 75;
    pub const ASSEMBLING: i32 = 90;
    pub const SAVING: i32 = 95;
    pub const COMPLETE: i32 = 100;
    /// Any negative value marks a terminal failure
    pub const FAILED: i32 = -1;
}

/// Export layout constants
pub mod output {
    /// Default report directory
    pub const DEFAULT_DIR: &str = "reports";

    pub const STUDENT_DIR: &str = "student_reports";
    pub const FINANCE_DIR: &str = "finance_reports";
    pub const GENERAL_DIR: &str = "general_reports";
    pub const METADATA_DIR: &str = "metadata";

    /// Timestamp format embedded in report file names
    pub const FILENAME_TIMESTAMP: &str = "%Y%m%d_%H%M%S";
}

/// Record ingestion constants
pub mod ingest {
    /// Timeout for fetching a remote CSV source
    pub const FETCH_TIMEOUT_SECS: u64 = 15;

    /// Dataset folders aggregated when none are selected
    pub const DATASET_FOLDERS: &[&str] = &["students", "finance", "akreditasi"];

    pub const SOURCE_TYPE_COLUMN: &str = "source_type";
    pub const SOURCE_FILE_COLUMN: &str = "source_file";
    pub const SOURCE_TYPE_LOCAL: &str = "local";
    pub const SOURCE_TYPE_REMOTE: &str = "api";
}
