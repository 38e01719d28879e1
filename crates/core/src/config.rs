use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub pipeline: PipelineConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SIGNAL_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SIGNAL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            pipeline: PipelineConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  cohorts:     k={}, seed={}, max_iterations={}",
            self.pipeline.cohort_k,
            self.pipeline.cohort_seed,
            self.pipeline.cohort_max_iterations
        );
        tracing::info!(
            "  anomaly:     min_days={}, window={}, z_threshold={}",
            self.pipeline.anomaly_min_days,
            self.pipeline.anomaly_window,
            self.pipeline.anomaly_z_threshold
        );
        tracing::info!(
            "  misuse:      feature={}, min_count={}",
            self.pipeline.misuse_feature,
            self.pipeline.misuse_min_count
        );
        tracing::info!("  sentiment:   noise_threshold={}", self.pipeline.sentiment_noise_threshold);
        tracing::info!("  ollama:      url={}, model={}", self.ollama.url, self.ollama.embedding_model);
        tracing::info!("  embedding:   provider={}", self.embedding.provider);
    }
}

// ── Pipeline ──────────────────────────────────────────────────

/// Tunables for the insight pipeline. Defaults are the production
/// values; the thresholds are empirical, not derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Requested number of cohorts (clamped to the number of active users).
    pub cohort_k: usize,
    pub cohort_seed: u64,
    pub cohort_max_iterations: usize,
    /// Fixed number of k-means restarts; `None` picks automatically.
    pub cohort_n_init: Option<usize>,
    /// Minimum distinct active days before a user's trend is scored.
    pub anomaly_min_days: usize,
    /// Trailing window length for the rolling mean and std.
    pub anomaly_window: usize,
    /// z-scores strictly below this emit a churn-risk finding.
    pub anomaly_z_threshold: f64,
    /// Value of `metadata.feature` counted by the misuse rule.
    pub misuse_feature: String,
    pub misuse_min_count: u64,
    /// Embedding polarity magnitudes below this use the keyword fallback.
    pub sentiment_noise_threshold: f64,
    /// Run the three detectors on the rayon pool instead of sequentially.
    pub parallel_detectors: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cohort_k: 3,
            cohort_seed: 42,
            cohort_max_iterations: 300,
            cohort_n_init: None,
            anomaly_min_days: 3,
            anomaly_window: 3,
            anomaly_z_threshold: -1.0,
            misuse_feature: "export".to_string(),
            misuse_min_count: 3,
            sentiment_noise_threshold: 0.05,
            parallel_detectors: false,
        }
    }
}

impl PipelineConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            cohort_k: profiled_env_parse(p, "COHORT_K", d.cohort_k),
            cohort_seed: profiled_env_parse(p, "COHORT_SEED", d.cohort_seed),
            cohort_max_iterations: profiled_env_parse(
                p,
                "COHORT_MAX_ITERATIONS",
                d.cohort_max_iterations,
            ),
            cohort_n_init: profiled_env_opt(p, "COHORT_N_INIT")
                .filter(|v| v != "auto")
                .and_then(|v| v.parse().ok()),
            anomaly_min_days: profiled_env_parse(p, "ANOMALY_MIN_DAYS", d.anomaly_min_days),
            anomaly_window: profiled_env_parse(p, "ANOMALY_WINDOW", d.anomaly_window),
            anomaly_z_threshold: profiled_env_parse(
                p,
                "ANOMALY_Z_THRESHOLD",
                d.anomaly_z_threshold,
            ),
            misuse_feature: profiled_env_or(p, "MISUSE_FEATURE", &d.misuse_feature),
            misuse_min_count: profiled_env_parse(p, "MISUSE_MIN_COUNT", d.misuse_min_count),
            sentiment_noise_threshold: profiled_env_parse(
                p,
                "SENTIMENT_NOISE_THRESHOLD",
                d.sentiment_noise_threshold,
            ),
            parallel_detectors: profiled_env_or(p, "PARALLEL_DETECTORS", "false") == "true",
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            embedding_model: profiled_env_or(p, "OLLAMA_EMBEDDING_MODEL", "all-minilm"),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama", "seeded"
    pub provider: String,
    pub dimensions: usize,
    /// Seed for the deterministic fallback encoder.
    pub seed: u64,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "ollama"),
            dimensions: profiled_env_parse(p, "EMBEDDING_DIMENSIONS", 384),
            seed: profiled_env_parse(p, "EMBEDDING_SEED", 42),
        }
    }
}
