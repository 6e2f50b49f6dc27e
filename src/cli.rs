//! Command-line interface for recipe-relay
//!
//! Provides argument parsing and subcommand handling for the recipe-relay binary.

use clap::{Parser, Subcommand};

/// HTTP gateway relaying recipe and image prompts to generative AI services
#[derive(Parser)]
#[command(name = "recipe-relay")]
#[command(version)]
#[command(about = "HTTP gateway relaying recipe and image prompts to generative AI services")]
#[command(
    long_about = "recipe-relay serves a static front-end and relays its recipe, free-form \
    and image prompts to an OpenAI-compatible API and to fal.ai. API keys are read from \
    OPENAI_API_KEY and FAL_API_KEY (a .env file in the working directory is honoured)."
)]
pub struct Cli {
    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# recipe-relay Configuration
# ==========================
#
# Every key below is optional; the values shown are the defaults.
# API keys are NOT configured here. Set OPENAI_API_KEY and FAL_API_KEY in the
# environment or in a .env file next to this one.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"
port = 8000

# ─────────────────────────────────────────────────────────────────────────────
# OPENAI-COMPATIBLE API (text completion + DALL·E)
# ─────────────────────────────────────────────────────────────────────────────

[openai]
base_url = "https://api.openai.com/v1"
chat_model = "gpt-3.5-turbo"

# Sampling used by POST /submit. GET /api/gpt always uses 0.7 / 150.
temperature = 0.8
max_tokens = 100

# Image generation for GET /api/dalle
image_model = "dall-e-3"
image_size = "1024x1024"
# Set quality/style to "" for models that do not accept them (dall-e-2)
image_quality = "standard"
image_style = "vivid"

# ─────────────────────────────────────────────────────────────────────────────
# FAL.AI QUEUE (GET /api/fal, GET /api/falfast)
# ─────────────────────────────────────────────────────────────────────────────

[fal]
base_url = "https://queue.fal.run"
# Delay between job status polls, in milliseconds (1-60000)
poll_interval_ms = 500

# ─────────────────────────────────────────────────────────────────────────────
# STATIC FRONT-END
# ─────────────────────────────────────────────────────────────────────────────

[static_files]
# Directory unmatched request paths are served from
root = "."
# GET / redirects here
landing_page = "/public/scene3.html"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
