//! recipe-relay - HTTP gateway for generative AI recipe and image prompts
//!
//! Relays recipe suggestions and free-form prompts to an OpenAI-compatible
//! completion API and image prompts to DALL·E or fal.ai, and serves the
//! static front-end that calls them.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod providers;
pub mod server;
pub mod telemetry;
