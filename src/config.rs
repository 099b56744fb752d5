use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::error::ConfigError;
use crate::generate::{
    DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_TTS_MODEL, DEFAULT_VOICE, GeminiSettings,
};

#[derive(Parser, Debug)]
#[command(name = "scene-player")]
#[command(about = "Narrated health-education slideshow with AI-generated scenes", long_about = None)]
pub struct Args {
    /// Gemini API key (falls back to GEMINI_API_KEY, then API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of the generative language API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Model used for scene illustrations
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL)]
    pub image_model: String,

    /// Model used for narration
    #[arg(long, default_value = DEFAULT_TTS_MODEL)]
    pub tts_model: String,

    /// Prebuilt narration voice
    #[arg(long, default_value = DEFAULT_VOICE)]
    pub voice: String,

    /// Per-request timeout for generation calls, in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Start with autoplay on (skips the welcome screen)
    #[arg(long)]
    pub autoplay: bool,

    /// Scene to open first (1-based)
    #[arg(long)]
    pub scene: Option<usize>,

    /// Log file (defaults to ~/.config/scene-player/scene-player.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("scene-player")
}

pub struct Config {
    pub gemini: GeminiSettings,
    pub autoplay: bool,
    pub start_index: Option<usize>,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_args(args: Args, scene_count: usize) -> Result<Self, ConfigError> {
        let api_key = args
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let start_index = match args.scene {
            Some(n) if n == 0 || n > scene_count => {
                return Err(ConfigError::SceneOutOfRange {
                    requested: n,
                    count: scene_count,
                });
            }
            Some(n) => Some(n - 1),
            None => None,
        };

        Ok(Config {
            gemini: GeminiSettings {
                api_key,
                api_base: args.api_base.trim_end_matches('/').to_string(),
                image_model: args.image_model,
                tts_model: args.tts_model,
                voice: args.voice,
                timeout: Duration::from_secs(args.timeout_secs.max(1)),
            },
            autoplay: args.autoplay,
            start_index,
            log_file: args
                .log_file
                .unwrap_or_else(|| config_dir().join("scene-player.log")),
        })
    }
}
