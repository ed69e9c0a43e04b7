use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mind_lantern::api::{self, AppState, SecurityConfig};
use mind_lantern::audio::{CueSink, ToneSynth};
use mind_lantern::config::AppConfig;
use mind_lantern::counsel::{ChatService, GeminiClient};
use mind_lantern::models::DurationPreset;
use mind_lantern::{console, db};

#[derive(Parser)]
#[command(name = "lantern")]
#[command(about = "마음의 등불: meditation timer, 108 bows and dharma counsel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API (default from config, then 17020)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a meditation countdown in the terminal
    Meditate {
        /// Session length in minutes: 5, 10, 15 or 30
        #[arg(short, long)]
        minutes: Option<u32>,
    },
    /// Count 108 bows
    Bow,
    /// Show the quote of the day
    Quote,
    /// List scriptures, or print one by id
    Sutra { id: Option<String> },
    /// Talk with the counselor
    Chat,
    /// Show the configuration, saving any values given
    Config {
        /// Port for the HTTP API
        #[arg(long)]
        port: Option<u16>,
        /// Session length used until preferences are saved: 5, 10, 15 or 30
        #[arg(long)]
        minutes: Option<u32>,
        /// Gemini model name
        #[arg(long)]
        model: Option<String>,
    },
}

/// Initialize tracing with output to stderr (interactive commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mind_lantern=info,tower_http=info".into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_database(config: &AppConfig) -> anyhow::Result<db::Database> {
    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    db.seed_preferences(config.default_preset())?;
    Ok(db)
}

fn chat_service(config: &AppConfig) -> Option<Arc<dyn ChatService>> {
    match &config.api_key {
        Some(key) => {
            let client: Arc<dyn ChatService> =
                Arc::new(GeminiClient::new(key.clone(), config.gemini_model.clone()));
            Some(client)
        }
        None => {
            tracing::warn!("GEMINI_API_KEY is not set; counsel and quotes use fixed replies");
            None
        }
    }
}

fn audio(config: &AppConfig) -> ToneSynth {
    match &config.ambience_path {
        Some(path) => ToneSynth::new().with_ambience(path.clone()),
        None => ToneSynth::new(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let config = AppConfig::load();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let db = open_database(&config)?;
            let cues: Arc<dyn CueSink> = Arc::new(audio(&config));
            let state = AppState::new(db, cues, chat_service(&config))?;

            let security = SecurityConfig::from_env();
            if let Some(limiter) = &security.rate_limiter {
                limiter.spawn_cleanup();
            }
            let app = api::create_router_with_config(state, security);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Mind Lantern listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Meditate { minutes } => {
            let db = open_database(&config)?;
            let prefs = db.get_preferences()?;
            let preset = match minutes {
                Some(m) => DurationPreset::from_minutes(m).ok_or_else(|| {
                    anyhow::anyhow!("{} minutes is not a preset (5, 10, 15 or 30)", m)
                })?,
                None => prefs.default_preset,
            };
            let synth = audio(&config);
            synth.set_volume(prefs.gain());
            console::meditate(preset, Arc::new(synth), &db).await?;
        }
        Commands::Bow => {
            let db = open_database(&config)?;
            let synth = ToneSynth::new();
            synth.set_volume(db.get_preferences()?.gain());
            console::bow(Arc::new(synth), db).await?;
        }
        Commands::Quote => {
            let db = open_database(&config)?;
            console::quote(db, chat_service(&config)).await?;
        }
        Commands::Sutra { id } => {
            console::sutra(id.as_deref())?;
        }
        Commands::Chat => {
            console::chat(chat_service(&config)).await?;
        }
        Commands::Config {
            port,
            minutes,
            model,
        } => {
            let mut config = config;
            let changed = port.is_some() || minutes.is_some() || model.is_some();
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(minutes) = minutes {
                DurationPreset::from_minutes(minutes).ok_or_else(|| {
                    anyhow::anyhow!("{} minutes is not a preset (5, 10, 15 or 30)", minutes)
                })?;
                config.default_minutes = minutes;
            }
            if let Some(model) = model {
                config.gemini_model = model;
            }
            if changed {
                config.save()?;
                tracing::info!("Saved configuration");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
