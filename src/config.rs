use clap::Parser;
use config::{Config, Environment};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the Text2SQL backend API
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Serve canned demo data instead of calling the backend
    #[arg(long, env = "MOCK_BACKEND")]
    pub mock_backend: Option<bool>,

    /// Path of the persisted auth state file
    #[arg(long, env = "AUTH_STATE_PATH")]
    pub auth_state_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static` (vendored HTMX/Alpine + app.css).
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the Text2SQL API, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// When true the server answers from canned demo data and never
    /// touches the network.
    pub mock: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Where the `{access_token, user}` state file lives.
    pub state_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Streaming reveal pace, in milliseconds per character.
    pub reveal_speed_ms: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("backend.base_url", "http://localhost:8000")?
            .set_default("backend.mock", false)?
            .set_default("auth.state_path", ".text2sql/auth.json")?
            .set_default("chat.reveal_speed_ms", 20)?;

        // Optional YAML file: explicit path, or ./config.yaml when present.
        if let Some(path) = &cli.config {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("config").required(false));
        }

        // Environment variables (prefixed with T2S_), e.g. T2S_SERVER__PORT=8000.
        builder = builder.add_source(
            Environment::with_prefix("T2S")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags win over everything. clap's `env = ...` attributes
        // fold the unprefixed legacy env vars into the same path.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(url) = cli.backend_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(mock) = cli.mock_backend {
            builder = builder.set_override("backend.mock", mock)?;
        }
        if let Some(path) = cli.auth_state_path {
            builder = builder.set_override("auth.state_path", path)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
