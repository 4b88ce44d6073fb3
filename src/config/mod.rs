//! Configuration loading and validation utilities.
//!
//! Values are merged in three layers: built-in defaults, the JSON config file
//! (`--load` or `~/.ggif.json`), and command-line flags, with flags winning.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use serde::Deserialize;
use tokio::fs;
use tracing::instrument;

use crate::{GgifError, upload::Store};

/// File name looked up in the home directory when `--load` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".ggif.json";

const DEFAULT_WIDTH: u32 = 480;
const DEFAULT_FRAME_RATE: u32 = 20;
const DEFAULT_QUALITY: u8 = 90;

/// Command-line arguments used to bootstrap the runtime.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "ggif",
    author,
    version,
    about = "Convert movies to gifs and upload them"
)]
pub struct CliArgs {
    /// Video to convert. Defaults to the newest video in the source folder.
    #[arg(value_name = "VIDEO")]
    pub video: Option<PathBuf>,
    /// Log level for output (critical, error, warning, notice, info, debug).
    #[arg(long = "log", value_name = "LEVEL", env = "GGIF_LOG")]
    pub log: Option<String>,
    /// Source folder for movie files.
    #[arg(long, value_name = "DIR", env = "GGIF_SRC")]
    pub src: Option<PathBuf>,
    /// Destination folder for generated gifs. Defaults to the source folder.
    #[arg(long, value_name = "DIR", env = "GGIF_DIST")]
    pub dist: Option<PathBuf>,
    /// Google Cloud Storage bucket name.
    #[arg(long, value_name = "BUCKET", env = "GGIF_GCP_BUCKET")]
    pub gcp_bucket: Option<String>,
    /// AWS S3 bucket name.
    #[arg(long, value_name = "BUCKET", env = "GGIF_S3_BUCKET")]
    pub s3_bucket: Option<String>,
    /// Output width in pixels.
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,
    /// Frames per second of the generated gif.
    #[arg(long, value_name = "FPS")]
    pub frames: Option<u32>,
    /// Encoder quality, 1-100.
    #[arg(long, value_name = "QUALITY")]
    pub quality: Option<u8>,
    /// Watch the source folder for new files.
    #[arg(long)]
    pub watch: bool,
    /// Upload the video itself instead of converting it.
    #[arg(long)]
    pub upload_only: bool,
    /// Location and file name of the configuration file.
    #[arg(long, value_name = "PATH", env = "GGIF_CONFIG")]
    pub load: Option<PathBuf>,
    /// Parent folder for per-job frame directories.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
    /// Kill external tools that run longer than this.
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,
}

/// Shape of the JSON configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub width: Option<u32>,
    pub frames: Option<u32>,
    pub quality: Option<u8>,
    pub src: Option<PathBuf>,
    pub dist: Option<PathBuf>,
    #[serde(alias = "bucket")]
    pub gcp_bucket: Option<String>,
    pub s3_bucket: Option<String>,
    #[serde(alias = "log_level")]
    pub log: Option<String>,
    pub watch: Option<bool>,
    pub upload_only: Option<bool>,
    pub scratch_dir: Option<PathBuf>,
    pub command_timeout_secs: Option<u64>,
    pub tools: ToolPaths,
}

impl ConfigFile {
    pub fn parse(raw: &str) -> Result<Self, GgifError> {
        serde_json::from_str(raw)
            .map_err(|err| GgifError::Config(format!("invalid config document: {err}")))
    }
}

/// Executables invoked by the pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub gifski: PathBuf,
    pub gsutil: PathBuf,
    pub aws: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            gifski: PathBuf::from("gifski"),
            gsutil: PathBuf::from("gsutil"),
            aws: PathBuf::from("aws"),
        }
    }
}

/// Verbosity accepted by `--log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = GgifError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" | "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warn),
            "notice" | "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(GgifError::Config(format!("invalid log level '{other}'"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

/// Encoder parameters handed to gifski.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub quality: u8,
    pub frame_rate: u32,
    pub width: u32,
}

/// Bucket names per target store; `None` disables that store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub gcs: Option<String>,
    pub s3: Option<String>,
}

impl Buckets {
    pub fn bucket(&self, store: Store) -> Option<&str> {
        match store {
            Store::Gcs => self.gcs.as_deref(),
            Store::S3 => self.s3.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gcs.is_none() && self.s3.is_none()
    }
}

/// What the pipeline does with each input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Extract frames, encode a gif, upload the gif.
    #[default]
    Convert,
    /// Upload the input file untouched.
    UploadOnly,
}

/// Fully merged configuration set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub input: Option<PathBuf>,
    pub log_level: LogLevel,
    pub src: PathBuf,
    pub dist: Option<PathBuf>,
    pub buckets: Buckets,
    pub encoder: EncoderSettings,
    pub watch: bool,
    pub mode: PipelineMode,
    pub scratch_root: PathBuf,
    pub command_timeout: Option<Duration>,
    pub tools: ToolPaths,
}

impl AppConfig {
    /// Reads the config file named by `--load` (or `~/.ggif.json` when it
    /// exists) and merges it with the command line.
    #[instrument(skip_all)]
    pub async fn load(cli: CliArgs) -> Result<Self, GgifError> {
        let file = match cli.load.clone().or_else(default_config_path) {
            Some(path) => {
                let raw = fs::read_to_string(&path).await.map_err(|err| {
                    GgifError::Config(format!("failed to read {}: {err}", path.display()))
                })?;
                ConfigFile::parse(&raw)?
            }
            None => ConfigFile::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merges flags over file values over defaults and validates the result.
    pub fn resolve(cli: CliArgs, file: ConfigFile) -> Result<Self, GgifError> {
        let log_level = match cli.log.or(file.log) {
            Some(level) => level.parse()?,
            None => LogLevel::default(),
        };

        let src = match non_empty_path(cli.src).or(non_empty_path(file.src)) {
            Some(src) => src,
            None => std::env::current_dir().map_err(|err| {
                GgifError::Config(format!("cannot determine current directory: {err}"))
            })?,
        };

        let encoder = EncoderSettings {
            quality: cli.quality.or(file.quality).unwrap_or(DEFAULT_QUALITY),
            frame_rate: cli.frames.or(file.frames).unwrap_or(DEFAULT_FRAME_RATE),
            width: cli.width.or(file.width).unwrap_or(DEFAULT_WIDTH),
        };
        if !(1..=100).contains(&encoder.quality) {
            return Err(GgifError::Config(format!(
                "quality {} outside 1-100",
                encoder.quality
            )));
        }
        if encoder.frame_rate == 0 {
            return Err(GgifError::Config(
                "frame rate must be positive".to_string(),
            ));
        }
        if encoder.width == 0 {
            return Err(GgifError::Config("width must be positive".to_string()));
        }

        let upload_only = cli.upload_only || file.upload_only.unwrap_or(false);

        Ok(Self {
            input: cli.video,
            log_level,
            src,
            dist: non_empty_path(cli.dist).or(non_empty_path(file.dist)),
            buckets: Buckets {
                gcs: non_empty(cli.gcp_bucket).or(non_empty(file.gcp_bucket)),
                s3: non_empty(cli.s3_bucket).or(non_empty(file.s3_bucket)),
            },
            encoder,
            watch: cli.watch || file.watch.unwrap_or(false),
            mode: if upload_only {
                PipelineMode::UploadOnly
            } else {
                PipelineMode::Convert
            },
            scratch_root: non_empty_path(cli.scratch_dir)
                .or(non_empty_path(file.scratch_dir))
                .unwrap_or_else(std::env::temp_dir),
            command_timeout: cli
                .command_timeout
                .or(file.command_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            tools: file.tools,
        })
    }

    /// Folder receiving generated artifacts: `dist`, else `src`.
    pub fn output_dir(&self) -> &Path {
        self.dist.as_deref().unwrap_or(&self.src)
    }
}

/// `~/.ggif.json`, when present.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.is_file())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|path| !path.as_os_str().is_empty())
}
