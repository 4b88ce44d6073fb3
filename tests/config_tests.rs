use std::{path::PathBuf, time::Duration};

use clap::{CommandFactory, FromArgMatches};
use ggif::{
    GgifError,
    config::{AppConfig, CliArgs, ConfigFile, LogLevel, PipelineMode},
    upload::Store,
};

fn base_cli() -> CliArgs {
    CliArgs {
        src: Some(PathBuf::from("/videos")),
        ..CliArgs::default()
    }
}

#[test]
fn config_resolves_defaults() {
    let config = AppConfig::resolve(base_cli(), ConfigFile::default()).expect("defaults");
    assert_eq!(config.log_level, LogLevel::Error);
    assert_eq!(config.encoder.quality, 90);
    assert_eq!(config.encoder.frame_rate, 20);
    assert_eq!(config.encoder.width, 480);
    assert_eq!(config.mode, PipelineMode::Convert);
    assert!(!config.watch);
    assert!(config.buckets.is_empty());
    assert_eq!(config.dist, None);
    assert_eq!(config.output_dir(), PathBuf::from("/videos"));
    assert_eq!(config.command_timeout, None);
    assert_eq!(config.tools.gifski, PathBuf::from("gifski"));
}

#[test]
fn flags_override_file_which_overrides_defaults() {
    let file = ConfigFile::parse(
        r#"{
            "width": 800,
            "frames": 15,
            "quality": 60,
            "src": "/from-file",
            "dist": "/gifs",
            "gcp_bucket": "file-bucket",
            "log": "info"
        }"#,
    )
    .expect("parse");
    let cli = CliArgs {
        width: Some(320),
        gcp_bucket: Some("flag-bucket".into()),
        ..CliArgs::default()
    };

    let config = AppConfig::resolve(cli, file).expect("resolve");

    assert_eq!(config.encoder.width, 320);
    assert_eq!(config.encoder.frame_rate, 15);
    assert_eq!(config.encoder.quality, 60);
    assert_eq!(config.src, PathBuf::from("/from-file"));
    assert_eq!(config.output_dir(), PathBuf::from("/gifs"));
    assert_eq!(config.buckets.bucket(Store::Gcs), Some("flag-bucket"));
    assert_eq!(config.buckets.bucket(Store::S3), None);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn legacy_keys_are_accepted() {
    let file = ConfigFile::parse(r#"{"bucket": "legacy", "log_level": "DEBUG"}"#).expect("parse");
    let config = AppConfig::resolve(base_cli(), file).expect("resolve");
    assert_eq!(config.buckets.gcs.as_deref(), Some("legacy"));
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = ConfigFile::parse(r#"{"widht": 400}"#).expect_err("typo should fail");
    assert!(matches!(err, GgifError::Config(_)));
}

#[test]
fn log_level_names() {
    assert_eq!("CRITICAL".parse::<LogLevel>().unwrap(), LogLevel::Error);
    assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("Notice".parse::<LogLevel>().unwrap(), LogLevel::Info);
    assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    assert_eq!(LogLevel::Warn.as_filter(), "warn");
}

#[test]
fn invalid_log_level_is_fatal() {
    let cli = CliArgs {
        log: Some("chatty".into()),
        ..base_cli()
    };
    let err = AppConfig::resolve(cli, ConfigFile::default()).expect_err("bad level");
    assert!(err.is_fatal());
    assert!(format!("{err}").contains("invalid log level"));
}

#[test]
fn encoder_bounds_are_validated() {
    for (quality, frames, width) in [(0, 10, 100), (101, 10, 100), (50, 0, 100), (50, 10, 0)] {
        let cli = CliArgs {
            quality: Some(quality),
            frames: Some(frames),
            width: Some(width),
            ..base_cli()
        };
        let err = AppConfig::resolve(cli, ConfigFile::default()).expect_err("out of range");
        assert!(matches!(err, GgifError::Config(_)));
    }
}

#[test]
fn blank_values_count_as_unset() {
    let file = ConfigFile::parse(r#"{"s3_bucket": "  ", "dist": ""}"#).expect("parse");
    let config = AppConfig::resolve(base_cli(), file).expect("resolve");
    assert!(config.buckets.is_empty());
    assert_eq!(config.dist, None);
}

#[test]
fn file_enables_modes_and_tools() {
    let file = ConfigFile::parse(
        r#"{
            "watch": true,
            "upload_only": true,
            "command_timeout_secs": 30,
            "tools": {"ffmpeg": "/opt/bin/ffmpeg"}
        }"#,
    )
    .expect("parse");
    let config = AppConfig::resolve(base_cli(), file).expect("resolve");
    assert!(config.watch);
    assert_eq!(config.mode, PipelineMode::UploadOnly);
    assert_eq!(config.command_timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.tools.ffmpeg, PathBuf::from("/opt/bin/ffmpeg"));
    assert_eq!(config.tools.aws, PathBuf::from("aws"));
}

/// Parses `args` with every `env` fallback switched off, so the caller's
/// `GGIF_*` variables cannot leak into the result.
fn parse_isolated(args: &[&str]) -> CliArgs {
    let matches = CliArgs::command()
        .mut_args(|arg| arg.env(None::<&'static str>))
        .try_get_matches_from(args.iter().copied())
        .expect("parse args");
    CliArgs::from_arg_matches(&matches).expect("derive args")
}

#[test]
fn command_line_parses() {
    let cli = parse_isolated(&[
        "ggif",
        "--watch",
        "--gcp-bucket",
        "clips",
        "--quality",
        "70",
        "recording.mov",
    ]);
    assert!(cli.watch);
    assert_eq!(cli.gcp_bucket.as_deref(), Some("clips"));
    assert_eq!(cli.quality, Some(70));
    assert_eq!(cli.video, Some(PathBuf::from("recording.mov")));
    assert_eq!(cli.src, None);
    assert_eq!(cli.dist, None);
    assert_eq!(cli.s3_bucket, None);
    assert_eq!(cli.log, None);
    assert_eq!(cli.load, None);
}

#[test]
fn explicit_empty_video_is_kept() {
    let cli = CliArgs {
        video: Some(PathBuf::new()),
        ..base_cli()
    };

    let config = AppConfig::resolve(cli, ConfigFile::default()).expect("resolve");

    assert_eq!(config.input, Some(PathBuf::new()));
}

#[tokio::test]
async fn load_reads_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ggif.json");
    std::fs::write(&path, r#"{"s3_bucket": "from-disk", "frames": 8}"#).unwrap();
    let cli = CliArgs {
        load: Some(path),
        ..base_cli()
    };

    let config = AppConfig::load(cli).await.expect("load");

    assert_eq!(config.buckets.bucket(Store::S3), Some("from-disk"));
    assert_eq!(config.encoder.frame_rate, 8);
}

#[tokio::test]
async fn load_rejects_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let cli = CliArgs {
        load: Some(dir.path().join("absent.json")),
        ..base_cli()
    };

    let err = AppConfig::load(cli).await.expect_err("missing file");

    assert!(matches!(err, GgifError::Config(_)));
}
