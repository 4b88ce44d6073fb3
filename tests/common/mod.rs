#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ggif::{
    GgifError,
    config::{AppConfig, CliArgs, ConfigFile},
    pipeline::ConversionPipeline,
    process::{CommandOutput, CommandRunner, Invocation},
    telemetry::TelemetrySink,
    upload::{Uploader, clipboard::Clipboard},
};
use tokio_util::sync::CancellationToken;

/// Fake process table: records every call and imitates ffmpeg and gifski
/// by writing the files they would produce.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    failing: Vec<String>,
    hanging: Vec<String>,
}

impl RecordingRunner {
    pub fn failing(programs: &[&str]) -> Self {
        Self {
            failing: programs.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn hanging(programs: &[&str]) -> Self {
        Self {
            hanging: programs.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::program_name).collect()
    }

    pub fn call_to(&self, program: &str) -> Option<Invocation> {
        self.calls()
            .into_iter()
            .find(|call| call.program_name() == program)
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, GgifError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let program = invocation.program_name();
        if self.hanging.contains(&program) {
            cancel.cancelled().await;
            return Err(GgifError::Cancelled);
        }
        if self.failing.contains(&program) {
            return Ok(CommandOutput::failure(1));
        }
        match program.as_str() {
            "ffmpeg" => {
                let pattern = PathBuf::from(invocation.args.last().unwrap());
                let dir = pattern.parent().unwrap();
                for index in 1..=3 {
                    std::fs::write(dir.join(format!("frame{index:04}.png")), b"png").unwrap();
                }
            }
            "gifski" => {
                let args = invocation.arg_strings();
                let output = args.iter().position(|arg| arg == "-o").unwrap() + 1;
                std::fs::write(&args[output], b"GIF89a").unwrap();
            }
            _ => {}
        }
        Ok(CommandOutput::success())
    }
}

/// Clipboard whose contents stay observable after it moves into an uploader.
#[derive(Clone, Default)]
pub struct SharedClipboard {
    contents: Arc<Mutex<Option<String>>>,
    broken: bool,
}

impl SharedClipboard {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }
}

impl Clipboard for SharedClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), GgifError> {
        if self.broken {
            return Err(GgifError::Clipboard("no display".to_string()));
        }
        *self.contents.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

pub fn base_cli(src: &Path, scratch: &Path) -> CliArgs {
    CliArgs {
        src: Some(src.to_path_buf()),
        scratch_dir: Some(scratch.to_path_buf()),
        ..CliArgs::default()
    }
}

pub fn config_from(cli: CliArgs) -> AppConfig {
    AppConfig::resolve(cli, ConfigFile::default()).expect("resolve config")
}

pub fn build_pipeline(
    config: AppConfig,
    runner: Arc<RecordingRunner>,
    clipboard: SharedClipboard,
    telemetry: TelemetrySink,
) -> ConversionPipeline {
    let uploader = Uploader::new(runner.clone(), config.tools.clone(), Box::new(clipboard));
    ConversionPipeline::new(Arc::new(config), runner, uploader, telemetry)
}

/// Number of entries left in `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
