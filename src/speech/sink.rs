use crate::config::SpeechConfig;
use crate::error::SpeechError;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Destination for spoken feedback
pub trait SpeechSink: Send {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;
}

/// Builds a sink for each new dispatcher
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn SpeechSink> + Send + Sync>;

/// Writes feedback to the log instead of an audio device
#[derive(Debug, Default)]
pub struct LogSpeechSink;

impl SpeechSink for LogSpeechSink {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        info!(target: "fitcam::speech", "{}", text);
        Ok(())
    }
}

/// Runs an external text-to-speech program with the text as its last argument
#[derive(Debug, Clone)]
pub struct CommandSpeechSink {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechSink {
    /// Parse a whitespace-separated command line such as `espeak -s 160`
    pub fn new(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SpeechSink for CommandSpeechSink {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| SpeechError::Sink {
                details: format!("failed to run {}: {}", self.program, e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Sink {
                details: format!("{} exited with {}", self.program, status),
            })
        }
    }
}

/// Build the sink described by the speech configuration
pub fn sink_from_config(config: &SpeechConfig) -> Box<dyn SpeechSink> {
    match config.command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => match CommandSpeechSink::new(command) {
            Some(sink) => {
                info!("Speaking feedback through {}", sink.program());
                Box::new(sink)
            }
            None => {
                warn!("Unusable speech command {:?}, logging feedback instead", command);
                Box::new(LogSpeechSink)
            }
        },
        _ => Box::new(LogSpeechSink),
    }
}
