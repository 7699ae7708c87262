use crate::config::ToolConfig;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Output formats the external tools can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// PDF export of a spreadsheet (`calc_pdf_Export`)
    Pdf,
    /// Plain text export of a word-processor document
    Text,
    /// RFC 822 message extracted from an Outlook container
    Eml,
    /// Plain text rendering of an RTF message body
    RtfText,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Text | TargetFormat::RtfText => "txt",
            TargetFormat::Eml => "eml",
        }
    }
}

/// Where a conversion of `input` into `target` lands: same directory, same stem.
pub fn output_path_for(input: &Path, target: TargetFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}.{}", stem, target.extension()))
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to start {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {after:?}")]
    TimedOut { tool: String, after: Duration },

    #[error("{tool} produced no output at {}", .path.display())]
    MissingOutput { tool: String, path: PathBuf },

    #[error("Failed to write {}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a file into another format and reports where the result was written.
#[async_trait::async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, input: &Path, target: TargetFormat) -> Result<PathBuf, ConversionError>;

    /// Whether the tools needed for every target can be located.
    async fn health_check(&self) -> bool;
}

/// Converter shelling out to soffice, msgconvert and unrtf.
pub struct CommandConverter {
    tools: ToolConfig,
    timeout: Option<Duration>,
}

impl CommandConverter {
    pub fn new(tools: ToolConfig, timeout: Option<Duration>) -> Self {
        Self { tools, timeout }
    }

    fn program_for(&self, target: TargetFormat) -> &str {
        match target {
            TargetFormat::Pdf | TargetFormat::Text => &self.tools.soffice,
            TargetFormat::Eml => &self.tools.msgconvert,
            TargetFormat::RtfText => &self.tools.unrtf,
        }
    }

    fn command_for(&self, input: &Path, output: &Path, target: TargetFormat) -> Command {
        let mut command = Command::new(self.program_for(target));
        let out_dir = output.parent().unwrap_or_else(|| Path::new("."));

        match target {
            TargetFormat::Pdf => {
                command
                    .args(["--headless", "--convert-to", "pdf:calc_pdf_Export"])
                    .arg(input)
                    .arg("--outdir")
                    .arg(out_dir);
            }
            TargetFormat::Text => {
                command
                    .args(["--headless", "--convert-to", "txt:Text"])
                    .arg(input)
                    .arg("--outdir")
                    .arg(out_dir);
            }
            TargetFormat::Eml => {
                command.arg("--outfile").arg(output).arg(input);
            }
            TargetFormat::RtfText => {
                command.arg("--text").arg(input);
            }
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, tool: &str, mut command: Command) -> Result<Output, ConversionError> {
        let child = command.spawn().map_err(|source| ConversionError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

        let waited = match self.timeout {
            Some(after) => tokio::time::timeout(after, child.wait_with_output())
                .await
                .map_err(|_| ConversionError::TimedOut {
                    tool: tool.to_string(),
                    after,
                })?,
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| ConversionError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

#[async_trait::async_trait]
impl DocumentConverter for CommandConverter {
    async fn convert(&self, input: &Path, target: TargetFormat) -> Result<PathBuf, ConversionError> {
        let output_path = output_path_for(input, target);
        let tool = self.program_for(target).to_string();
        tracing::info!(
            "🔧 Converting {} -> {} with {}",
            input.display(),
            output_path.display(),
            tool
        );

        let command = self.command_for(input, &output_path, target);
        let output = self.run(&tool, command).await?;

        if !output.stderr.is_empty() {
            tracing::debug!("{} stderr: {}", tool, String::from_utf8_lossy(&output.stderr).trim());
        }

        // unrtf only writes to stdout
        if target == TargetFormat::RtfText {
            tokio::fs::write(&output_path, &output.stdout)
                .await
                .map_err(|source| ConversionError::WriteOutput {
                    path: output_path.clone(),
                    source,
                })?;
        }

        // soffice exits 0 even when it could not load the input
        if tokio::fs::metadata(&output_path).await.is_err() {
            return Err(ConversionError::MissingOutput {
                tool,
                path: output_path,
            });
        }

        Ok(output_path)
    }

    async fn health_check(&self) -> bool {
        let mut healthy = true;
        for tool in [&self.tools.soffice, &self.tools.msgconvert, &self.tools.unrtf] {
            match which::which(tool) {
                Ok(path) => tracing::debug!("Found {} at {}", tool, path.display()),
                Err(e) => {
                    tracing::warn!("⚠️  Conversion tool '{}' not found: {}", tool, e);
                    healthy = false;
                }
            }
        }
        healthy
    }
}
