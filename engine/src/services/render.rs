//! Diagram rendering
//!
//! The renderer turns a text description into an image by asking the LLM for
//! Python code that uses the `diagrams` library, writing it to the work
//! directory, and executing it with the configured interpreter.
//!
//! Every session renders in its own subdirectory of the work directory, so
//! one session never runs, repairs or overwrites another's code.
//!
//! Code that fails to run is a normal outcome ([`RenderOutcome::Failed`]),
//! reported back to the agent so it can tell the user or attempt a repair.
//! Only infrastructure problems (LLM unreachable, interpreter missing,
//! unwritable work dir) are errors.

use async_trait::async_trait;
use regex::Regex;
use sdk::errors::EngineError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm::{LLMProvider, LLMResponse, Message};

/// File the generated code is written to, inside the work dir
pub const CODE_FILE: &str = "temp_generated_code.py";

/// Stem the generated code must render to; `.png` is appended by `diagrams`
pub const OUTPUT_STEM: &str = "output_diagram";

/// Stderr kept in a failure report
const MAX_ERROR_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered { artifact: PathBuf },
    Failed { error: String },
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Rendered { .. })
    }
}

#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Generate code for `description` and run it
    async fn render(&self, session: &str, description: &str) -> Result<RenderOutcome, EngineError>;

    /// Re-run the session's most recently generated code
    async fn check(&self, session: &str) -> Result<RenderOutcome, EngineError>;

    /// Ask the LLM to fix the session's current code given `error`, then run it
    async fn repair(&self, session: &str, error: &str) -> Result<RenderOutcome, EngineError>;
}

/// File-system-safe directory name for a session id
pub fn session_slug(session: &str) -> String {
    let slug: String = session
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "anonymous".to_string()
    } else {
        slug
    }
}

pub struct PythonDiagramRenderer {
    provider: Arc<dyn LLMProvider>,
    python: String,
    work_dir: PathBuf,
    timeout: Duration,
}

impl PythonDiagramRenderer {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        python: impl Into<String>,
        work_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            python: python.into(),
            work_dir: work_dir.into(),
            timeout,
        }
    }

    pub fn session_dir(&self, session: &str) -> PathBuf {
        self.work_dir.join(session_slug(session))
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, EngineError> {
        let messages = [Message::system(system), Message::user(user)];
        match self.provider.generate(&messages, &[]).await? {
            LLMResponse::FinalAnswer(answer) => Ok(answer.content),
            LLMResponse::ToolCalls { .. } => Err(EngineError::external(
                "llm",
                "expected diagram code, got a tool call",
            )),
        }
    }

    async fn write_and_run(&self, dir: &Path, code: &str) -> Result<RenderOutcome, EngineError> {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(CODE_FILE), code).await?;
        self.run(dir).await
    }

    async fn run(&self, dir: &Path) -> Result<RenderOutcome, EngineError> {
        let artifact = dir.join(format!("{}.png", OUTPUT_STEM));
        if artifact.exists() {
            tokio::fs::remove_file(&artifact).await?;
        }

        info!(python = %self.python, dir = %dir.display(), "Running diagram code");

        let child = tokio::process::Command::new(&self.python)
            .arg(CODE_FILE)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::external("render", format!("cannot start {}: {}", self.python, e))
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Diagram code timed out after {}s", self.timeout.as_secs());
                return Ok(RenderOutcome::Failed {
                    error: format!("timed out after {} seconds", self.timeout.as_secs()),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(status = %output.status, "Diagram code failed");
            return Ok(RenderOutcome::Failed {
                error: tail(stderr.trim(), MAX_ERROR_CHARS),
            });
        }

        if artifact.exists() {
            Ok(RenderOutcome::Rendered { artifact })
        } else {
            Ok(RenderOutcome::Failed {
                error: format!(
                    "code ran but did not produce {}; render with filename=\"{}\"",
                    file_name(&artifact),
                    OUTPUT_STEM
                ),
            })
        }
    }
}

#[async_trait]
impl DiagramRenderer for PythonDiagramRenderer {
    async fn render(&self, session: &str, description: &str) -> Result<RenderOutcome, EngineError> {
        let reply = self
            .complete(
                GENERATE_PROMPT,
                format!("Architecture description:\n{}", description),
            )
            .await?;
        self.write_and_run(&self.session_dir(session), &extract_code(&reply))
            .await
    }

    async fn check(&self, session: &str) -> Result<RenderOutcome, EngineError> {
        let dir = self.session_dir(session);
        if !dir.join(CODE_FILE).exists() {
            return Ok(RenderOutcome::Failed {
                error: "no diagram code has been generated yet".to_string(),
            });
        }
        self.run(&dir).await
    }

    async fn repair(&self, session: &str, error: &str) -> Result<RenderOutcome, EngineError> {
        let dir = self.session_dir(session);
        let current = match tokio::fs::read_to_string(dir.join(CODE_FILE)).await {
            Ok(code) => code,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RenderOutcome::Failed {
                    error: "no diagram code has been generated yet".to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let reply = self
            .complete(
                REPAIR_PROMPT,
                format!("Code:\n```python\n{}\n```\n\nError:\n{}", current, error),
            )
            .await?;
        self.write_and_run(&dir, &extract_code(&reply)).await
    }
}

const GENERATE_PROMPT: &str = "You write Python code with the `diagrams` library that draws \
the described cloud architecture. Use `with Diagram(..., filename=\"output_diagram\", \
show=False, outformat=\"png\")`. Include every import. Reply with one ```python code block \
and nothing else.";

const REPAIR_PROMPT: &str = "You fix Python code that uses the `diagrams` library. Keep \
`filename=\"output_diagram\"` and `show=False`. Correct the imports and any other cause of \
the error. Reply with the complete corrected program in one ```python code block and \
nothing else.";

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:python|py)?[ \t]*\r?\n(.*?)```").unwrap_or_else(|_| unreachable!())
    })
}

/// Extract the first fenced code block, or the whole reply when unfenced
pub fn extract_code(reply: &str) -> String {
    code_fence()
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| reply.replace("```", "").trim().to_string())
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        text.to_string()
    } else {
        text.chars().skip(count - max_chars).collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
