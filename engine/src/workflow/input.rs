//! Sources of user input for [`Workflow::run`](super::Workflow::run)

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::collections::VecDeque;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[async_trait]
pub trait InputSource: Send {
    /// Next line of input, or `None` once the source is exhausted
    async fn next_line(&mut self) -> Result<Option<String>, EngineError>;
}

/// Line-oriented reader, e.g. stdin
pub struct LineInput<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> InputSource for LineInput<R> {
    async fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.lines.next_line().await?)
    }
}

/// Fixed script of lines
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.lines.pop_front())
    }
}
