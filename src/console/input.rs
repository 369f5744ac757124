use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::error::Result;

/// What a single read from the terminal produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl+C while waiting for input.
    Interrupted,
    /// Ctrl+D or end of the input stream.
    Eof,
}

/// A line-oriented input with recallable history.
pub trait LineSource {
    /// Reads one line. `history` is the list offered for up/down recall, oldest first.
    fn read_line(&mut self, prompt: &str, history: &[String]) -> Result<ReadOutcome>;
}

/// Terminal input backed by rustyline.
pub struct EditorInput {
    editor: DefaultEditor,
    loaded: Vec<String>,
}

impl EditorInput {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            loaded: Vec::new(),
        })
    }

    fn sync_history(&mut self, history: &[String]) -> Result<()> {
        if self.loaded == history {
            return Ok(());
        }
        self.editor.clear_history()?;
        for entry in history {
            self.editor.add_history_entry(entry.as_str())?;
        }
        self.loaded = history.to_vec();
        Ok(())
    }
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str, history: &[String]) -> Result<ReadOutcome> {
        self.sync_history(history)?;
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

/// Replays a fixed script of reads; used for non-interactive runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    reads: std::collections::VecDeque<ReadOutcome>,
    prompts: Vec<String>,
    offered_history: Vec<Vec<String>>,
}

impl ScriptedInput {
    pub fn new<I>(reads: I) -> Self
    where
        I: IntoIterator<Item = ReadOutcome>,
    {
        Self {
            reads: reads.into_iter().collect(),
            prompts: Vec::new(),
            offered_history: Vec::new(),
        }
    }

    /// Script made of plain lines.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(|l| ReadOutcome::Line(l.into())))
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// The history list offered on each read, in order.
    pub fn offered_history(&self) -> &[Vec<String>] {
        &self.offered_history
    }

    pub fn remaining(&self) -> usize {
        self.reads.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str, history: &[String]) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        self.offered_history.push(history.to_vec());
        Ok(self.reads.pop_front().unwrap_or(ReadOutcome::Eof))
    }
}
