//! Per-client command loop.
//!
//! A session reads lines from its client, gathers continuation lines while a
//! value is unfinished, and dispatches each complete command through the
//! [`CommandTable`]. Failures are reported to the client as `error` events
//! and never end the session; only end of input, a read failure, a dead
//! client or an exit request do.

mod control;
mod factory;
mod reader;
mod sink;
mod tokenizer;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use linebridge_schema::{
    CommandTable, EventArgument, EventSet, EventSignature, Native, Parameter, Targets, decode,
};
use thiserror::Error;
use tracing::{debug, warn};

pub use self::control::SessionControl;
pub use self::factory::{SessionFactory, SessionWiring};
pub use self::sink::EventSink;
pub use self::tokenizer::SyntaxError;

pub(crate) use self::reader::LineReader;
use self::tokenizer::{TokenizeError, tokenize};

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = "... ";

/// Failures that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Client input could not be read.
    #[error("failed to read client input: {0}")]
    Read(#[source] io::Error),
    /// The client stopped accepting output.
    #[error("failed to write to client: {0}")]
    Write(#[source] io::Error),
}

/// Events the session itself emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A command could not be evaluated.
    Error {
        /// Reason, usually followed by the offending input.
        message: String,
    },
}

impl EventSet for SessionEvent {
    fn signatures() -> Vec<EventSignature> {
        vec![EventSignature::new("error").parameter::<String>("message")]
    }

    fn name(&self) -> &'static str {
        "error"
    }

    fn into_arguments(self) -> Vec<EventArgument> {
        match self {
            Self::Error { message } => vec![EventArgument::typed(message)],
        }
    }
}

enum Step {
    Done,
    NeedMore,
}

/// One client's command loop.
pub struct Session<R> {
    reader: LineReader<R>,
    table: Arc<CommandTable>,
    targets: Box<dyn Targets>,
    sink: EventSink,
    control: Arc<SessionControl>,
    prompt: Option<Box<dyn Write + Send>>,
}

impl<R: BufRead> Session<R> {
    /// Creates a session reading commands from `input`.
    pub fn new(
        input: R,
        table: Arc<CommandTable>,
        targets: Box<dyn Targets>,
        sink: EventSink,
        control: Arc<SessionControl>,
    ) -> Self {
        Self {
            reader: LineReader::new(input),
            table,
            targets,
            sink,
            control,
            prompt: None,
        }
    }

    /// Writes `> ` before each command and `... ` before continuation lines.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Write + Send + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Runs until the input ends or an exit is requested, then closes the
    /// targets.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the client cannot be read or written.
    pub fn run(mut self) -> Result<(), SessionError> {
        let result = self.serve();
        self.targets.close();
        debug!(
            target: SESSION_TARGET,
            exit_requested = self.control.exit_requested(),
            "session closed"
        );
        result
    }

    fn serve(&mut self) -> Result<(), SessionError> {
        let mut pending = String::new();
        while !self.control.exit_requested() {
            self.show_prompt(pending.is_empty());
            let Some(line) = self.reader.read_line().map_err(SessionError::Read)? else {
                break;
            };
            if !pending.is_empty() && line.trim().is_empty() {
                pending.clear();
                continue;
            }
            pending.push_str(&line);
            match self.evaluate(&pending)? {
                Step::Done => pending.clear(),
                Step::NeedMore => pending.push('\n'),
            }
        }
        Ok(())
    }

    fn evaluate(&mut self, input: &str) -> Result<Step, SessionError> {
        let parsed = match tokenize(input) {
            Ok(parsed) => parsed,
            Err(TokenizeError::Incomplete) => return Ok(Step::NeedMore),
            Err(TokenizeError::Syntax(error)) => {
                self.report(error.to_string())?;
                return Ok(Step::Done);
            }
        };
        if parsed.command.is_empty() {
            return Ok(Step::Done);
        }

        let table = Arc::clone(&self.table);
        let parameters = match table.parameter_types(&parsed.command) {
            Ok(parameters) => parameters,
            Err(error) => {
                self.report(error.to_string())?;
                return Ok(Step::Done);
            }
        };
        let supplied = parsed.values.len();
        if parameters
            .get(supplied..)
            .is_some_and(|missing| missing.iter().any(Parameter::is_required))
        {
            return Ok(Step::NeedMore);
        }
        if supplied > parameters.len() {
            let extra = supplied - parameters.len();
            self.report(format!(
                "Expected {extra} less value(s) while evaluating {input}"
            ))?;
            return Ok(Step::Done);
        }

        let mut arguments = Vec::with_capacity(parameters.len());
        for (position, parameter) in parameters.iter().enumerate() {
            let Some(text) = parsed.values.get(position) else {
                arguments.push(Native::Null);
                continue;
            };
            match decode(text, parameter.descriptor()) {
                Ok(value) => arguments.push(value),
                Err(error) => {
                    let error = error.at_argument(position + 1);
                    self.report(format!("{error} while evaluating {input}"))?;
                    return Ok(Step::Done);
                }
            }
        }

        debug!(
            target: SESSION_TARGET,
            command = %parsed.command,
            arguments = arguments.len(),
            "dispatching"
        );
        if let Err(error) = table.invoke(&parsed.command, self.targets.as_mut(), arguments) {
            self.report(format!("{error} while evaluating {input}"))?;
        }
        Ok(Step::Done)
    }

    fn report(&self, message: String) -> Result<(), SessionError> {
        debug!(target: SESSION_TARGET, %message, "command failed");
        self.sink
            .emit(SessionEvent::Error { message })
            .map_err(SessionError::Write)
    }

    fn show_prompt(&mut self, fresh: bool) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        let text = if fresh { PROMPT } else { CONTINUATION_PROMPT };
        if let Err(error) = prompt
            .write_all(text.as_bytes())
            .and_then(|()| prompt.flush())
        {
            warn!(target: SESSION_TARGET, %error, "prompt write failed");
        }
    }
}
