// * Console commands and the messages that carry them through the queue

pub mod errors;
pub mod parser;

pub use errors::ParseError;
pub use parser::parse_command;

use std::fmt;

/// Parameters of a `SCAN` job
#[derive(Debug, Clone, PartialEq)]
pub struct ScanParams {
    pub min: f64,
    pub max: f64,
    pub letter: char,
    pub output_file: String,
    pub job_name: String,
}

impl ScanParams {
    /// Builds validated scan parameters
    ///
    /// Rejects blank output file or job names and an inverted range.
    pub fn new(
        min: f64,
        max: f64,
        letter: char,
        output_file: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let output_file = output_file.into();
        let job_name = job_name.into();

        if output_file.trim().is_empty() {
            return Err(ParseError::BlankField("output"));
        }
        if job_name.trim().is_empty() {
            return Err(ParseError::BlankField("job"));
        }
        if min.is_nan() || max.is_nan() {
            return Err(ParseError::InvalidNumber {
                flag: "min/max".to_string(),
                value: "NaN".to_string(),
            });
        }
        if min > max {
            return Err(ParseError::MinGreaterThanMax { min, max });
        }

        Ok(Self {
            min,
            max,
            letter,
            output_file,
            job_name,
        })
    }

    /// True when `temperature` lies in the inclusive `[min, max]` range
    pub fn accepts(&self, temperature: f64) -> bool {
        temperature >= self.min && temperature <= self.max
    }
}

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { load_jobs: bool },
    Stop { save_jobs: bool },
    Scan(ScanParams),
    /// `None` asks for every job
    Status { job_name: Option<String> },
    Map,
    ExportMap,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "START",
            Command::Stop { .. } => "STOP",
            Command::Scan(_) => "SCAN",
            Command::Status { .. } => "STATUS",
            Command::Map => "MAP",
            Command::ExportMap => "EXPORTMAP",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Scan(p) => write!(
                f,
                "SCAN job={} letter={} range=[{}, {}] output={}",
                p.job_name, p.letter, p.min, p.max, p.output_file
            ),
            Command::Status {
                job_name: Some(name),
            } => write!(f, "STATUS {}", name),
            other => f.write_str(other.name()),
        }
    }
}

/// Unit of work flowing through the message queue
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Command(Command),
    /// Shutdown sentinel, always delivered ahead of pending commands
    PoisonPill { save_jobs: bool },
}

impl Message {
    /// Higher values are delivered first
    pub fn priority(&self) -> u8 {
        match self {
            Message::Command(_) => 0,
            Message::PoisonPill { .. } => 1,
        }
    }

    pub fn is_poison_pill(&self) -> bool {
        matches!(self, Message::PoisonPill { .. })
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}
