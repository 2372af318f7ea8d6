use thiserror::Error;

// * Everything that can go wrong turning a console line into a Command
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Too many arguments for {0} command")]
    TooManyArguments(String),

    #[error("Invalid argument for {command} command: {argument}")]
    InvalidArgument { command: String, argument: String },

    #[error("Expected a flag, but got: {0}")]
    ExpectedFlag(String),

    #[error("Missing value for flag: {0}")]
    MissingValue(String),

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("Missing required options: {}", .0.join(", "))]
    MissingOptions(Vec<&'static str>),

    #[error("Invalid number for {flag}: {value}")]
    InvalidNumber { flag: String, value: String },

    #[error("Min value ({min}) must not exceed max value ({max})")]
    MinGreaterThanMax { min: f64, max: f64 },

    #[error("Letter must be a single character, got: {0:?}")]
    InvalidLetter(String),

    #[error("{0} cannot be blank")]
    BlankField(&'static str),
}
