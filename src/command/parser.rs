// * Console line parser
// * Keywords are case-insensitive, tokens are split on runs of whitespace

use crate::command::{Command, ParseError, ScanParams};
use std::collections::HashMap;

// * SCAN option names, in the order they are reported when missing
const SCAN_OPTIONS: [&str; 5] = ["min", "max", "letter", "output", "job"];

// * Maps every accepted SCAN flag to its canonical option name
fn scan_option(flag: &str) -> Option<&'static str> {
    match flag {
        "--min" | "-m" => Some("min"),
        "--max" | "-M" => Some("max"),
        "--letter" | "-l" => Some("letter"),
        "--output" | "-o" => Some("output"),
        "--job" | "-j" => Some("job"),
        _ => None,
    }
}

/// Parses one console line into a [`Command`]
///
/// # Example
/// ```
/// use concurrent_mess::command::{parse_command, Command};
///
/// let cmd = parse_command("start --load-jobs").unwrap();
/// assert_eq!(cmd, Command::Start { load_jobs: true });
/// ```
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(keyword) = parts.first() else {
        return Err(ParseError::Empty);
    };

    let keyword = keyword.to_uppercase();
    match keyword.as_str() {
        "START" => parse_toggle(&keyword, &parts, &["-l", "--load-jobs"])
            .map(|load_jobs| Command::Start { load_jobs }),
        "STOP" | "SHUTDOWN" | "EXIT" | "QUIT" => {
            parse_toggle(&keyword, &parts, &["-s", "--save-jobs"])
                .map(|save_jobs| Command::Stop { save_jobs })
        }
        "SCAN" => parse_scan(&parts).map(Command::Scan),
        "STATUS" => parse_status(&parts),
        "MAP" => no_arguments(&keyword, &parts, Command::Map),
        "EXPORTMAP" => no_arguments(&keyword, &parts, Command::ExportMap),
        _ => Err(ParseError::UnknownCommand(parts[0].to_string())),
    }
}

// * `KEYWORD [flag]` where the flag switches a boolean on
fn parse_toggle(keyword: &str, parts: &[&str], flags: &[&str]) -> Result<bool, ParseError> {
    match parts {
        [_] => Ok(false),
        [_, arg] => {
            if flags.iter().any(|flag| arg.eq_ignore_ascii_case(flag)) {
                Ok(true)
            } else {
                Err(ParseError::InvalidArgument {
                    command: keyword.to_string(),
                    argument: arg.to_string(),
                })
            }
        }
        _ => Err(ParseError::TooManyArguments(keyword.to_string())),
    }
}

fn no_arguments(keyword: &str, parts: &[&str], command: Command) -> Result<Command, ParseError> {
    if parts.len() > 1 {
        return Err(ParseError::TooManyArguments(keyword.to_string()));
    }
    Ok(command)
}

// * STATUS takes either nothing or a `--job <name>` pair
fn parse_status(parts: &[&str]) -> Result<Command, ParseError> {
    match parts {
        [_] => Ok(Command::Status { job_name: None }),
        [_, arg] => Err(ParseError::MissingValue(arg.to_string())),
        [_, flag, name] => {
            if *flag != "-j" && *flag != "--job" {
                return Err(ParseError::InvalidArgument {
                    command: "STATUS".to_string(),
                    argument: flag.to_string(),
                });
            }
            Ok(Command::Status {
                job_name: Some(name.to_string()),
            })
        }
        _ => Err(ParseError::TooManyArguments("STATUS".to_string())),
    }
}

fn parse_scan(parts: &[&str]) -> Result<ScanParams, ParseError> {
    let mut options: HashMap<&'static str, &str> = HashMap::new();
    let mut args = parts.iter().skip(1);

    while let Some(flag) = args.next() {
        if !flag.starts_with('-') {
            return Err(ParseError::ExpectedFlag(flag.to_string()));
        }
        let value = args
            .next()
            .ok_or_else(|| ParseError::MissingValue(flag.to_string()))?;
        let option = scan_option(flag).ok_or_else(|| ParseError::UnknownFlag(flag.to_string()))?;
        // * Repeated flags: last one wins
        options.insert(option, value);
    }

    let missing: Vec<&'static str> = SCAN_OPTIONS
        .iter()
        .copied()
        .filter(|name| !options.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingOptions(missing));
    }

    let min = parse_number("min", options["min"])?;
    let max = parse_number("max", options["max"])?;

    let letter_str = options["letter"];
    let mut chars = letter_str.chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(ParseError::InvalidLetter(letter_str.to_string())),
    };

    ScanParams::new(min, max, letter, options["output"], options["job"])
}

fn parse_number(flag: &str, value: &str) -> Result<f64, ParseError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
        .ok_or_else(|| ParseError::InvalidNumber {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}
