// * Console reader
// * Reads one command per line, pushes it onto the queue, and ends with a
// * poison pill on STOP or end of input

use crate::command::{parse_command, Command, Message};
use crate::config::constants::PROMPT;
use crate::queue::MessageQueue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

/// Runs the read-parse-emit loop; returns the `save_jobs` flag of the pill it emitted
pub async fn run_cli<R, W>(mut input: R, mut output: W, queue: &MessageQueue) -> bool
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        // * Prompt failures are cosmetic, keep reading
        if let Err(e) = write_prompt(&mut output).await {
            warn!("Could not write prompt: {}", e);
        }

        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("End of input, shutting down");
                return emit_pill(queue, false);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error reading input: {}", e);
                return emit_pill(queue, false);
            }
        }

        // * Invalid UTF-8 becomes U+FFFD and fails parsing like any other typo
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_command(trimmed) {
            Ok(Command::Stop { save_jobs }) => return emit_pill(queue, save_jobs),
            Ok(command) => {
                if !queue.emit(Message::Command(command)) {
                    warn!("Invalid command: {}", trimmed);
                }
            }
            Err(e) => error!("Error parsing command: {}", e),
        }
    }
}

async fn write_prompt<W: AsyncWrite + Unpin>(output: &mut W) -> std::io::Result<()> {
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await
}

fn emit_pill(queue: &MessageQueue, save_jobs: bool) -> bool {
    info!("Emitting poison pill...");
    queue.emit(Message::PoisonPill { save_jobs });
    save_jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cli_emits_commands_then_pill() {
        let queue = MessageQueue::new();
        let input: &[u8] = b"map\n\nbogus\nSTATUS\nstop --save-jobs\nexportmap\n";
        let mut prompts = Vec::new();

        let save = run_cli(input, &mut prompts, &queue).await;
        assert!(save);

        // * The line after STOP was never read
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.try_take(),
            Some(Message::PoisonPill { save_jobs: true })
        );

        let prompts = String::from_utf8(prompts).unwrap();
        assert_eq!(prompts.matches(PROMPT).count(), 5);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_session() {
        let queue = MessageQueue::new();
        let input: &[u8] = b"caf\xe9\nMAP\nSTOP --save-jobs\n";

        let save = run_cli(input, tokio::io::sink(), &queue).await;

        assert!(save);
        assert_eq!(queue.len(), 1);
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_end_of_input_stops_without_saving() {
        let queue = MessageQueue::new();
        let input: &[u8] = b"map";
        let save = run_cli(input, tokio::io::sink(), &queue).await;

        assert!(!save);
        assert!(queue.is_closed());
        assert_eq!(queue.len(), 1);
    }
}
