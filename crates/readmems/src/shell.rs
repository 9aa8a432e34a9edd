//! Interactive raw command shell
//!
//! The operator types one hex command byte per line. Each byte is sent to the
//! ECU as-is and whatever comes back is printed as a hex dump. Input is read
//! through an 8-byte line buffer, so at most 7 characters are taken per read
//! and the remainder of a longer line is handled as the next line.

use std::io::Write;

use mems_core::EcuLink;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::logging::hex_rows;

/// Size of the operator line buffer, terminator included
pub const INPUT_BUFFER_SIZE: usize = 8;

/// Capacity of the response buffer
pub const RESPONSE_BUFFER_SIZE: usize = 16384;

const BANNER: &str = "Enter a command (in hex) or 'quit'.\n";
const PROMPT: &str = "> ";

/// Recoverable problems with an operator line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Error: command must be a hexadecimal byte.")]
    NotHex,

    #[error("Error: command must be between 0x00 and 0xFF.")]
    OutOfRange,
}

/// Parse an operator line as a command byte
///
/// Leading whitespace and an optional `0x` prefix are skipped; parsing stops
/// at the first character that is not a hex digit.
pub fn parse_command_byte(line: &str) -> Result<u8, InputError> {
    let trimmed = line.trim_start();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits_len = body
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(body.len());
    let digits = &body[..digits_len];
    if digits.is_empty() {
        return Err(InputError::NotHex);
    }

    let value = u32::from_str_radix(digits, 16).map_err(|_| InputError::OutOfRange)?;
    u8::try_from(value).map_err(|_| InputError::OutOfRange)
}

/// Read one line chunk the way a fixed line buffer would
///
/// Returns an empty chunk at end of input.
async fn read_chunk<R>(input: &mut R, chunk: &mut Vec<u8>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    chunk.clear();
    let capacity = INPUT_BUFFER_SIZE - 1;

    while chunk.len() < capacity {
        let available = input.fill_buf().await?;
        if available.is_empty() {
            break;
        }

        let room = capacity - chunk.len();
        let window = &available[..available.len().min(room)];
        let take = match window.iter().position(|b| *b == b'\n') {
            Some(newline) => newline + 1,
            None => window.len(),
        };

        chunk.extend_from_slice(&window[..take]);
        input.consume(take);

        if chunk.last() == Some(&b'\n') {
            break;
        }
    }
    Ok(())
}

fn is_blank(chunk: &[u8]) -> bool {
    chunk.starts_with(b"\n") || chunk.starts_with(b"\r\n")
}

/// Send one command byte and collect its response into `response`
async fn round_trip<L>(link: &mut L, command: u8, response: &mut Vec<u8>) -> bool
where
    L: EcuLink + ?Sized,
{
    if let Err(e) = link.write_raw_byte(command).await {
        tracing::debug!(command, error = %e, "Raw write failed");
        return false;
    }

    response.clear();
    while response.len() < RESPONSE_BUFFER_SIZE {
        match link.read_raw_byte().await {
            Some(byte) => response.push(byte),
            None => break,
        }
    }
    true
}

/// Run the shell until the operator quits or input ends
///
/// Always reports `false`: an interactive session is never scored as a
/// command outcome.
pub async fn run<L, R, W>(link: &mut L, input: &mut R, console: &mut W, response: &mut Vec<u8>) -> bool
where
    L: EcuLink + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut chunk = Vec::with_capacity(INPUT_BUFFER_SIZE);
    print(console, BANNER);
    print(console, PROMPT);

    loop {
        if let Err(e) = read_chunk(input, &mut chunk).await {
            tracing::warn!(error = %e, "Failed to read operator input");
            break;
        }
        if chunk.is_empty() || chunk.starts_with(b"q") {
            break;
        }

        if !is_blank(&chunk) {
            let line = String::from_utf8_lossy(&chunk);
            match parse_command_byte(&line) {
                Ok(command) => {
                    if !round_trip(link, command, response).await {
                        print(console, "Error: failed to write command byte to serial port.\n");
                    } else if response.is_empty() {
                        print(console, "No response from ECU.\n");
                    } else {
                        print(console, &hex_rows(response));
                    }
                }
                Err(e) => print(console, &format!("{}\n", e)),
            }
        }
        print(console, PROMPT);
    }

    false
}

fn print<W: Write>(console: &mut W, text: &str) {
    if let Err(e) = console.write_all(text.as_bytes()).and_then(|_| console.flush()) {
        tracing::debug!(error = %e, "Console write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mems_link::{MockLink, Transaction};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    async fn session(link: &mut MockLink, input: &str) -> (bool, String) {
        let mut console = Vec::new();
        let mut response = Vec::with_capacity(RESPONSE_BUFFER_SIZE);
        let mut input = input.as_bytes();

        let success = run(link, &mut input, &mut console, &mut response).await;
        (success, String::from_utf8(console).unwrap())
    }

    #[rstest]
    #[case("ff\n", Ok(0xFF))]
    #[case("0x7d\n", Ok(0x7D))]
    #[case("  0a\r\n", Ok(0x0A))]
    #[case("0\n", Ok(0x00))]
    #[case("80zz", Ok(0x80))]
    #[case("100\n", Err(InputError::OutOfRange))]
    #[case("fffffff", Err(InputError::OutOfRange))]
    #[case("zz\n", Err(InputError::NotHex))]
    #[case("0x\n", Err(InputError::NotHex))]
    fn test_parse_command_byte(#[case] line: &str, #[case] expected: Result<u8, InputError>) {
        assert_eq!(parse_command_byte(line), expected);
    }

    #[tokio::test]
    async fn test_byte_round_trip_then_quit() {
        let mut link = MockLink::new().respond_raw(0xFF, vec![0xAB]);

        let (success, output) = session(&mut link, "ff\nquit\n").await;
        assert!(!success);
        assert_eq!(output, "Enter a command (in hex) or 'quit'.\n> AB \n> ");
        assert_eq!(link.count(Transaction::WriteRaw(0xFF)), 1);
    }

    #[tokio::test]
    async fn test_quit_prints_no_further_prompt() {
        let mut link = MockLink::new();

        let (success, output) = session(&mut link, "q\nff\n").await;
        assert!(!success);
        assert_eq!(output, "Enter a command (in hex) or 'quit'.\n> ");
        assert!(link.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_blank_lines_reprompt() {
        let mut link = MockLink::new();

        let (_, output) = session(&mut link, "\n\r\n").await;
        assert_eq!(output, "Enter a command (in hex) or 'quit'.\n> > > ");
        assert!(link.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_no_response() {
        let mut link = MockLink::new().respond_raw(0x0A, Vec::new());

        let (_, output) = session(&mut link, "0a\n").await;
        assert!(output.contains("No response from ECU.\n"));
    }

    #[tokio::test]
    async fn test_write_failure_reprompts() {
        let mut link = MockLink::new().failing_raw_writes();

        let (_, output) = session(&mut link, "ca\n").await;
        assert!(output.ends_with("Error: failed to write command byte to serial port.\n> "));
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_sent() {
        let mut link = MockLink::new();

        let (_, output) = session(&mut link, "1ff\nxyz\n").await;
        assert!(output.contains("Error: command must be between 0x00 and 0xFF.\n"));
        assert!(output.contains("Error: command must be a hexadecimal byte.\n"));
        assert!(link.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_long_line_is_split_like_a_line_buffer() {
        let mut link = MockLink::new()
            .respond_raw(0x01, vec![0x01])
            .respond_raw(0x02, vec![0x02]);

        // "0000001" fills the buffer, "2\n" is read as the next line
        let (_, output) = session(&mut link, "00000012\n").await;
        assert_eq!(
            link.transactions()
                .into_iter()
                .filter(|t| matches!(t, Transaction::WriteRaw(_)))
                .collect::<Vec<_>>(),
            vec![Transaction::WriteRaw(0x01), Transaction::WriteRaw(0x02)]
        );
        assert!(output.ends_with("01 \n> 02 \n> "));
    }

    #[tokio::test]
    async fn test_long_response_wraps() {
        let mut link = MockLink::new().respond_raw(0x80, (0..29).collect());

        let (_, output) = session(&mut link, "80\n").await;
        let dump: Vec<&str> = output.lines().skip(1).take(2).collect();
        assert_eq!(dump[0].trim_start_matches(PROMPT).split_whitespace().count(), 16);
        assert_eq!(dump[1].split_whitespace().count(), 13);
    }
}
