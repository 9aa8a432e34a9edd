//! Operator input for the interactive shell
//!
//! Terminal reads block, so they run on their own thread and arrive as lines
//! over a channel. Abandoning the shell leaves that thread parked on its read
//! without holding up runtime shutdown.

use std::io::{self, BufRead};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};
use tokio::sync::mpsc;

type Line = io::Result<Vec<u8>>;

/// Line-by-line async reader over a blocking source
///
/// The reader thread starts on the first read, so commands that never prompt
/// leave the source untouched.
pub struct OperatorInput<S> {
    source: Option<S>,
    lines: Option<mpsc::UnboundedReceiver<Line>>,
    pending: Vec<u8>,
    pos: usize,
}

impl OperatorInput<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

impl<S> OperatorInput<S>
where
    S: BufRead + Send + Unpin + 'static,
{
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            lines: None,
            pending: Vec::new(),
            pos: 0,
        }
    }
}

fn spawn_reader<S>(mut source: S) -> io::Result<mpsc::UnboundedReceiver<Line>>
where
    S: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("operator-input".to_string())
        .spawn(move || loop {
            let mut line = Vec::new();
            match source.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        })?;

    tracing::debug!("Started operator input thread");
    Ok(rx)
}

impl<S> AsyncBufRead for OperatorInput<S>
where
    S: BufRead + Send + Unpin + 'static,
{
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        let this = self.get_mut();

        while this.pos >= this.pending.len() {
            if this.lines.is_none() {
                match this.source.take() {
                    Some(source) => this.lines = Some(spawn_reader(source)?),
                    None => return Poll::Ready(Ok(&[])),
                }
            }
            let Some(lines) = this.lines.as_mut() else {
                return Poll::Ready(Ok(&[]));
            };

            match ready!(lines.poll_recv(cx)) {
                Some(Ok(line)) => {
                    this.pending = line;
                    this.pos = 0;
                }
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // End of input
                None => {
                    this.lines = None;
                    return Poll::Ready(Ok(&[]));
                }
            }
        }

        Poll::Ready(Ok(&this.pending[this.pos..]))
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        let this = self.get_mut();
        this.pos = (this.pos + amt).min(this.pending.len());
    }
}

impl<S> AsyncRead for OperatorInput<S>
where
    S: BufRead + Send + Unpin + 'static,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let available = ready!(self.as_mut().poll_fill_buf(cx))?;
        let n = available.len().min(buf.remaining());
        buf.put_slice(&available[..n]);
        self.consume(n);
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt};

    #[tokio::test]
    async fn test_reads_lines_then_end_of_input() {
        let mut input = OperatorInput::new(io::Cursor::new(b"ff\nquit\n".to_vec()));

        let mut line = String::new();
        input.read_line(&mut line).await.unwrap();
        assert_eq!(line, "ff\n");

        line.clear();
        input.read_line(&mut line).await.unwrap();
        assert_eq!(line, "quit\n");

        line.clear();
        assert_eq!(input.read_line(&mut line).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partial_reads_keep_the_rest_of_the_line() {
        let mut input = OperatorInput::new(io::Cursor::new(b"00000012\n".to_vec()));

        let mut head = [0u8; 3];
        input.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"000");

        let mut rest = Vec::new();
        input.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"00012\n");
    }

    #[test]
    fn test_unread_source_is_never_touched() {
        let input = OperatorInput::new(io::Cursor::new(Vec::new()));
        assert!(input.source.is_some());
        assert!(input.lines.is_none());
    }
}
