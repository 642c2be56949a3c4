//! Concrete [`Channel`] and [`LinePrompt`] implementations.
//!
//! - [`SocketChannel`] / [`SocketPrompt`]: any tokio byte stream, e.g. a TCP connection.
//! - [`TerminalChannel`] / [`RustylinePrompt`]: the local terminal with line editing.
//! - [`MemChannel`] / [`ScriptedPrompt`]: in-memory adapters for tests and embedding.

use crate::command::{Channel, LinePrompt};
use crate::out::colorize;
use async_trait::async_trait;
use colored::Color;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io::{self, IsTerminal};
use std::sync::{Arc, mpsc};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::sync::{Mutex, oneshot};

/// Marker shown whenever a session is ready for the next command.
pub const PROMPT_MARKER: &str = "quiz > ";

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "channel closed")
}

/// Write half of a stream, shared between a [`SocketChannel`] and its [`SocketPrompt`].
type SharedWriter<W> = Arc<Mutex<Option<W>>>;

/// Channel writing to the write half of a byte stream.
pub struct SocketChannel<W> {
    writer: SharedWriter<W>,
}

/// Line prompt reading from the read half of a byte stream.
///
/// Prompts and questions are written to the same stream as the channel output.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub struct SocketPrompt<R, W> {
    reader: BufReader<R>,
    writer: SharedWriter<W>,
    closed: bool,
}

/// Split `stream` into the channel and prompt of one session.
pub fn socket_pair<S>(
    stream: S,
) -> (SocketChannel<WriteHalf<S>>, SocketPrompt<ReadHalf<S>, WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read, write) = tokio::io::split(stream);
    let writer = Arc::new(Mutex::new(Some(write)));
    (
        SocketChannel {
            writer: Arc::clone(&writer),
        },
        SocketPrompt {
            reader: BufReader::new(read),
            writer,
            closed: false,
        },
    )
}

async fn write_shared<W: AsyncWrite + Unpin + Send>(
    writer: &SharedWriter<W>,
    text: &str,
) -> io::Result<()> {
    let mut guard = writer.lock().await;
    let w = guard.as_mut().ok_or_else(closed_error)?;
    w.write_all(text.as_bytes()).await?;
    w.flush().await
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Channel for SocketChannel<W> {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        write_shared(&self.writer, text).await
    }

    async fn close(&mut self) -> io::Result<()> {
        match self.writer.lock().await.take() {
            Some(mut w) => w.shutdown().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<R, W> LinePrompt for SocketPrompt<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn prompt(&mut self) -> io::Result<()> {
        write_shared(&self.writer, &colorize(PROMPT_MARKER, Color::Blue)).await
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    async fn question(
        &mut self,
        query: &str,
        _initial: Option<&str>,
    ) -> io::Result<Option<String>> {
        write_shared(&self.writer, query).await?;
        self.next_line().await
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Channel writing to the process stdout.
pub struct TerminalChannel {
    stdout: tokio::io::Stdout,
    closed: bool,
}

impl TerminalChannel {
    pub fn new() -> Self {
        Self {
            stdout: tokio::io::stdout(),
            closed: false,
        }
    }
}

impl Default for TerminalChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for TerminalChannel {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.stdout.flush().await
    }

    fn is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }
}

struct ReadRequest {
    prompt: String,
    initial: Option<String>,
    reply: oneshot::Sender<io::Result<Option<String>>>,
}

/// Line prompt backed by a `rustyline` editor on the local terminal.
///
/// The editor blocks, so it lives on its own thread and serves one read request
/// at a time.
pub struct RustylinePrompt {
    requests: Option<mpsc::Sender<ReadRequest>>,
    armed: bool,
}

impl RustylinePrompt {
    /// Start the editor thread.
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<ReadRequest>();
        let (ready_tx, ready_rx) = mpsc::channel::<io::Result<()>>();
        std::thread::Builder::new()
            .name("quiz-readline".to_string())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => {
                        let _ = ready_tx.send(Ok(()));
                        editor
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(io::Error::other(e.to_string())));
                        return;
                    }
                };
                for request in rx {
                    let line = read_one(&mut editor, &request.prompt, request.initial.as_deref());
                    let _ = request.reply.send(line);
                }
            })?;
        ready_rx
            .recv()
            .map_err(|_| io::Error::other("line editor thread exited"))??;
        Ok(Self {
            requests: Some(tx),
            armed: false,
        })
    }

    async fn read(&mut self, prompt: &str, initial: Option<&str>) -> io::Result<Option<String>> {
        let Some(requests) = &self.requests else {
            return Ok(None);
        };
        let (reply, response) = oneshot::channel();
        requests
            .send(ReadRequest {
                prompt: prompt.to_string(),
                initial: initial.map(str::to_string),
                reply,
            })
            .map_err(|_| io::Error::other("line editor thread exited"))?;
        response
            .await
            .map_err(|_| io::Error::other("line editor thread exited"))?
    }
}

fn read_one(
    editor: &mut DefaultEditor,
    prompt: &str,
    initial: Option<&str>,
) -> io::Result<Option<String>> {
    let line = match initial {
        Some(initial) => editor.readline_with_initial(prompt, (initial, "")),
        None => editor.readline(prompt),
    };
    match line {
        Ok(line) => {
            if !line.trim().is_empty() {
                let _ = editor.add_history_entry(line.as_str());
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(ReadlineError::Io(e)) => Err(e),
        Err(e) => Err(io::Error::other(e.to_string())),
    }
}

#[async_trait]
impl LinePrompt for RustylinePrompt {
    async fn prompt(&mut self) -> io::Result<()> {
        self.armed = true;
        Ok(())
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let marker = if std::mem::take(&mut self.armed) {
            PROMPT_MARKER
        } else {
            ""
        };
        self.read(marker, None).await
    }

    async fn question(&mut self, query: &str, initial: Option<&str>) -> io::Result<Option<String>> {
        self.read(query, initial).await
    }

    fn close(&mut self) {
        // Dropping the sender ends the editor thread.
        self.requests = None;
    }
}

#[derive(Debug, Default)]
struct TranscriptState {
    text: String,
    closed: bool,
}

/// Shared record of everything written to a [`MemChannel`] and its [`ScriptedPrompt`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    state: Arc<std::sync::Mutex<TranscriptState>>,
}

impl Transcript {
    fn with<T>(&self, f: impl FnOnce(&mut TranscriptState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn push(&self, text: &str) -> io::Result<()> {
        self.with(|s| {
            if s.closed {
                return Err(closed_error());
            }
            s.text.push_str(text);
            Ok(())
        })
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.with(|s| s.text.clone())
    }

    /// Whether the channel was closed.
    pub fn is_closed(&self) -> bool {
        self.with(|s| s.closed)
    }

    /// Number of times the prompt marker was shown.
    pub fn prompt_count(&self) -> usize {
        self.with(|s| s.text.matches(PROMPT_MARKER).count())
    }
}

/// Memory-backed channel capturing output into a [`Transcript`].
pub struct MemChannel {
    transcript: Transcript,
    terminal: bool,
}

impl MemChannel {
    /// Convenience: create a channel and return (channel, transcript handle).
    pub fn with_handle() -> (Self, Transcript) {
        let transcript = Transcript::default();
        let channel = Self {
            transcript: transcript.clone(),
            terminal: false,
        };
        (channel, transcript)
    }

    /// Pretend to be an interactive terminal.
    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }
}

#[async_trait]
impl Channel for MemChannel {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.transcript.push(text)
    }

    async fn close(&mut self) -> io::Result<()> {
        self.transcript.with(|s| s.closed = true);
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}

/// Line prompt replaying a fixed list of input lines.
///
/// Prompt markers and questions are recorded in the transcript; offered
/// initial text is recorded as `[initial]`.
pub struct ScriptedPrompt {
    lines: VecDeque<String>,
    transcript: Transcript,
    closed: bool,
}

impl ScriptedPrompt {
    pub fn new(lines: &[&str], transcript: Transcript) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            transcript,
            closed: false,
        }
    }
}

#[async_trait]
impl LinePrompt for ScriptedPrompt {
    async fn prompt(&mut self) -> io::Result<()> {
        self.transcript.push(PROMPT_MARKER)
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.lines.pop_front())
    }

    async fn question(&mut self, query: &str, initial: Option<&str>) -> io::Result<Option<String>> {
        self.transcript.push(query)?;
        if let Some(initial) = initial {
            self.transcript.push(&format!("[{initial}]"))?;
        }
        self.next_line().await
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn test_socket_pair_reads_lines_and_writes_output() {
        colored::control::set_override(false);
        let (server, mut client) = duplex(1024);
        let (mut channel, mut prompt) = socket_pair(server);

        client.write_all(b"list\r\nshow 1\n").await.unwrap();
        assert_eq!(prompt.next_line().await.unwrap().as_deref(), Some("list"));
        assert_eq!(
            prompt.question("id? ", None).await.unwrap().as_deref(),
            Some("show 1")
        );

        channel.write("hello\n").await.unwrap();
        prompt.prompt().await.unwrap();
        channel.close().await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, format!("id? hello\n{PROMPT_MARKER}"));
    }

    #[tokio::test]
    async fn test_socket_prompt_ends_on_eof_and_close() {
        let (server, client) = duplex(64);
        let (_channel, mut prompt) = socket_pair(server);
        drop(client);
        assert_eq!(prompt.next_line().await.unwrap(), None);

        let (server, mut client) = duplex(64);
        let (_channel, mut prompt) = socket_pair(server);
        client.write_all(b"quit\n").await.unwrap();
        prompt.close();
        assert_eq!(prompt.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_socket_prompt_survives_invalid_utf8() {
        let (server, mut client) = duplex(64);
        let (_channel, mut prompt) = socket_pair(server);
        client.write_all(b"Espa\xF1a\r\nshow 1").await.unwrap();
        drop(client);

        assert_eq!(
            prompt.next_line().await.unwrap().as_deref(),
            Some("Espa\u{FFFD}a")
        );
        assert_eq!(prompt.next_line().await.unwrap().as_deref(), Some("show 1"));
        assert_eq!(prompt.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_socket_channel_write_after_close_fails() {
        let (server, _client) = duplex(64);
        let (mut channel, _prompt) = socket_pair(server);
        channel.close().await.unwrap();
        let err = channel.write("late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_mem_channel_records_until_closed() {
        let (mut channel, transcript) = MemChannel::with_handle();
        channel.write("a").await.unwrap();
        channel.close().await.unwrap();
        assert!(channel.write("b").await.is_err());
        assert_eq!(transcript.contents(), "a");
        assert!(transcript.is_closed());
    }

    #[tokio::test]
    async fn test_scripted_prompt_replays_lines() {
        let transcript = Transcript::default();
        let mut prompt = ScriptedPrompt::new(&["one", "two"], transcript.clone());
        prompt.prompt().await.unwrap();
        assert_eq!(prompt.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(
            prompt.question("q: ", Some("x")).await.unwrap().as_deref(),
            Some("two")
        );
        assert_eq!(prompt.next_line().await.unwrap(), None);
        assert_eq!(transcript.contents(), format!("{PROMPT_MARKER}q: [x]"));
        assert_eq!(transcript.prompt_count(), 1);
    }
}
