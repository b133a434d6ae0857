use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::{Conversation, SendOutcome, format};
use crate::core::relay::StreamingRelay;
use crate::core::types::Role;
use crate::core::Result;

const HELP: &str = "Commands:
  /new         start a new session
  /sessions    list sessions
  /switch N    switch to session N
  /delete N    delete session N
  /show        reprint the active session
  /help        show this help
  /quit        exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    New,
    Sessions,
    Switch(usize),
    Delete(usize),
    Show,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let rest = line.trim().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let number = parts.next().and_then(|n| n.parse().ok());

    let command = match (name, number) {
        ("new", _) => Command::New,
        ("sessions" | "list", _) => Command::Sessions,
        ("switch", Some(n)) => Command::Switch(n),
        ("delete", Some(n)) => Command::Delete(n),
        ("show", _) => Command::Show,
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(line.trim().to_string()),
    };
    Some(command)
}

type Interrupts = Option<mpsc::UnboundedReceiver<()>>;

/// Forwards every Ctrl-C for the rest of the process to the returned
/// receiver. Once this runs, SIGINT no longer terminates the process.
#[must_use]
pub fn ctrl_c_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Resolves on the next interrupt; never resolves without a live source.
async fn interrupted(interrupts: &mut Interrupts) {
    if let Some(rx) = interrupts
        && rx.recv().await.is_some()
    {
        return;
    }
    std::future::pending::<()>().await;
}

/// Line-oriented chat loop. Each reply is printed as it streams in.
pub struct Repl<'a, W: Write> {
    relay: &'a StreamingRelay,
    conversation: Conversation,
    out: W,
    color: bool,
    interrupts: Interrupts,
}

impl<'a, W: Write> Repl<'a, W> {
    pub fn new(relay: &'a StreamingRelay, conversation: Conversation, out: W) -> Self {
        Self {
            relay,
            conversation,
            out,
            color: false,
            interrupts: None,
        }
    }

    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// An interrupt stops the reply being streamed. At the prompt it ends
    /// the loop like `/quit`.
    #[must_use]
    pub fn with_interrupts(mut self, interrupts: mpsc::UnboundedReceiver<()>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    pub async fn run<R>(mut self, input: R) -> Result<Conversation>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut interrupts = self.interrupts.take();
        writeln!(self.out, "Type a message, or /help for commands.")?;
        self.prompt()?;

        loop {
            let line = tokio::select! {
                biased;
                line = lines.next_line() => line?,
                () = interrupted(&mut interrupts) => {
                    tracing::debug!("Interrupted at the prompt");
                    None
                }
            };
            let Some(line) = line else { break };

            match parse_command(&line) {
                Some(Command::Quit) => break,
                Some(command) => self.handle_command(command)?,
                None => self.send(&line, &mut interrupts).await?,
            }
            self.prompt()?;
        }

        writeln!(self.out)?;
        Ok(self.conversation)
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }

    async fn send(&mut self, line: &str, interrupts: &mut Interrupts) -> Result<()> {
        let cancel = CancellationToken::new();
        let mut printed = false;
        let mut write_error: Option<std::io::Error> = None;

        let outcome = {
            let out = &mut self.out;
            let reply = self.conversation.send_with_cancel(
                self.relay,
                line,
                cancel.clone(),
                |delta| {
                    printed = true;
                    if write_error.is_none() {
                        write_error = write!(out, "{delta}").and_then(|()| out.flush()).err();
                    }
                },
            );
            tokio::pin!(reply);

            loop {
                tokio::select! {
                    biased;
                    outcome = &mut reply => break outcome,
                    () = interrupted(interrupts) => {
                        tracing::debug!("Interrupted while streaming");
                        cancel.cancel();
                    }
                }
            }
        };

        if let Some(e) = write_error {
            return Err(e.into());
        }

        match outcome {
            SendOutcome::Ignored => {}
            SendOutcome::Answered(_) => writeln!(self.out)?,
            SendOutcome::Failed(e) => {
                tracing::debug!(error = %e, "Reply replaced by apology");
                let apology = self
                    .conversation
                    .messages()
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                if printed {
                    writeln!(self.out)?;
                }
                writeln!(self.out, "{apology}")?;
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::New => {
                self.conversation.sessions_mut().create();
                writeln!(self.out, "Started a new session.")?;
            }
            Command::Sessions => self.list_sessions()?,
            Command::Switch(n) => match self.conversation.sessions_mut().switch_to_index(n) {
                Ok(session) => {
                    let title = session.title.clone();
                    writeln!(self.out, "Switched to {n}: {title}")?;
                    self.show()?;
                }
                Err(e) => writeln!(self.out, "{e}")?,
            },
            Command::Delete(n) => {
                let id = self.conversation.sessions().list().get(n.wrapping_sub(1)).map(|s| s.id);
                match id.map(|id| self.conversation.sessions_mut().remove(id)) {
                    Some(Ok(removed)) => writeln!(self.out, "Deleted {n}: {}", removed.title)?,
                    Some(Err(e)) => writeln!(self.out, "{e}")?,
                    None => writeln!(self.out, "No session #{n}")?,
                }
            }
            Command::Show => self.show()?,
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Unknown(raw) => writeln!(self.out, "Unknown command: {raw}. Try /help.")?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn list_sessions(&mut self) -> Result<()> {
        let sessions = self.conversation.sessions();
        let active = sessions.active_id();
        let lines: Vec<String> = sessions
            .list()
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let marker = if s.id == active { '*' } else { ' ' };
                format!(
                    "{marker} {}. {} ({} messages, {})",
                    i + 1,
                    s.title,
                    s.messages.len(),
                    s.created_at.format("%Y-%m-%d %H:%M")
                )
            })
            .collect();

        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let rendered: Vec<String> = self
            .conversation
            .messages()
            .iter()
            .map(|m| match m.role {
                Role::User => format!("you: {}\n", m.content),
                Role::Bot => format!("bot:\n{}", format::render_message(&m.content, self.color)),
            })
            .collect();

        for block in rendered {
            write!(self.out, "{block}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::APOLOGY;
    use crate::core::RelayError;
    use crate::core::relay::RelayConfig;
    use crate::providers::mock::{ScriptedGenerator, ScriptedReply};
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::BufReader;

    const GREETING: &str = "Type a message, or /help for commands.\n";

    /// Accepts `budget` bytes, then behaves like a closed pipe.
    struct ClosedAfter {
        budget: usize,
    }

    impl Write for ClosedAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.budget {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.budget -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/new"), Some(Command::New));
        assert_eq!(parse_command(" /switch 2 "), Some(Command::Switch(2)));
        assert_eq!(
            parse_command("/switch"),
            Some(Command::Unknown("/switch".to_string()))
        );
        assert_eq!(parse_command("/exit"), Some(Command::Quit));
    }

    fn relay(generator: &ScriptedGenerator) -> StreamingRelay {
        StreamingRelay::with_config(Arc::new(generator.clone()), RelayConfig::default())
    }

    async fn run(generator: &ScriptedGenerator, input: &str) -> (Conversation, String) {
        let relay = relay(generator);
        let mut out = Vec::new();
        let conversation = Repl::new(&relay, Conversation::new(), &mut out)
            .run(input.as_bytes())
            .await
            .unwrap();
        (conversation, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_reply_is_streamed_to_output() {
        let generator =
            ScriptedGenerator::new().with_reply(ScriptedReply::stream(["Hi", " there"]));
        let (conversation, out) = run(&generator, "Hello\n/quit\n").await;

        assert!(out.contains("> Hi there\n"));
        assert_eq!(conversation.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_prints_apology() {
        let generator = ScriptedGenerator::new().with_reply(ScriptedReply::unauthorized());
        let (_, out) = run(&generator, "Hello\n").await;
        assert!(out.contains(&format!("> {APOLOGY}\n")));
    }

    #[tokio::test]
    async fn test_apology_starts_on_its_own_line_after_printed_text() {
        let generator = ScriptedGenerator::new().with_reply(ScriptedReply::stream(["  "]));
        let (conversation, out) = run(&generator, "Hello\n").await;

        assert!(out.contains(&format!(">   \n{APOLOGY}\n")));
        assert_eq!(conversation.messages().last().unwrap().content, APOLOGY);
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt_ends_the_loop() {
        let generator = ScriptedGenerator::new();
        let relay = relay(&generator);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();
        let (_stdin_writer, stdin) = tokio::io::duplex(64);

        let mut out = Vec::new();
        let conversation = Repl::new(&relay, Conversation::new(), &mut out)
            .with_interrupts(rx)
            .run(BufReader::new(stdin))
            .await
            .unwrap();

        assert!(conversation.messages().is_empty());
        assert_eq!(generator.attempt_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_cancels_only_the_streaming_reply() {
        let generator = ScriptedGenerator::new()
            .with_reply(ScriptedReply::Stalled(vec!["Hal".to_string()]))
            .with_reply(ScriptedReply::stream(["Still here"]));
        let relay = relay(&generator);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(());
        });

        let mut out = Vec::new();
        let conversation = Repl::new(&relay, Conversation::new(), &mut out)
            .with_interrupts(rx)
            .run("Hello\nAgain\n".as_bytes())
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains(&format!("> Hal\n{APOLOGY}\n")));
        assert!(out.contains("> Still here\n"));
        assert_eq!(generator.attempt_count(), 2);
        assert_eq!(conversation.messages().len(), 5);
    }

    #[tokio::test]
    async fn test_write_failure_while_streaming_is_returned() {
        let generator = ScriptedGenerator::new().with_reply(ScriptedReply::stream(["Hi"]));
        let relay = relay(&generator);
        let out = ClosedAfter {
            budget: GREETING.len() + "> ".len(),
        };

        let err = Repl::new(&relay, Conversation::new(), out)
            .run("Hello\n".as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn test_session_commands() {
        let generator = ScriptedGenerator::new()
            .with_reply(ScriptedReply::stream(["one"]))
            .with_reply(ScriptedReply::stream(["two"]));
        let input = "First\n/new\nSecond\n/sessions\n/switch 1\n/delete 2\n/switch 9\n";
        let (conversation, out) = run(&generator, input).await;

        assert!(out.contains("Started a new session."));
        assert!(out.contains("* 2. Second (2 messages"));
        assert!(out.contains("Switched to 1: First"));
        assert!(out.contains("bot:\none\n"));
        assert!(out.contains("Deleted 2: Second"));
        assert!(out.contains("Session not found: #9"));
        assert_eq!(conversation.sessions().list().len(), 1);
        assert_eq!(generator.attempt_count(), 2);
    }
}
