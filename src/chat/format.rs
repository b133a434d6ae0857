use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

static STEP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("valid regex"));
static BOLD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").expect("valid regex"));

const FENCE: &str = "```";
const BULLET: &str = "- ";

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Fenced code, every line terminated by `\n`.
    Code(String),
    /// A numbered line, renumbered from 1 in order of appearance.
    Step { number: usize, spans: Vec<Span> },
    Bullet(Vec<Span>),
    Paragraph(Vec<Span>),
}

/// Splits bot text into display blocks, one per line outside code fences.
#[must_use]
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut code: Option<String> = None;
    let mut steps = 0;

    for line in text.split('\n') {
        if line.starts_with(FENCE) {
            match code.take() {
                Some(content) => blocks.push(Block::Code(content)),
                None => code = Some(String::new()),
            }
            continue;
        }

        if let Some(content) = code.as_mut() {
            content.push_str(line);
            content.push('\n');
            continue;
        }

        if let Some(marker) = STEP_REGEX.find(line) {
            steps += 1;
            blocks.push(Block::Step {
                number: steps,
                spans: parse_spans(&line[marker.end()..]),
            });
        } else if let Some(rest) = line.strip_prefix(BULLET) {
            blocks.push(Block::Bullet(parse_spans(rest)));
        } else {
            blocks.push(Block::Paragraph(parse_spans(line)));
        }
    }

    if let Some(content) = code {
        blocks.push(Block::Code(content));
    }

    blocks
}

#[must_use]
pub fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for bold in BOLD_REGEX.find_iter(line) {
        if bold.start() > last {
            spans.push(Span::Text(line[last..bold.start()].to_string()));
        }
        let inner = &bold.as_str()[2..bold.as_str().len() - 2];
        spans.push(Span::Bold(inner.to_string()));
        last = bold.end();
    }

    if last < line.len() {
        spans.push(Span::Text(line[last..].to_string()));
    }

    spans
}

/// Renders blocks as terminal text. Without colour, bold text loses its
/// markers and code is only indented.
#[must_use]
pub fn render(blocks: &[Block], color: bool) -> String {
    let mut out = String::new();

    for block in blocks {
        match block {
            Block::Code(content) => {
                for line in content.lines() {
                    if color {
                        let _ = writeln!(out, "    {ANSI_DIM}{line}{ANSI_RESET}");
                    } else {
                        let _ = writeln!(out, "    {line}");
                    }
                }
            }
            Block::Step { number, spans } => {
                if color {
                    let _ = write!(out, "  {ANSI_BOLD}{number}.{ANSI_RESET} ");
                } else {
                    let _ = write!(out, "  {number}. ");
                }
                render_spans(&mut out, spans, color);
                out.push('\n');
            }
            Block::Bullet(spans) => {
                out.push_str("  \u{2022} ");
                render_spans(&mut out, spans, color);
                out.push('\n');
            }
            Block::Paragraph(spans) => {
                render_spans(&mut out, spans, color);
                out.push('\n');
            }
        }
    }

    out
}

fn render_spans(out: &mut String, spans: &[Span], color: bool) {
    for span in spans {
        match span {
            Span::Text(text) => out.push_str(text),
            Span::Bold(text) if color => {
                let _ = write!(out, "{ANSI_BOLD}{text}{ANSI_RESET}");
            }
            Span::Bold(text) => out.push_str(text),
        }
    }
}

#[must_use]
pub fn render_message(text: &str, color: bool) -> String {
    render(&parse(text), color)
}
