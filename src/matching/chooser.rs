//! Disambiguation between several plausible candidates.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use console::style;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::{Mutex as AsyncMutex, Notify};

use crate::models::ScoredCandidate;

/// Outcome of presenting candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the presented candidates.
    Pick(usize),
    Cancel,
}

/// Parse a 1-based choice. `0`, blank, non-numeric and out-of-range input
/// all cancel.
pub fn parse_selection(input: &str, count: usize) -> Selection {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Selection::Pick(n - 1),
        _ => Selection::Cancel,
    }
}

/// Something that can pick one of several candidates for a query.
#[async_trait]
pub trait Chooser: Send + Sync {
    async fn present(&self, query: &str, candidates: &[ScoredCandidate]) -> Selection;
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

/// Ctrl-C delivery point for an open prompt. While a prompt is waiting for
/// input, an interrupt cancels only that prompt.
#[derive(Clone, Default)]
pub struct PromptInterrupt {
    inner: Arc<PromptInner>,
}

#[derive(Default)]
struct PromptInner {
    open: AtomicBool,
    notify: Notify,
}

impl PromptInterrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Interrupt the open prompt. Returns `false` when no prompt is open.
    pub fn interrupt(&self) -> bool {
        if self.is_open() {
            self.inner.notify.notify_waiters();
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for PromptInterrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptInterrupt")
            .field("open", &self.is_open())
            .finish()
    }
}

/// Clears the open mark when the prompt ends, however it ends.
struct OpenPrompt<'a>(&'a PromptInterrupt);

impl Drop for OpenPrompt<'_> {
    fn drop(&mut self) {
        self.0.inner.open.store(false, Ordering::SeqCst);
    }
}

type InputLines = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Prompts on the terminal and reads the answer from an input stream
/// (stdin unless given another).
pub struct TerminalChooser {
    input: AsyncMutex<InputLines>,
    interrupt: PromptInterrupt,
}

impl TerminalChooser {
    pub fn new(interrupt: PromptInterrupt) -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()), interrupt)
    }

    pub fn with_input<R>(input: R, interrupt: PromptInterrupt) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let input: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(input);
        Self {
            input: AsyncMutex::new(input.lines()),
            interrupt,
        }
    }

    /// Next input line, or `None` on end of input, read errors and interrupts.
    async fn read_answer(&self, prompt: &str) -> Option<String> {
        let mut input = self.input.lock().await;

        let interrupted = self.interrupt.inner.notify.notified();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();
        self.interrupt.inner.open.store(true, Ordering::SeqCst);
        let _open = OpenPrompt(&self.interrupt);

        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        tokio::select! {
            line = input.next_line() => line.ok().flatten(),
            _ = &mut interrupted => {
                println!();
                None
            }
        }
    }
}

impl std::fmt::Debug for TerminalChooser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalChooser")
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Chooser for TerminalChooser {
    async fn present(&self, query: &str, candidates: &[ScoredCandidate]) -> Selection {
        if candidates.is_empty() {
            return Selection::Cancel;
        }

        println!(
            "\n{} Multiple projects found for '{}'. Please select:",
            style("?").yellow(),
            query
        );
        println!("  0. Cancel");
        for (i, candidate) in candidates.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                truncate(candidate.title(), 60),
                style(format!(
                    "(score {:.2}, via '{}')",
                    candidate.score, candidate.source_variant
                ))
                .dim()
            );
            println!(
                "     {} {} | {}",
                style("ID:").dim(),
                candidate.id(),
                truncate(&candidate.record.description, 80)
            );
        }

        let count = candidates.len();
        let prompt = format!("Enter your choice (0-{}): ", count);
        let selection = match self.read_answer(&prompt).await {
            Some(input) => parse_selection(&input, count),
            None => Selection::Cancel,
        };
        match selection {
            Selection::Pick(index) => {
                println!("{} Selected: {}", style("✓").green(), candidates[index].title());
            }
            Selection::Cancel => {
                println!("{} Cancelled", style("✗").red());
            }
        }
        selection
    }
}

/// Answers prompts from a queue of canned inputs; an exhausted queue
/// behaves like end of input.
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    inputs: Mutex<VecDeque<String>>,
    presented: AtomicUsize,
    last_shown: Mutex<Vec<String>>,
}

impl ScriptedChooser {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Mutex::new(inputs.into_iter().map(Into::into).collect()),
            presented: AtomicUsize::new(0),
            last_shown: Mutex::new(Vec::new()),
        }
    }

    /// How many times candidates were presented.
    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    /// Project ids of the most recent presentation, in display order.
    pub fn last_shown(&self) -> Vec<String> {
        self.last_shown
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Chooser for ScriptedChooser {
    async fn present(&self, _query: &str, candidates: &[ScoredCandidate]) -> Selection {
        self.presented.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut shown) = self.last_shown.lock() {
            *shown = candidates.iter().map(|c| c.id().to_string()).collect();
        }
        let next = self
            .inputs
            .lock()
            .ok()
            .and_then(|mut inputs| inputs.pop_front());
        match next {
            Some(input) => parse_selection(&input, candidates.len()),
            None => Selection::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRecord, MatchType};

    fn scored(id: &str) -> ScoredCandidate {
        ScoredCandidate {
            record: CandidateRecord::new(id, format!("Project {}", id), "", ""),
            score: 0.5,
            match_type: MatchType::Fuzzy,
            source_variant: "q".to_string(),
        }
    }

    #[test]
    fn parse_selection_rules() {
        assert_eq!(parse_selection("2", 3), Selection::Pick(1));
        assert_eq!(parse_selection(" 1\n", 3), Selection::Pick(0));
        assert_eq!(parse_selection("0", 3), Selection::Cancel);
        assert_eq!(parse_selection("9", 3), Selection::Cancel);
        assert_eq!(parse_selection("abc", 3), Selection::Cancel);
        assert_eq!(parse_selection("", 3), Selection::Cancel);
        assert_eq!(parse_selection("-1", 3), Selection::Cancel);
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[tokio::test]
    async fn terminal_chooser_reads_answers_from_input() {
        use tokio::io::AsyncWriteExt;

        let (mut writer, reader) = tokio::io::duplex(64);
        let chooser = TerminalChooser::with_input(BufReader::new(reader), PromptInterrupt::new());
        let candidates = vec![scored("1"), scored("2"), scored("3")];

        writer.write_all(b"2\n9\n").await.unwrap();
        assert_eq!(chooser.present("q", &candidates).await, Selection::Pick(1));
        assert_eq!(chooser.present("q", &candidates).await, Selection::Cancel);

        drop(writer);
        assert_eq!(chooser.present("q", &candidates).await, Selection::Cancel);
    }

    #[tokio::test]
    async fn interrupted_prompt_cancels_and_next_prompt_still_reads() {
        use std::time::Duration;
        use tokio::io::AsyncWriteExt;

        let interrupt = PromptInterrupt::new();
        let (mut writer, reader) = tokio::io::duplex(64);
        let chooser = Arc::new(TerminalChooser::with_input(
            BufReader::new(reader),
            interrupt.clone(),
        ));
        let candidates = vec![scored("1"), scored("2")];

        assert!(!interrupt.interrupt());

        let pending = {
            let chooser = chooser.clone();
            let candidates = candidates.clone();
            tokio::spawn(async move { chooser.present("q", &candidates).await })
        };
        while !interrupt.is_open() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(interrupt.interrupt());
        let selection = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selection, Selection::Cancel);

        writer.write_all(b"1\n").await.unwrap();
        assert_eq!(chooser.present("q", &candidates).await, Selection::Pick(0));
    }

    #[tokio::test]
    async fn scripted_chooser_consumes_inputs() {
        let chooser = ScriptedChooser::new(["2", "0"]);
        let candidates = vec![scored("1"), scored("2")];

        assert_eq!(chooser.present("q", &candidates).await, Selection::Pick(1));
        assert_eq!(chooser.present("q", &candidates).await, Selection::Cancel);
        // Exhausted queue acts like EOF.
        assert_eq!(chooser.present("q", &candidates).await, Selection::Cancel);
        assert_eq!(chooser.presented(), 3);
    }
}
