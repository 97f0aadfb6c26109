//! Streaming reveal (typewriter) effect.
//!
//! A finished assistant message is revealed one character per timer tick at
//! a configured milliseconds-per-character pace. The effect is an explicit
//! cancelable scheduled task: the owning view holds a [`Revealer`], and a
//! restart or teardown aborts the in-flight timer so no tick can mutate
//! state afterwards.

use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default reveal pace, in milliseconds per character.
pub const DEFAULT_SPEED_MS: u64 = 20;

/// One step of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// The next, one-character-longer prefix of the full text.
    Prefix(String),
    /// The reveal finished. Emitted exactly once, after the full prefix
    /// (immediately, for empty text). The empty prefix is the initial
    /// rendered state before the first tick.
    Done,
}

/// Lazily produce the time-paced prefix sequence for `text`.
///
/// For a text of n characters the stream yields n `Prefix` steps followed by
/// a single `Done`. Dropping the stream cancels the pending ticks.
pub fn reveal(text: String, speed: Duration) -> impl Stream<Item = RevealStep> + Send {
    async_stream::stream! {
        let chars: Vec<char> = text.chars().collect();
        let mut prefix = String::with_capacity(text.len());

        for ch in chars {
            tokio::time::sleep(speed).await;
            prefix.push(ch);
            yield RevealStep::Prefix(prefix.clone());
        }

        yield RevealStep::Done;
    }
}

/// Handle owning at most one running reveal task.
///
/// At most one timer is active per handle: starting a new reveal aborts the
/// previous one first, so two reveals can never interleave.
#[derive(Debug, Default)]
pub struct Revealer {
    task: Option<JoinHandle<()>>,
}

impl Revealer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin revealing `text`, canceling any reveal still in progress.
    ///
    /// Steps arrive on the returned channel; the channel closes after the
    /// terminal [`RevealStep::Done`].
    pub fn start(
        &mut self,
        text: String,
        speed: Duration,
    ) -> mpsc::UnboundedReceiver<RevealStep> {
        self.cancel();

        let (tx, rx) = mpsc::unbounded_channel();
        self.task = Some(tokio::spawn(async move {
            let chars: Vec<char> = text.chars().collect();
            let mut prefix = String::with_capacity(text.len());

            for ch in chars {
                tokio::time::sleep(speed).await;
                prefix.push(ch);
                if tx.send(RevealStep::Prefix(prefix.clone())).is_err() {
                    // Receiver gone: the view navigated away.
                    return;
                }
            }
            let _ = tx.send(RevealStep::Done);
        }));

        rx
    }

    /// Abort the pending timer, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a reveal task is still attached to this handle.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Revealer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn test_reveal_emits_every_prefix_then_done_once() {
        let steps: Vec<RevealStep> = reveal("abc".to_string(), Duration::from_millis(20))
            .collect()
            .await;

        assert_eq!(
            steps,
            vec![
                RevealStep::Prefix("a".to_string()),
                RevealStep::Prefix("ab".to_string()),
                RevealStep::Prefix("abc".to_string()),
                RevealStep::Done,
            ]
        );
        let done_count = steps.iter().filter(|s| **s == RevealStep::Done).count();
        assert_eq!(done_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_completes_immediately() {
        let steps: Vec<RevealStep> = reveal(String::new(), Duration::from_millis(20))
            .collect()
            .await;
        assert_eq!(steps, vec![RevealStep::Done]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multibyte_text_reveals_per_character() {
        let steps: Vec<RevealStep> = reveal("Dư nợ".to_string(), Duration::from_millis(1))
            .collect()
            .await;
        // 5 characters -> 5 prefixes + Done.
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], RevealStep::Prefix("D".to_string()));
        assert_eq!(steps[4], RevealStep::Prefix("Dư nợ".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_reveal() {
        let mut revealer = Revealer::new();
        let mut first = revealer.start("aaaa".to_string(), Duration::from_millis(50));
        let mut second = revealer.start("bb".to_string(), Duration::from_millis(10));

        let mut collected = Vec::new();
        while let Some(step) = second.recv().await {
            collected.push(step);
        }
        assert_eq!(
            collected,
            vec![
                RevealStep::Prefix("b".to_string()),
                RevealStep::Prefix("bb".to_string()),
                RevealStep::Done,
            ]
        );

        // The superseded reveal was aborted: its channel closes without
        // delivering a completion.
        assert!(!first.recv().await.is_some_and(|s| s == RevealStep::Done));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_ticks() {
        let mut revealer = Revealer::new();
        let mut rx = revealer.start("abc".to_string(), Duration::from_millis(100));
        revealer.cancel();

        // Channel closes with no further steps.
        assert!(rx.recv().await.is_none());
        assert!(!revealer.is_running());
    }
}
