use std::time::Duration;

use crate::{dom::Document, timer::Timer};

pub const FLASH_SELECTOR: &str = ".messages li";
pub const FLASH_LIFETIME: Duration = Duration::from_millis(3000);

/// Flash messages captured at page load, removed once their lifetime is up.
#[derive(Debug)]
pub struct FlashDismissal<N> {
    messages: Vec<N>,
    lifetime: Duration,
}

impl<N> FlashDismissal<N> {
    pub fn capture<D>(doc: &D) -> Self
    where
        D: Document<Node = N> + ?Sized,
    {
        Self {
            messages: doc.select_all(FLASH_SELECTOR),
            lifetime: FLASH_LIFETIME,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Waits out the lifetime, then removes every captured message.
    /// Returns how many messages were captured.
    pub async fn run<D, T>(self, doc: &D, timer: &T) -> usize
    where
        D: Document<Node = N> + ?Sized,
        T: Timer + ?Sized,
    {
        tracing::debug!(
            "Dismissing {} flash messages in {:?}",
            self.messages.len(),
            self.lifetime
        );

        timer.sleep(self.lifetime).await;

        for message in &self.messages {
            doc.remove(message);
        }

        self.messages.len()
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{headless::HeadlessDocument, timer::TokioTimer};

    fn page_with_messages(count: usize) -> HeadlessDocument {
        (0..count).fold(HeadlessDocument::new(), |doc, i| {
            doc.with_node(FLASH_SELECTOR, &format!("message {i}"))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn removes_all_messages_after_lifetime() {
        for count in [0, 1, 5] {
            let doc = page_with_messages(count);
            let dismissal = FlashDismissal::capture(&doc);
            assert_eq!(dismissal.len(), count);

            let removed = dismissal.run(&doc, &TokioTimer).await;

            assert_eq!(removed, count);
            assert!(doc.attached(FLASH_SELECTOR).is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_messages_until_lifetime_elapses() {
        let doc = page_with_messages(3);
        let dismissal = FlashDismissal::capture(&doc);

        let run = dismissal.run(&doc, &TokioTimer);
        tokio::pin!(run);

        let early = tokio::time::timeout(FLASH_LIFETIME - Duration::from_millis(1), &mut run).await;
        assert!(early.is_err());
        assert_eq!(doc.attached(FLASH_SELECTOR).len(), 3);

        assert_eq!(run.await, 3);
        assert!(doc.attached(FLASH_SELECTOR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tolerates_messages_removed_in_the_meantime() {
        let doc = page_with_messages(2);
        let dismissal = FlashDismissal::capture(&doc);

        for node in doc.select_all(FLASH_SELECTOR) {
            doc.remove(&node);
        }

        assert_eq!(dismissal.run(&doc, &TokioTimer).await, 2);
        assert!(doc.attached(FLASH_SELECTOR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_messages_added_after_capture() {
        let doc = page_with_messages(1);
        let dismissal = FlashDismissal::capture(&doc);
        let doc = doc.with_node(FLASH_SELECTOR, "late");

        dismissal.run(&doc, &TokioTimer).await;

        assert_eq!(doc.attached(FLASH_SELECTOR), vec!["late".to_string()]);
    }
}
