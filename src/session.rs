use std::time::Duration;

use futures::{Stream, StreamExt};
use serenity::all::{ComponentInteraction, MessageId, UserId};
use serenity::async_trait;

use crate::pager::{Nav, PageStore, PageView, PagerState};

/// A button press as delivered by a collector.
pub trait Press: Send + Sync {
    fn nav(&self) -> Option<Nav>;
}

impl Press for ComponentInteraction {
    fn nav(&self) -> Option<Nav> {
        Nav::from_custom_id(&self.data.custom_id)
    }
}

impl Press for Nav {
    fn nav(&self) -> Option<Nav> {
        Some(*self)
    }
}

/// The live message a session draws on.
#[async_trait]
pub trait PagerMessage<P, A>: Send {
    type Press: Press;

    /// Tells Discord the press was received, before the next window is rendered.
    async fn acknowledge(&mut self, press: &Self::Press) -> anyhow::Result<()>;

    /// Redraws the message with `view` in answer to `press`.
    async fn update(&mut self, press: Self::Press, view: PageView<P, A>) -> anyhow::Result<()>;

    /// Strips every component from the message.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Which presses belong to a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionFilter {
    pub message_id: MessageId,
    pub user_id: UserId,
}

impl SessionFilter {
    pub fn accepts(&self, message_id: MessageId, user_id: UserId, custom_id: &str) -> bool {
        message_id == self.message_id
            && user_id == self.user_id
            && Nav::from_custom_id(custom_id).is_some()
    }
}

/// Pager state bound to one sent message until its deadline passes.
pub struct Session<P, A> {
    store: PageStore<P, A>,
    state: PagerState,
    ttl: Duration,
}

impl<P, A> Session<P, A>
where
    P: Clone + Send,
    A: Clone + Send,
{
    pub fn new(store: PageStore<P, A>, state: PagerState, ttl: Duration) -> Self {
        Self { store, state, ttl }
    }

    /// Consumes presses in arrival order until the deadline, then closes the
    /// message. Returns how many presses were redrawn. A failed redraw is
    /// logged and the session keeps listening.
    pub async fn run<S, M>(mut self, presses: S, message: &mut M) -> anyhow::Result<usize>
    where
        S: Stream<Item = M::Press> + Send,
        M: PagerMessage<P, A>,
    {
        let deadline = tokio::time::sleep(self.ttl);
        let mut presses = Box::pin(presses.take_until(deadline));
        let mut handled = 0;

        while let Some(press) = presses.next().await {
            let Some(nav) = press.nav() else {
                continue;
            };
            // Rendering may download attachments, which can outlast the acknowledgement window.
            if let Err(err) = message.acknowledge(&press).await {
                log::warn!("Unable to acknowledge a pager press: {err:#}");
            }
            self.state.apply(nav);
            let view = self.store.render(&self.state).await;
            match message.update(press, view).await {
                Ok(()) => handled += 1,
                Err(err) => log::warn!("Unable to redraw the pager at page {}: {err:#}", self.state.index() + 1),
            }
        }

        // Dropping the stream unregisters the collector before the buttons go away.
        drop(presses);
        message.close().await?;
        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use futures::{stream, FutureExt};
    use tokio::time::Instant;

    use super::*;

    #[derive(Default)]
    struct RecordingMessage {
        acked_at: Vec<Instant>,
        updated_at: Vec<Instant>,
        updates: Vec<(Nav, PageView<u32, String>)>,
        closes: usize,
        /// Number of leading updates that fail.
        failing_updates: usize,
    }

    #[async_trait]
    impl PagerMessage<u32, String> for RecordingMessage {
        type Press = Nav;

        async fn acknowledge(&mut self, _press: &Nav) -> anyhow::Result<()> {
            self.acked_at.push(Instant::now());
            Ok(())
        }

        async fn update(&mut self, press: Nav, view: PageView<u32, String>) -> anyhow::Result<()> {
            if self.failing_updates > 0 {
                self.failing_updates -= 1;
                anyhow::bail!("interaction token expired");
            }
            self.updated_at.push(Instant::now());
            self.updates.push((press, view));
            Ok(())
        }

        async fn close(&mut self) -> anyhow::Result<()> {
            self.closes += 1;
            Ok(())
        }
    }

    fn session(total: u32, display_amount: usize, ttl: Duration) -> Session<u32, String> {
        let mut store = PageStore::new();
        for page in 0..total {
            store.add(page);
        }
        Session::new(store, PagerState::new(display_amount, total as usize), ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn presses_are_handled_until_timeout() {
        let mut message = RecordingMessage::default();
        let presses = stream::iter(vec![Nav::Next, Nav::Next, Nav::Back]).chain(stream::pending());

        let handled = session(5, 2, Duration::from_secs(35)).run(presses, &mut message).await.unwrap();

        assert_eq!(handled, 3);
        assert_eq!(message.closes, 1);
        let pages: Vec<Vec<u32>> = message.updates.iter().map(|(_, view)| view.pages.clone()).collect();
        assert_eq!(pages, vec![vec![1, 2], vec![2, 3], vec![1, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_press_after_deadline_is_ignored() {
        let mut message = RecordingMessage::default();
        let presses = stream::iter(vec![Nav::Next]).then(|nav| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            nav
        });

        let handled = session(3, 1, Duration::from_secs(21)).run(presses, &mut message).await.unwrap();

        assert_eq!(handled, 0);
        assert!(message.updates.is_empty());
        assert_eq!(message.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clamped_presses_still_redraw() {
        let mut message = RecordingMessage::default();
        let presses = stream::iter(vec![Nav::Next, Nav::Next, Nav::Next]);

        session(2, 1, Duration::from_secs(14)).run(presses, &mut message).await.unwrap();

        let last = &message.updates.last().unwrap().1;
        assert_eq!(last.pages, vec![1]);
        assert!(last.next_disabled);
        assert!(!last.back_disabled);
        assert_eq!(message.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_keeps_the_session_alive() {
        let mut message = RecordingMessage { failing_updates: 1, ..Default::default() };
        let presses = stream::iter(vec![Nav::Next, Nav::Next, Nav::Next]);

        let handled = session(5, 1, Duration::from_secs(35)).run(presses, &mut message).await.unwrap();

        assert_eq!(handled, 2);
        assert_eq!(message.acked_at.len(), 3);
        let pages: Vec<Vec<u32>> = message.updates.iter().map(|(_, view)| view.pages.clone()).collect();
        assert_eq!(pages, vec![vec![2], vec![3]]);
        assert_eq!(message.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn presses_are_acknowledged_before_slow_attachments_resolve() {
        let mut store = PageStore::new();
        store.add(0);
        store.add_with_memoize(1, || {
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(vec!["preview.jpg".to_owned()])
            }
            .boxed()
        });

        let mut message = RecordingMessage::default();
        let presses = stream::iter(vec![Nav::Next]);
        Session::new(store, PagerState::new(1, 2), Duration::from_secs(60))
            .run(presses, &mut message)
            .await
            .unwrap();

        assert_eq!(message.acked_at.len(), 1);
        assert_eq!(message.updated_at[0] - message.acked_at[0], Duration::from_secs(10));
        assert_eq!(message.updates[0].1.attachments, vec!["preview.jpg".to_owned()]);
    }

    #[test]
    fn filter_only_accepts_requester_on_same_message() {
        let filter = SessionFilter { message_id: MessageId::new(10), user_id: UserId::new(20) };

        assert!(filter.accepts(MessageId::new(10), UserId::new(20), "next"));
        assert!(filter.accepts(MessageId::new(10), UserId::new(20), "back"));
        assert!(!filter.accepts(MessageId::new(10), UserId::new(21), "next"));
        assert!(!filter.accepts(MessageId::new(11), UserId::new(20), "next"));
        assert!(!filter.accepts(MessageId::new(10), UserId::new(20), "vote1"));
    }
}
