use futures::future::BoxFuture;

/// Which way a navigation button moves the page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Back,
    Next,
}

impl Nav {
    pub const BACK_ID: &'static str = "back";
    pub const NEXT_ID: &'static str = "next";

    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            Self::BACK_ID => Some(Self::Back),
            Self::NEXT_ID => Some(Self::Next),
            _ => None,
        }
    }

    pub fn custom_id(&self) -> &'static str {
        match self {
            Self::Back => Self::BACK_ID,
            Self::Next => Self::NEXT_ID,
        }
    }
}

/// Position of the visible window over the page list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerState {
    index: usize,
    display_amount: usize,
    total: usize,
}

impl PagerState {
    pub fn new(display_amount: usize, total: usize) -> Self {
        Self {
            index: 0,
            display_amount: display_amount.max(1),
            total,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Half-open range of pages currently visible, never past the last page.
    pub fn window(&self) -> (usize, usize) {
        let start = self.index.min(self.total);
        let end = (self.index + self.display_amount).min(self.total);
        (start, end)
    }

    pub fn back_disabled(&self) -> bool {
        self.index == 0
    }

    pub fn next_disabled(&self) -> bool {
        self.index + self.display_amount >= self.total
    }

    /// More than one page exists, so navigation is possible at all.
    pub fn is_navigable(&self) -> bool {
        self.total > 1 && self.total > self.display_amount
    }

    fn last_index(&self) -> usize {
        self.total.saturating_sub(self.display_amount)
    }

    /// Applies one button press. Returns false when the press was a no-op.
    pub fn apply(&mut self, nav: Nav) -> bool {
        let previous = self.index;
        self.index = match nav {
            Nav::Next => (self.index + 1).min(self.last_index()),
            Nav::Back => self.index.saturating_sub(1),
        };
        previous != self.index
    }
}

/// Lazily computed attachments for one page.
pub type AttachmentProducer<A> = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Vec<A>>> + Send>;

enum Attachments<A> {
    None,
    Ready(Vec<A>),
    Pending(AttachmentProducer<A>),
}

struct Entry<P, A> {
    page: P,
    attachments: Attachments<A>,
}

/// Ordered pages, each with optional and possibly memoized attachments.
pub struct PageStore<P, A> {
    entries: Vec<Entry<P, A>>,
}

impl<P, A> Default for PageStore<P, A> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<P, A: Clone> PageStore<P, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn add(&mut self, page: P) {
        self.entries.push(Entry { page, attachments: Attachments::None });
    }

    pub fn add_with_attachment(&mut self, page: P, attachments: Vec<A>) {
        self.entries.push(Entry { page, attachments: Attachments::Ready(attachments) });
    }

    pub fn add_with_memoize<F>(&mut self, page: P, producer: F)
    where
        F: FnOnce() -> BoxFuture<'static, anyhow::Result<Vec<A>>> + Send + 'static,
    {
        self.entries.push(Entry { page, attachments: Attachments::Pending(Box::new(producer)) });
    }

    pub fn pages(&self, start: usize, end: usize) -> impl Iterator<Item = &P> {
        self.entries[start..end].iter().map(|entry| &entry.page)
    }

    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut P> {
        self.entries.iter_mut().map(|entry| &mut entry.page)
    }

    /// Panics if `index` is out of range.
    pub async fn get_attachment(&mut self, index: usize) -> &[A] {
        let entry = &mut self.entries[index];
        if let Attachments::Pending(_) = entry.attachments {
            let Attachments::Pending(producer) = std::mem::replace(&mut entry.attachments, Attachments::None) else {
                unreachable!()
            };
            let resolved = match producer().await {
                Ok(attachments) => attachments,
                Err(err) => {
                    log::warn!("Unable to produce attachments for page {}: {:#}", index + 1, err);
                    Vec::new()
                }
            };
            entry.attachments = Attachments::Ready(resolved);
        }

        match &entry.attachments {
            Attachments::Ready(attachments) => attachments.as_slice(),
            _ => &[],
        }
    }

    pub async fn get_attachment_range(&mut self, start: usize, end: usize) -> Vec<A> {
        let mut attachments = Vec::new();
        for index in start..end {
            attachments.extend_from_slice(self.get_attachment(index).await);
        }
        attachments
    }
}

/// Everything needed to draw the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<P, A> {
    pub pages: Vec<P>,
    pub attachments: Vec<A>,
    pub back_disabled: bool,
    pub next_disabled: bool,
}

impl<P: Clone, A: Clone> PageStore<P, A> {
    pub async fn render(&mut self, state: &PagerState) -> PageView<P, A> {
        let (start, end) = state.window();
        PageView {
            pages: self.pages(start, end).cloned().collect(),
            attachments: self.get_attachment_range(start, end).await,
            back_disabled: state.back_disabled(),
            next_disabled: state.next_disabled(),
        }
    }
}
