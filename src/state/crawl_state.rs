/// Crawl state definitions for tracking crawl progress
///
/// Page numbers start at 1.
use std::fmt;

/// Represents where the crawl driver is in its page loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Run row created, start page not yet loaded
    Init,

    /// Waiting for page N to finish rendering
    Loading(u32),

    /// Reading quotes from page N and inserting them
    Extracting(u32),

    /// Deciding whether to move past page N
    Advancing(u32),

    /// Browser closed and store flushed; no further transitions
    Done,
}

impl CrawlState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Page number the state refers to, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Loading(n) | Self::Extracting(n) | Self::Advancing(n) => Some(*n),
            Self::Init | Self::Done => None,
        }
    }

    /// Checks whether moving from `self` to `next` is allowed
    ///
    /// The page loop is `Init -> Loading(1) -> Extracting(1) -> Advancing(1)
    /// -> Loading(2) ...`. Any non-terminal state may end in `Done`.
    pub fn can_transition_to(&self, next: &CrawlState) -> bool {
        match (self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (Self::Init, Self::Loading(1)) => true,
            (Self::Loading(n), Self::Extracting(m)) => n == m,
            (Self::Extracting(n), Self::Advancing(m)) => n == m,
            (Self::Advancing(n), Self::Loading(m)) => n.checked_add(1) == Some(*m),
            _ => false,
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Loading(n) => write!(f, "loading page {}", n),
            Self::Extracting(n) => write!(f, "extracting page {}", n),
            Self::Advancing(n) => write!(f, "advancing from page {}", n),
            Self::Done => write!(f, "done"),
        }
    }
}
