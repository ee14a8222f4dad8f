/// Work item state definitions for tracking fan-out progress
///
/// Each work item moves through
/// `Pending -> FetchedPage -> (Paginating -> FetchedPage)* -> Done | Failed`,
/// or goes straight from `Pending` to `Skipped` when the error budget is
/// exhausted before it is admitted.
use std::fmt;

/// Represents the current state of one work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Item is waiting for admission
    Pending,

    /// At least one page of the item has been fetched and extracted
    FetchedPage,

    /// Item is moving on to its next page
    Paginating,

    // ===== Terminal States =====
    /// All pages of the item were processed
    Done,

    /// Item stopped on a navigation or provider failure
    Failed,

    /// Item was never admitted because the error budget was exhausted
    Skipped,
}

impl ItemState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, next),
            (Pending, FetchedPage)
                | (Pending, Skipped)
                | (Pending, Failed)
                | (FetchedPage, Paginating)
                | (FetchedPage, Done)
                | (FetchedPage, Failed)
                | (Paginating, FetchedPage)
                | (Paginating, Failed)
        )
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FetchedPage => "fetched_page",
            Self::Paginating => "paginating",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state of a single work item, refusing illegal transitions
#[derive(Debug, Clone)]
pub struct ItemTracker {
    state: ItemState,
    pages: u32,
}

impl Default for ItemTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemTracker {
    pub fn new() -> Self {
        Self {
            state: ItemState::Pending,
            pages: 0,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Number of pages fetched so far
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Moves to `next`; illegal transitions are logged and ignored
    pub fn advance(&mut self, next: ItemState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!("Invalid item state transition: {} -> {}", self.state, next);
            return false;
        }
        if next == ItemState::FetchedPage {
            self.pages += 1;
        }
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!ItemState::Pending.is_terminal());
        assert!(!ItemState::FetchedPage.is_terminal());
        assert!(!ItemState::Paginating.is_terminal());

        assert!(ItemState::Done.is_terminal());
        assert!(ItemState::Failed.is_terminal());
        assert!(ItemState::Skipped.is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(ItemState::Done.is_success());
        assert!(!ItemState::Failed.is_success());
        assert!(!ItemState::Skipped.is_success());
    }

    #[test]
    fn test_pagination_cycle() {
        let mut tracker = ItemTracker::new();
        assert!(tracker.advance(ItemState::FetchedPage));
        assert!(tracker.advance(ItemState::Paginating));
        assert!(tracker.advance(ItemState::FetchedPage));
        assert!(tracker.advance(ItemState::Done));

        assert_eq!(tracker.state(), ItemState::Done);
        assert_eq!(tracker.pages(), 2);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut tracker = ItemTracker::new();
        assert!(tracker.advance(ItemState::Skipped));
        assert!(!tracker.advance(ItemState::FetchedPage));
        assert_eq!(tracker.state(), ItemState::Skipped);
    }

    #[test]
    fn test_cannot_finish_without_a_page() {
        assert!(!ItemState::Pending.can_transition_to(ItemState::Done));
        assert!(!ItemState::Paginating.can_transition_to(ItemState::Done));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ItemState::FetchedPage), "fetched_page");
        assert_eq!(format!("{}", ItemState::Skipped), "skipped");
    }
}
