//! Pure state machine for the item creation steps.
//!
//! ```text
//! Import    ── import complete ─────▶ Details
//! Details   ── emote editor ────────▶ Thumbnail
//! Thumbnail ── back / screenshot ───▶ Details
//! Details   ── emote submit ────────▶ SetPrice
//! Details   ── persisted ───────────▶ Closed
//! SetPrice  ── persisted ───────────▶ Closed
//! ```

use builder_types::ItemKind;
use strum::Display;
use tracing::info;

use crate::error::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum CreateItemView {
    #[default]
    Import,
    Details,
    Thumbnail,
    SetPrice,
    /// The item was persisted; nothing is revisited afterwards.
    Closed,
}

/// What the import step has produced so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSnapshot {
    pub has_thumbnail: bool,
    pub has_contents: bool,
    pub has_kind: bool,
    pub is_loading: bool,
}

impl ImportSnapshot {
    pub fn is_complete(&self) -> bool {
        self.has_thumbnail && self.has_contents && self.has_kind && !self.is_loading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// The import data changed.
    ImportProgress(ImportSnapshot),
    OpenThumbnailEditor { kind: ItemKind },
    CloseThumbnailEditor,
    ScreenshotCaptured,
    RequestPricing { kind: ItemKind },
    Persisted,
}

impl ViewEvent {
    fn name(&self) -> &'static str {
        match self {
            ViewEvent::ImportProgress(_) => "report import progress",
            ViewEvent::OpenThumbnailEditor { .. } => "open the thumbnail editor",
            ViewEvent::CloseThumbnailEditor => "close the thumbnail editor",
            ViewEvent::ScreenshotCaptured => "capture a screenshot",
            ViewEvent::RequestPricing { .. } => "request pricing",
            ViewEvent::Persisted => "persist the item",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewMachine {
    view: CreateItemView,
    last_import: ImportSnapshot,
}

impl ViewMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> CreateItemView {
        self.view
    }

    /// Apply `event` and return the resulting view.
    ///
    /// `Import → Details` is edge-triggered: it fires once when the import
    /// snapshot becomes complete, never again while it stays complete.
    pub fn handle(&mut self, event: ViewEvent) -> Result<CreateItemView, ViewError> {
        use CreateItemView::*;

        let next = match (self.view, event) {
            (Closed, _) => return Err(self.invalid(event)),

            (view, ViewEvent::ImportProgress(snapshot)) => {
                let became_complete = !self.last_import.is_complete() && snapshot.is_complete();
                self.last_import = snapshot;
                if view == Import && became_complete { Details } else { view }
            }

            (Details, ViewEvent::OpenThumbnailEditor { kind: ItemKind::Emote }) => Thumbnail,
            (Thumbnail, ViewEvent::CloseThumbnailEditor | ViewEvent::ScreenshotCaptured) => Details,
            (Details, ViewEvent::RequestPricing { kind: ItemKind::Emote }) => SetPrice,
            (Details | SetPrice, ViewEvent::Persisted) => Closed,

            _ => return Err(self.invalid(event)),
        };

        if next != self.view {
            info!(from = %self.view, to = %next, "view transition");
            self.view = next;
        }
        Ok(next)
    }

    fn invalid(&self, event: ViewEvent) -> ViewError {
        ViewError::InvalidTransition {
            from: self.view,
            event: event.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const COMPLETE: ImportSnapshot = ImportSnapshot {
        has_thumbnail: true,
        has_contents: true,
        has_kind: true,
        is_loading: false,
    };

    fn at_details() -> ViewMachine {
        let mut machine = ViewMachine::new();
        machine.handle(ViewEvent::ImportProgress(COMPLETE)).unwrap();
        machine
    }

    #[traced_test]
    #[test]
    fn import_completes_into_details() {
        let mut machine = ViewMachine::new();
        let loading = ImportSnapshot {
            is_loading: true,
            ..COMPLETE
        };
        assert_eq!(machine.handle(ViewEvent::ImportProgress(loading)).unwrap(), CreateItemView::Import);
        assert_eq!(machine.handle(ViewEvent::ImportProgress(COMPLETE)).unwrap(), CreateItemView::Details);
        assert!(logs_contain("view transition"));
    }

    #[test]
    fn import_transition_is_edge_triggered() {
        let mut machine = at_details();
        machine
            .handle(ViewEvent::OpenThumbnailEditor { kind: ItemKind::Emote })
            .unwrap();
        // Still complete: no jump back to Details.
        assert_eq!(
            machine.handle(ViewEvent::ImportProgress(COMPLETE)).unwrap(),
            CreateItemView::Thumbnail
        );
    }

    #[test]
    fn thumbnail_editor_is_emote_only() {
        let mut machine = at_details();
        let err = machine
            .handle(ViewEvent::OpenThumbnailEditor { kind: ItemKind::Wearable })
            .unwrap_err();
        assert_eq!(
            err,
            ViewError::InvalidTransition {
                from: CreateItemView::Details,
                event: "open the thumbnail editor",
            }
        );
        assert_eq!(machine.view(), CreateItemView::Details);

        machine
            .handle(ViewEvent::OpenThumbnailEditor { kind: ItemKind::Emote })
            .unwrap();
        assert_eq!(machine.handle(ViewEvent::ScreenshotCaptured).unwrap(), CreateItemView::Details);
    }

    #[test]
    fn pricing_then_close() {
        let mut machine = at_details();
        assert!(machine
            .handle(ViewEvent::RequestPricing { kind: ItemKind::Wearable })
            .is_err());
        assert_eq!(
            machine.handle(ViewEvent::RequestPricing { kind: ItemKind::Emote }).unwrap(),
            CreateItemView::SetPrice
        );
        assert_eq!(machine.handle(ViewEvent::Persisted).unwrap(), CreateItemView::Closed);
        assert!(machine.handle(ViewEvent::ImportProgress(COMPLETE)).is_err());
    }

    #[test]
    fn cannot_persist_from_import() {
        let mut machine = ViewMachine::new();
        assert!(machine.handle(ViewEvent::Persisted).is_err());
    }
}
