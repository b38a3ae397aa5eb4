use slog::{debug, error, Logger};

use crate::consent::{Category, CategoryFlags, ConsentStore};
use crate::events::ConsentEvents;

/// A visitor-initiated consent action, as carried by the markup's
/// action markers on the banner and modal controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentAction {
    Accept,
    Reject,
    Manage,
    Save,
    Close,
}

/// Banner and modal visibility manager.
///
/// Two independent flags with one coupling rule: opening the modal closes
/// the banner so the overlays never stack, while closing the modal leaves
/// the banner alone. Accept, reject, and save persist a decision and
/// notify subscribers; close (also backdrop clicks and Escape) never
/// touches storage and never notifies.
pub struct ConsentUi {
    store: ConsentStore,
    events: ConsentEvents,
    banner_open: bool,
    modal_open: bool,
    toggles: CategoryFlags,
    focus: Option<Category>,
    logger: Logger,
}

impl ConsentUi {
    /// Creates the manager and derives the initial state from storage:
    /// the banner shows until the visitor has decided, the modal starts
    /// closed.
    pub fn new(store: ConsentStore, events: ConsentEvents, logger: Logger) -> Self {
        let record = store.read();

        ConsentUi {
            store,
            events,
            banner_open: !record.decided,
            modal_open: false,
            toggles: record.flags,
            focus: None,
            logger,
        }
    }

    pub fn banner_open(&self) -> bool {
        self.banner_open
    }

    pub fn modal_open(&self) -> bool {
        self.modal_open
    }

    /// The modal's current toggle values.
    pub fn toggles(&self) -> CategoryFlags {
        self.toggles
    }

    /// The control that should hold focus, if any.
    pub fn focus(&self) -> Option<Category> {
        self.focus
    }

    /// Records the visitor flipping one of the modal's category toggles.
    /// Nothing is persisted until a save action.
    pub fn set_toggle(&mut self, category: Category, value: bool) {
        self.toggles.set(category, value);
    }

    pub fn handle(&mut self, action: ConsentAction) {
        debug!(self.logger, "handling consent action"; "action" => format!("{:?}", action));

        match action {
            ConsentAction::Accept => self.decide(CategoryFlags::all()),
            ConsentAction::Reject => self.decide(CategoryFlags::default()),
            ConsentAction::Manage => self.open_modal(),
            // Save is only reachable from the modal.
            ConsentAction::Save if !self.modal_open => {
                debug!(self.logger, "ignoring save with the modal closed");
            }
            ConsentAction::Save => self.decide(self.toggles),
            ConsentAction::Close => self.close_modal(),
        }
    }

    /// A click on the modal backdrop. Equivalent to the close action.
    pub fn backdrop_click(&mut self) {
        self.close_modal();
    }

    /// An Escape key press. Closes the modal if it is open, otherwise
    /// does nothing.
    pub fn escape(&mut self) {
        if self.modal_open {
            self.close_modal();
        }
    }

    fn open_modal(&mut self) {
        // Sync the toggles to the stored record before showing them.
        self.toggles = self.store.read().flags;

        self.banner_open = false;
        self.modal_open = true;
        self.focus = Some(Category::Functional);
    }

    fn close_modal(&mut self) {
        self.modal_open = false;
        self.focus = None;
    }

    fn decide(&mut self, flags: CategoryFlags) {
        let record = match self.store.write(flags) {
            Ok(record) => record,
            Err(e) => {
                error!(self.logger, "failed to persist consent decision"; "error" => format!("{:?}", e));
                return;
            }
        };

        self.toggles = record.flags;
        self.banner_open = false;
        self.modal_open = false;
        self.focus = None;

        self.events.emit(record);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use slog::{o, Discard, Logger};
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::consent::{ConsentRecord, CONSENT_STORAGE_KEY};
    use crate::errors::StorageError;
    use crate::storage::{MemoryStorage, Storage};

    /// A substrate that refuses every write.
    struct FailingStorage;

    impl Storage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "substrate full"),
            })
        }
    }

    fn make_ui() -> (Arc<MemoryStorage>, ConsentEvents, ConsentUi) {
        let storage = Arc::new(MemoryStorage::new());
        let events = ConsentEvents::new();
        let logger = Logger::root(Discard, o!());
        let ui = ConsentUi::new(
            ConsentStore::new(storage.clone(), logger.clone()),
            events.clone(),
            logger,
        );

        (storage, events, ui)
    }

    #[test]
    fn banner_shows_until_decided() {
        let (_storage, _events, ui) = make_ui();

        assert!(ui.banner_open());
        assert!(!ui.modal_open());
    }

    #[test]
    fn banner_stays_hidden_after_a_decision() {
        let (storage, events, mut ui) = make_ui();

        ui.handle(ConsentAction::Accept);

        let logger = Logger::root(Discard, o!());
        let ui = ConsentUi::new(
            ConsentStore::new(storage, logger.clone()),
            events,
            logger,
        );
        assert!(!ui.banner_open());
        assert!(!ui.modal_open());
    }

    #[test]
    fn accept_grants_every_category() {
        let (_storage, events, mut ui) = make_ui();
        let mut rx = events.subscribe();

        ui.handle(ConsentAction::Accept);

        assert!(!ui.banner_open());
        assert!(!ui.modal_open());

        let record = rx.try_recv().unwrap();
        assert!(record.decided);
        assert_eq!(record.flags, CategoryFlags::all());
    }

    #[test]
    fn reject_denies_every_category() {
        let (_storage, events, mut ui) = make_ui();
        let mut rx = events.subscribe();

        ui.handle(ConsentAction::Reject);

        let record = rx.try_recv().unwrap();
        assert!(record.decided);
        assert_eq!(record.flags, CategoryFlags::default());
    }

    #[test]
    fn manage_closes_the_banner_and_opens_the_modal() {
        let (_storage, _events, mut ui) = make_ui();

        ui.handle(ConsentAction::Manage);

        assert!(!ui.banner_open());
        assert!(ui.modal_open());
        assert_eq!(ui.focus(), Some(Category::Functional));
    }

    #[test]
    fn manage_syncs_toggles_to_the_stored_record() {
        let (_storage, _events, mut ui) = make_ui();

        ui.handle(ConsentAction::Accept);
        ui.set_toggle(Category::Analytics, false);
        ui.handle(ConsentAction::Manage);

        assert_eq!(ui.toggles(), CategoryFlags::all());
    }

    #[test]
    fn save_persists_the_toggle_values_verbatim() {
        let (_storage, events, mut ui) = make_ui();
        let mut rx = events.subscribe();

        ui.handle(ConsentAction::Accept);
        rx.try_recv().unwrap();

        // A later save overwrites the earlier all-true decision in full.
        ui.handle(ConsentAction::Manage);
        ui.set_toggle(Category::Functional, false);
        ui.set_toggle(Category::Analytics, false);
        ui.set_toggle(Category::Marketing, false);
        ui.set_toggle(Category::Marketing, true);
        ui.handle(ConsentAction::Save);

        let record = rx.try_recv().unwrap();
        assert!(record.decided);
        assert!(!record.flags.functional);
        assert!(!record.flags.analytics);
        assert!(record.flags.marketing);
        assert!(!ui.modal_open());
    }

    #[test]
    fn close_variants_never_persist_or_notify() {
        let dismiss: [&dyn Fn(&mut ConsentUi); 3] = [
            &|ui| ui.handle(ConsentAction::Close),
            &|ui| ui.backdrop_click(),
            &|ui| ui.escape(),
        ];

        for close in &dismiss {
            let (storage, events, mut ui) = make_ui();
            let mut rx = events.subscribe();

            ui.handle(ConsentAction::Manage);
            ui.set_toggle(Category::Analytics, true);
            close(&mut ui);

            assert!(!ui.modal_open());
            assert!(!ui.banner_open(), "closing must not reopen the banner");
            assert_eq!(storage.get(CONSENT_STORAGE_KEY).unwrap(), None);
            assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
        }
    }

    #[test]
    fn save_outside_the_modal_is_ignored() {
        let (storage, events, mut ui) = make_ui();
        let mut rx = events.subscribe();

        ui.set_toggle(Category::Marketing, true);
        ui.handle(ConsentAction::Save);

        assert!(ui.banner_open());
        assert!(!ui.modal_open());
        assert_eq!(storage.get(CONSENT_STORAGE_KEY).unwrap(), None);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn a_failed_write_leaves_the_overlays_alone_and_stays_silent() {
        let events = ConsentEvents::new();
        let logger = Logger::root(Discard, o!());
        let mut ui = ConsentUi::new(
            ConsentStore::new(Arc::new(FailingStorage), logger.clone()),
            events.clone(),
            logger,
        );
        let mut rx = events.subscribe();

        // From the banner: the decision does not take, so the banner stays.
        ui.handle(ConsentAction::Accept);
        assert!(ui.banner_open());
        assert!(!ui.modal_open());
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        // From the modal: it stays open with the visitor's toggles intact.
        ui.handle(ConsentAction::Manage);
        ui.set_toggle(Category::Analytics, true);
        ui.handle(ConsentAction::Save);

        assert!(ui.modal_open());
        assert_eq!(
            ui.toggles(),
            CategoryFlags {
                analytics: true,
                ..Default::default()
            }
        );
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn escape_with_the_modal_closed_is_a_no_op() {
        let (_storage, _events, mut ui) = make_ui();

        ui.escape();

        assert!(ui.banner_open());
        assert!(!ui.modal_open());
    }

    #[test]
    fn first_visit_manage_then_save_analytics() {
        // Fresh state: banner visible, modal hidden.
        let (storage, events, mut ui) = make_ui();
        let mut rx = events.subscribe();
        assert!(ui.banner_open());
        assert!(!ui.modal_open());

        // Manage: modal up, banner down, toggles reflect all-false.
        ui.handle(ConsentAction::Manage);
        assert!(ui.modal_open());
        assert!(!ui.banner_open());
        assert_eq!(ui.toggles(), CategoryFlags::default());

        // Check analytics, save.
        ui.set_toggle(Category::Analytics, true);
        ui.handle(ConsentAction::Save);

        assert!(!ui.banner_open());
        assert!(!ui.modal_open());

        let record = rx.try_recv().unwrap();
        assert!(record.decided);
        assert!(!record.flags.functional);
        assert!(record.flags.analytics);
        assert!(!record.flags.marketing);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        let persisted: ConsentRecord =
            serde_json::from_str(&storage.get(CONSENT_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.flags, record.flags);
        assert!(persisted.decided);
    }
}
