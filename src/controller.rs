use crate::model::NoteError;
use crate::state::{Action, DayState, Outcome};
use crate::storage::{load_notes, save_notes, KeyValueStore, StorageError};
use chrono::{Local, NaiveDate};
use tracing::{debug, error, warn};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Rejected(#[from] NoteError),
    /// The in-memory state already holds the change; only the write failed.
    #[error("could not save notes: {0}")]
    Unsaved(#[from] StorageError),
}

/// Owns the day state and the store it is mirrored to.
pub struct Controller<S> {
    state: DayState,
    store: S,
}

impl<S: KeyValueStore> Controller<S> {
    pub fn open(store: S, selected: NaiveDate) -> Result<Self, StorageError> {
        let notes = load_notes(&store)?;
        Ok(Controller {
            state: DayState::new(notes, selected),
            store,
        })
    }

    pub fn state(&self) -> &DayState {
        &self.state
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, DispatchError> {
        debug!(?action, day = %self.state.selected(), "dispatch");
        let outcome = self.state.apply(action).map_err(|err| {
            warn!(%err, "action rejected");
            err
        })?;
        if outcome == Outcome::NotesChanged {
            if let Err(err) = save_notes(&mut self.store, self.state.notes()) {
                error!(%err, "notes changed in memory but were not saved");
                return Err(err.into());
            }
        }
        Ok(outcome)
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ReadOnlyStore, NOTES_KEY};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn loads_existing_notes_on_open() {
        let mut store = MemoryStore::default();
        store
            .set(NOTES_KEY, r#"{"2024-03-10":["Buy milk"]}"#)
            .expect("set");
        let controller = Controller::open(store, day("2024-03-10")).expect("open");
        assert_eq!(
            controller.state().notes_for_selected_day(),
            ["Buy milk"]
        );
    }

    #[test]
    fn every_mutation_rewrites_the_whole_store() {
        let mut controller =
            Controller::open(MemoryStore::default(), day("2024-03-10")).expect("open");
        controller
            .dispatch(Action::SetDraft("Buy milk".into()))
            .expect("draft");
        assert!(controller.store.entries.is_empty());

        controller.dispatch(Action::AddNote).expect("add");
        assert_eq!(
            controller.store.entries.get(NOTES_KEY).map(String::as_str),
            Some(r#"{"2024-03-10":["Buy milk"]}"#)
        );

        controller.dispatch(Action::DeleteNote(0)).expect("delete");
        assert_eq!(
            controller.store.entries.get(NOTES_KEY).map(String::as_str),
            Some("{}")
        );
    }

    #[test]
    fn rejected_actions_do_not_write() {
        let mut controller =
            Controller::open(ReadOnlyStore::default(), day("2024-03-10")).expect("open");
        let err = controller.dispatch(Action::AddNote).expect_err("blank draft");
        assert!(matches!(err, DispatchError::Rejected(NoteError::EmptyDraft)));
        assert_eq!(err.to_string(), "Enter the note text!");
        assert_eq!(controller.store.writes, 0);
    }

    #[test]
    fn failed_write_keeps_the_in_memory_change() {
        let mut controller =
            Controller::open(ReadOnlyStore::default(), day("2024-03-10")).expect("open");
        controller
            .dispatch(Action::SetDraft("Call dentist".into()))
            .expect("draft");
        let err = controller.dispatch(Action::AddNote).expect_err("write fails");
        assert!(matches!(err, DispatchError::Unsaved(_)));
        assert_eq!(controller.store.writes, 1);
        assert_eq!(
            controller.state().notes_for_selected_day(),
            ["Call dentist"]
        );
        assert_eq!(controller.state().draft(), "");
    }

    #[test]
    fn navigation_does_not_write() {
        let mut controller =
            Controller::open(ReadOnlyStore::default(), day("2024-03-10")).expect("open");
        controller.dispatch(Action::NextDay).expect("next");
        controller.dispatch(Action::PreviousDay).expect("prev");
        controller
            .dispatch(Action::SelectDay(local_today()))
            .expect("today");
        assert_eq!(controller.state().selected(), local_today());
        assert_eq!(controller.store.writes, 0);
    }
}
