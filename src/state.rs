//! Day selection, draft and edit-buffer state, and the view derived from it.
//!
//! Every user action is an [`Action`] applied to a [`DayState`]. Applying an
//! action is pure: the clock is read by the caller (see [`Action::SelectDay`])
//! and persistence is left to the controller, which only writes when the
//! returned [`Outcome`] says the notes changed.

use crate::model::{day_key, NoteError, Notes};
use chrono::{Locale, NaiveDate, TimeZone, Utc};

const LABEL_FORMAT: &str = "%A, %-d %B %Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectDay(NaiveDate),
    PreviousDay,
    NextDay,
    SetDraft(String),
    AddNote,
    StartEdit(usize),
    SetEditText(String),
    SaveEdit,
    CancelEdit,
    DeleteNote(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    NotesChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub position: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DayState {
    selected: NaiveDate,
    draft: String,
    notes: Notes,
    edit: Option<EditBuffer>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DayView<'a> {
    pub day_key: String,
    pub label: String,
    pub notes: Vec<NoteRow<'a>>,
    pub draft: &'a str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NoteRow<'a> {
    pub position: usize,
    pub text: &'a str,
    /// Scratch text while this note is being edited.
    pub editing: Option<&'a str>,
}

impl DayView<'_> {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl DayState {
    pub fn new(notes: Notes, selected: NaiveDate) -> Self {
        DayState {
            selected,
            draft: String::new(),
            notes,
            edit: None,
        }
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    pub fn edit_buffer(&self) -> Option<&EditBuffer> {
        self.edit.as_ref()
    }

    pub fn notes_for_selected_day(&self) -> &[String] {
        self.notes.for_day(self.selected)
    }

    pub fn apply(&mut self, action: Action) -> Result<Outcome, NoteError> {
        match action {
            Action::SelectDay(day) => self.select(day),
            Action::PreviousDay => {
                if let Some(day) = self.selected.pred_opt() {
                    self.select(day);
                }
            }
            Action::NextDay => {
                if let Some(day) = self.selected.succ_opt() {
                    self.select(day);
                }
            }
            Action::SetDraft(text) => self.draft = text,
            Action::AddNote => {
                self.notes.push(self.selected, self.draft.clone())?;
                self.draft.clear();
                return Ok(Outcome::NotesChanged);
            }
            Action::StartEdit(position) => {
                let text = self
                    .notes_for_selected_day()
                    .get(position)
                    .cloned()
                    .ok_or(NoteError::NoSuchNote {
                        day: self.selected,
                        position,
                    })?;
                self.edit = Some(EditBuffer { position, text });
            }
            Action::SetEditText(text) => {
                if let Some(edit) = self.edit.as_mut() {
                    edit.text = text;
                }
            }
            Action::SaveEdit => {
                let Some(edit) = self.edit.as_ref() else {
                    return Ok(Outcome::Unchanged);
                };
                self.notes
                    .replace(self.selected, edit.position, edit.text.clone())?;
                self.edit = None;
                return Ok(Outcome::NotesChanged);
            }
            Action::CancelEdit => self.edit = None,
            Action::DeleteNote(position) => {
                self.notes.remove(self.selected, position)?;
                self.edit = None;
                return Ok(Outcome::NotesChanged);
            }
        }
        Ok(Outcome::Unchanged)
    }

    /// Derives everything the UI shows for the selected day.
    pub fn view(&self, locale: Locale) -> DayView<'_> {
        let notes = self
            .notes_for_selected_day()
            .iter()
            .enumerate()
            .map(|(position, text)| NoteRow {
                position,
                text,
                editing: self
                    .edit
                    .as_ref()
                    .filter(|edit| edit.position == position)
                    .map(|edit| edit.text.as_str()),
            })
            .collect();
        DayView {
            day_key: day_key(self.selected),
            label: format_day_label(self.selected, locale),
            notes,
            draft: &self.draft,
        }
    }

    // An edit position only means something for the day it was taken on.
    fn select(&mut self, day: NaiveDate) {
        if day != self.selected {
            self.edit = None;
        }
        self.selected = day;
    }
}

/// Long weekday/day/month/year label, e.g. "Sunday, 10 March 2024".
pub fn format_day_label(day: NaiveDate, locale: Locale) -> String {
    match day.and_hms_opt(0, 0, 0) {
        Some(midnight) => Utc
            .from_utc_datetime(&midnight)
            .format_localized(LABEL_FORMAT, locale)
            .to_string(),
        None => day.format(LABEL_FORMAT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn state_on(s: &str) -> DayState {
        DayState::new(Notes::default(), day(s))
    }

    fn add(state: &mut DayState, text: &str) -> Result<Outcome, NoteError> {
        state.apply(Action::SetDraft(text.into()))?;
        state.apply(Action::AddNote)
    }

    #[test]
    fn scenario_add_then_delete_down_to_empty_store() {
        let mut state = state_on("2024-03-10");

        assert_eq!(add(&mut state, "Buy milk"), Ok(Outcome::NotesChanged));
        assert_eq!(state.notes_for_selected_day(), ["Buy milk"]);
        assert_eq!(state.draft(), "");

        add(&mut state, "Call dentist").expect("add");
        assert_eq!(state.notes_for_selected_day(), ["Buy milk", "Call dentist"]);

        state.apply(Action::DeleteNote(0)).expect("delete");
        assert_eq!(
            serde_json::to_string(state.notes()).expect("json"),
            r#"{"2024-03-10":["Call dentist"]}"#
        );

        state.apply(Action::DeleteNote(0)).expect("delete");
        assert!(state.notes().is_empty());
    }

    #[test]
    fn blank_drafts_are_rejected_and_kept() {
        let mut state = state_on("2024-03-10");
        assert_eq!(add(&mut state, ""), Err(NoteError::EmptyDraft));
        assert_eq!(add(&mut state, "   "), Err(NoteError::EmptyDraft));
        assert!(state.notes().is_empty());
        assert_eq!(state.draft(), "   ");
    }

    #[test]
    fn draft_is_stored_verbatim() {
        let mut state = state_on("2024-03-10");
        add(&mut state, "  padded\nnote ").expect("add");
        assert_eq!(state.notes_for_selected_day(), ["  padded\nnote "]);
    }

    #[test]
    fn save_edit_replaces_the_buffered_position() {
        let mut state = state_on("2024-03-10");
        add(&mut state, "one").expect("add");
        add(&mut state, "two").expect("add");

        state.apply(Action::StartEdit(1)).expect("start");
        assert_eq!(
            state.edit_buffer(),
            Some(&EditBuffer {
                position: 1,
                text: "two".into()
            })
        );
        state.apply(Action::SetEditText("TWO".into())).expect("edit");
        assert_eq!(state.apply(Action::SaveEdit), Ok(Outcome::NotesChanged));
        assert_eq!(state.notes_for_selected_day(), ["one", "TWO"]);
        assert!(state.edit_buffer().is_none());
    }

    #[test]
    fn blank_edit_is_rejected_and_buffer_kept() {
        let mut state = state_on("2024-03-10");
        add(&mut state, "one").expect("add");
        state.apply(Action::StartEdit(0)).expect("start");
        state.apply(Action::SetEditText(" \t ".into())).expect("edit");
        assert_eq!(state.apply(Action::SaveEdit), Err(NoteError::EmptyEdit));
        assert_eq!(state.notes_for_selected_day(), ["one"]);
        assert_eq!(state.edit_buffer().map(|e| e.text.as_str()), Some(" \t "));
    }

    #[test]
    fn cancel_edit_leaves_notes_alone() {
        let mut state = state_on("2024-03-10");
        add(&mut state, "one").expect("add");
        state.apply(Action::StartEdit(0)).expect("start");
        state.apply(Action::SetEditText("changed".into())).expect("edit");
        assert_eq!(state.apply(Action::CancelEdit), Ok(Outcome::Unchanged));
        assert_eq!(state.notes_for_selected_day(), ["one"]);
        assert!(state.edit_buffer().is_none());
        assert_eq!(state.apply(Action::SaveEdit), Ok(Outcome::Unchanged));
    }

    #[test]
    fn start_edit_needs_an_existing_note() {
        let mut state = state_on("2024-03-10");
        assert_eq!(
            state.apply(Action::StartEdit(0)),
            Err(NoteError::NoSuchNote {
                day: day("2024-03-10"),
                position: 0
            })
        );
        assert!(state.edit_buffer().is_none());
    }

    #[test]
    fn delete_clears_edit_of_another_note() {
        let mut state = state_on("2024-03-10");
        for text in ["a", "b", "c"] {
            add(&mut state, text).expect("add");
        }
        state.apply(Action::StartEdit(2)).expect("start");
        state.apply(Action::DeleteNote(0)).expect("delete");
        assert_eq!(state.notes_for_selected_day(), ["b", "c"]);
        assert!(state.edit_buffer().is_none());
    }

    #[test]
    fn navigation_abandons_an_edit_in_progress() {
        let mut state = state_on("2024-03-10");
        add(&mut state, "a").expect("add");
        state.apply(Action::StartEdit(0)).expect("start");
        state.apply(Action::NextDay).expect("next");
        assert!(state.edit_buffer().is_none());

        state.apply(Action::PreviousDay).expect("prev");
        state.apply(Action::StartEdit(0)).expect("start");
        state.apply(Action::SelectDay(day("2024-03-10"))).expect("same day");
        assert!(state.edit_buffer().is_some());
    }

    #[test]
    fn next_day_twice_moves_two_days() {
        let mut state = state_on("2024-03-10");
        state.apply(Action::NextDay).expect("next");
        state.apply(Action::NextDay).expect("next");
        assert_eq!(state.selected(), day("2024-03-12"));
    }

    #[test]
    fn navigation_rolls_over_calendar_edges() {
        let cases = [
            ("2024-02-28", "2024-02-29"),
            ("2024-02-29", "2024-03-01"),
            ("2023-02-28", "2023-03-01"),
            ("2023-12-31", "2024-01-01"),
            ("2024-04-30", "2024-05-01"),
            ("2024-03-30", "2024-03-31"),
        ];
        for (from, to) in cases {
            let mut state = state_on(from);
            state.apply(Action::NextDay).expect("next");
            assert_eq!(state.selected(), day(to), "next day after {from}");
            state.apply(Action::PreviousDay).expect("prev");
            assert_eq!(state.selected(), day(from), "previous day before {to}");
        }
    }

    #[test]
    fn notes_are_grouped_by_selected_day() {
        let mut state = state_on("2023-12-31");
        add(&mut state, "old year").expect("add");
        state.apply(Action::NextDay).expect("next");
        assert!(state.notes_for_selected_day().is_empty());
        add(&mut state, "new year").expect("add");
        assert_eq!(
            state.notes().days().collect::<Vec<_>>(),
            [(day("2023-12-31"), 1), (day("2024-01-01"), 1)]
        );
    }

    #[test]
    fn view_marks_the_note_being_edited() {
        let mut state = state_on("2024-03-10");
        add(&mut state, "a").expect("add");
        add(&mut state, "b").expect("add");
        state.apply(Action::StartEdit(1)).expect("start");
        state.apply(Action::SetEditText("b!".into())).expect("edit");
        state.apply(Action::SetDraft("draft".into())).expect("draft");

        let view = state.view(Locale::en_US);
        assert_eq!(view.day_key, "2024-03-10");
        assert_eq!(view.label, "Sunday, 10 March 2024");
        assert_eq!(view.draft, "draft");
        assert_eq!(
            view.notes,
            [
                NoteRow {
                    position: 0,
                    text: "a",
                    editing: None
                },
                NoteRow {
                    position: 1,
                    text: "b",
                    editing: Some("b!")
                },
            ]
        );
    }

    #[test]
    fn empty_day_view() {
        let state = state_on("2024-01-01");
        let view = state.view(Locale::en_US);
        assert!(view.is_empty());
        assert_eq!(view.label, "Monday, 1 January 2024");
    }
}
