use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type DayMap = BTreeMap<NaiveDate, Vec<String>>;

/// All notes, grouped by calendar day.
///
/// A day is present only while it holds at least one note; removing the last
/// note of a day drops the day. Notes keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DayMap", into = "DayMap")]
pub struct Notes {
    days: DayMap,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("Enter the note text!")]
    EmptyDraft,
    #[error("A note can't be empty!")]
    EmptyEdit,
    #[error("no note #{} on {day}", .position + 1)]
    NoSuchNote { day: NaiveDate, position: usize },
}

/// ISO `YYYY-MM-DD` key used to group notes.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl Notes {
    pub fn for_day(&self, day: NaiveDate) -> &[String] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Days holding notes, oldest first, with their note counts.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, usize)> + '_ {
        self.days.iter().map(|(day, notes)| (*day, notes.len()))
    }

    /// Appends `text` as typed; only the emptiness check trims.
    pub fn push(&mut self, day: NaiveDate, text: String) -> Result<(), NoteError> {
        if is_blank(&text) {
            return Err(NoteError::EmptyDraft);
        }
        self.days.entry(day).or_default().push(text);
        Ok(())
    }

    pub fn replace(
        &mut self,
        day: NaiveDate,
        position: usize,
        text: String,
    ) -> Result<(), NoteError> {
        if is_blank(&text) {
            return Err(NoteError::EmptyEdit);
        }
        let slot = self
            .days
            .get_mut(&day)
            .and_then(|notes| notes.get_mut(position))
            .ok_or(NoteError::NoSuchNote { day, position })?;
        *slot = text;
        Ok(())
    }

    pub fn remove(&mut self, day: NaiveDate, position: usize) -> Result<String, NoteError> {
        let notes = self
            .days
            .get_mut(&day)
            .filter(|notes| position < notes.len())
            .ok_or(NoteError::NoSuchNote { day, position })?;
        let removed = notes.remove(position);
        if notes.is_empty() {
            self.days.remove(&day);
        }
        Ok(removed)
    }
}

impl From<DayMap> for Notes {
    fn from(mut days: DayMap) -> Self {
        days.retain(|_, notes| !notes.is_empty());
        Notes { days }
    }
}

impl From<Notes> for DayMap {
    fn from(notes: Notes) -> Self {
        notes.days
    }
}
