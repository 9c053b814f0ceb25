use crate::cli::Cli;
use crate::config::{load_config, parse_locale, Config};
use crate::controller::{local_today, Controller};
use crate::model::day_key;
use crate::state::{format_day_label, Action};
use crate::storage::{current_dir, init_project_store, locate_store, FileStore, StoreLocation};
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Locale, NaiveDate};
use tracing::info;

/// Settings every command needs, resolved from flags, env and config.yml.
pub struct Session {
    pub config: Config,
    pub locale: Locale,
    pub location: StoreLocation,
}

impl Session {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config = load_config(cli.config.as_deref())?;
        let locale = match cli.locale.as_deref() {
            Some(name) => parse_locale(name)?,
            None => config.locale()?,
        };
        let location = locate_store(cli.store_dir.as_deref(), &current_dir()?)?;
        Ok(Session {
            config,
            locale,
            location,
        })
    }

    fn open(&self, date: Option<&str>) -> Result<Controller<FileStore>> {
        let day = parse_day(date, local_today())?;
        Controller::open(FileStore::new(&self.location.dir), day)
            .with_context(|| format!("loading notes from {}", self.location.dir.display()))
    }
}

pub fn init() -> Result<()> {
    let location = init_project_store(&current_dir()?)?;
    println!("Initialized notes store at {}", location.dir.display());
    Ok(())
}

pub fn list(session: &Session, date: Option<String>) -> Result<()> {
    let controller = session.open(date.as_deref())?;
    let view = controller.state().view(session.locale);
    println!("{} ({})", view.label, view.day_key);
    if view.is_empty() {
        println!("  No notes for this day yet.");
    }
    for row in &view.notes {
        print_note(row.position, row.text);
    }
    Ok(())
}

pub fn add(session: &Session, text: String, date: Option<String>) -> Result<()> {
    let mut controller = session.open(date.as_deref())?;
    controller.dispatch(Action::SetDraft(text))?;
    controller.dispatch(Action::AddNote)?;
    let state = controller.state();
    let number = state.notes_for_selected_day().len();
    info!(day = %state.selected(), number, "note added from cli");
    println!("Added note {} to {}", number, day_key(state.selected()));
    Ok(())
}

pub fn edit(session: &Session, number: usize, text: String, date: Option<String>) -> Result<()> {
    let position = to_position(number)?;
    let mut controller = session.open(date.as_deref())?;
    controller.dispatch(Action::StartEdit(position))?;
    controller.dispatch(Action::SetEditText(text))?;
    controller.dispatch(Action::SaveEdit)?;
    println!(
        "Updated note {} on {}",
        number,
        day_key(controller.state().selected())
    );
    Ok(())
}

pub fn delete(session: &Session, number: usize, date: Option<String>) -> Result<()> {
    let position = to_position(number)?;
    let mut controller = session.open(date.as_deref())?;
    controller.dispatch(Action::DeleteNote(position))?;
    println!(
        "Deleted note {} from {}",
        number,
        day_key(controller.state().selected())
    );
    Ok(())
}

pub fn days(session: &Session) -> Result<()> {
    let controller = session.open(None)?;
    let notes = controller.state().notes();
    if notes.is_empty() {
        println!("No notes yet.");
    }
    for (day, count) in notes.days() {
        println!(
            "{}  {}  ({} {})",
            day_key(day),
            format_day_label(day, session.locale),
            count,
            if count == 1 { "note" } else { "notes" }
        );
    }
    Ok(())
}

pub fn tui(session: &Session, date: Option<String>) -> Result<()> {
    let controller = session.open(date.as_deref())?;
    ui::run(controller, session)
}

/// Accepts `YYYY-MM-DD`, `today`, `yesterday` or `tomorrow`; `None` means today.
pub fn parse_day(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    let raw = match input.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(today),
    };
    let day = match raw.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "yesterday" => today.pred_opt(),
        "tomorrow" => today.succ_opt(),
        _ => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            anyhow!(
                "invalid date (use YYYY-MM-DD, today, yesterday or tomorrow): {}",
                raw
            )
        })?),
    };
    day.ok_or_else(|| anyhow!("date out of range: {}", raw))
}

fn to_position(number: usize) -> Result<usize> {
    if number == 0 {
        bail!("note numbers start at 1");
    }
    Ok(number - 1)
}

fn print_note(position: usize, text: &str) {
    let mut lines = text.lines();
    println!("  {}. {}", position + 1, lines.next().unwrap_or_default());
    for line in lines {
        println!("     {}", line);
    }
}
