//! Command handlers.
//!
//! Every run opens the store, restores the current quote into a fresh
//! session, applies the command and writes the current quote back when
//! the command changed it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info, warn};

use quote_core::file_io::{export_quote, import_quote};
use quote_core::line::LineInput;
use quote_core::project::PROJECT_FIELDS;
use quote_core::quote::{export_id, save_id};
use quote_core::{catalog, QuoteError, QuoteSession, QuoteStorage};

use crate::cli::{Command, SetLineArgs, ShowArgs};
use crate::report;

/// Application directory name under the platform data dir.
const APP_NAME: &str = "quoteline";

/// `--store`/`QUOTELINE_STORE`, else the platform data directory.
pub fn resolve_store_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("no home directory found; pass --store <DIR>"))
}

/// Store plus the session restored from the current quote.
pub struct Workspace {
    storage: QuoteStorage,
    session: QuoteSession,
}

impl Workspace {
    pub fn open(dir: &Path, today: NaiveDate) -> Result<Self> {
        let storage = QuoteStorage::open(dir, whoami::username())
            .with_context(|| format!("open quote store {}", dir.display()))?;
        let settings = storage.load_settings().context("load settings")?;
        let catalog = catalog::standard().context("load catalog")?;
        let mut session = QuoteSession::new(catalog, settings, today);

        // An unreadable current quote must not block `new` or `import`.
        match storage.load_current() {
            Ok(Some(current)) => {
                session.load(&current);
            }
            Ok(None) => {}
            Err(error @ QuoteError::Parse { .. }) => {
                warn!(%error, "ignoring unreadable current quote");
            }
            Err(error) => return Err(error).context("load current quote"),
        }
        debug!(store = %dir.display(), "workspace ready");
        Ok(Workspace { storage, session })
    }

    #[cfg(test)]
    pub fn session(&self) -> &QuoteSession {
        &self.session
    }

    /// Write the session back as the current quote.
    fn persist_current(&self) -> Result<()> {
        let now = Utc::now();
        let quote = self.session.snapshot(save_id(self.session.project(), now), now);
        self.storage
            .save_current(&quote)
            .context("write current quote")
    }

    /// Run one command, writing its output to stdout.
    pub fn run(&mut self, command: Command, today: NaiveDate) -> Result<()> {
        match command {
            Command::Catalog { section } => {
                println!("{}", report::catalog_table(self.session.catalog(), section));
            }
            Command::SetLine(args) => self.set_line(&args)?,
            Command::Project { field, value } => self.project(field, value)?,
            Command::Extra { key, value } => self.extra(key, value)?,
            Command::Show(args) => self.show(&args)?,
            Command::Save => self.save()?,
            Command::List => {
                let registry = self.storage.load_registry().context("load saved quotes")?;
                if registry.is_empty() {
                    println!("No saved quotes.");
                } else {
                    println!("{}", report::registry_table(&registry.listing()));
                }
            }
            Command::Load { id } => self.load(&id)?,
            Command::Delete { id } => {
                let removed = self
                    .storage
                    .delete_quote(&id)
                    .with_context(|| format!("delete quote '{id}'"))?;
                println!("Deleted quote '{}' ({})", removed.id, removed.display_title());
            }
            Command::Export { dir } => self.export(&dir)?,
            Command::Import { path } => self.import(&path)?,
            Command::New => {
                self.storage.clear_current().context("clear current quote")?;
                self.session.reset(today);
                println!("Started a new quote dated {}", today.format("%Y-%m-%d"));
            }
        }
        Ok(())
    }

    fn set_line(&mut self, args: &SetLineArgs) -> Result<()> {
        let edit = LineInput {
            qty: args.qty.clone(),
            nb: args.nb.clone(),
            rate: args.rate.clone(),
            markup: args.markup.clone(),
            note: args.note.clone(),
            unit: args.unit.clone(),
        };
        if edit.is_empty() {
            return Err(anyhow!(
                "nothing to change; pass at least one of --qty, --nb, --rate, --markup, --note, --unit"
            ));
        }
        let total = self
            .session
            .update_line(args.position, &edit)
            .with_context(|| format!("update line {}", args.position))?;
        self.persist_current()?;

        let item = self
            .session
            .catalog()
            .item(args.position)
            .map_or("", |item| item.name.as_str());
        let currency = &self.session.project().currency;
        println!(
            "{} {}: {}",
            args.position,
            item,
            quote_core::presentation::AmountDisplay::currency(total, currency)
        );
        println!(
            "Grand total: {}",
            quote_core::presentation::AmountDisplay::currency(
                self.session.summary().grand.grand_total,
                currency
            )
        );
        Ok(())
    }

    fn project(&mut self, field: Option<String>, value: Option<String>) -> Result<()> {
        match (field, value) {
            (None, _) => println!("{}", report::project_table(self.session.project(), self.session.settings())),
            (Some(field), None) => {
                return Err(anyhow!(
                    "missing value for '{field}' (fields: {})",
                    PROJECT_FIELDS.join(", ")
                ))
            }
            (Some(field), Some(value)) => {
                self.session
                    .set_project_field(&field, &value)
                    .with_context(|| format!("set project field '{field}'"))?;
                self.persist_current()?;
                println!("{field} = {value}");
            }
        }
        Ok(())
    }

    fn extra(&mut self, key: Option<String>, value: Option<String>) -> Result<()> {
        match (key, value) {
            (None, _) => println!("{}", report::extra_table(self.session.extra())),
            (Some(key), None) => {
                println!("{}", self.session.extra().get(&key).unwrap_or(""));
            }
            (Some(key), Some(value)) => {
                self.session.set_extra(&key, &value);
                self.persist_current()?;
                println!("{key} = {value}");
            }
        }
        Ok(())
    }

    fn show(&self, args: &ShowArgs) -> Result<()> {
        if args.json {
            let json = serde_json::to_string_pretty(self.session.summary())
                .context("serialize summary")?;
            println!("{json}");
            return Ok(());
        }

        for line in report::quote_header(&self.session) {
            println!("{line}");
        }
        println!();
        println!("{}", report::sections_table(&self.session));
        if let Some(section) = args.section {
            let table = report::lines_table(&self.session, section)
                .ok_or_else(|| anyhow!("section {section} is not in the catalog"))?;
            println!("{table}");
        }
        println!(
            "{}",
            report::top_sheet_table(self.session.summary(), &self.session.project().currency)
        );
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let now = Utc::now();
        let id = save_id(self.session.project(), now);
        let quote = self.session.snapshot(id, now);
        let replaced = self
            .storage
            .save_quote(&quote)
            .with_context(|| format!("save quote '{}'", quote.id))?;
        let verb = if replaced { "Updated" } else { "Saved" };
        println!("{verb} quote '{}' ({})", quote.id, quote.display_title());
        Ok(())
    }

    fn load(&mut self, id: &str) -> Result<()> {
        let registry = self.storage.load_registry().context("load saved quotes")?;
        let quote = registry.require(id)?;
        let report = self.session.load(quote);
        self.persist_loaded(&quote.id, quote.saved_at)?;
        println!(
            "Loaded quote '{}' ({}, {} lines)",
            quote.id,
            quote.display_title(),
            report.applied
        );
        Ok(())
    }

    fn export(&self, dir: &Path) -> Result<()> {
        let now = Utc::now();
        let quote = self.session.snapshot(export_id(self.session.project()), now);
        let path = export_quote(&quote, dir)
            .with_context(|| format!("export to {}", dir.display()))?;
        println!("Exported {}", path.display());
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<()> {
        let quote =
            import_quote(path).with_context(|| format!("import {}", path.display()))?;
        let report = self.session.load(&quote);
        self.persist_loaded(&quote.id, quote.saved_at)?;
        info!(ignored = report.ignored, "import applied");
        println!(
            "Imported quote '{}' ({}, {} lines)",
            quote.id,
            quote.display_title(),
            report.applied
        );
        Ok(())
    }

    /// Current quote after a load keeps the loaded id and save time.
    fn persist_loaded(&self, id: &str, saved_at: chrono::DateTime<Utc>) -> Result<()> {
        self.storage
            .save_current(&self.session.snapshot(id, saved_at))
            .context("write current quote")
    }
}

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_core::Position;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::open(dir.path(), day()).unwrap()
    }

    fn set_rate(ws: &mut Workspace, position: Position, rate: &str) {
        let args = SetLineArgs {
            position,
            qty: None,
            nb: None,
            rate: Some(rate.to_string()),
            markup: Some("0".to_string()),
            note: None,
            unit: None,
        };
        ws.run(Command::SetLine(args), day()).unwrap();
    }

    #[test]
    fn test_edits_survive_between_runs() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        set_rate(&mut ws, Position::new(3, 0, 0), "1000");

        let reopened = workspace(&dir);
        assert_eq!(reopened.session().totals().section(3), 1000.0);
    }

    #[test]
    fn test_save_load_and_delete() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        ws.run(
            Command::Project {
                field: Some("ref".into()),
                value: Some("Q-7".into()),
            },
            day(),
        )
        .unwrap();
        set_rate(&mut ws, Position::new(0, 0, 0), "500");
        ws.run(Command::Save, day()).unwrap();

        ws.run(Command::New, day()).unwrap();
        assert_eq!(ws.session().totals().all_cost(), 0.0);

        ws.run(Command::Load { id: "Q-7".into() }, day()).unwrap();
        assert_eq!(ws.session().totals().section(0), 500.0);

        ws.run(Command::Delete { id: "Q-7".into() }, day()).unwrap();
        assert!(ws.run(Command::Load { id: "Q-7".into() }, day()).is_err());
    }

    #[test]
    fn test_new_clears_current() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        set_rate(&mut ws, Position::new(0, 0, 0), "500");
        ws.run(Command::New, day()).unwrap();

        let reopened = workspace(&dir);
        assert_eq!(reopened.session().totals().all_cost(), 0.0);
    }

    #[test]
    fn test_corrupt_current_quote_does_not_block_commands() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("current.json"), "{\"id\": ").unwrap();

        let mut ws = workspace(&dir);
        assert_eq!(ws.session().totals().all_cost(), 0.0);

        ws.run(Command::New, day()).unwrap();
        assert!(!dir.path().join("current.json").exists());

        set_rate(&mut ws, Position::new(0, 0, 0), "300");
        assert_eq!(workspace(&dir).session().totals().section(0), 300.0);
    }

    #[test]
    fn test_export_then_import_elsewhere() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        set_rate(&mut ws, Position::new(16, 0, 0), "250");
        ws.run(
            Command::Export {
                dir: out.path().to_path_buf(),
            },
            day(),
        )
        .unwrap();

        let exported = std::fs::read_dir(out.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert!(exported
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("quote-quote-"));

        let other = TempDir::new().unwrap();
        let mut fresh = workspace(&other);
        fresh.run(Command::Import { path: exported }, day()).unwrap();
        assert_eq!(fresh.session().totals().section(16), 250.0);
        assert_eq!(workspace(&other).session().totals().section(16), 250.0);
    }

    #[test]
    fn test_set_line_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let empty = SetLineArgs {
            position: Position::new(0, 0, 0),
            qty: None,
            nb: None,
            rate: None,
            markup: None,
            note: None,
            unit: None,
        };
        assert!(ws.run(Command::SetLine(empty), day()).is_err());

        let outside = SetLineArgs {
            position: Position::new(99, 0, 0),
            qty: None,
            nb: None,
            rate: Some("10".into()),
            markup: None,
            note: None,
            unit: None,
        };
        assert!(ws.run(Command::SetLine(outside), day()).is_err());
    }

    #[test]
    fn test_unknown_project_field() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let result = ws.run(
            Command::Project {
                field: Some("colour".into()),
                value: Some("red".into()),
            },
            day(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_store_dir_wins() {
        let dir = resolve_store_dir(Some(PathBuf::from("/tmp/elsewhere"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/elsewhere"));
    }
}
