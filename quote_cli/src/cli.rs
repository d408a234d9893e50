//! CLI argument definitions for Quoteline.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use quote_core::Position;

#[derive(Parser)]
#[command(
    name = "quoteline",
    version,
    about = "Quoteline - Advertising production quotes from the terminal",
    long_about = "Price an advertising production against the standard catalog.\n\n\
                  Line edits are rolled up into section totals and the client top sheet\n\
                  (gross, cutdown, VAT, grand total). The quote being edited is kept in\n\
                  the store between runs; saved quotes live in the same directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quote store directory (defaults to the platform data directory).
    #[arg(long, value_name = "DIR", env = "QUOTELINE_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// List catalog sections, or the items of one section.
    Catalog {
        /// Section index to expand.
        #[arg(long)]
        section: Option<usize>,
    },

    /// Edit one line of the current quote.
    SetLine(SetLineArgs),

    /// Show the project header, or set one field.
    Project {
        /// Field name (title, ref, margin, date, ...).
        field: Option<String>,
        /// New value; an empty string clears the field.
        value: Option<String>,
    },

    /// Show the top sheet fields, or set one (ts-cutdown, ts-vat-pct, ...).
    Extra {
        key: Option<String>,
        value: Option<String>,
    },

    /// Print section totals and the top sheet.
    Show(ShowArgs),

    /// Save the current quote into the registry.
    Save,

    /// List saved quotes, most recent first.
    List,

    /// Load a saved quote into the current quote.
    Load {
        /// Saved quote id.
        id: String,
    },

    /// Delete a saved quote.
    Delete {
        /// Saved quote id.
        id: String,
    },

    /// Export the current quote as a JSON file.
    Export {
        /// Directory to write the file into.
        #[arg(long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,
    },

    /// Import an exported quote file and make it the current quote.
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Discard the current quote and start a blank one dated today.
    New,
}

#[derive(Args)]
pub struct SetLineArgs {
    /// Line position as SECTION.SUBSECTION.ITEM (see `catalog --section`).
    #[arg(value_name = "POSITION", value_parser = parse_position)]
    pub position: Position,

    /// Quantity (0 counts as 1).
    #[arg(long)]
    pub qty: Option<String>,

    /// Number of days/units (0 counts as 1).
    #[arg(long)]
    pub nb: Option<String>,

    /// Unit rate.
    #[arg(long)]
    pub rate: Option<String>,

    /// Line markup percent (0 to 100).
    #[arg(long)]
    pub markup: Option<String>,

    #[arg(long)]
    pub note: Option<String>,

    #[arg(long)]
    pub unit: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Also list the priced lines of this section.
    #[arg(long)]
    pub section: Option<usize>,

    /// Print the summary as JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

/// Parse `SECTION.SUBSECTION.ITEM`.
pub fn parse_position(text: &str) -> Result<Position, String> {
    let parts: Vec<&str> = text.trim().split('.').collect();
    let [section, subsection, item] = parts.as_slice() else {
        return Err(format!("expected SECTION.SUBSECTION.ITEM, got '{text}'"));
    };
    let index = |part: &str| {
        part.parse::<usize>()
            .map_err(|_| format!("'{part}' is not a valid index"))
    };
    Ok(Position::new(index(section)?, index(subsection)?, index(item)?))
}
