//! # Project Data Structures
//!
//! Header information for a quote plus the defaults the application starts
//! from.
//!
//! ## Structure
//!
//! ```text
//! ProjectMetadata  (title, advertiser, agency, ..., margin, discount, notes)
//! ExtraFields      (open string map used by the top sheet header)
//! Settings         (defaults for new quotes, loadable from settings.toml)
//! ```
//!
//! The serialized field names match the persisted quote format (`ep`,
//! `ref`, `type`, ...). Numeric fields accept numbers or numeric text so
//! files written by older form-based tools still load.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use quote_core::project::{ProjectMetadata, Settings};
//!
//! let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let project = ProjectMetadata::new(&Settings::default(), today);
//! assert_eq!(project.margin, Some(25.0));
//! assert_eq!(project.valid_until(), NaiveDate::from_ymd_opt(2025, 3, 31));
//! ```

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{QuoteError, QuoteResult};
use crate::input::{self, de_amount, de_optional_number, de_text};

pub const DEFAULT_CURRENCY: &str = "€";
pub const DEFAULT_MARGIN_PERCENT: f64 = 25.0;
pub const DEFAULT_VAT_PERCENT: f64 = 20.0;
pub const DEFAULT_VALIDITY_DAYS: u32 = 30;
pub const DEFAULT_PRODUCTION_TYPE: &str = "Film";
pub const DEFAULT_TITLE: &str = "Advertising Production Quote";

/// Shown in the top sheet header when neither a production house nor an
/// agency is filled in.
pub const DEFAULT_COMPANY: &str = "Production House";

/// Extra key holding the manual cutdown amount.
pub const CUTDOWN_KEY: &str = "ts-cutdown";
/// Extra key holding the VAT percentage.
pub const VAT_PERCENT_KEY: &str = "ts-vat-pct";
/// Extra key holding the production house name.
pub const PRODUCTION_HOUSE_KEY: &str = "ts-prod-house";

/// The known top sheet fields stored in [`ExtraFields`].
pub const EXTRA_FIELDS: [&str; 22] = [
    "ts-music",
    "ts-ag-producer",
    PRODUCTION_HOUSE_KEY,
    "ts-line-prod",
    "ts-prod-service",
    "ts-post-mgr",
    "ts-nb-films",
    "ts-duration",
    "ts-shoot-format",
    "ts-del-format",
    "ts-medias",
    "ts-studio-loc",
    "ts-shoot-loc",
    "ts-prep-days",
    "ts-travel-days",
    "ts-shoot-days",
    "ts-date-preprod",
    "ts-date-shoot",
    "ts-date-postprod",
    "ts-date-delivery",
    CUTDOWN_KEY,
    VAT_PERCENT_KEY,
];

/// Defaults applied to new quotes.
///
/// Loaded from `settings.toml` in the quote store when present; any key
/// left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Currency symbol shown next to amounts
    pub currency: String,
    /// Global margin applied on top of section costs
    pub margin_percent: f64,
    /// VAT used when the top sheet field is blank
    pub vat_percent: f64,
    /// How long a quote stays valid
    pub validity_days: u32,
    /// Production type ("Film", "Photo", ...)
    pub production_type: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            currency: DEFAULT_CURRENCY.to_string(),
            margin_percent: DEFAULT_MARGIN_PERCENT,
            vat_percent: DEFAULT_VAT_PERCENT,
            validity_days: DEFAULT_VALIDITY_DAYS,
            production_type: DEFAULT_PRODUCTION_TYPE.to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> QuoteResult<Self> {
        toml::from_str(text).map_err(|e| QuoteError::parse("settings.toml", e.to_string()))
    }
}

/// Quote header fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    #[serde(deserialize_with = "de_text")]
    pub title: String,
    #[serde(deserialize_with = "de_text")]
    pub advertiser: String,
    #[serde(deserialize_with = "de_text")]
    pub agency: String,
    #[serde(deserialize_with = "de_text")]
    pub client: String,
    #[serde(deserialize_with = "de_text")]
    pub product: String,
    #[serde(deserialize_with = "de_text")]
    pub director: String,
    #[serde(rename = "ep", deserialize_with = "de_text")]
    pub executive_producer: String,
    /// Quote reference; doubles as the saved quote id
    #[serde(rename = "ref", deserialize_with = "de_text")]
    pub reference: String,
    #[serde(deserialize_with = "de_text")]
    pub currency: String,
    /// Issue date
    #[serde(with = "issue_date")]
    pub date: Option<NaiveDate>,
    /// Validity in days
    #[serde(deserialize_with = "de_validity")]
    pub validity: u32,
    #[serde(rename = "type", deserialize_with = "de_text")]
    pub production_type: String,
    /// Global margin percent applied to every section on the top sheet.
    /// `None` (blank on the wire) means the settings default.
    #[serde(deserialize_with = "de_optional_number")]
    pub margin: Option<f64>,
    /// Captured and persisted; not used by any calculation
    #[serde(deserialize_with = "de_amount")]
    pub discount: f64,
    #[serde(deserialize_with = "de_text")]
    pub notes: String,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        ProjectMetadata {
            title: String::new(),
            advertiser: String::new(),
            agency: String::new(),
            client: String::new(),
            product: String::new(),
            director: String::new(),
            executive_producer: String::new(),
            reference: String::new(),
            currency: DEFAULT_CURRENCY.to_string(),
            date: None,
            validity: DEFAULT_VALIDITY_DAYS,
            production_type: DEFAULT_PRODUCTION_TYPE.to_string(),
            margin: None,
            discount: 0.0,
            notes: String::new(),
        }
    }
}

impl ProjectMetadata {
    /// A blank project using `settings`, issued on `today`.
    pub fn new(settings: &Settings, today: NaiveDate) -> Self {
        ProjectMetadata {
            currency: settings.currency.clone(),
            date: Some(today),
            validity: settings.validity_days,
            production_type: settings.production_type.clone(),
            margin: Some(input::sanitize_amount(settings.margin_percent)),
            ..ProjectMetadata::default()
        }
    }

    /// Title, or the generic heading when blank.
    pub fn display_title(&self) -> &str {
        match self.title.trim() {
            "" => DEFAULT_TITLE,
            title => title,
        }
    }

    /// Trimmed reference, if one is set.
    pub fn reference_id(&self) -> Option<&str> {
        Some(self.reference.trim()).filter(|r| !r.is_empty())
    }

    /// Margin the top sheet uses: the project's own, else the settings
    /// default.
    pub fn margin_percent(&self, settings: &Settings) -> f64 {
        self.margin
            .unwrap_or_else(|| input::sanitize_amount(settings.margin_percent))
    }

    /// Last day the quote is valid: issue date plus validity days.
    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.date?.checked_add_days(Days::new(u64::from(self.validity)))
    }

    /// Set a field by its persisted name from operator text.
    ///
    /// Numeric fields go through the usual input coercion. A non-blank
    /// date that does not parse as `YYYY-MM-DD` is rejected.
    pub fn set_field(&mut self, name: &str, value: &str) -> QuoteResult<()> {
        match name {
            "title" => self.title = value.to_string(),
            "advertiser" => self.advertiser = value.to_string(),
            "agency" => self.agency = value.to_string(),
            "client" => self.client = value.to_string(),
            "product" => self.product = value.to_string(),
            "director" => self.director = value.to_string(),
            "ep" => self.executive_producer = value.to_string(),
            "ref" => self.reference = value.to_string(),
            "currency" => {
                self.currency = match value.trim() {
                    "" => DEFAULT_CURRENCY.to_string(),
                    symbol => symbol.to_string(),
                }
            }
            "date" => self.date = parse_issue_date(value)?,
            "validity" => self.validity = validity_from(input::parse_optional(value)),
            "type" => self.production_type = value.to_string(),
            "margin" => self.margin = input::parse_optional(value).map(input::sanitize_amount),
            "discount" => self.discount = input::parse_amount(value),
            "notes" => self.notes = value.to_string(),
            other => {
                return Err(QuoteError::invalid_input(
                    "field",
                    other,
                    "Unknown project field",
                ))
            }
        }
        Ok(())
    }
}

/// Names accepted by [`ProjectMetadata::set_field`], in form order.
pub const PROJECT_FIELDS: [&str; 15] = [
    "title",
    "advertiser",
    "agency",
    "client",
    "product",
    "director",
    "ep",
    "ref",
    "currency",
    "date",
    "validity",
    "type",
    "margin",
    "discount",
    "notes",
];

fn validity_from(value: Option<f64>) -> u32 {
    value
        .map(f64::trunc)
        .filter(|days| *days >= 1.0 && *days <= f64::from(u32::MAX))
        .map(|days| days as u32)
        .unwrap_or(DEFAULT_VALIDITY_DAYS)
}

fn de_validity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    de_optional_number(deserializer).map(validity_from)
}

fn parse_issue_date(value: &str) -> QuoteResult<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| QuoteError::invalid_input("date", value, e.to_string()))
}

/// `YYYY-MM-DD` on the wire, with `""` for no date.
mod issue_date {
    use super::*;

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.collect_str(&date.format("%Y-%m-%d")),
            None => serializer.serialize_str(""),
        }
    }

    /// Unparseable dates read as "no date" rather than failing the load.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = de_text(deserializer)?;
        Ok(parse_issue_date(&raw).ok().flatten())
    }
}

/// Open set of string fields shown on the top sheet.
///
/// Only the cutdown and VAT keys are read by the engine; everything else
/// passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraFields(#[serde(deserialize_with = "de_text_map")] BTreeMap<String, String>);

/// String map whose values older files may have stored as numbers or null.
fn de_text_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Text(#[serde(deserialize_with = "de_text")] String);

    let raw = BTreeMap::<String, Text>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, Text(value))| (key, value)).collect())
}

impl ExtraFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overwrite the keys present in `incoming`, keeping the rest.
    pub fn merge_from(&mut self, incoming: &ExtraFields) {
        for (key, value) in &incoming.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Manual cutdown amount; blank or garbage reads as 0.
    pub fn cutdown(&self) -> f64 {
        self.get(CUTDOWN_KEY).map_or(0.0, input::parse_amount)
    }

    /// VAT percent, or `default` when blank or non-numeric.
    pub fn vat_percent(&self, default: f64) -> f64 {
        self.get(VAT_PERCENT_KEY)
            .and_then(input::parse_optional)
            .map(input::sanitize_amount)
            .unwrap_or(default)
    }

    /// Company named in the top sheet header.
    pub fn company_display<'a>(&'a self, project: &'a ProjectMetadata) -> &'a str {
        [self.get(PRODUCTION_HOUSE_KEY), Some(project.agency.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(DEFAULT_COMPANY)
    }
}
