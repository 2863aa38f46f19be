//! Promotion layers and table identity.
//!
//! Tables are identified by `(layer, table_name)`. Canonical table names are
//! uppercase with non-alphanumeric runs collapsed to `_`, derived
//! deterministically from the snapshot file that sourced them. Inside the
//! query engine the same identifiers appear lowercased, because unquoted SQL
//! identifiers are case-normalized there; `sql_schema`/`sql_name` expose that
//! form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the ordered promotion stages for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layer {
    /// Snapshot files ingested as-is, plus provenance columns.
    Raw,
    /// Normalized tables derived from RAW.
    Staged,
    /// Quality-gated tables derived from STAGED, exposed for querying.
    Cleaned,
}

impl Layer {
    /// All layers in promotion order.
    pub const ALL: [Self; 3] = [Self::Raw, Self::Staged, Self::Cleaned];

    /// Canonical uppercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::Staged => "STAGED",
            Self::Cleaned => "CLEANED",
        }
    }

    /// Schema name as seen by the query engine (lowercase).
    #[must_use]
    pub const fn sql_schema(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Staged => "staged",
            Self::Cleaned => "cleaned",
        }
    }

    /// The layer this one is derived from, if any.
    #[must_use]
    pub const fn upstream(self) -> Option<Self> {
        match self {
            Self::Raw => None,
            Self::Staged => Some(Self::Raw),
            Self::Cleaned => Some(Self::Staged),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "RAW" => Ok(Self::Raw),
            "STAGED" => Ok(Self::Staged),
            "CLEANED" => Ok(Self::Cleaned),
            other => Err(Error::InvalidInput(format!("unknown layer: {other}"))),
        }
    }
}

/// Identity of a catalog table: `(layer, table_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdent {
    /// Layer the table lives in.
    pub layer: Layer,
    /// Canonical uppercase table name.
    pub name: String,
}

impl TableIdent {
    /// Creates a table identity. The name is canonicalized on the way in.
    #[must_use]
    pub fn new(layer: Layer, name: impl AsRef<str>) -> Self {
        Self {
            layer,
            name: canonicalize(name.as_ref()),
        }
    }

    /// The fully qualified catalog key, e.g. `RAW.ASTRONAUTS`.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.layer, self.name)
    }

    /// Table name as seen by the query engine (lowercase).
    #[must_use]
    pub fn sql_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Parses a qualified key back into an identity.
    pub fn parse(qualified: &str) -> Result<Self, Error> {
        let (layer, name) = qualified.split_once('.').ok_or_else(|| {
            Error::InvalidInput(format!("malformed table identity: {qualified}"))
        })?;
        if name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "malformed table identity: {qualified}"
            )));
        }
        Ok(Self {
            layer: layer.parse()?,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for TableIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.layer, self.name)
    }
}

/// Derives the canonical table name for a snapshot file.
///
/// The base name is taken, a trailing `.parquet` extension stripped, and the
/// remainder canonicalized: non-alphanumeric runs collapse to a single `_`,
/// leading/trailing separators drop, letters uppercase. Two file names
/// differing only in case or separators map to the same table.
#[must_use]
pub fn table_name_from_file(file_name: &str) -> String {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = base.strip_suffix(".parquet").unwrap_or(base);
    canonicalize(stem)
}

fn canonicalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_uppercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separator_runs_and_case() {
        assert_eq!(table_name_from_file("nasa-apod 2025.parquet"), "NASA_APOD_2025");
        assert_eq!(table_name_from_file("astronauts.parquet"), "ASTRONAUTS");
        assert_eq!(table_name_from_file("RAW_DATA/nasa_donki.parquet"), "NASA_DONKI");
    }

    #[test]
    fn case_and_separator_variants_collapse() {
        let a = table_name_from_file("Nasa--Apod.parquet");
        let b = table_name_from_file("nasa_apod.parquet");
        assert_eq!(a, b);
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(table_name_from_file("_astronauts_.parquet"), "ASTRONAUTS");
    }

    #[test]
    fn qualified_round_trips_through_parse() {
        let ident = TableIdent::new(Layer::Staged, "nasa_apod");
        assert_eq!(ident.qualified(), "STAGED.NASA_APOD");
        let parsed = TableIdent::parse(&ident.qualified()).expect("parse");
        assert_eq!(parsed, ident);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(TableIdent::parse("ASTRONAUTS").is_err());
        assert!(TableIdent::parse("BRONZE.ASTRONAUTS").is_err());
        assert!(TableIdent::parse("RAW.").is_err());
    }

    #[test]
    fn sql_forms_are_lowercase() {
        let ident = TableIdent::new(Layer::Cleaned, "NASA_EXOPLANETS");
        assert_eq!(ident.layer.sql_schema(), "cleaned");
        assert_eq!(ident.sql_name(), "nasa_exoplanets");
    }

    #[test]
    fn upstream_chain() {
        assert_eq!(Layer::Cleaned.upstream(), Some(Layer::Staged));
        assert_eq!(Layer::Staged.upstream(), Some(Layer::Raw));
        assert_eq!(Layer::Raw.upstream(), None);
    }
}
