//! Externalized transformation and quality-check definitions.
//!
//! Definitions are SQL files grouped by purpose under a definitions root:
//!
//! ```text
//! definitions/
//! ├── staging/STAGED_<DATASET>.sql             # RAW -> STAGED
//! ├── cleaned_aggregation/CLEANED_<DATASET>.sql # STAGED -> CLEANED
//! └── data_quality/QUALITY_<DATASET>.sql        # violation-set checks
//! ```
//!
//! The contract for each file kind:
//!
//! - A **transformation** is an idempotent SELECT producing the complete
//!   contents of its target table; the runner replaces the target with the
//!   result. Its primary source is the same dataset one layer up.
//! - A **quality check** is a read-only SELECT whose result set is the set
//!   of violating rows. An empty result is a pass. This is the documented
//!   contract, not a side effect of the runner.
//!
//! Execution order is the dataset family order of the defining list; order
//! across families is insertion order, never inferred from dependencies.

use std::path::Path;

use orbital_core::{Layer, TableIdent};

use crate::error::{LakeError, Result};

/// The dataset families synchronized by default, in execution order.
pub const DATASET_FAMILIES: [&str; 4] = ["ASTRONAUTS", "NASA_APOD", "NASA_DONKI", "NASA_EXOPLANETS"];

/// A named, ordered transformation deriving one table from the layer above.
#[derive(Debug, Clone)]
pub struct TransformDefinition {
    /// Definition name, e.g. `STAGED_ASTRONAUTS`.
    pub name: String,
    /// Table the transformation replaces.
    pub target: TableIdent,
    /// Primary source table one layer up; used to skip the definition when
    /// its dataset has never landed.
    pub source: TableIdent,
    /// The SELECT producing the target's contents.
    pub sql: String,
}

/// A named, read-only check whose result set is the violation set.
#[derive(Debug, Clone)]
pub struct QualityCheckDefinition {
    /// Check name, e.g. `QUALITY_ASTRONAUTS`.
    pub name: String,
    /// The SELECT returning violating rows.
    pub sql: String,
}

/// The full set of definitions for one sync run, loaded up front.
#[derive(Debug, Clone)]
pub struct DefinitionSet {
    /// RAW -> STAGED transformations, in family order.
    pub staged: Vec<TransformDefinition>,
    /// STAGED -> CLEANED transformations, in family order.
    pub cleaned: Vec<TransformDefinition>,
    /// Quality checks against STAGED, in family order.
    pub quality: Vec<QualityCheckDefinition>,
}

impl DefinitionSet {
    /// Loads the default dataset families from a definitions root.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::MissingDefinition`] naming the first absent
    /// file. Loading happens before any catalog mutation, so a missing
    /// definition aborts a run up front.
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_families(root, &DATASET_FAMILIES)
    }

    /// Loads an explicit family list from a definitions root.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::MissingDefinition`] naming the first absent file.
    pub fn load_families(root: &Path, families: &[&str]) -> Result<Self> {
        let mut staged = Vec::with_capacity(families.len());
        let mut cleaned = Vec::with_capacity(families.len());
        let mut quality = Vec::with_capacity(families.len());
        for family in families {
            staged.push(load_transform(root, "staging", "STAGED", family, Layer::Staged)?);
            cleaned.push(load_transform(
                root,
                "cleaned_aggregation",
                "CLEANED",
                family,
                Layer::Cleaned,
            )?);
            let name = format!("QUALITY_{family}");
            let path = root.join("data_quality").join(format!("{name}.sql"));
            quality.push(QualityCheckDefinition {
                sql: read_sql(&path)?,
                name,
            });
        }
        Ok(Self {
            staged,
            cleaned,
            quality,
        })
    }
}

fn load_transform(
    root: &Path,
    group: &str,
    prefix: &str,
    family: &str,
    target_layer: Layer,
) -> Result<TransformDefinition> {
    let name = format!("{prefix}_{family}");
    let path = root.join(group).join(format!("{name}.sql"));
    let sql = read_sql(&path)?;
    let source_layer = match target_layer.upstream() {
        Some(layer) => layer,
        None => {
            return Err(LakeError::internal(format!(
                "transformation {name} targets the bottom layer"
            )));
        }
    };
    Ok(TransformDefinition {
        name,
        target: TableIdent::new(target_layer, family),
        source: TableIdent::new(source_layer, family),
        sql,
    })
}

fn read_sql(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|_| LakeError::MissingDefinition {
        path: path.to_path_buf(),
    })?;
    let sql = raw.trim().to_string();
    if sql.is_empty() {
        return Err(LakeError::MissingDefinition {
            path: path.to_path_buf(),
        });
    }
    Ok(sql)
}
