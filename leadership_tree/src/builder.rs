pub use crate::config::*;

/// A builder for assembling a roster programmatically.
///
/// It should be considered when the rows do not come from a spreadsheet.
///
/// ```
/// pub use leadership_tree::builder::Builder;
/// pub use leadership_tree::HierarchyRules;
/// # use leadership_tree::HierarchyErrors;
///
/// let mut builder = Builder::new(&HierarchyRules::DEFAULT_RULES)?;
///
/// builder.add_row_simple("Ana", "candidato")?;
/// builder.add_row_simple("Bruno", "lideranca")?;
///
/// let result = builder.build()?;
/// assert_eq!(result.roots.len(), 1);
///
/// # Ok::<(), HierarchyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: HierarchyRules,
    pub(crate) _rows: Vec<RawRow>,
}

impl Builder {
    pub fn new(rules: &HierarchyRules) -> Result<Builder, HierarchyErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _rows: Vec::new(),
        })
    }

    /// Adds a row with just a name and a level tag.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_row_simple(&mut self, name: &str, level: &str) -> Result<(), HierarchyErrors> {
        self.add_row(RawRow {
            name: Some(name.to_string()),
            level: Some(level.to_string()),
            ..RawRow::default()
        })
    }

    /// Adds a complete raw row.
    ///
    /// Fields may be missing or malformed; the classifier applies the usual
    /// recovery rules (defaults, skips) when the hierarchy is built.
    pub fn add_row(&mut self, row: RawRow) -> Result<(), HierarchyErrors> {
        self._rows.push(row);
        Ok(())
    }

    /// Runs the full pipeline on the accumulated rows.
    pub fn build(&self) -> Result<HierarchyResult, HierarchyErrors> {
        crate::build_hierarchy(&self._rows, &self._rules)
    }
}
