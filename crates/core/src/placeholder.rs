//! Substitution of `[[Sheet!Cell]]` placeholders in slide markup.

use crate::{CellRef, PlaceholderToken, Result, ValueFormatter, Workbook};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `[[Sheet Name!B12]]`: sheet names of letters, digits, underscore and space.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([A-Za-z0-9_ ]+?)!([A-Za-z0-9]+)\]\]").unwrap());

/// Replacement for a placeholder naming a sheet the workbook does not have.
pub const SHEET_NOT_FOUND: &str = "Not found";

/// Replaces placeholder tokens with formatted values from the master workbook.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderSubstitutor {
    formatter: ValueFormatter,
}

impl PlaceholderSubstitutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find every placeholder token in the markup, left to right.
    pub fn find_tokens(&self, markup: &str) -> Vec<PlaceholderToken> {
        PLACEHOLDER_REGEX
            .captures_iter(markup)
            .map(|caps| PlaceholderToken::new(&caps[1], &caps[2]))
            .collect()
    }

    /// Substitute every placeholder in `markup`.
    ///
    /// Substituted text is inserted verbatim and never re-scanned.
    pub fn substitute<W: Workbook + ?Sized>(&self, markup: &str, workbook: &W) -> String {
        let sheets = workbook.sheet_names();

        PLACEHOLDER_REGEX
            .replace_all(markup, |caps: &Captures| {
                let token = PlaceholderToken::new(&caps[1], &caps[2]);
                if sheets.iter().any(|s| *s == token.sheet_name) {
                    self.resolve(workbook, &token)
                } else {
                    log::debug!("Placeholder sheet '{}' not found", token.sheet_name);
                    SHEET_NOT_FOUND.to_string()
                }
            })
            .into_owned()
    }

    /// Resolve a token on an existing sheet; failures become the empty string.
    fn resolve<W: Workbook + ?Sized>(&self, workbook: &W, token: &PlaceholderToken) -> String {
        match self.try_resolve(workbook, token) {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "Failed to resolve placeholder [[{}!{}]]: {}",
                    token.sheet_name,
                    token.cell_ref,
                    e
                );
                String::new()
            }
        }
    }

    fn try_resolve<W: Workbook + ?Sized>(&self, workbook: &W, token: &PlaceholderToken) -> Result<String> {
        let cell_ref = CellRef::parse(&token.cell_ref)?;
        let cell = workbook.cell(&token.sheet_name, cell_ref)?;
        Ok(self.formatter.format_cell(cell.as_ref()))
    }
}
