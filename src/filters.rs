use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// One selectable query refinement (a tag or category on the source).
///
/// `group` is an organizational label for display purposes only; the engine
/// treats all options alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOption {
    pub display_name: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl FilterOption {
    pub fn none(display_name: &str) -> Self {
        Self { display_name: display_name.to_string(), target_url: None, group: None }
    }

    pub fn new(display_name: &str, target_url: &str, group: Option<&str>) -> Self {
        Self {
            display_name: display_name.to_string(),
            target_url: Some(target_url.to_string()),
            group: group.map(str::to_string),
        }
    }
}

/// Typed filter selection, validated against a fixed option set.
///
/// Option 0 is always the distinguished "none selected" option. Selecting
/// any later option overrides free-text query construction entirely;
/// selecting option 0 falls back to keyword+page requests.
#[derive(Debug, Clone)]
pub struct FilterModel {
    options: Vec<FilterOption>,
    selected: usize,
}

impl FilterModel {
    /// Build a model over the given options, prepending the "none" option
    /// when the source did not supply one itself.
    pub fn new(mut options: Vec<FilterOption>) -> Self {
        if options.first().map(|o| o.target_url.is_some()).unwrap_or(true) {
            options.insert(0, FilterOption::none("None"));
        }
        Self { options, selected: 0 }
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    pub fn select(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= self.options.len() {
            return Err(EngineError::InvalidFilterIndex { index, len: self.options.len() });
        }
        self.selected = index;
        Ok(())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> &FilterOption {
        &self.options[self.selected]
    }

    /// True iff the current selection replaces the free-text query.
    pub fn is_overriding_query(&self) -> bool {
        self.selected > 0 && self.options[self.selected].target_url.is_some()
    }
}
