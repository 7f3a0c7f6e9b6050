//! The three-step wizard sequencer: `upload → select-format → download`.
//!
//! Transitions are user-triggered; the controller allows movement to any of
//! the three named steps at any time. Gating (e.g. disabling "convert" until
//! every item has a format) is a presentation concern, not enforced here.
//! `reset` belongs to the store: it returns to [`WizardStep::Upload`] and
//! clears all items in one mutation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which view of the item store is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    /// Collect files or a website URL.
    #[default]
    Upload,
    /// Choose a target format per item.
    SelectFormat,
    /// Conversion results and downloads.
    Download,
}

impl WizardStep {
    /// The natural forward order of the wizard; `Download` has no successor.
    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Upload => Some(WizardStep::SelectFormat),
            WizardStep::SelectFormat => Some(WizardStep::Download),
            WizardStep::Download => None,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WizardStep::Upload => "upload",
            WizardStep::SelectFormat => "select-format",
            WizardStep::Download => "download",
        };
        f.write_str(s)
    }
}

impl FromStr for WizardStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(WizardStep::Upload),
            "select-format" => Ok(WizardStep::SelectFormat),
            "download" => Ok(WizardStep::Download),
            other => Err(format!("unknown wizard step: '{other}'")),
        }
    }
}
