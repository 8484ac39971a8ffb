//! Roll aggregation for pixelroll.
//!
//! Turns settled dice into chat messages:
//!
//! - [`compute_rollset`] picks the dice a formula cares about
//! - [`RollAggregator`] collects their faces over one or two passes
//! - [`format_message`] fills the formula's placeholders
//! - [`FormulaLibrary`] keeps the user's saved formulas
//!
//! # Modes
//!
//! | advantage | sum | posts per roll                              |
//! |-----------|-----|---------------------------------------------|
//! | off       | off | one, `#face_value` = faces space-separated  |
//! | off       | on  | one, `#face_value` = sum of faces           |
//! | on        | on  | two (one per pass), each with its pass sum  |
//! | on        | off | one per die, each with that die's two faces |

mod aggregator;
mod config;
mod error;
mod formula;
mod library;

pub use aggregator::{RollAggregator, RollReport, RollSession};
pub use config::RollSettings;
pub use error::RollError;
pub use formula::{
    DEFAULT_FORMULA, MessageContext, NAME_PLACEHOLDER, WILDCARD,
    compute_rollset, contains_placeholder, format_message,
};
pub use library::{FormulaEntry, FormulaLibrary};
