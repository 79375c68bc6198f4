//! Domain types for the setup scanner.

pub mod bar;
pub mod candidate;
pub mod indicator_set;
pub mod series;
pub mod session;
pub mod setup;

pub use bar::{Bar, BarError};
pub use candidate::Candidate;
pub use indicator_set::IndicatorSet;
pub use series::BarSeries;
pub use session::SessionSnapshot;
pub use setup::{Diagnostics, SetupKind, SetupTag};

/// Symbol type alias
pub type Symbol = String;
