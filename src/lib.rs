//! County and state level views over the USAFacts confirmed-case tables.
//!
//! The raw per-county CSV is loaded once into a [`CountyTable`], summed
//! into a per-state [`StateAggregate`] and unpivoted into a [`LongTable`].
//! A [`Dashboard`] owns all three and answers the view queries for a
//! [`Selection`].

mod error;
mod dates;
mod states;
mod timeseries;
mod usafacts;
mod aggregate;
mod longform;
mod query;
mod session;
mod config;

pub use error::{Error, ErrorKind, Result};
pub use dates::*;
pub use states::*;
pub use timeseries::*;
pub use usafacts::*;
pub use aggregate::*;
pub use longform::*;
pub use query::*;
pub use session::*;
pub use config::*;
