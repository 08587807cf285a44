use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use log::debug;

use snafu::OptionExt;

use super::dates::DateAxis;
use super::error::{Result, UnknownStateSnafu};
use super::states::{StateCode, StateFips};
use super::timeseries::Counters;
use super::usafacts::CountyTable;


pub type StateKey = (StateCode, StateFips);


/// One state row of the aggregated wide table.
#[derive(Debug, Clone, Copy)]
pub struct StateAggregateRecord<'t> {
	pub state: &'t StateCode,
	pub state_fips: StateFips,
	pub confirmed: &'t [u64],
}


/// Per-state wide table. Rows are ordered by (State, stateFIPS).
#[derive(Debug, Clone)]
pub struct StateAggregate {
	confirmed: Counters<StateKey>,
	by_code: HashMap<StateCode, StateKey>,
}

impl StateAggregate {
	/// Wrap an already summed table. Rows are re-sorted by key.
	pub fn from_counters(mut confirmed: Counters<StateKey>) -> Self {
		confirmed.sort_keys();
		let mut by_code = HashMap::new();
		for k in confirmed.keys() {
			by_code.entry(k.0.clone()).or_insert_with(|| k.clone());
		}
		Self{confirmed, by_code}
	}

	pub fn axis(&self) -> &Arc<DateAxis> {
		self.confirmed.axis()
	}

	pub fn confirmed(&self) -> &Counters<StateKey> {
		&self.confirmed
	}

	pub fn len(&self) -> usize {
		self.confirmed.key_count()
	}

	pub fn is_empty(&self) -> bool {
		self.confirmed.is_empty()
	}

	pub fn records(&self) -> impl Iterator<Item = StateAggregateRecord<'_>> + '_ {
		self.confirmed.iter().map(|(k, confirmed)| StateAggregateRecord{
			state: &k.0,
			state_fips: k.1,
			confirmed,
		})
	}

	pub fn get(&self, state: &StateCode) -> Option<StateAggregateRecord<'_>> {
		let key = self.by_code.get(state)?;
		Some(StateAggregateRecord{
			state: &key.0,
			state_fips: key.1,
			confirmed: self.confirmed.get(key)?,
		})
	}

	/// Cumulative count of one state on one date.
	pub fn value_at(&self, state: &StateCode, date: NaiveDate) -> Result<u64> {
		let i = self.axis().locate(date)?;
		let rec = self.get(state).context(UnknownStateSnafu{code: state.as_str()})?;
		Ok(rec.confirmed[i])
	}

	/// All states on one date, in row order.
	pub fn column(&self, date: NaiveDate) -> Result<Vec<(StateAggregateRecord<'_>, u64)>> {
		let i = self.axis().locate(date)?;
		Ok(self.records().map(|rec| {
			let v = rec.confirmed[i];
			(rec, v)
		}).collect())
	}
}

impl PartialEq for StateAggregate {
	fn eq(&self, other: &Self) -> bool {
		if self.axis() != other.axis() || self.len() != other.len() {
			return false
		}
		self.records().zip(other.records()).all(|(a, b)| {
			a.state == b.state && a.state_fips == b.state_fips && a.confirmed == b.confirmed
		})
	}
}


/// Group the county rows by (State, stateFIPS) and sum every date column.
pub fn aggregate_states(counties: &CountyTable) -> Result<StateAggregate> {
	let confirmed = counties.confirmed().rekeyed(|k| {
		let info = counties.info(k)?;
		Some((info.state.clone(), info.state_fips))
	})?;
	debug!("aggregated {} counties into {} states", counties.len(), confirmed.key_count());
	Ok(StateAggregate::from_counters(confirmed))
}
