use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use chrono::NaiveDate;

use serde::Serialize;

use super::aggregate::{StateAggregate, StateKey};
use super::dates::DateAxis;
use super::error::{Result, DuplicateCellSnafu, MissingCellSnafu};
use super::states::{StateCode, StateFips};
use super::timeseries::Counters;


/// One (state, date) cell of the tidy table. Field names follow the
/// column names of the dashboard's line chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongFormRecord {
	#[serde(rename = "State")]
	pub state: StateCode,
	#[serde(rename = "stateFIPS")]
	pub state_fips: StateFips,
	#[serde(rename = "Date")]
	pub date: NaiveDate,
	#[serde(rename = "numberOfConfirmed")]
	pub confirmed: u64,
}


#[derive(Debug, Clone)]
pub struct LongTable {
	axis: Arc<DateAxis>,
	records: Vec<LongFormRecord>,
	by_state: HashMap<StateCode, Range<usize>>,
}

impl LongTable {
	/// Build a table from arbitrary records. They are grouped by state and
	/// ordered by date; relative order is otherwise kept.
	pub fn from_records(axis: Arc<DateAxis>, mut records: Vec<LongFormRecord>) -> Self {
		records.sort_by(|a, b| {
			(&a.state, a.state_fips, a.date).cmp(&(&b.state, b.state_fips, b.date))
		});
		let mut by_state: HashMap<StateCode, Range<usize>> = HashMap::new();
		for (i, rec) in records.iter().enumerate() {
			by_state.entry(rec.state.clone())
				.and_modify(|r| r.end = i + 1)
				.or_insert(i..i + 1);
		}
		Self{axis, records, by_state}
	}

	pub fn axis(&self) -> &Arc<DateAxis> {
		&self.axis
	}

	pub fn records(&self) -> &[LongFormRecord] {
		&self.records[..]
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// All records of one state, ascending by date.
	pub fn for_state(&self, state: &StateCode) -> &[LongFormRecord] {
		match self.by_state.get(state) {
			Some(range) => &self.records[range.clone()],
			None => &[],
		}
	}

	pub fn get(&self, state: &StateCode, date: NaiveDate) -> Option<&LongFormRecord> {
		let recs = self.for_state(state);
		let i = recs.binary_search_by(|r| r.date.cmp(&date)).ok()?;
		Some(&recs[i])
	}
}


/// Unpivot every date column of the aggregate into its own record.
pub fn reshape(aggregate: &StateAggregate) -> LongTable {
	let axis = aggregate.axis().clone();
	let mut records = Vec::with_capacity(aggregate.len() * axis.len());
	for rec in aggregate.records() {
		for (date, confirmed) in axis.dates().iter().zip(rec.confirmed.iter()) {
			records.push(LongFormRecord{
				state: rec.state.clone(),
				state_fips: rec.state_fips,
				date: *date,
				confirmed: *confirmed,
			});
		}
	}
	LongTable::from_records(axis, records)
}

/// Inverse of [`reshape`]. Every (state, date) cell must be present
/// exactly once.
pub fn pivot(long: &LongTable) -> Result<StateAggregate> {
	let axis = long.axis().clone();
	let mut confirmed = Counters::<StateKey>::new(axis.clone());
	let mut seen: HashMap<StateKey, Vec<bool>> = HashMap::new();
	for rec in long.records() {
		let i = axis.locate(rec.date)?;
		let key = (rec.state.clone(), rec.state_fips);
		let filled = seen.entry(key.clone()).or_insert_with(|| vec![false; axis.len()]);
		if filled[i] {
			return DuplicateCellSnafu{state: rec.state.as_str(), date: rec.date}.fail()
		}
		filled[i] = true;
		confirmed.get_or_create(key)[i] = rec.confirmed;
	}
	for ((state, _), filled) in seen.iter() {
		if let Some(i) = filled.iter().position(|f| !f) {
			return MissingCellSnafu{
				state: state.as_str(),
				date: axis.dates()[i],
			}.fail()
		}
	}
	Ok(StateAggregate::from_counters(confirmed))
}
