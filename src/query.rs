use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;

use enum_map::{enum_map, Enum, EnumMap};

use log::info;

use serde::{Deserialize, Serialize};

use smartstring::alias::{String as SmartString};

use snafu::OptionExt;

use super::aggregate::{aggregate_states, StateAggregate};
use super::dates::DateAxis;
use super::error::{Result, NoDatesSnafu};
use super::longform::{reshape, LongTable};
use super::session::Selection;
use super::states::{county_state_fips, CountyFips, StateCode, StateFips, StateTable};
use super::usafacts::{load_usafacts, CountyTable};


pub const LEADERBOARD_SIZE: usize = 10;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum MapLevel {
	County,
	State,
}

pub fn default_thresholds() -> EnumMap<MapLevel, Vec<u64>> {
	enum_map!{
		MapLevel::County => vec![20, 100, 500, 1000, 5000],
		MapLevel::State => vec![200, 1000, 5000, 10000, 50000],
	}
}


/// Y axis transform of the line chart. Does not change any data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
	Linear,
	Log,
}

impl Default for Scale {
	fn default() -> Self {
		Self::Linear
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScaleError(pub String);

impl fmt::Display for ParseScaleError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "unknown scale {:?}, expected linear or log", self.0)
	}
}

impl std::error::Error for ParseScaleError {}

impl FromStr for Scale {
	type Err = ParseScaleError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"linear" => Ok(Self::Linear),
			"log" => Ok(Self::Log),
			_ => Err(ParseScaleError(s.into())),
		}
	}
}

impl fmt::Display for Scale {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Linear => f.write_str("linear"),
			Self::Log => f.write_str("log"),
		}
	}
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountyCell {
	#[serde(rename = "countyFIPS")]
	pub county_fips: CountyFips,
	#[serde(rename = "countyName")]
	pub county_name: SmartString,
	pub confirmed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountyChoropleth {
	pub state: StateCode,
	#[serde(rename = "stateFIPS")]
	pub state_fips: StateFips,
	pub date: NaiveDate,
	pub thresholds: Vec<u64>,
	pub counties: Vec<CountyCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateCell {
	#[serde(rename = "stateFIPS")]
	pub state_fips: StateFips,
	pub state: StateCode,
	pub confirmed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChoropleth {
	pub date: NaiveDate,
	pub thresholds: Vec<u64>,
	pub states: Vec<StateCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
	pub rank: usize,
	pub state: StateCode,
	pub confirmed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
	pub date: NaiveDate,
	pub confirmed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesView {
	pub state: StateCode,
	pub scale: Scale,
	pub points: Vec<SeriesPoint>,
	/// Value at the selected date, drawn on top of the line.
	pub marker: Option<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarRow {
	pub state: StateCode,
	pub confirmed: u64,
}

/// Everything the page shows for one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardViews {
	pub selection: Selection,
	pub county_map: CountyChoropleth,
	pub state_map: StateChoropleth,
	pub leaderboard: Vec<LeaderboardRow>,
	pub time_series: TimeSeriesView,
	pub bar_chart: Vec<BarRow>,
}


/// The immutable tables of one dataset plus the reference data needed to
/// query them.
#[derive(Debug, Clone)]
pub struct Dashboard {
	states: StateTable,
	counties: CountyTable,
	aggregate: StateAggregate,
	long: LongTable,
	thresholds: EnumMap<MapLevel, Vec<u64>>,
}

impl Dashboard {
	pub fn new(states: StateTable, counties: CountyTable) -> Result<Self> {
		let aggregate = aggregate_states(&counties)?;
		let long = reshape(&aggregate);
		info!(
			"dashboard ready: {} counties, {} states, {} long-form records",
			counties.len(), aggregate.len(), long.len(),
		);
		Ok(Self{
			states,
			counties,
			aggregate,
			long,
			thresholds: default_thresholds(),
		})
	}

	pub fn load<P: AsRef<Path>>(states: StateTable, path: P) -> Result<Self> {
		Self::new(states, load_usafacts(path)?)
	}

	pub fn with_thresholds(mut self, level: MapLevel, thresholds: Vec<u64>) -> Self {
		self.thresholds[level] = thresholds;
		self
	}

	pub fn states(&self) -> &StateTable {
		&self.states
	}

	pub fn counties(&self) -> &CountyTable {
		&self.counties
	}

	pub fn aggregate(&self) -> &StateAggregate {
		&self.aggregate
	}

	pub fn long(&self) -> &LongTable {
		&self.long
	}

	pub fn axis(&self) -> &Arc<DateAxis> {
		self.counties.axis()
	}

	pub fn thresholds(&self, level: MapLevel) -> &[u64] {
		&self.thresholds[level][..]
	}

	/// Bounds for the date picker.
	pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
		let axis = self.axis();
		let first = axis.first().context(NoDatesSnafu)?;
		let last = axis.last().context(NoDatesSnafu)?;
		Ok((first, last))
	}

	/// Counties of one state on one date, for the county map.
	///
	/// Counties are matched through their own FIPS code, so the
	/// "Statewide Unallocated" rows (county code 0) never show up.
	pub fn county_choropleth(&self, state: &StateCode, date: NaiveDate) -> Result<CountyChoropleth> {
		let state_fips = self.states.fips(state)?;
		let i = self.axis().locate(date)?;
		let counties = self.counties.records()
			.filter(|rec| county_state_fips(rec.info.county_fips) == state_fips)
			.map(|rec| CountyCell{
				county_fips: rec.info.county_fips,
				county_name: rec.info.name.clone(),
				confirmed: rec.confirmed[i],
			})
			.collect();
		Ok(CountyChoropleth{
			state: state.clone(),
			state_fips,
			date,
			thresholds: self.thresholds(MapLevel::County).to_vec(),
			counties,
		})
	}

	pub fn state_choropleth(&self, date: NaiveDate) -> Result<StateChoropleth> {
		let states = self.aggregate.column(date)?
			.into_iter()
			.map(|(rec, confirmed)| StateCell{
				state_fips: rec.state_fips,
				state: rec.state.clone(),
				confirmed,
			})
			.collect();
		Ok(StateChoropleth{
			date,
			thresholds: self.thresholds(MapLevel::State).to_vec(),
			states,
		})
	}

	/// States ordered by count, highest first. Equal counts keep the
	/// aggregate's row order.
	fn ranked(&self, date: NaiveDate) -> Result<Vec<(StateCode, u64)>> {
		let mut column: Vec<_> = self.aggregate.column(date)?
			.into_iter()
			.map(|(rec, v)| (rec.state.clone(), v))
			.collect();
		column.sort_by(|a, b| b.1.cmp(&a.1));
		Ok(column)
	}

	pub fn top_n(&self, date: NaiveDate, n: usize) -> Result<Vec<LeaderboardRow>> {
		Ok(self.ranked(date)?
			.into_iter()
			.take(n)
			.enumerate()
			.map(|(i, (state, confirmed))| LeaderboardRow{
				rank: i + 1,
				state,
				confirmed,
			})
			.collect())
	}

	pub fn leaderboard(&self, date: NaiveDate) -> Result<Vec<LeaderboardRow>> {
		self.top_n(date, LEADERBOARD_SIZE)
	}

	/// The line chart of one state: days with at least one case, plus the
	/// marker at the selected date.
	pub fn time_series(&self, state: &StateCode, date: NaiveDate, scale: Scale) -> Result<TimeSeriesView> {
		self.states.fips(state)?;
		let i = self.axis().locate(date)?;
		let points = self.long.for_state(state)
			.iter()
			.filter(|rec| rec.confirmed > 0)
			.map(|rec| SeriesPoint{date: rec.date, confirmed: rec.confirmed})
			.collect();
		let marker = self.aggregate.get(state).map(|rec| SeriesPoint{
			date,
			confirmed: rec.confirmed[i],
		});
		Ok(TimeSeriesView{
			state: state.clone(),
			scale,
			points,
			marker,
		})
	}

	pub fn bar_chart(&self, date: NaiveDate) -> Result<Vec<BarRow>> {
		Ok(self.ranked(date)?
			.into_iter()
			.map(|(state, confirmed)| BarRow{state, confirmed})
			.collect())
	}

	/// Evaluate every view for one selection.
	pub fn views(&self, selection: &Selection) -> Result<DashboardViews> {
		Ok(DashboardViews{
			selection: selection.clone(),
			county_map: self.county_choropleth(&selection.state, selection.date)?,
			state_map: self.state_choropleth(selection.date)?,
			leaderboard: self.leaderboard(selection.date)?,
			time_series: self.time_series(&selection.state, selection.date, selection.scale)?,
			bar_chart: self.bar_chart(selection.date)?,
		})
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::error::{Error, ErrorKind};
	use crate::usafacts::read_usafacts;

	fn code(s: &str) -> StateCode {
		s.parse().unwrap()
	}

	fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn dashboard(csv: &str) -> Dashboard {
		Dashboard::new(StateTable::builtin().unwrap(), read_usafacts(csv.as_bytes()).unwrap()).unwrap()
	}

	static SAMPLE: &'static str = "countyFIPS,County Name,State,stateFIPS,3/3/20,3/4/20,3/5/20,3/6/20\n\
		0,Statewide Unallocated,NY,36,0,0,1,1\n\
		36061,New York County,NY,36,0,0,2,6\n\
		36047,Kings County,NY,36,0,0,0,0\n\
		34003,Bergen County,NJ,34,0,1,2,3\n\
		6001,Alameda County,CA,6,1,1,1,1\n";

	#[test]
	fn county_map_filters_on_county_fips() {
		let d = dashboard(SAMPLE);
		let map = d.county_choropleth(&code("NY"), ymd(2020, 3, 6)).unwrap();
		assert_eq!(map.state_fips, 36);
		assert_eq!(map.thresholds, vec![20, 100, 500, 1000, 5000]);
		let rows: Vec<_> = map.counties.iter().map(|c| (c.county_fips, c.confirmed)).collect();
		assert_eq!(rows, vec![(36061, 6), (36047, 0)]);
		for c in map.counties.iter() {
			assert_eq!(c.county_fips / 1000, 36);
		}
	}

	#[test]
	fn county_map_rejects_unknown_states() {
		let d = dashboard(SAMPLE);
		match d.county_choropleth(&code("ZZ"), ymd(2020, 3, 6)) {
			Err(Error::UnknownState{code}) => assert_eq!(code, "ZZ"),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn state_map_covers_all_states() {
		let d = dashboard(SAMPLE);
		let map = d.state_choropleth(ymd(2020, 3, 5)).unwrap();
		let rows: Vec<_> = map.states.iter().map(|s| (s.state.as_str(), s.state_fips, s.confirmed)).collect();
		assert_eq!(rows, vec![("CA", 6, 1), ("NJ", 34, 2), ("NY", 36, 3)]);
		assert_eq!(map.thresholds, vec![200, 1000, 5000, 10000, 50000]);
	}

	#[test]
	fn leaderboard_is_ranked_and_stable() {
		let d = dashboard(SAMPLE);
		let top = d.leaderboard(ymd(2020, 3, 4)).unwrap();
		let rows: Vec<_> = top.iter().map(|r| (r.rank, r.state.as_str(), r.confirmed)).collect();
		// CA and NJ tie; aggregate order decides
		assert_eq!(rows, vec![(1, "CA", 1), (2, "NJ", 1), (3, "NY", 0)]);
	}

	#[test]
	fn leaderboard_is_capped_at_ten() {
		let mut csv = String::from("countyFIPS,County Name,State,stateFIPS,3/3/20\n");
		for (i, info) in StateTable::builtin().unwrap().iter().enumerate().take(12) {
			csv.push_str(&format!("{},County,{},{},{}\n", info.fips * 1000 + 1, info.code, info.fips, i));
		}
		let d = dashboard(&csv);
		let top = d.leaderboard(ymd(2020, 3, 3)).unwrap();
		assert_eq!(top.len(), LEADERBOARD_SIZE);
		for (i, row) in top.iter().enumerate() {
			assert_eq!(row.rank, i + 1);
		}
		for pair in top.windows(2) {
			assert!(pair[0].confirmed >= pair[1].confirmed);
		}
		assert_eq!(top[0].confirmed, 11);
	}

	#[test]
	fn time_series_skips_days_without_cases() {
		let d = dashboard(SAMPLE);
		let view = d.time_series(&code("NY"), ymd(2020, 3, 5), Scale::Log).unwrap();
		assert_eq!(view.points, vec![
			SeriesPoint{date: ymd(2020, 3, 5), confirmed: 3},
			SeriesPoint{date: ymd(2020, 3, 6), confirmed: 7},
		]);
		assert_eq!(view.marker, Some(SeriesPoint{date: ymd(2020, 3, 5), confirmed: 3}));
		assert_eq!(view.scale, Scale::Log);

		let empty = d.time_series(&code("TX"), ymd(2020, 3, 5), Scale::Linear).unwrap();
		assert!(empty.points.is_empty());
		assert_eq!(empty.marker, None);
	}

	#[test]
	fn bar_chart_is_sorted_descending() {
		let d = dashboard(SAMPLE);
		let bars = d.bar_chart(ymd(2020, 3, 6)).unwrap();
		let rows: Vec<_> = bars.iter().map(|b| (b.state.as_str(), b.confirmed)).collect();
		assert_eq!(rows, vec![("NY", 7), ("NJ", 3), ("CA", 1)]);
	}

	#[test]
	fn dates_outside_the_dataset_fail_loudly() {
		let d = dashboard(SAMPLE);
		assert_eq!(d.date_range().unwrap(), (ymd(2020, 3, 3), ymd(2020, 3, 6)));
		for date in [ymd(2020, 3, 2), ymd(2020, 3, 7)] {
			assert_eq!(d.state_choropleth(date).unwrap_err().kind(), ErrorKind::Lookup);
			assert_eq!(d.leaderboard(date).unwrap_err().kind(), ErrorKind::Lookup);
			assert_eq!(d.bar_chart(date).unwrap_err().kind(), ErrorKind::Lookup);
			assert_eq!(d.time_series(&code("NY"), date, Scale::Linear).unwrap_err().kind(), ErrorKind::Lookup);
			assert_eq!(d.county_choropleth(&code("NY"), date).unwrap_err().kind(), ErrorKind::Lookup);
		}
	}

	#[test]
	fn thresholds_can_be_overridden() {
		let d = dashboard(SAMPLE).with_thresholds(MapLevel::County, vec![1, 2, 3]);
		assert_eq!(d.thresholds(MapLevel::County), &[1, 2, 3]);
		assert_eq!(d.thresholds(MapLevel::State), &[200, 1000, 5000, 10000, 50000]);
	}

	#[test]
	fn scales_parse_case_insensitively() {
		assert_eq!("LOG".parse::<Scale>().unwrap(), Scale::Log);
		assert_eq!("linear".parse::<Scale>().unwrap(), Scale::Linear);
		assert!("sqrt".parse::<Scale>().is_err());
		assert_eq!(Scale::default(), Scale::Linear);
	}
}
