use std::collections::HashMap;
use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;

use log::{debug, info};

use serde::Serialize;

use smartstring::alias::{String as SmartString};

use snafu::{ensure, OptionExt, ResultExt};

use super::dates::{DateAxis, parse_header_date};
use super::error::{Result, OpenSnafu, ReadCsvSnafu, MissingColumnSnafu, InvalidFieldSnafu, InvalidCountSnafu, DuplicateCountySnafu, InconsistentStateFipsSnafu};
use super::states::{StateCode, StateFips, CountyFips};
use super::timeseries::Counters;


pub static COUNTY_FIPS_COLUMN: &'static str = "countyFIPS";
pub static COUNTY_NAME_COLUMN: &'static str = "County Name";
pub static STATE_COLUMN: &'static str = "State";
pub static STATE_FIPS_COLUMN: &'static str = "stateFIPS";

/// USAFacts reuses countyFIPS 0 for the "Statewide Unallocated" row of
/// every state, so rows are keyed by both codes.
pub type CountyKey = (StateFips, CountyFips);


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountyInfo {
	#[serde(rename = "countyFIPS")]
	pub county_fips: CountyFips,
	#[serde(rename = "countyName")]
	pub name: SmartString,
	#[serde(rename = "state")]
	pub state: StateCode,
	#[serde(rename = "stateFIPS")]
	pub state_fips: StateFips,
}

impl CountyInfo {
	pub fn key(&self) -> CountyKey {
		(self.state_fips, self.county_fips)
	}
}


/// One county row with its cumulative confirmed counts, aligned with the
/// table's [`DateAxis`].
#[derive(Debug, Clone, Copy)]
pub struct RawCountyRecord<'t> {
	pub info: &'t CountyInfo,
	pub confirmed: &'t [u64],
}


/// The raw per-county table as loaded from the source file.
#[derive(Debug, Clone)]
pub struct CountyTable {
	counties: HashMap<CountyKey, Arc<CountyInfo>>,
	confirmed: Counters<CountyKey>,
}

impl CountyTable {
	pub fn new(axis: Arc<DateAxis>) -> Self {
		Self{
			counties: HashMap::new(),
			confirmed: Counters::new(axis),
		}
	}

	/// Adds one county row. Returns false if the key is already taken.
	pub fn insert(&mut self, info: CountyInfo, confirmed: Vec<u64>) -> Result<bool> {
		let key = info.key();
		if !self.confirmed.insert(key, confirmed)? {
			return Ok(false)
		}
		self.counties.insert(key, Arc::new(info));
		Ok(true)
	}

	pub fn axis(&self) -> &Arc<DateAxis> {
		self.confirmed.axis()
	}

	pub fn confirmed(&self) -> &Counters<CountyKey> {
		&self.confirmed
	}

	pub fn info(&self, key: &CountyKey) -> Option<&Arc<CountyInfo>> {
		self.counties.get(key)
	}

	pub fn len(&self) -> usize {
		self.confirmed.key_count()
	}

	pub fn is_empty(&self) -> bool {
		self.confirmed.is_empty()
	}

	/// Rows in file order.
	pub fn records(&self) -> impl Iterator<Item = RawCountyRecord<'_>> + '_ {
		self.confirmed.iter().filter_map(move |(k, confirmed)| {
			Some(RawCountyRecord{
				info: self.counties.get(k)?,
				confirmed,
			})
		})
	}
}


fn open_source(path: &Path) -> io::Result<Box<dyn Read>> {
	let f = fs::File::open(path)?;
	if path.extension().map_or(false, |x| x == "gz") {
		// read every member of concatenated gzip streams
		Ok(Box::new(MultiGzDecoder::new(io::BufReader::new(f))))
	} else {
		Ok(Box::new(f))
	}
}

/// Load a USAFacts confirmed-cases file, decompressing `.gz` files on the
/// fly.
pub fn load_usafacts<P: AsRef<Path>>(path: P) -> Result<CountyTable> {
	let path = path.as_ref();
	let r = open_source(path).context(OpenSnafu{path})?;
	let table = read_usafacts(r)?;
	match (table.axis().first(), table.axis().last()) {
		(Some(first), Some(last)) => info!(
			"loaded {} counties from {} ({} dates, {} to {})",
			table.len(), path.display(), table.axis().len(), first, last,
		),
		_ => info!("loaded {} counties from {} (no dates)", table.len(), path.display()),
	}
	Ok(table)
}


struct HeaderLayout {
	county_fips: usize,
	county_name: usize,
	state: usize,
	state_fips: usize,
	// (csv column, axis index)
	dates: Vec<(usize, usize)>,
	axis: Arc<DateAxis>,
}

fn normalize_header(s: &str) -> &str {
	s.trim_start_matches('\u{feff}').trim()
}

impl HeaderLayout {
	fn detect(headers: &csv::StringRecord) -> Result<Self> {
		let find = |name: &'static str| -> Result<usize> {
			headers.iter()
				.position(|h| normalize_header(h) == name)
				.context(MissingColumnSnafu{column: name})
		};
		let county_fips = find(COUNTY_FIPS_COLUMN)?;
		let county_name = find(COUNTY_NAME_COLUMN)?;
		let state = find(STATE_COLUMN)?;
		let state_fips = find(STATE_FIPS_COLUMN)?;
		let identity = [county_fips, county_name, state, state_fips];

		let mut columns = Vec::new();
		for (i, h) in headers.iter().enumerate() {
			if identity.contains(&i) {
				continue
			}
			match parse_header_date(normalize_header(h)) {
				Some(date) => columns.push((i, date)),
				None => debug!("ignoring non-date column {:?}", h),
			}
		}

		let axis = DateAxis::new(columns.iter().map(|(_, d)| *d).collect())?;
		let dates = columns.iter()
			.filter_map(|(i, d)| Some((*i, axis.index(*d)?)))
			.collect();
		Ok(Self{
			county_fips,
			county_name,
			state,
			state_fips,
			dates,
			axis: Arc::new(axis),
		})
	}
}

fn field<'r>(row: &'r csv::StringRecord, index: usize) -> &'r str {
	row.get(index).unwrap_or("").trim()
}

fn parse_count(value: &str) -> Option<u64> {
	if value.is_empty() {
		// blank trailing cells occur in the published files
		return Some(0)
	}
	value.parse::<u64>().ok()
}

/// Read the raw county table from any CSV source.
pub fn read_usafacts<R: io::Read>(r: R) -> Result<CountyTable> {
	let mut r = csv::ReaderBuilder::new()
		.flexible(true)
		.from_reader(r);
	let headers = r.headers().context(ReadCsvSnafu)?.clone();
	let layout = HeaderLayout::detect(&headers)?;
	let mut table = CountyTable::new(layout.axis.clone());
	let mut state_fips_of: HashMap<StateCode, StateFips> = HashMap::new();

	for row in r.records() {
		let row = row.context(ReadCsvSnafu)?;
		let line = row.position().map(|p| p.line()).unwrap_or(0);

		let raw = field(&row, layout.county_fips);
		let county_fips = raw.parse::<CountyFips>().ok()
			.context(InvalidFieldSnafu{line, column: COUNTY_FIPS_COLUMN, value: raw})?;
		let raw = field(&row, layout.state_fips);
		let state_fips = raw.parse::<StateFips>().ok()
			.context(InvalidFieldSnafu{line, column: STATE_FIPS_COLUMN, value: raw})?;
		let raw = field(&row, layout.state);
		let state = raw.parse::<StateCode>().ok()
			.context(InvalidFieldSnafu{line, column: STATE_COLUMN, value: raw})?;
		let name: SmartString = field(&row, layout.county_name).into();

		// one state code must map to exactly one stateFIPS
		let expected = *state_fips_of.entry(state.clone()).or_insert(state_fips);
		ensure!(expected == state_fips, InconsistentStateFipsSnafu{
			line,
			state: state.as_str(),
			expected,
			found: state_fips,
		});

		let mut confirmed = vec![0u64; layout.axis.len()];
		for (col, axis_index) in layout.dates.iter() {
			let raw = field(&row, *col);
			confirmed[*axis_index] = parse_count(raw).context(InvalidCountSnafu{
				line,
				column: normalize_header(&headers[*col]),
				value: raw,
			})?;
		}

		let info = CountyInfo{
			county_fips,
			name,
			state,
			state_fips,
		};
		if !table.insert(info, confirmed)? {
			return DuplicateCountySnafu{line, state_fips, county_fips}.fail()
		}
	}
	Ok(table)
}
