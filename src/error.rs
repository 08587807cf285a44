use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;

use snafu::Snafu;


/// Coarse classification of [`Error`], used to decide whether a failure is
/// fatal at startup (load, schema, aggregation) or a rejected selection
/// (lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	Load,
	Schema,
	Lookup,
	Aggregation,
}


#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
	#[snafu(display("failed to open {}: {}", path.display(), source))]
	Open {
		path: PathBuf,
		source: io::Error,
	},

	#[snafu(display("malformed csv: {}", source))]
	ReadCsv {
		source: csv::Error,
	},

	#[snafu(display("failed to parse configuration {}: {}", path.display(), source))]
	ParseConfig {
		path: PathBuf,
		source: serde_json::Error,
	},

	#[snafu(display("no input file configured (use --input, the config file or ${})", var))]
	MissingInput {
		var: &'static str,
	},

	#[snafu(display("line {}: invalid value {:?} in column {}", line, value, column))]
	InvalidField {
		line: u64,
		column: &'static str,
		value: String,
	},

	#[snafu(display("required column {:?} is missing", column))]
	MissingColumn {
		column: &'static str,
	},

	#[snafu(display("date {} appears in more than one column", date))]
	DuplicateDate {
		date: NaiveDate,
	},

	#[snafu(display("line {}: county {} of state {} appears more than once", line, county_fips, state_fips))]
	DuplicateCounty {
		line: u64,
		state_fips: u32,
		county_fips: u32,
	},

	#[snafu(display("line {}: state {} has stateFIPS {}, earlier rows use {}", line, state, found, expected))]
	InconsistentStateFips {
		line: u64,
		state: String,
		expected: u32,
		found: u32,
	},

	#[snafu(display("row has {} values for {} date columns", found, expected))]
	RowLength {
		expected: usize,
		found: usize,
	},

	#[snafu(display("state code {} is listed more than once", code))]
	DuplicateState {
		code: String,
	},

	#[snafu(display("more than one record for state {} on {}", state, date))]
	DuplicateCell {
		state: String,
		date: NaiveDate,
	},

	#[snafu(display("no record for state {} on {}", state, date))]
	MissingCell {
		state: String,
		date: NaiveDate,
	},

	#[snafu(display("line {}: count {:?} in column {} is not a non-negative integer", line, value, column))]
	InvalidCount {
		line: u64,
		column: String,
		value: String,
	},

	#[snafu(display("case count overflow while summing {} on {}", key, date))]
	CountOverflow {
		key: String,
		date: NaiveDate,
	},

	#[snafu(display("unknown state code {:?}", code))]
	UnknownState {
		code: String,
	},

	#[snafu(display("date {} is outside of the dataset range {} to {}", date, first, last))]
	DateOutOfRange {
		date: NaiveDate,
		first: NaiveDate,
		last: NaiveDate,
	},

	#[snafu(display("the dataset has no column for {}", date))]
	MissingDate {
		date: NaiveDate,
	},

	#[snafu(display("the dataset has no date columns"))]
	NoDates,

	#[snafu(display("cannot interpret {:?} as a date", value))]
	InvalidDate {
		value: String,
	},

	#[snafu(display("invalid selection event: {}", source))]
	InvalidEvent {
		source: serde_json::Error,
	},
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Open{..}
				| Self::ReadCsv{..}
				| Self::ParseConfig{..}
				| Self::MissingInput{..}
				| Self::InvalidField{..} => ErrorKind::Load,
			Self::MissingColumn{..}
				| Self::DuplicateDate{..}
				| Self::DuplicateCounty{..}
				| Self::InconsistentStateFips{..}
				| Self::RowLength{..}
				| Self::DuplicateState{..}
				| Self::DuplicateCell{..}
				| Self::MissingCell{..} => ErrorKind::Schema,
			Self::InvalidCount{..}
				| Self::CountOverflow{..} => ErrorKind::Aggregation,
			Self::UnknownState{..}
				| Self::DateOutOfRange{..}
				| Self::MissingDate{..}
				| Self::NoDates
				| Self::InvalidDate{..}
				| Self::InvalidEvent{..} => ErrorKind::Lookup,
		}
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
