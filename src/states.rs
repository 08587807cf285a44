use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use smartstring::alias::{String as SmartString};

use snafu::{OptionExt, ResultExt};

use super::error::{Result, OpenSnafu, ReadCsvSnafu, DuplicateStateSnafu, UnknownStateSnafu};


pub type StateFips = u32;
pub type CountyFips = u32;

static BUILTIN_STATES: &'static str = include_str!("../data/states.csv");


/// State identifier derived from a county FIPS code (`SSCCC`).
#[inline(always)]
pub fn county_state_fips(county: CountyFips) -> StateFips {
	county / 1000
}


/// Two-letter postal code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateCode(SmartString);

impl StateCode {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStateCodeError {
	InvalidLength(usize),
	NotAlphabetic,
}

impl fmt::Display for ParseStateCodeError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::InvalidLength(n) => write!(f, "state code must have two letters, got {}", n),
			Self::NotAlphabetic => f.write_str("state code must be alphabetic"),
		}
	}
}

impl std::error::Error for ParseStateCodeError {}

impl FromStr for StateCode {
	type Err = ParseStateCodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let n = s.chars().count();
		if n != 2 {
			return Err(ParseStateCodeError::InvalidLength(n))
		}
		if !s.chars().all(|c| c.is_ascii_alphabetic()) {
			return Err(ParseStateCodeError::NotAlphabetic)
		}
		Ok(Self(s.to_ascii_uppercase().into()))
	}
}

impl fmt::Display for StateCode {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Serialize for StateCode {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where S: Serializer
	{
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for StateCode {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where D: Deserializer<'de>
	{
		let s = String::deserialize(deserializer)?;
		FromStr::from_str(&s).map_err(de::Error::custom)
	}
}


#[derive(Debug, Clone, Serialize)]
pub struct StateInfo {
	pub code: StateCode,
	pub fips: StateFips,
	pub name: SmartString,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStateRow {
	code: StateCode,
	fips: StateFips,
	name: SmartString,
}


/// The fixed list of jurisdictions a user may select, with their FIPS
/// codes. Row order is the order offered to the user.
#[derive(Debug, Clone)]
pub struct StateTable {
	states: Vec<StateInfo>,
	by_code: HashMap<StateCode, usize>,
}

impl StateTable {
	/// The 50 states plus DC, from the table embedded at build time.
	pub fn builtin() -> Result<Self> {
		Self::from_reader(BUILTIN_STATES.as_bytes())
	}

	pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let f = fs::File::open(path).context(OpenSnafu{path})?;
		Self::from_reader(f)
	}

	pub fn from_reader<R: io::Read>(r: R) -> Result<Self> {
		let mut states = Vec::new();
		let mut by_code = HashMap::new();
		let mut r = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(r);
		for row in r.deserialize() {
			let rec: RawStateRow = row.context(ReadCsvSnafu)?;
			if by_code.contains_key(&rec.code) {
				return DuplicateStateSnafu{code: rec.code.as_str()}.fail()
			}
			by_code.insert(rec.code.clone(), states.len());
			states.push(StateInfo{
				code: rec.code,
				fips: rec.fips,
				name: rec.name,
			});
		}
		Ok(Self{states, by_code})
	}

	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, StateInfo> {
		self.states.iter()
	}

	pub fn codes(&self) -> impl Iterator<Item = &StateCode> + '_ {
		self.states.iter().map(|s| &s.code)
	}

	pub fn contains(&self, code: &StateCode) -> bool {
		self.by_code.contains_key(code)
	}

	pub fn get(&self, code: &StateCode) -> Option<&StateInfo> {
		let index = self.by_code.get(code)?;
		Some(&self.states[*index])
	}

	pub fn fips(&self, code: &StateCode) -> Result<StateFips> {
		self.get(code)
			.map(|s| s.fips)
			.context(UnknownStateSnafu{code: code.as_str()})
	}

	/// Parse user input into a code from this table.
	pub fn resolve(&self, s: &str) -> Result<StateCode> {
		let code = match s.parse::<StateCode>() {
			Ok(code) => code,
			Err(_) => return UnknownStateSnafu{code: s}.fail(),
		};
		if !self.contains(&code) {
			return UnknownStateSnafu{code: code.as_str()}.fail()
		}
		Ok(code)
	}
}
