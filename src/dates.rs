use chrono::NaiveDate;

use snafu::OptionExt;

use super::error::{Result, DuplicateDateSnafu, DateOutOfRangeSnafu, MissingDateSnafu, NoDatesSnafu, InvalidDateSnafu};


/// Parse a USAFacts column header such as `3/5/20`.
///
/// Month and day are not zero-padded in the source; the year has two
/// digits. A four-digit year is tolerated for hand-edited files.
pub fn parse_header_date(s: &str) -> Option<NaiveDate> {
	let s = s.trim();
	if s.is_empty() || !s.contains('/') {
		return None
	}
	NaiveDate::parse_from_str(s, "%m/%d/%y")
		.or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
		.ok()
}

/// Inverse of [`parse_header_date`], producing the non-padded form.
pub fn format_header_date(date: NaiveDate) -> String {
	date.format("%-m/%-d/%y").to_string()
}

/// Parse a date chosen by the user: ISO (`2020-03-05`) or header form.
pub fn parse_selection_date(s: &str) -> Result<NaiveDate> {
	let s = s.trim();
	match s.parse::<NaiveDate>() {
		Ok(d) => Ok(d),
		Err(_) => parse_header_date(s).context(InvalidDateSnafu{value: s}),
	}
}


/// The sorted set of dates for which a table has a column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateAxis {
	dates: Vec<NaiveDate>,
}

impl DateAxis {
	pub fn new(mut dates: Vec<NaiveDate>) -> Result<Self> {
		dates.sort_unstable();
		for pair in dates.windows(2) {
			if pair[0] == pair[1] {
				return DuplicateDateSnafu{date: pair[0]}.fail()
			}
		}
		Ok(Self{dates})
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.dates.len()
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.dates.is_empty()
	}

	pub fn dates(&self) -> &[NaiveDate] {
		&self.dates[..]
	}

	pub fn first(&self) -> Option<NaiveDate> {
		self.dates.first().copied()
	}

	pub fn last(&self) -> Option<NaiveDate> {
		self.dates.last().copied()
	}

	#[inline(always)]
	pub fn index(&self, date: NaiveDate) -> Option<usize> {
		self.dates.binary_search(&date).ok()
	}

	#[inline(always)]
	pub fn date(&self, i: usize) -> Option<NaiveDate> {
		self.dates.get(i).copied()
	}

	/// Like [`index`](Self::index), but tells apart a date outside of the
	/// covered range from a gap inside it.
	pub fn locate(&self, date: NaiveDate) -> Result<usize> {
		let (first, last) = match (self.first(), self.last()) {
			(Some(first), Some(last)) => (first, last),
			_ => return NoDatesSnafu.fail(),
		};
		if date < first || date > last {
			return DateOutOfRangeSnafu{date, first, last}.fail()
		}
		self.index(date).context(MissingDateSnafu{date})
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::error::ErrorKind;

	fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	#[test]
	fn parses_unpadded_headers() {
		assert_eq!(parse_header_date("3/3/20"), Some(ymd(2020, 3, 3)));
		assert_eq!(parse_header_date("12/31/20"), Some(ymd(2020, 12, 31)));
		assert_eq!(parse_header_date("1/22/2020"), Some(ymd(2020, 1, 22)));
		assert_eq!(parse_header_date("countyFIPS"), None);
		assert_eq!(parse_header_date("13/1/20"), None);
		assert_eq!(parse_header_date(""), None);
	}

	#[test]
	fn header_order_is_chronological_not_lexical() {
		let a = parse_header_date("3/3/20").unwrap();
		let b = parse_header_date("4/17/20").unwrap();
		let c = parse_header_date("10/1/20").unwrap();
		assert!(a < b);
		assert!(b < c);
		// lexically "10/1/20" sorts first
		assert!("10/1/20" < "3/3/20");
	}

	#[test]
	fn formats_without_padding() {
		assert_eq!(format_header_date(ymd(2020, 3, 5)), "3/5/20");
		assert_eq!(format_header_date(ymd(2020, 11, 12)), "11/12/20");
	}

	#[test]
	fn selection_dates_accept_both_forms() {
		assert_eq!(parse_selection_date("2020-04-03").unwrap(), ymd(2020, 4, 3));
		assert_eq!(parse_selection_date("4/3/20").unwrap(), ymd(2020, 4, 3));
		assert_eq!(parse_selection_date("yesterday").unwrap_err().kind(), ErrorKind::Lookup);
	}

	#[test]
	fn axis_sorts_and_rejects_duplicates() {
		let axis = DateAxis::new(vec![ymd(2020, 3, 5), ymd(2020, 3, 3)]).unwrap();
		assert_eq!(axis.dates(), &[ymd(2020, 3, 3), ymd(2020, 3, 5)]);
		assert_eq!(axis.first(), Some(ymd(2020, 3, 3)));
		assert_eq!(axis.last(), Some(ymd(2020, 3, 5)));

		let err = DateAxis::new(vec![ymd(2020, 3, 3), ymd(2020, 3, 3)]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Schema);
	}

	#[test]
	fn locate_distinguishes_range_and_gaps() {
		let axis = DateAxis::new(vec![ymd(2020, 3, 3), ymd(2020, 3, 5)]).unwrap();
		assert_eq!(axis.locate(ymd(2020, 3, 5)).unwrap(), 1);
		match axis.locate(ymd(2020, 3, 4)) {
			Err(crate::Error::MissingDate{date}) => assert_eq!(date, ymd(2020, 3, 4)),
			other => panic!("unexpected {:?}", other),
		}
		match axis.locate(ymd(2020, 4, 1)) {
			Err(crate::Error::DateOutOfRange{..}) => (),
			other => panic!("unexpected {:?}", other),
		}
		match DateAxis::default().locate(ymd(2020, 4, 1)) {
			Err(crate::Error::NoDates) => (),
			other => panic!("unexpected {:?}", other),
		}
	}
}
