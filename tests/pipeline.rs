use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use flate2::write::GzEncoder;
use flate2::Compression;

use covid_dashboard::{
	aggregate_states, load_usafacts, pivot, reshape, Dashboard, DashboardConfig, ErrorKind, Scale,
	Selection, StateCode, StateTable, LEADERBOARD_SIZE,
};


fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn code(s: &str) -> StateCode {
	s.parse().unwrap()
}

fn write_plain(path: &Path, contents: &str) {
	fs::write(path, contents).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
	let f = fs::File::create(path).unwrap();
	let mut enc = GzEncoder::new(f, Compression::default());
	enc.write_all(contents.as_bytes()).unwrap();
	enc.finish().unwrap();
}

static TWO_COUNTIES: &'static str = "countyFIPS,County Name,State,stateFIPS,3/1/20,3/2/20\n\
	36001,County A,NY,36,5,10\n\
	36003,County B,NY,36,3,2\n";

static WIDER: &'static str = "\u{feff}countyFIPS,County Name,State,stateFIPS,3/3/20,3/4/20,3/5/20,3/6/20\n\
	0,Statewide Unallocated,NY,36,0,0,0,0\n\
	36061,New York County,NY,36,0,0,3,7\n\
	36047,Kings County,NY,36,0,0,0,0\n\
	34003,Bergen County,NJ,34,0,1,2,4\n\
	6001,Alameda County,CA,6,1,1,1,9\n\
	53033,King County,WA,53,2,3,5,8\n\
	0,Statewide Unallocated,WA,53,0,1,1,1\n";


#[test]
fn two_county_scenario() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("covid_confirmed_usafacts.csv");
	write_plain(&path, TWO_COUNTIES);

	let counties = load_usafacts(&path).unwrap();
	let agg = aggregate_states(&counties).unwrap();
	assert_eq!(agg.len(), 1);
	assert_eq!(agg.get(&code("NY")).unwrap().confirmed, &[8, 12]);

	let long = reshape(&agg);
	let cells: Vec<_> = long.records().iter()
		.map(|r| (r.state.as_str().to_string(), r.date, r.confirmed))
		.collect();
	assert_eq!(cells, vec![
		("NY".to_string(), ymd(2020, 3, 1), 8),
		("NY".to_string(), ymd(2020, 3, 2), 12),
	]);
}

#[test]
fn gzip_and_plain_inputs_agree() {
	let dir = tempfile::tempdir().unwrap();
	let plain = dir.path().join("covid_confirmed_usafacts.csv");
	let packed = dir.path().join("covid_confirmed_usafacts_new.csv.gz");
	write_plain(&plain, WIDER);
	write_gz(&packed, WIDER);

	let a = aggregate_states(&load_usafacts(&plain).unwrap()).unwrap();
	let b = aggregate_states(&load_usafacts(&packed).unwrap()).unwrap();
	assert!(a == b);
}

#[test]
fn aggregation_and_reshaping_invariants() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("covid_confirmed_usafacts.csv");
	write_plain(&path, WIDER);
	let counties = load_usafacts(&path).unwrap();
	let agg = aggregate_states(&counties).unwrap();
	let long = reshape(&agg);

	// conservation under aggregation
	for i in 0..counties.axis().len() {
		let raw: u64 = counties.records().map(|r| r.confirmed[i]).sum();
		let summed: u64 = agg.records().map(|r| r.confirmed[i]).sum();
		assert_eq!(raw, summed);
	}

	// one long record per (state, date), equal to the wide cell
	assert_eq!(long.len(), agg.len() * agg.axis().len());
	for rec in agg.records() {
		for (i, date) in agg.axis().dates().iter().enumerate() {
			assert_eq!(long.get(rec.state, *date).unwrap().confirmed, rec.confirmed[i]);
		}
	}

	// pivoting back reproduces the wide table
	assert!(pivot(&long).unwrap() == agg);
}

#[test]
fn dashboard_views_from_config() {
	let dir = tempfile::tempdir().unwrap();
	write_plain(&dir.path().join("data.csv"), WIDER);
	let config_path = dir.path().join("dashboard.json");
	fs::write(&config_path, r#"{"input": "data.csv", "thresholds": {"state": [1, 5, 10]}}"#).unwrap();

	let config = DashboardConfig::from_path(&config_path).unwrap();
	let dashboard = config.open_dashboard().unwrap();
	assert_eq!(dashboard.thresholds(covid_dashboard::MapLevel::State), &[1, 5, 10]);

	let selection = Selection::initial(&dashboard).unwrap();
	assert_eq!(selection.date, ymd(2020, 3, 6));
	let views = dashboard.views(&selection).unwrap();

	let county_codes: Vec<_> = views.county_map.counties.iter().map(|c| c.county_fips).collect();
	assert_eq!(county_codes, vec![36061, 36047]);
	assert!(county_codes.iter().all(|c| c / 1000 == 36));

	assert_eq!(views.leaderboard.len(), 4usize.min(LEADERBOARD_SIZE));
	let ranks: Vec<_> = views.leaderboard.iter().map(|r| r.rank).collect();
	assert_eq!(ranks, vec![1, 2, 3, 4]);
	for pair in views.leaderboard.windows(2) {
		assert!(pair[0].confirmed >= pair[1].confirmed);
	}
	assert_eq!(views.leaderboard[0].state.as_str(), "CA");
	assert_eq!(views.leaderboard[1].state.as_str(), "WA");

	let series: Vec<_> = views.time_series.points.iter().map(|p| (p.date, p.confirmed)).collect();
	assert_eq!(series, vec![(ymd(2020, 3, 5), 3), (ymd(2020, 3, 6), 7)]);
	assert_eq!(views.time_series.marker.unwrap().confirmed, 7);

	let bars: Vec<_> = views.bar_chart.iter().map(|b| b.confirmed).collect();
	assert_eq!(bars, vec![9, 9, 7, 4]);

	let json = serde_json::to_value(&views).unwrap();
	assert_eq!(json["time_series"]["points"][0]["date"], "2020-03-05");
	assert_eq!(json["county_map"]["counties"][0]["countyFIPS"], 36061);
}

#[test]
fn invalid_selections_fail_loudly() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("covid_confirmed_usafacts.csv");
	write_plain(&path, WIDER);
	let dashboard = Dashboard::load(StateTable::builtin().unwrap(), &path).unwrap();

	let err = dashboard.county_choropleth(&code("ZZ"), ymd(2020, 3, 4)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Lookup);
	let err = dashboard.time_series(&code("NY"), ymd(2020, 5, 1), Scale::Linear).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn startup_errors_are_not_lookups() {
	let dir = tempfile::tempdir().unwrap();

	let missing = dir.path().join("nope.csv");
	assert_eq!(Dashboard::load(StateTable::builtin().unwrap(), &missing).unwrap_err().kind(), ErrorKind::Load);

	let no_state = dir.path().join("no_state.csv");
	write_plain(&no_state, "countyFIPS,County Name,stateFIPS,3/3/20\n1001,A,1,1\n");
	assert_eq!(Dashboard::load(StateTable::builtin().unwrap(), &no_state).unwrap_err().kind(), ErrorKind::Schema);

	let garbage = dir.path().join("garbage.csv");
	write_plain(&garbage, "countyFIPS,County Name,State,stateFIPS,3/3/20\n1001,A,AL,1,many\n");
	assert_eq!(Dashboard::load(StateTable::builtin().unwrap(), &garbage).unwrap_err().kind(), ErrorKind::Aggregation);

	// NY under two stateFIPS would give two interleaved series for one code
	let split = dir.path().join("split.csv");
	write_plain(&split, "countyFIPS,County Name,State,stateFIPS,3/3/20,3/4/20\n36001,A,NY,36,1,2\n99001,B,NY,99,5,6\n");
	assert_eq!(Dashboard::load(StateTable::builtin().unwrap(), &split).unwrap_err().kind(), ErrorKind::Schema);
}
