use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use serde::Deserialize;

use snafu::{OptionExt, ResultExt};

use super::error::{Result, OpenSnafu, ParseConfigSnafu, MissingInputSnafu};
use super::query::{Dashboard, MapLevel};
use super::states::StateTable;


pub static INPUT_ENV: &'static str = "COVID_DASHBOARD_INPUT";


#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ThresholdConfig {
	pub county: Option<Vec<u64>>,
	pub state: Option<Vec<u64>>,
}


/// Settings read from an optional JSON file. Relative paths are resolved
/// against the directory of that file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
	/// USAFacts confirmed-cases CSV, optionally gzip-compressed.
	pub input: Option<PathBuf>,
	#[serde(rename = "defaultState")]
	pub default_state: Option<String>,
	/// Replacement for the built-in state table (code,fips,name).
	#[serde(rename = "statesFile")]
	pub states_file: Option<PathBuf>,
	#[serde(default)]
	pub thresholds: ThresholdConfig,
}

impl DashboardConfig {
	pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let contents = fs::read_to_string(path).context(OpenSnafu{path})?;
		let mut config: Self = serde_json::from_str(&contents).context(ParseConfigSnafu{path})?;
		if let Some(root) = path.parent() {
			config.input = config.input.map(|p| root.join(p));
			config.states_file = config.states_file.map(|p| root.join(p));
		}
		debug!("read configuration from {}: {:?}", path.display(), config);
		Ok(config)
	}

	/// Let the environment override the input file.
	pub fn apply_env(&mut self) {
		if let Ok(v) = env::var(INPUT_ENV) {
			if !v.is_empty() {
				debug!("input taken from ${}", INPUT_ENV);
				self.input = Some(v.into());
			}
		}
	}

	pub fn state_table(&self) -> Result<StateTable> {
		match &self.states_file {
			Some(path) => StateTable::from_path(path),
			None => StateTable::builtin(),
		}
	}

	/// Load and aggregate the configured dataset.
	pub fn open_dashboard(&self) -> Result<Dashboard> {
		let input = self.input.as_ref().context(MissingInputSnafu{var: INPUT_ENV})?;
		let mut dashboard = Dashboard::load(self.state_table()?, input)?;
		if let Some(t) = &self.thresholds.county {
			dashboard = dashboard.with_thresholds(MapLevel::County, t.clone());
		}
		if let Some(t) = &self.thresholds.state {
			dashboard = dashboard.with_thresholds(MapLevel::State, t.clone());
		}
		Ok(dashboard)
	}
}
