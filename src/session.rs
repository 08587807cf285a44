use std::io;
use std::io::{BufRead, Write};

use chrono::NaiveDate;

use log::{debug, warn};

use serde::{Deserialize, Serialize};

use snafu::ResultExt;

use super::dates::parse_selection_date;
use super::error::{Result, InvalidEventSnafu};
use super::query::{Dashboard, DashboardViews, Scale};
use super::states::StateCode;


/// What the user currently looks at. Only decides which slice is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
	pub state: StateCode,
	pub date: NaiveDate,
	pub scale: Scale,
}

impl Selection {
	pub const DEFAULT_STATE: &'static str = "NY";

	/// The selection shown on startup: New York, the latest date, linear
	/// scale.
	pub fn initial(dashboard: &Dashboard) -> Result<Self> {
		Self::initial_for(dashboard, Self::DEFAULT_STATE)
	}

	pub fn initial_for(dashboard: &Dashboard, state: &str) -> Result<Self> {
		let state = dashboard.states().resolve(state)?;
		let (_, last) = dashboard.date_range()?;
		Ok(Self{
			state,
			date: last,
			scale: Scale::default(),
		})
	}

	pub fn validate(&self, dashboard: &Dashboard) -> Result<()> {
		dashboard.states().fips(&self.state)?;
		dashboard.axis().locate(self.date)?;
		Ok(())
	}
}


/// A single widget change, as sent by the page, e.g. `{"state": "NJ"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionEvent {
	State(String),
	Date(String),
	Scale(Scale),
}


/// One viewer's selection over a shared dashboard.
pub struct Session<'d> {
	dashboard: &'d Dashboard,
	selection: Selection,
}

impl<'d> Session<'d> {
	pub fn new(dashboard: &'d Dashboard, selection: Selection) -> Result<Self> {
		selection.validate(dashboard)?;
		Ok(Self{dashboard, selection})
	}

	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	pub fn views(&self) -> Result<DashboardViews> {
		self.dashboard.views(&self.selection)
	}

	/// Apply one change and recompute. A rejected change leaves the
	/// selection as it was.
	pub fn apply(&mut self, event: SelectionEvent) -> Result<DashboardViews> {
		let mut next = self.selection.clone();
		match event {
			SelectionEvent::State(s) => next.state = self.dashboard.states().resolve(&s)?,
			SelectionEvent::Date(s) => next.date = parse_selection_date(&s)?,
			SelectionEvent::Scale(scale) => next.scale = scale,
		}
		let views = self.dashboard.views(&next)?;
		debug!("selection changed to {:?}", next);
		self.selection = next;
		Ok(views)
	}

	pub fn apply_json(&mut self, line: &str) -> Result<DashboardViews> {
		let event: SelectionEvent = serde_json::from_str(line).context(InvalidEventSnafu)?;
		self.apply(event)
	}
}


#[derive(Debug, Serialize)]
struct ErrorReply {
	error: String,
}

/// Drive a session from newline-delimited JSON events, answering each with
/// one line of JSON. Returns the number of events handled.
pub fn run_session<R: BufRead, W: Write>(session: &mut Session<'_>, input: R, mut output: W) -> io::Result<usize> {
	let mut n = 0;
	for line in input.lines() {
		let line = line?;
		if line.trim().is_empty() {
			continue
		}
		match session.apply_json(&line) {
			Ok(views) => serde_json::to_writer(&mut output, &views)?,
			Err(e) => {
				warn!("rejected event {:?}: {}", line, e);
				serde_json::to_writer(&mut output, &ErrorReply{error: e.to_string()})?;
			},
		}
		output.write_all(b"\n")?;
		output.flush()?;
		n += 1;
	}
	Ok(n)
}
