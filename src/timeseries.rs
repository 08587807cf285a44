use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use num_traits::{CheckedAdd, Zero};

use chrono::NaiveDate;

use snafu::ensure;

use super::dates::DateAxis;
use super::error::{Result, CountOverflowSnafu, RowLengthSnafu};


pub trait TimeSeriesKey: Hash + Eq + Clone + std::fmt::Debug {}
impl<T: Hash + Eq + Clone + std::fmt::Debug> TimeSeriesKey for T {}


/// A wide table: one row per key, one column per date of the shared axis.
///
/// Rows keep the order in which they were created unless explicitly
/// re-sorted.
#[derive(Debug, Clone)]
pub struct TimeSeries<T: Hash + Eq, V: Copy> {
	axis: Arc<DateAxis>,
	keys: HashMap<T, usize>,
	order: Vec<T>,
	time_series: Vec<Vec<V>>,
}

impl<T: Hash + Eq, V: Copy> TimeSeries<T, V> {
	pub fn new(axis: Arc<DateAxis>) -> Self {
		Self{
			axis,
			keys: HashMap::new(),
			order: Vec::new(),
			time_series: Vec::new(),
		}
	}

	#[inline(always)]
	pub fn axis(&self) -> &Arc<DateAxis> {
		&self.axis
	}

	/// Number of date columns.
	#[inline(always)]
	pub fn len(&self) -> usize {
		self.axis.len()
	}

	#[inline(always)]
	pub fn key_count(&self) -> usize {
		self.order.len()
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}

impl<T: TimeSeriesKey, V: Copy + Zero> TimeSeries<T, V> {
	pub fn get_or_create(&mut self, k: T) -> &mut [V] {
		let index = self.get_index_or_create(k);
		&mut self.time_series[index][..]
	}

	pub fn get_index_or_create(&mut self, k: T) -> usize {
		match self.keys.get(&k) {
			Some(v) => *v,
			None => {
				let v = self.time_series.len();
				self.time_series.push(vec![V::zero(); self.axis.len()]);
				self.keys.insert(k.clone(), v);
				self.order.push(k);
				v
			},
		}
	}

	/// Inserts a new row. Returns false, leaving the table untouched, if
	/// the key already exists.
	pub fn insert(&mut self, k: T, vec: Vec<V>) -> Result<bool> {
		ensure!(vec.len() == self.axis.len(), RowLengthSnafu{expected: self.axis.len(), found: vec.len()});
		if self.keys.contains_key(&k) {
			return Ok(false)
		}
		self.keys.insert(k.clone(), self.time_series.len());
		self.time_series.push(vec);
		self.order.push(k);
		Ok(true)
	}

	pub fn get_index(&self, k: &T) -> Option<usize> {
		Some(*self.keys.get(k)?)
	}

	pub fn get(&self, k: &T) -> Option<&[V]> {
		let index = self.get_index(k)?;
		Some(&self.time_series[index][..])
	}

	pub fn get_value(&self, k: &T, i: usize) -> Option<V> {
		self.get(k).and_then(|v| v.get(i).copied())
	}

	/// Keys in row order.
	pub fn keys(&self) -> std::slice::Iter<'_, T> {
		self.order.iter()
	}

	/// Rows in row order.
	pub fn iter(&self) -> impl Iterator<Item = (&T, &[V])> + '_ {
		self.order.iter().map(move |k| {
			let index = self.keys[k];
			(k, &self.time_series[index][..])
		})
	}

	/// One date column, in row order.
	pub fn column(&self, i: usize) -> impl Iterator<Item = (&T, V)> + '_ {
		self.iter().filter_map(move |(k, v)| Some((k, *v.get(i)?)))
	}
}

impl<T: TimeSeriesKey + Ord, V: Copy + Zero> TimeSeries<T, V> {
	pub fn sort_keys(&mut self) {
		self.order.sort();
	}
}

impl<T: TimeSeriesKey, V: Copy + Zero + CheckedAdd> TimeSeries<T, V> {
	/// Re-key every row through `f` and sum rows which end up under the
	/// same key. Rows for which `f` returns `None` are dropped. New rows
	/// appear in order of their first contributing source row.
	pub fn rekeyed<U: TimeSeriesKey, F: Fn(&T) -> Option<U>>(&self, f: F) -> Result<TimeSeries<U, V>> {
		let mut result = TimeSeries::<U, V>::new(self.axis.clone());
		for (k_old, ts_old) in self.iter() {
			let k_new = match f(k_old) {
				Some(k) => k,
				None => continue,
			};
			let ts_new = result.get_or_create(k_new.clone());
			for (i, (dst, src)) in ts_new.iter_mut().zip(ts_old.iter()).enumerate() {
				*dst = match dst.checked_add(src) {
					Some(v) => v,
					None => return CountOverflowSnafu{
						key: format!("{:?}", k_new),
						date: self.axis.date(i).unwrap_or(NaiveDate::MIN),
					}.fail(),
				};
			}
		}
		Ok(result)
	}

	/// Sum over all rows at one date column.
	pub fn total_at(&self, i: usize) -> Option<V> {
		let mut accum = V::zero();
		for (_, v) in self.column(i) {
			accum = accum.checked_add(&v)?;
		}
		Some(accum)
	}
}


pub type Counters<T> = TimeSeries<T, u64>;
