//! Serial or rayon execution of per-element transforms.
//!
//! Every phase of a step is written as a function of an index (or a row) and
//! handed to a [`Backend`]. Both backends produce identical results because
//! no phase depends on the order elements are visited.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Execution backend for the data-parallel phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Plain iteration on the calling thread
    Serial,
    /// rayon's global thread pool
    #[default]
    Parallel,
}

impl Backend {
    /// Evaluate `f(i)` for `i in 0..n` and collect the results in index order.
    pub fn map_indices<T, F>(self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            Self::Serial => (0..n).map(f).collect(),
            Self::Parallel => (0..n).into_par_iter().map(f).collect(),
        }
    }

    /// Call `f(i)` for `i in 0..n`, ignoring order.
    pub fn for_each_index<F>(self, n: usize, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            Self::Serial => (0..n).for_each(f),
            Self::Parallel => (0..n).into_par_iter().for_each(f),
        }
    }

    /// Call `f(row_index, row)` for each `row_len`-wide row of `data`.
    pub fn for_each_row_mut<F>(self, data: &mut [f32], row_len: usize, f: F)
    where
        F: Fn(usize, &mut [f32]) + Sync + Send,
    {
        if row_len == 0 {
            return;
        }
        match self {
            Self::Serial => data
                .chunks_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row)),
            Self::Parallel => data
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row)),
        }
    }

    /// Count elements of `data` matching `pred`.
    pub fn count<F>(self, data: &[f32], pred: F) -> usize
    where
        F: Fn(f32) -> bool + Sync + Send,
    {
        match self {
            Self::Serial => data.iter().filter(|&&v| pred(v)).count(),
            Self::Parallel => data.par_iter().filter(|&&v| pred(v)).count(),
        }
    }
}
