//! 2-D binning utilities
//!
//! Background densities and signal color probabilities both live on binned
//! color-magnitude grids. `Grid2` is a dense row-major grid addressed by
//! (x bin, y bin); `take_2d` is the per-point lookup the likelihood uses to
//! read a background expectation for every catalog object.

use crate::error::{PoshoError, Result};

/// Dense 2-D grid addressed by (x bin, y bin), row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2 {
    values: Vec<f64>,
    nx: usize,
    ny: usize,
}

impl Grid2 {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Grid2 {
            values: vec![0.0; nx * ny],
            nx,
            ny,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn get(&self, ix: usize, iy: usize) -> f64 {
        self.values[ix * self.ny + iy]
    }

    pub fn set(&mut self, ix: usize, iy: usize, value: f64) {
        self.values[ix * self.ny + iy] = value;
    }

    pub fn add(&mut self, ix: usize, iy: usize, value: f64) {
        self.values[ix * self.ny + iy] += value;
    }

    /// Sum of all cells
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Index of the bin containing `value`, or `None` outside the edges.
///
/// Edges must be strictly ascending. The final bin includes its right edge,
/// matching the usual histogram convention.
pub fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    if edges.len() < 2 || value < edges[0] || value > edges[edges.len() - 1] {
        return None;
    }
    let i = edges.partition_point(|&e| e <= value);
    // partition_point returns edges.len() only when value equals the last edge
    Some(i.min(edges.len() - 1) - 1)
}

/// Weighted 2-D histogram over bin edges
pub fn histogram_2d(
    x: &[f64],
    y: &[f64],
    weights: Option<&[f64]>,
    xedges: &[f64],
    yedges: &[f64],
) -> Result<Grid2> {
    if x.len() != y.len() {
        return Err(PoshoError::Numerical(format!(
            "histogram input length mismatch: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if let Some(w) = weights {
        if w.len() != x.len() {
            return Err(PoshoError::Numerical(format!(
                "histogram weight length mismatch: {} vs {}",
                w.len(),
                x.len()
            )));
        }
    }
    if xedges.len() < 2 || yedges.len() < 2 {
        return Err(PoshoError::Numerical(
            "histogram needs at least two bin edges per axis".to_string(),
        ));
    }
    let mut grid = Grid2::zeros(xedges.len() - 1, yedges.len() - 1);
    for k in 0..x.len() {
        if let (Some(ix), Some(iy)) = (bin_index(xedges, x[k]), bin_index(yedges, y[k])) {
            let w = weights.map(|w| w[k]).unwrap_or(1.0);
            grid.add(ix, iy, w);
        }
    }
    Ok(grid)
}

/// Per-point lookup into a binned grid; points outside the binning read 0.0
pub fn take_2d(grid: &Grid2, x: &[f64], y: &[f64], xedges: &[f64], yedges: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y.iter())
        .map(|(&xv, &yv)| {
            match (bin_index(xedges, xv), bin_index(yedges, yv)) {
                (Some(ix), Some(iy)) => grid.get(ix, iy),
                _ => 0.0,
            }
        })
        .collect()
}

/// Bin centers from edges
pub fn centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

/// Evenly spaced values from `start` (inclusive) toward `stop` (exclusive)
/// with the given step, mirroring the usual numeric-range convention.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    if step <= 0.0 {
        return out;
    }
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    for i in 0..n {
        out.push(start + step * i as f64);
    }
    out
}

/// `n` evenly spaced values covering `[start, stop]` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
