//! Least-squares parabola fitting
//!
//! The richness maximization walks the vertex of a quadratic fitted to
//! (richness, 2 * log-likelihood) points, so all that is needed here is a
//! small least-squares fit with vertex extraction.

use crate::error::{PoshoError, Result};

/// Quadratic `y = a x^2 + b x + c` fitted to a set of points
#[derive(Debug, Clone, Copy)]
pub struct Parabola {
    a: f64,
    b: f64,
    c: f64,
}

impl Parabola {
    /// Least-squares fit through at least three points.
    ///
    /// Fails when fewer than three points are given or when the normal
    /// equations are singular (fewer than three distinct x values).
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PoshoError::Numerical(format!(
                "parabola input length mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 3 {
            return Err(PoshoError::Numerical(format!(
                "parabola fit needs at least 3 points, got {}",
                x.len()
            )));
        }

        let n = x.len() as f64;
        let (mut s1, mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0, 0.0);
        let (mut t0, mut t1, mut t2) = (0.0, 0.0, 0.0);
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            let xi2 = xi * xi;
            s1 += xi;
            s2 += xi2;
            s3 += xi2 * xi;
            s4 += xi2 * xi2;
            t0 += yi;
            t1 += xi * yi;
            t2 += xi2 * yi;
        }

        // Normal equations [s4 s3 s2; s3 s2 s1; s2 s1 n] [a b c]^T = [t2 t1 t0],
        // solved with Cramer's rule.
        let det = s4 * (s2 * n - s1 * s1) - s3 * (s3 * n - s1 * s2) + s2 * (s3 * s1 - s2 * s2);
        let scale = s4.abs().max(s2.abs()).max(1.0);
        if det.abs() < 1e-12 * scale {
            return Err(PoshoError::Numerical(
                "singular parabola fit (degenerate x values)".to_string(),
            ));
        }

        let det_a =
            t2 * (s2 * n - s1 * s1) - s3 * (t1 * n - s1 * t0) + s2 * (t1 * s1 - s2 * t0);
        let det_b =
            s4 * (t1 * n - s1 * t0) - t2 * (s3 * n - s1 * s2) + s2 * (s3 * t0 - s2 * t1);
        let det_c =
            s4 * (s2 * t0 - t1 * s1) - s3 * (s3 * t0 - s2 * t1) + t2 * (s3 * s1 - s2 * s2);

        Ok(Parabola {
            a: det_a / det,
            b: det_b / det,
            c: det_c / det,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }

    /// True when the parabola opens downward (the vertex is a maximum)
    pub fn concave_down(&self) -> bool {
        self.a < 0.0
    }

    /// x position of the vertex; meaningful only when `a != 0`
    pub fn vertex_x(&self) -> f64 {
        -self.b / (2.0 * self.a)
    }

    pub fn vertex_y(&self) -> f64 {
        self.eval(self.vertex_x())
    }
}
