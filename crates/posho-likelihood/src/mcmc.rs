//! Affine-invariant ensemble sampling
//!
//! A stretch-move ensemble sampler over named likelihood parameters. Each
//! walker proposes along the line toward another walker with the scale drawn
//! from g(z) ~ 1/sqrt(z) on [1/a, a]; out-of-bounds proposals (including
//! kernel centers leaving the search region) are rejected.

use rand::Rng;
use tracing::{debug, info};

use posho_common::{PoshoError, Result};

use crate::loglike::LogLikelihood;

/// One sampled dimension: a likelihood parameter name with prior bounds
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub lo: f64,
    pub hi: f64,
}

impl ParamSpec {
    pub fn new(name: &str, lo: f64, hi: f64) -> Self {
        ParamSpec {
            name: name.to_string(),
            lo,
            hi,
        }
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Posterior chain in step-major order
#[derive(Debug, Clone)]
pub struct Chain {
    samples: Vec<Vec<f64>>,
    nwalkers: usize,
    dims: usize,
    accepted: usize,
    proposed: usize,
}

impl Chain {
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn acceptance_fraction(&self) -> f64 {
        if self.proposed == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.proposed as f64
    }

    /// Samples with the first `burn` steps of every walker discarded
    pub fn flat(&self, burn: usize) -> Vec<&Vec<f64>> {
        self.samples
            .iter()
            .skip(burn * self.nwalkers)
            .collect()
    }

    /// Quantile of one dimension over the post-burn samples
    pub fn quantile(&self, dim: usize, q: f64, burn: usize) -> Option<f64> {
        let mut values: Vec<f64> = self.flat(burn).iter().map(|s| s[dim]).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let idx = ((values.len() - 1) as f64 * q.clamp(0.0, 1.0)).round() as usize;
        Some(values[idx])
    }
}

/// Goodman-Weare stretch-move ensemble sampler
#[derive(Debug, Clone)]
pub struct EnsembleSampler {
    nwalkers: usize,
    stretch: f64,
}

impl EnsembleSampler {
    pub fn new(nwalkers: usize, stretch: f64) -> Result<Self> {
        if stretch <= 1.0 {
            return Err(PoshoError::Config(format!(
                "stretch scale must exceed 1, got {}",
                stretch
            )));
        }
        Ok(EnsembleSampler { nwalkers, stretch })
    }

    /// Run `steps` ensemble updates starting from a ball around `seed_point`
    pub fn run<R: Rng>(
        &self,
        loglike: &mut LogLikelihood,
        params: &[ParamSpec],
        seed_point: &[f64],
        steps: usize,
        rng: &mut R,
    ) -> Result<Chain> {
        let dims = params.len();
        if dims == 0 || seed_point.len() != dims {
            return Err(PoshoError::Config(format!(
                "seed point has {} values for {} sampled parameters",
                seed_point.len(),
                dims
            )));
        }
        if self.nwalkers < 2 * dims {
            return Err(PoshoError::Config(format!(
                "need at least {} walkers for {} dimensions, got {}",
                2 * dims,
                dims,
                self.nwalkers
            )));
        }
        info!(
            walkers = self.nwalkers,
            dims, steps, "starting ensemble sampling"
        );

        // Initialize walkers in a small ball, clamped into the prior box
        let mut walkers: Vec<Vec<f64>> = (0..self.nwalkers)
            .map(|_| {
                params
                    .iter()
                    .zip(seed_point.iter())
                    .map(|(spec, &center)| {
                        let scale = 1e-3 * (spec.hi - spec.lo);
                        let jitter: f64 = rng.random_range(-1.0..1.0) * scale;
                        (center + jitter).clamp(spec.lo, spec.hi)
                    })
                    .collect()
            })
            .collect();

        let mut lnprob: Vec<f64> = Vec::with_capacity(self.nwalkers);
        for walker in &walkers {
            lnprob.push(self.ln_prob(loglike, params, walker)?);
        }

        let mut samples = Vec::with_capacity(steps * self.nwalkers);
        let mut accepted = 0usize;
        let mut proposed = 0usize;

        for step in 0..steps {
            for i in 0..self.nwalkers {
                // Partner drawn from the rest of the ensemble
                let mut j = rng.random_range(0..self.nwalkers - 1);
                if j >= i {
                    j += 1;
                }

                let a = self.stretch;
                let u: f64 = rng.random_range(0.0..1.0);
                let z = ((a - 1.0) * u + 1.0).powi(2) / a;

                let proposal: Vec<f64> = walkers[i]
                    .iter()
                    .zip(walkers[j].iter())
                    .map(|(&x, &partner)| partner + z * (x - partner))
                    .collect();
                proposed += 1;

                let ln_new = self.ln_prob(loglike, params, &proposal)?;
                let ln_accept = (dims as f64 - 1.0) * z.ln() + ln_new - lnprob[i];
                let threshold: f64 = rng.random_range(0.0..1.0);
                if ln_accept >= 0.0 || threshold.ln() < ln_accept {
                    walkers[i] = proposal;
                    lnprob[i] = ln_new;
                    accepted += 1;
                }
            }
            for walker in &walkers {
                samples.push(walker.clone());
            }
            if (step + 1) % 100 == 0 {
                debug!(step = step + 1, "ensemble step");
            }
        }

        let chain = Chain {
            samples,
            nwalkers: self.nwalkers,
            dims,
            accepted,
            proposed,
        };
        info!(
            acceptance = chain.acceptance_fraction(),
            "ensemble sampling finished"
        );
        Ok(chain)
    }

    /// Log-probability of one walker position; out-of-prior or
    /// out-of-region positions are impossible rather than errors
    fn ln_prob(
        &self,
        loglike: &mut LogLikelihood,
        params: &[ParamSpec],
        position: &[f64],
    ) -> Result<f64> {
        if params
            .iter()
            .zip(position.iter())
            .any(|(spec, &v)| !spec.contains(v))
        {
            return Ok(f64::NEG_INFINITY);
        }
        let kv: Vec<(&str, f64)> = params
            .iter()
            .zip(position.iter())
            .map(|(spec, &v)| (spec.name.as_str(), v))
            .collect();
        match loglike.value(&kv) {
            Ok(value) => Ok(value),
            Err(PoshoError::OutsideInterior(_, _)) => Ok(f64::NEG_INFINITY),
            Err(PoshoError::ParameterBounds { .. }) => Ok(f64::NEG_INFINITY),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_spec_contains() {
        let spec = ParamSpec::new("richness", 0.0, 100.0);
        assert!(spec.contains(0.0));
        assert!(spec.contains(100.0));
        assert!(!spec.contains(-1.0));
        assert!(!spec.contains(100.1));
    }

    #[test]
    fn test_sampler_rejects_bad_configuration() {
        assert!(EnsembleSampler::new(10, 1.0).is_err());
        assert!(EnsembleSampler::new(10, 2.0).is_ok());
    }

    #[test]
    fn test_chain_quantiles() {
        let samples: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64]).collect();
        let chain = Chain {
            samples,
            nwalkers: 10,
            dims: 1,
            accepted: 50,
            proposed: 100,
        };
        assert_eq!(chain.acceptance_fraction(), 0.5);
        // Burn drops whole ensemble steps
        assert_eq!(chain.flat(2).len(), 80);
        let median = chain.quantile(0, 0.5, 0).unwrap();
        assert!((median - 49.5).abs() <= 0.5);
        assert_eq!(chain.quantile(0, 0.0, 0).unwrap(), 0.0);
        assert_eq!(chain.quantile(0, 1.0, 0).unwrap(), 99.0);
    }
}
