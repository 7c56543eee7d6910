//! Latent merchant traits.
//!
//! Three hidden, probability-scale values drive every observable signal a
//! merchant produces. They are drawn once, never drift, and never reach the
//! output tables.

use crate::{
    config::{BetaParams, TraitPriors},
    error::{SimError, SimResult},
    rng::SimRng,
};
use rand_distr::Beta;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatentTraits {
    pub tech_risk:    f64,
    pub engagement:   f64,
    pub roi_strength: f64,
}

/// Holds the three prior distributions, built once per run.
pub struct LatentSampler {
    tech_risk:    Beta<f64>,
    engagement:   Beta<f64>,
    roi_strength: Beta<f64>,
}

impl LatentSampler {
    pub fn new(priors: &TraitPriors) -> SimResult<Self> {
        Ok(Self {
            tech_risk:    beta("tech_risk", priors.tech_risk)?,
            engagement:   beta("engagement", priors.engagement)?,
            roi_strength: beta("roi_strength", priors.roi_strength)?,
        })
    }

    /// Draw in a fixed order: tech_risk, engagement, roi_strength.
    pub fn sample(&self, rng: &mut SimRng) -> LatentTraits {
        LatentTraits {
            tech_risk:    rng.sample(&self.tech_risk),
            engagement:   rng.sample(&self.engagement),
            roi_strength: rng.sample(&self.roi_strength),
        }
    }
}

fn beta(name: &str, p: BetaParams) -> SimResult<Beta<f64>> {
    Beta::new(p.alpha, p.beta)
        .map_err(|e| SimError::config(format!("{name} prior Beta({}, {}): {e}", p.alpha, p.beta)))
}
