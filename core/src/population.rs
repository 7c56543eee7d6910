//! Merchant population: install dates and categorical attributes.

use crate::{
    config::{PopulationConfig, SimConfig},
    rng::SimRng,
    types::MerchantId,
};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, PartialEq)]
pub struct MerchantProfile {
    pub merchant_id:         MerchantId,
    pub install_date:        NaiveDate,
    pub country:             String,
    pub acquisition_channel: String,
    pub industry:            Option<String>,
}

pub struct PopulationSampler {
    pool:          PopulationConfig,
    install_start: NaiveDate,
    install_span:  u32,
}

impl PopulationSampler {
    /// Expects a validated config (non-empty pools, ordered date range).
    pub fn new(config: &SimConfig) -> Self {
        let span = (config.install_end - config.install_start).num_days().max(0);
        Self {
            pool:          config.population.clone(),
            install_start: config.install_start,
            install_span:  u32::try_from(span).unwrap_or(u32::MAX),
        }
    }

    /// Uniform over the inclusive install range.
    pub fn install_date(&self, rng: &mut SimRng) -> NaiveDate {
        let offset = rng.range_inclusive(0, self.install_span);
        self.install_start + Duration::days(i64::from(offset))
    }

    /// Country, then channel, then industry.
    pub fn profile(&self, merchant_id: MerchantId, install_date: NaiveDate, rng: &mut SimRng) -> MerchantProfile {
        let country = rng.pick(&self.pool.countries).clone();
        let acquisition_channel = rng.pick_weighted(&self.pool.channels).clone();
        let industry = rng.pick(&self.pool.industries).clone();
        MerchantProfile {
            merchant_id,
            install_date,
            country,
            acquisition_channel,
            industry,
        }
    }
}
