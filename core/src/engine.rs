//! The generation engine.
//!
//! PIPELINE PER MERCHANT (fixed order, never reordered):
//!   1. Install date + latent traits + attributes
//!   2. Trial row; paid-tier adoption roll
//!   3. Adopters only: upgrade row, then synthesize_full_window
//!   4. Churn label from the full-window signals
//!   5. Churners only: cancel row, then apply_cancellation
//!
//! RULES:
//!   - Every merchant draws only from its own RngBank stream.
//!   - Merchants are assembled in id order, 1..=merchant_count.
//!   - No I/O happens here; storage and export consume the finished Dataset.

use crate::{
    churn::{apply_cancellation, ChurnModel},
    config::SimConfig,
    dataset::{Dataset, MerchantBundle, MerchantOutcome, SubscriptionEvent},
    dirty::SubscriptionKind,
    error::SimResult,
    latent::LatentSampler,
    population::PopulationSampler,
    rng::RngBank,
    synth::{EventSynthesizer, MerchantStream},
    types::{at_time, MerchantId},
};
use chrono::Duration;

pub struct SimEngine {
    config:     SimConfig,
    rng_bank:   RngBank,
    population: PopulationSampler,
    latents:    LatentSampler,
    synth:      EventSynthesizer,
    churn:      ChurnModel,
}

impl SimEngine {
    /// Validate the config and build every sampler. All configuration
    /// errors surface here, before anything is generated.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            rng_bank:   RngBank::new(config.seed),
            population: PopulationSampler::new(&config),
            latents:    LatentSampler::new(&config.traits)?,
            synth:      EventSynthesizer::new(&config)?,
            churn:      ChurnModel::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn churn_model(&self) -> &ChurnModel {
        &self.churn
    }

    pub fn synthesizer(&self) -> &EventSynthesizer {
        &self.synth
    }

    /// Generate every merchant and assemble the dataset.
    pub fn run(&self) -> Dataset {
        log::info!(
            "generating {} merchants (seed={}, installs {}..={})",
            self.config.merchant_count,
            self.config.seed,
            self.config.install_start,
            self.config.install_end,
        );

        let mut dataset = Dataset::new();
        for merchant_id in 1..=self.config.merchant_count {
            dataset.push(self.simulate_merchant(merchant_id));
        }

        let counts = dataset.row_counts();
        log::info!(
            "generated merchants={} subscription_events={} app_events={} revenue_rows={}",
            counts.merchants,
            counts.subscription_events,
            counts.app_events,
            counts.revenue,
        );
        dataset
    }

    /// Run one merchant through the whole pipeline on its own stream.
    pub fn simulate_merchant(&self, merchant_id: MerchantId) -> MerchantBundle {
        let mut rng = self.rng_bank.for_merchant(merchant_id);
        let sub = &self.config.subscription;

        let install = self.population.install_date(&mut rng);
        let traits = self.latents.sample(&mut rng);
        let profile = self.population.profile(merchant_id, install, &mut rng);

        let mut subscription_events = vec![SubscriptionEvent {
            timestamp: at_time(install, sub.trial_hour, 0),
            kind:      SubscriptionKind::TrialStart,
            price:     0.0,
            plan_code: sub.trial_plan_code.clone(),
        }];

        if !rng.chance(sub.pro_adoption_probability) {
            log::debug!("merchant={merchant_id} adoption: stayed on trial");
            return MerchantBundle {
                profile,
                subscription_events,
                stream: MerchantStream::default(),
                outcome: MerchantOutcome {
                    merchant_id,
                    adopted_pro:       false,
                    churn_probability: None,
                    roi_ratio:         None,
                    fail_rate:         None,
                    cancel:            None,
                    app_event_count:   0,
                    revenue_row_count: 0,
                },
            };
        }

        let upgrade_day = rng.range_inclusive(sub.upgrade_delay.first, sub.upgrade_delay.last);
        subscription_events.push(SubscriptionEvent {
            timestamp: at_time(install + Duration::days(i64::from(upgrade_day)), sub.upgrade_hour, 0),
            kind:      SubscriptionKind::UpgradePro,
            price:     sub.pro_price,
            plan_code: self.synth.dirt().plan_code(&mut rng).to_string(),
        });

        let window_end = install + Duration::days(i64::from(self.config.churn.label_horizon_days));
        let stream = self.synth.synthesize_full_window(&traits, install, window_end, &mut rng);
        let label = self.churn.label(&traits, &stream, install, upgrade_day + 1, &mut rng);

        let stream = match label.cancel {
            Some(cancel) => {
                subscription_events.push(SubscriptionEvent {
                    timestamp: cancel.timestamp,
                    kind:      SubscriptionKind::Cancel,
                    price:     sub.pro_price,
                    plan_code: self.synth.dirt().plan_code(&mut rng).to_string(),
                });
                log::debug!(
                    "merchant={merchant_id} churn: cancelled on day {} (p={:.3}, roi={:.2}, fail={:.3})",
                    cancel.day,
                    label.probability,
                    label.roi_ratio,
                    label.fail_rate,
                );
                apply_cancellation(stream, cancel.timestamp)
            }
            None => {
                log::debug!(
                    "merchant={merchant_id} churn: retained (p={:.3}, roi={:.2}, fail={:.3})",
                    label.probability,
                    label.roi_ratio,
                    label.fail_rate,
                );
                stream
            }
        };

        MerchantBundle {
            outcome: MerchantOutcome {
                merchant_id,
                adopted_pro:       true,
                churn_probability: Some(label.probability),
                roi_ratio:         Some(label.roi_ratio),
                fail_rate:         Some(label.fail_rate),
                cancel:            label.cancel,
                app_event_count:   stream.app_events.len(),
                revenue_row_count: stream.revenue.len(),
            },
            profile,
            subscription_events,
            stream,
        }
    }
}
