//! Event synthesizer: walks a merchant's window one day at a time.
//!
//! Knows nothing about churn: it always produces the full window, and the
//! churn labeler cuts the stream afterwards. Per day, each event family is an
//! independent Bernoulli trial at `base_rate(trait) * seasonal_multiplier`.
//!
//! Draw order per day (part of the determinism contract):
//!   1. dashboard_view
//!   2. integration_error
//!   3. sms_sent, then its failure roll
//!   4. end-of-day duplicate roll
//! Revenue is a second pass over the same days.

use crate::{
    config::{EventRates, RevenueModel, Seasonality, SimConfig},
    dirty::{AppEventKind, DirtinessInjector},
    error::{SimError, SimResult},
    latent::LatentTraits,
    rng::SimRng,
    types::at_time,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rand_distr::LogNormal;

#[derive(Debug, Clone, PartialEq)]
pub struct AppEvent {
    pub timestamp:  NaiveDateTime,
    pub kind:       AppEventKind,
    /// Noisy surface form of `kind`.
    pub event_type: &'static str,
    pub metadata:   Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueDay {
    pub date:   NaiveDate,
    pub amount: f64,
}

/// Everything one merchant produced over its window.
#[derive(Debug, Clone, Default)]
pub struct MerchantStream {
    pub app_events: Vec<AppEvent>,
    pub revenue:    Vec<RevenueDay>,
    pub sms_sent:   u32,
    pub sms_failed: u32,
}

impl MerchantStream {
    /// Failed over attempted SMS; zero when nothing was sent.
    pub fn fail_rate(&self) -> f64 {
        if self.sms_sent == 0 {
            0.0
        } else {
            f64::from(self.sms_failed) / f64::from(self.sms_sent)
        }
    }

    pub fn total_revenue(&self) -> f64 {
        self.revenue.iter().map(|r| r.amount).sum()
    }

    pub fn count_of(&self, kind: AppEventKind) -> usize {
        self.app_events.iter().filter(|e| e.kind == kind).count()
    }
}

pub fn seasonal_multiplier(date: NaiveDate, seasonality: &Seasonality) -> f64 {
    match date.month() {
        11 | 12 => seasonality.holiday_multiplier,
        1 => seasonality.january_multiplier,
        _ => 1.0,
    }
}

pub struct EventSynthesizer {
    rates:     EventRates,
    revenue:   RevenueModel,
    sales_mix: LogNormal<f64>,
    dirt:      DirtinessInjector,
}

impl EventSynthesizer {
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        let sales_mix = LogNormal::new(0.0, config.revenue.lognormal_sigma)
            .map_err(|e| SimError::config(format!("revenue lognormal: {e}")))?;
        Ok(Self {
            rates:   config.events.clone(),
            revenue: config.revenue.clone(),
            sales_mix,
            dirt: DirtinessInjector::new(
                config.dirtiness.metadata_drop_probability,
                config.dirtiness.duplicate_probability,
            ),
        })
    }

    pub fn dirt(&self) -> &DirtinessInjector {
        &self.dirt
    }

    /// Generate app events and daily revenue for every day in
    /// `[install, window_end)`.
    pub fn synthesize_full_window(
        &self,
        traits: &LatentTraits,
        install: NaiveDate,
        window_end: NaiveDate,
        rng: &mut SimRng,
    ) -> MerchantStream {
        let days = (window_end - install).num_days().max(0);
        let mut stream = MerchantStream::default();

        let base_dash = self.rates.dashboard_view.at(traits.engagement);
        let base_sms = self.rates.sms_sent.at(traits.engagement);
        let base_err = self.rates.integration_error.at(traits.tech_risk);
        let fail_p = self
            .rates
            .sms_failure
            .at(traits.tech_risk)
            .clamp(self.rates.sms_failure_floor, self.rates.sms_failure_ceiling);

        for offset in 0..days {
            let day = install + Duration::days(offset);
            let mult = seasonal_multiplier(day, &self.rates.seasonality);

            if rng.chance(base_dash * mult) {
                let ts = self.time_of_day(day, 7, 22, rng);
                self.emit(&mut stream, AppEventKind::DashboardView, ts, rng);
            }

            if rng.chance(base_err * mult) {
                let ts = self.time_of_day(day, 0, 23, rng);
                self.emit(&mut stream, AppEventKind::IntegrationError, ts, rng);
            }

            if rng.chance(base_sms * mult) {
                stream.sms_sent += 1;
                let failed = rng.chance(fail_p);
                let ts = self.time_of_day(day, 8, 23, rng);
                let kind = if failed {
                    stream.sms_failed += 1;
                    AppEventKind::SmsFailed
                } else {
                    AppEventKind::SmsSent
                };
                self.emit(&mut stream, kind, ts, rng);
            }

            self.dirt.maybe_duplicate_last(&mut stream.app_events, rng);
        }

        for offset in 0..days {
            let day = install + Duration::days(offset);
            if let Some(amount) = self.daily_revenue(traits, day, rng) {
                stream.revenue.push(RevenueDay { date: day, amount });
            }
        }

        stream
    }

    /// One day's recovered sales, or `None` for a missing-data day.
    fn daily_revenue(&self, traits: &LatentTraits, day: NaiveDate, rng: &mut SimRng) -> Option<f64> {
        let m = &self.revenue;
        if rng.chance(m.missing_day_probability) {
            return None;
        }
        let base = m.scale
            * m.engagement_factor.at(traits.engagement)
            * m.roi_factor.at(traits.roi_strength)
            * seasonal_multiplier(day, &self.rates.seasonality);
        let mut value = (base * rng.sample(&self.sales_mix)).clamp(0.0, m.daily_cap);
        if rng.chance(m.bad_day_probability.at(traits.engagement)) {
            value *= m.bad_day_factor;
        }
        Some(round_cents(value))
    }

    fn time_of_day(&self, day: NaiveDate, first_hour: u32, last_hour: u32, rng: &mut SimRng) -> NaiveDateTime {
        let hour = rng.range_inclusive(first_hour, last_hour);
        let minute = rng.range_inclusive(0, 59);
        at_time(day, hour, minute)
    }

    fn emit(&self, stream: &mut MerchantStream, kind: AppEventKind, timestamp: NaiveDateTime, rng: &mut SimRng) {
        let metadata = self.dirt.metadata(kind, rng);
        let event_type = self.dirt.event_type(kind, rng);
        stream.app_events.push(AppEvent { timestamp, kind, event_type, metadata });
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn traits(tech_risk: f64, engagement: f64, roi_strength: f64) -> LatentTraits {
        LatentTraits { tech_risk, engagement, roi_strength }
    }

    #[test]
    fn holiday_months_lift_and_january_dips() {
        let s = SimConfig::default().events.seasonality;
        assert_eq!(seasonal_multiplier(date(2025, 11, 3), &s), 1.4);
        assert_eq!(seasonal_multiplier(date(2025, 12, 31), &s), 1.4);
        assert_eq!(seasonal_multiplier(date(2026, 1, 15), &s), 0.8);
        assert_eq!(seasonal_multiplier(date(2025, 6, 1), &s), 1.0);
    }

    #[test]
    fn fail_rate_with_no_sms_is_zero() {
        assert_eq!(MerchantStream::default().fail_rate(), 0.0);
    }

    #[test]
    fn window_is_half_open() {
        let synth = EventSynthesizer::new(&SimConfig::default()).unwrap();
        let install = date(2025, 4, 10);
        let end = install + Duration::days(90);
        let mut rng = SimRng::new(11, 3);
        let stream = synth.synthesize_full_window(&traits(0.3, 0.9, 0.5), install, end, &mut rng);

        assert!(!stream.app_events.is_empty());
        for e in &stream.app_events {
            assert!(e.timestamp.date() >= install && e.timestamp.date() < end);
        }
        for r in &stream.revenue {
            assert!(r.date >= install && r.date < end);
        }
        assert!(stream.revenue.len() <= 90);
    }

    #[test]
    fn empty_window_produces_nothing() {
        let synth = EventSynthesizer::new(&SimConfig::default()).unwrap();
        let install = date(2025, 4, 10);
        let mut rng = SimRng::new(11, 3);
        let stream = synth.synthesize_full_window(&traits(0.3, 0.9, 0.5), install, install, &mut rng);
        assert!(stream.app_events.is_empty());
        assert!(stream.revenue.is_empty());
        assert_eq!(stream.sms_sent, 0);
    }

    #[test]
    fn event_types_are_surface_forms_of_their_kind() {
        let synth = EventSynthesizer::new(&SimConfig::default()).unwrap();
        let install = date(2025, 5, 1);
        let mut rng = SimRng::new(99, 1);
        let stream = synth.synthesize_full_window(
            &traits(0.5, 0.8, 0.5),
            install,
            install + Duration::days(90),
            &mut rng,
        );
        for e in &stream.app_events {
            assert_eq!(AppEventKind::from_raw(e.event_type), Some(e.kind));
            if let Some(md) = e.metadata {
                assert_eq!(md, e.kind.metadata());
            }
        }
        let sms_rows = stream.count_of(AppEventKind::SmsSent) + stream.count_of(AppEventKind::SmsFailed);
        assert!(sms_rows as u32 >= stream.sms_sent, "duplicates only ever add rows");
    }

    #[test]
    fn revenue_rounds_to_cents() {
        assert_eq!(round_cents(12.345_6), 12.35);
        assert_eq!(round_cents(0.0), 0.0);
    }
}
