//! Churn labeler: turns a merchant's realised signals into a cancellation.
//!
//! The churn probability is a logistic function of ROI, SMS failure rate and
//! two latent traits. Cancellation timing is bimodal: most churners leave in
//! the retention cliff, the rest leave early out of dissatisfaction.
//!
//! Churn is applied after synthesis: the full window is generated first, then
//! `apply_cancellation` cuts everything at or after the cancel timestamp.

use crate::{
    config::{ChurnModelConfig, SimConfig},
    latent::LatentTraits,
    rng::SimRng,
    synth::MerchantStream,
    types::{at_time, DayOffset},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    /// Days after install.
    pub day:       DayOffset,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChurnLabel {
    pub probability: f64,
    pub roi_ratio:   f64,
    pub fail_rate:   f64,
    pub cancel:      Option<Cancellation>,
}

/// Recovered sales over the subscription cost of `months` months.
/// Zero when the cost is not positive.
pub fn roi_ratio(total_revenue: f64, monthly_price: f64, months: f64) -> f64 {
    let cost = months * monthly_price;
    if cost > 0.0 {
        total_revenue / cost
    } else {
        0.0
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub struct ChurnModel {
    cfg:         ChurnModelConfig,
    pro_price:   f64,
    cancel_hour: u32,
}

impl ChurnModel {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            cfg:         config.churn.clone(),
            pro_price:   config.subscription.pro_price,
            cancel_hour: config.subscription.cancel_hour,
        }
    }

    pub fn roi_ratio(&self, total_revenue: f64) -> f64 {
        roi_ratio(total_revenue, self.pro_price, self.cfg.roi_price_months)
    }

    /// Logistic churn model, clamped to [floor, ceiling].
    pub fn churn_probability(&self, traits: &LatentTraits, roi_ratio: f64, fail_rate: f64) -> f64 {
        let c = &self.cfg;
        let logit = c.intercept
            + c.roi_weight * (roi_ratio - c.roi_pivot)
            + c.fail_weight * (fail_rate - c.fail_pivot)
            + c.tech_weight * (traits.tech_risk - c.tech_pivot)
            + c.engagement_weight * (traits.engagement - c.engagement_pivot);
        sigmoid(logit).clamp(c.probability_floor, c.probability_ceiling)
    }

    /// Bimodal cancel day: the retention cliff with probability
    /// `cliff_share`, otherwise the early window. No day before
    /// `earliest` is ever returned.
    pub fn sample_cancel_day(&self, earliest: DayOffset, rng: &mut SimRng) -> DayOffset {
        let cliff = self.cfg.cliff;
        let early = self.cfg.early;
        let in_cliff = rng.chance(self.cfg.cliff_share);
        let window = if in_cliff || earliest > early.last { cliff } else { early };
        let first = window.first.max(earliest).min(window.last);
        rng.range_inclusive(first, window.last)
    }

    /// Score a merchant's full-window stream and decide churn.
    /// `earliest_cancel` keeps the cancel row after the paid-tier upgrade.
    pub fn label(
        &self,
        traits: &LatentTraits,
        stream: &MerchantStream,
        install: NaiveDate,
        earliest_cancel: DayOffset,
        rng: &mut SimRng,
    ) -> ChurnLabel {
        let roi_ratio = self.roi_ratio(stream.total_revenue());
        let fail_rate = stream.fail_rate();
        let probability = self.churn_probability(traits, roi_ratio, fail_rate);

        let cancel = rng.chance(probability).then(|| {
            let day = self.sample_cancel_day(earliest_cancel, rng);
            let date = install + Duration::days(i64::from(day));
            Cancellation { day, timestamp: at_time(date, self.cancel_hour, 0) }
        });

        ChurnLabel { probability, roi_ratio, fail_rate, cancel }
    }
}

/// Drop every app event at or after `cancel_at` and every revenue row on or
/// after its date.
pub fn apply_cancellation(mut stream: MerchantStream, cancel_at: NaiveDateTime) -> MerchantStream {
    let cancel_date = cancel_at.date();
    stream.app_events.retain(|e| e.timestamp < cancel_at);
    stream.revenue.retain(|r| r.date < cancel_date);
    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dirty::AppEventKind,
        synth::{AppEvent, RevenueDay},
    };

    fn model() -> ChurnModel {
        ChurnModel::new(&SimConfig::default())
    }

    fn traits(tech_risk: f64, engagement: f64) -> LatentTraits {
        LatentTraits { tech_risk, engagement, roi_strength: 0.5 }
    }

    #[test]
    fn roi_ratio_with_zero_price_is_zero() {
        assert_eq!(roi_ratio(500.0, 0.0, 3.0), 0.0);
        assert_eq!(roi_ratio(87.0, 29.0, 3.0), 1.0);
    }

    #[test]
    fn probability_rises_with_tech_risk() {
        let m = model();
        let mut last = 0.0;
        for step in 0..=10 {
            let p = m.churn_probability(&traits(step as f64 / 10.0, 0.5), 1.2, 0.10);
            assert!(p > last, "p={p} did not rise at tech_risk step {step}");
            last = p;
        }
    }

    #[test]
    fn probability_falls_with_roi() {
        let m = model();
        let mut last = 1.0;
        for step in 0..=10 {
            let roi = 0.5 + step as f64 * 0.1;
            let p = m.churn_probability(&traits(0.25, 0.5), roi, 0.10);
            assert!(p < last, "p={p} did not fall at roi {roi}");
            last = p;
        }
    }

    #[test]
    fn probability_is_clamped() {
        let m = model();
        assert_eq!(m.churn_probability(&traits(0.0, 1.0), 50.0, 0.0), 0.02);
        assert_eq!(m.churn_probability(&traits(1.0, 0.0), 0.0, 1.0), 0.95);
    }

    #[test]
    fn cancel_day_never_precedes_earliest() {
        let m = model();
        let mut rng = SimRng::new(3, 3);
        for _ in 0..5_000 {
            let day = m.sample_cancel_day(22, &mut rng);
            assert!((22..=59).contains(&day) || (60..=90).contains(&day), "day {day}");
        }
    }

    #[test]
    fn cancellation_cuts_at_timestamp() {
        let install = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let cancel_at = at_time(install + Duration::days(2), 12, 0);
        let event = |day: i64, hour: u32| AppEvent {
            timestamp:  at_time(install + Duration::days(day), hour, 0),
            kind:       AppEventKind::DashboardView,
            event_type: "dashboard_view",
            metadata:   None,
        };
        let stream = MerchantStream {
            app_events: vec![event(0, 9), event(2, 11), event(2, 12), event(2, 13), event(3, 8)],
            revenue: (0..4)
                .map(|d| RevenueDay { date: install + Duration::days(d), amount: 10.0 })
                .collect(),
            sms_sent: 0,
            sms_failed: 0,
        };

        let cut = apply_cancellation(stream, cancel_at);
        assert_eq!(cut.app_events.len(), 2);
        assert!(cut.app_events.iter().all(|e| e.timestamp < cancel_at));
        assert_eq!(cut.revenue.len(), 2, "revenue on the cancel date is dropped");
    }
}
