//! Run configuration. Every constant that shapes a generated dataset lives
//! here; nothing is read from the command line or the environment.

use crate::{
    error::{SimError, SimResult},
    types::DayOffset,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub seed:           u64,
    pub merchant_count: u32,
    pub install_start:  NaiveDate,
    /// Inclusive.
    pub install_end:    NaiveDate,
    pub population:     PopulationConfig,
    pub subscription:   SubscriptionConfig,
    pub traits:         TraitPriors,
    pub events:         EventRates,
    pub revenue:        RevenueModel,
    pub dirtiness:      DirtinessConfig,
    pub churn:          ChurnModelConfig,
}

/// An inclusive range of day offsets after install.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayWindow {
    pub first: DayOffset,
    pub last:  DayOffset,
}

impl DayWindow {
    pub const fn new(first: DayOffset, last: DayOffset) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, day: DayOffset) -> bool {
        (self.first..=self.last).contains(&day)
    }
}

/// `base + slope * x` for a trait value `x` in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearRate {
    pub base:  f64,
    pub slope: f64,
}

impl LinearRate {
    pub const fn new(base: f64, slope: f64) -> Self {
        Self { base, slope }
    }

    pub fn at(&self, x: f64) -> f64 {
        self.base + self.slope * x
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta:  f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub countries:  Vec<String>,
    pub channels:   Vec<(String, f64)>,
    /// `None` entries produce merchants with no recorded industry.
    pub industries: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    pub pro_price:                f64,
    pub trial_plan_code:          String,
    pub pro_adoption_probability: f64,
    pub upgrade_delay:            DayWindow,
    pub trial_hour:               u32,
    pub upgrade_hour:             u32,
    pub cancel_hour:              u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitPriors {
    pub tech_risk:    BetaParams,
    pub engagement:   BetaParams,
    pub roi_strength: BetaParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRates {
    /// Driven by engagement.
    pub dashboard_view:    LinearRate,
    /// Driven by engagement.
    pub sms_sent:          LinearRate,
    /// Driven by tech_risk.
    pub integration_error: LinearRate,
    /// Driven by tech_risk, then clamped to [floor, ceiling].
    pub sms_failure:       LinearRate,
    pub sms_failure_floor:   f64,
    pub sms_failure_ceiling: f64,
    pub seasonality:       Seasonality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seasonality {
    /// November and December.
    pub holiday_multiplier: f64,
    pub january_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueModel {
    pub missing_day_probability: f64,
    pub scale:                   f64,
    pub engagement_factor:       LinearRate,
    pub roi_factor:              LinearRate,
    pub lognormal_sigma:         f64,
    pub daily_cap:               f64,
    /// Chance of a bad sales day, driven by engagement.
    pub bad_day_probability:     LinearRate,
    pub bad_day_factor:          f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirtinessConfig {
    pub metadata_drop_probability: f64,
    pub duplicate_probability:     f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnModelConfig {
    pub label_horizon_days: DayOffset,
    /// ROI denominator = `roi_price_months * pro_price`.
    pub roi_price_months:   f64,
    pub intercept:          f64,
    pub roi_weight:         f64,
    pub roi_pivot:          f64,
    pub fail_weight:        f64,
    pub fail_pivot:         f64,
    pub tech_weight:        f64,
    pub tech_pivot:         f64,
    pub engagement_weight:  f64,
    pub engagement_pivot:   f64,
    pub probability_floor:  f64,
    pub probability_ceiling: f64,
    pub cliff:              DayWindow,
    pub early:              DayWindow,
    pub cliff_share:        f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed:           42,
            merchant_count: 864,
            install_start:  ymd(2025, 3, 1),
            install_end:    ymd(2026, 1, 1),
            population: PopulationConfig {
                countries: ["NZ", "AU", "US", "GB", "CA"].map(String::from).to_vec(),
                channels: vec![
                    ("twitter".into(),  0.25),
                    ("discord".into(),  0.20),
                    ("referral".into(), 0.15),
                    ("organic".into(),  0.25),
                    ("unknown".into(),  0.15),
                ],
                industries: vec![
                    Some("Apparel".into()),
                    Some("Beauty".into()),
                    Some("Tech".into()),
                    Some("HomeGoods".into()),
                    Some("Sports".into()),
                    None,
                ],
            },
            subscription: SubscriptionConfig {
                pro_price:                29.0,
                trial_plan_code:          "free".into(),
                pro_adoption_probability: 0.45,
                upgrade_delay:            DayWindow::new(7, 21),
                trial_hour:               9,
                upgrade_hour:             10,
                cancel_hour:              12,
            },
            traits: TraitPriors {
                tech_risk:    BetaParams { alpha: 2.0, beta: 8.0 },
                engagement:   BetaParams { alpha: 3.0, beta: 3.0 },
                roi_strength: BetaParams { alpha: 2.5, beta: 4.5 },
            },
            events: EventRates {
                dashboard_view:      LinearRate::new(0.20, 0.90),
                sms_sent:            LinearRate::new(0.08, 0.25),
                integration_error:   LinearRate::new(0.01, 0.20),
                sms_failure:         LinearRate::new(0.03, 0.45),
                sms_failure_floor:   0.01,
                sms_failure_ceiling: 0.60,
                seasonality: Seasonality {
                    holiday_multiplier: 1.4,
                    january_multiplier: 0.8,
                },
            },
            revenue: RevenueModel {
                missing_day_probability: 0.06,
                scale:                   12.0,
                engagement_factor:       LinearRate::new(0.2, 1.6),
                roi_factor:              LinearRate::new(0.2, 1.8),
                lognormal_sigma:         0.6,
                daily_cap:               900.0,
                bad_day_probability:     LinearRate::new(0.25, -0.15),
                bad_day_factor:          0.05,
            },
            dirtiness: DirtinessConfig {
                metadata_drop_probability: 0.03,
                duplicate_probability:     0.002,
            },
            churn: ChurnModelConfig {
                label_horizon_days:  90,
                roi_price_months:    3.0,
                intercept:           -0.35,
                roi_weight:          -2.2,
                roi_pivot:           1.0,
                fail_weight:         3.0,
                fail_pivot:          0.08,
                tech_weight:         1.2,
                tech_pivot:          0.25,
                engagement_weight:   -1.0,
                engagement_pivot:    0.5,
                probability_floor:   0.02,
                probability_ceiling: 0.95,
                cliff:               DayWindow::new(60, 90),
                early:               DayWindow::new(15, 59),
                cliff_share:         0.80,
            },
        }
    }
}

impl SimConfig {
    /// A small run for tests: same model, 50 merchants.
    pub fn default_test() -> Self {
        Self {
            merchant_count: 50,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_merchant_count(mut self, merchant_count: u32) -> Self {
        self.merchant_count = merchant_count;
        self
    }

    /// Reject configurations that cannot produce a coherent dataset.
    /// Runs before any generation.
    pub fn validate(&self) -> SimResult<()> {
        if self.install_end < self.install_start {
            return Err(SimError::InvalidDateRange {
                start: self.install_start,
                end:   self.install_end,
            });
        }

        let pop = &self.population;
        if pop.countries.is_empty() {
            return Err(SimError::config("country pool is empty"));
        }
        if pop.industries.is_empty() {
            return Err(SimError::config("industry pool is empty"));
        }
        check_weights("channel", &pop.channels)?;

        let sub = &self.subscription;
        if !(sub.pro_price > 0.0) {
            return Err(SimError::config(format!("pro_price must be positive, got {}", sub.pro_price)));
        }
        check_probability("pro_adoption_probability", sub.pro_adoption_probability)?;
        check_window("upgrade_delay", sub.upgrade_delay)?;
        for (name, hour) in [
            ("trial_hour", sub.trial_hour),
            ("upgrade_hour", sub.upgrade_hour),
            ("cancel_hour", sub.cancel_hour),
        ] {
            if hour > 23 {
                return Err(SimError::config(format!("{name} must be 0..=23, got {hour}")));
            }
        }

        for (name, p) in [
            ("tech_risk", self.traits.tech_risk),
            ("engagement", self.traits.engagement),
            ("roi_strength", self.traits.roi_strength),
        ] {
            if !(p.alpha > 0.0 && p.beta > 0.0) {
                return Err(SimError::config(format!(
                    "{name} prior needs positive shape parameters, got Beta({}, {})",
                    p.alpha, p.beta
                )));
            }
        }

        let ev = &self.events;
        if !(ev.sms_failure_floor <= ev.sms_failure_ceiling) {
            return Err(SimError::config("sms_failure_floor exceeds sms_failure_ceiling"));
        }
        check_probability("sms_failure_floor", ev.sms_failure_floor)?;
        check_probability("sms_failure_ceiling", ev.sms_failure_ceiling)?;

        let rev = &self.revenue;
        check_probability("missing_day_probability", rev.missing_day_probability)?;
        if !(rev.lognormal_sigma > 0.0) {
            return Err(SimError::config("lognormal_sigma must be positive"));
        }
        if !(rev.daily_cap >= 0.0) {
            return Err(SimError::config("daily_cap must be non-negative"));
        }

        check_probability("metadata_drop_probability", self.dirtiness.metadata_drop_probability)?;
        check_probability("duplicate_probability", self.dirtiness.duplicate_probability)?;

        let churn = &self.churn;
        if churn.label_horizon_days == 0 {
            return Err(SimError::config("label_horizon_days must be at least 1"));
        }
        check_window("cliff", churn.cliff)?;
        check_window("early", churn.early)?;
        check_probability("cliff_share", churn.cliff_share)?;
        check_probability("probability_floor", churn.probability_floor)?;
        check_probability("probability_ceiling", churn.probability_ceiling)?;
        if churn.probability_floor > churn.probability_ceiling {
            return Err(SimError::config("probability_floor exceeds probability_ceiling"));
        }
        if churn.cliff.last > churn.label_horizon_days {
            return Err(SimError::config(format!(
                "cliff ends on day {} beyond the {}-day label horizon",
                churn.cliff.last, churn.label_horizon_days
            )));
        }
        // A cancel is sampled no earlier than the day after the upgrade and
        // no later than cliff.last.
        let upgrade_last = sub.upgrade_delay.last;
        if upgrade_last >= churn.label_horizon_days {
            return Err(SimError::config(format!(
                "upgrade_delay ends on day {upgrade_last}, outside the {}-day label horizon",
                churn.label_horizon_days
            )));
        }
        if upgrade_last >= churn.cliff.last {
            return Err(SimError::config(format!(
                "upgrade_delay ends on day {upgrade_last}, leaving no cancel day before the cliff ends on day {}",
                churn.cliff.last
            )));
        }

        Ok(())
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn check_probability(name: &str, p: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::config(format!("{name} must be within [0, 1], got {p}")))
    }
}

fn check_window(name: &str, window: DayWindow) -> SimResult<()> {
    if window.first <= window.last {
        Ok(())
    } else {
        Err(SimError::config(format!(
            "{name} window is inverted: {}..={}",
            window.first, window.last
        )))
    }
}

fn check_weights(name: &str, pool: &[(String, f64)]) -> SimResult<()> {
    if pool.is_empty() {
        return Err(SimError::config(format!("{name} pool is empty")));
    }
    if pool.iter().any(|(_, w)| !(*w >= 0.0)) {
        return Err(SimError::config(format!("{name} weights must be non-negative")));
    }
    if pool.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
        return Err(SimError::config(format!("{name} weights sum to zero")));
    }
    Ok(())
}
