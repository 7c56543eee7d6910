//! Dataset assembler: the four relational row sets for one run.
//!
//! Rows are appended one merchant at a time, in merchant order, and every
//! table gets its own 1-based, strictly increasing surrogate key. Nothing is
//! written anywhere until the whole dataset exists.

use crate::{
    churn::Cancellation,
    config::DayWindow,
    dirty::{AppEventKind, SubscriptionKind},
    population::MerchantProfile,
    synth::MerchantStream,
    types::{serialize_date, serialize_timestamp, DayOffset, MerchantId, RowId},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

// ── Table rows ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantRow {
    pub merchant_id:         MerchantId,
    #[serde(serialize_with = "serialize_date")]
    pub install_date:        NaiveDate,
    pub country:             String,
    pub acquisition_channel: String,
    pub industry:            Option<String>,
    pub is_active:           i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionEventRow {
    pub event_id:        RowId,
    pub merchant_id:     MerchantId,
    #[serde(serialize_with = "serialize_timestamp")]
    pub event_timestamp: NaiveDateTime,
    pub event_type:      String,
    pub monthly_price:   f64,
    pub plan_code_raw:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppEventRow {
    pub event_id:        RowId,
    pub merchant_id:     MerchantId,
    #[serde(serialize_with = "serialize_timestamp")]
    pub event_timestamp: NaiveDateTime,
    pub event_type:      String,
    pub metadata:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueRow {
    pub id:                  RowId,
    pub merchant_id:         MerchantId,
    #[serde(serialize_with = "serialize_date")]
    pub event_date:          NaiveDate,
    pub recovered_sales_nzd: f64,
}

/// A row struct whose serialized fields line up with `COLUMNS`.
pub trait TableRow: Serialize {
    const COLUMNS: &'static [&'static str];
}

impl TableRow for MerchantRow {
    const COLUMNS: &'static [&'static str] = &[
        "merchant_id",
        "install_date",
        "country",
        "acquisition_channel",
        "industry",
        "is_active",
    ];
}

impl TableRow for SubscriptionEventRow {
    const COLUMNS: &'static [&'static str] = &[
        "event_id",
        "merchant_id",
        "event_timestamp",
        "event_type",
        "monthly_price",
        "plan_code_raw",
    ];
}

impl TableRow for AppEventRow {
    const COLUMNS: &'static [&'static str] =
        &["event_id", "merchant_id", "event_timestamp", "event_type", "metadata"];
}

impl TableRow for RevenueRow {
    const COLUMNS: &'static [&'static str] =
        &["id", "merchant_id", "event_date", "recovered_sales_nzd"];
}

// ── Per-merchant output ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEvent {
    pub timestamp: NaiveDateTime,
    pub kind:      SubscriptionKind,
    pub price:     f64,
    pub plan_code: String,
}

/// Ground truth for one merchant. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantOutcome {
    pub merchant_id:       MerchantId,
    pub adopted_pro:       bool,
    pub churn_probability: Option<f64>,
    pub roi_ratio:         Option<f64>,
    pub fail_rate:         Option<f64>,
    pub cancel:            Option<Cancellation>,
    pub app_event_count:   usize,
    pub revenue_row_count: usize,
}

impl MerchantOutcome {
    pub fn churned(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel_day(&self) -> Option<DayOffset> {
        self.cancel.map(|c| c.day)
    }
}

/// Everything one merchant contributes, ready to be assembled.
#[derive(Debug, Clone)]
pub struct MerchantBundle {
    pub profile:             MerchantProfile,
    pub subscription_events: Vec<SubscriptionEvent>,
    /// Already cut at the cancel timestamp for churned merchants.
    pub stream:              MerchantStream,
    pub outcome:             MerchantOutcome,
}

// ── Assembler ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub merchants:           Vec<MerchantRow>,
    pub subscription_events: Vec<SubscriptionEventRow>,
    pub app_events:          Vec<AppEventRow>,
    pub revenue:             Vec<RevenueRow>,
    pub outcomes:            Vec<MerchantOutcome>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one merchant's rows, assigning the next surrogate keys.
    pub fn push(&mut self, bundle: MerchantBundle) {
        let MerchantBundle { profile, subscription_events, stream, outcome } = bundle;
        let merchant_id = profile.merchant_id;

        self.merchants.push(MerchantRow {
            merchant_id,
            install_date:        profile.install_date,
            country:             profile.country,
            acquisition_channel: profile.acquisition_channel,
            industry:            profile.industry,
            is_active:           1,
        });

        for sub in subscription_events {
            let event_id = next_id(self.subscription_events.len());
            self.subscription_events.push(SubscriptionEventRow {
                event_id,
                merchant_id,
                event_timestamp: sub.timestamp,
                event_type:      sub.kind.canonical().to_string(),
                monthly_price:   sub.price,
                plan_code_raw:   sub.plan_code,
            });
        }

        for event in stream.app_events {
            let event_id = next_id(self.app_events.len());
            self.app_events.push(AppEventRow {
                event_id,
                merchant_id,
                event_timestamp: event.timestamp,
                event_type:      event.event_type.to_string(),
                metadata:        event.metadata.map(str::to_string),
            });
        }

        for day in stream.revenue {
            let id = next_id(self.revenue.len());
            self.revenue.push(RevenueRow {
                id,
                merchant_id,
                event_date:          day.date,
                recovered_sales_nzd: day.amount,
            });
        }

        self.outcomes.push(outcome);
    }

    pub fn row_counts(&self) -> RowCounts {
        RowCounts {
            merchants:           self.merchants.len(),
            subscription_events: self.subscription_events.len(),
            app_events:          self.app_events.len(),
            revenue:             self.revenue.len(),
        }
    }

    /// Headline statistics of the run, including the ground-truth split a
    /// downstream feature check would compare against.
    pub fn summary(&self, cliff: DayWindow) -> RunSummary {
        let pro: Vec<&MerchantOutcome> = self.outcomes.iter().filter(|o| o.adopted_pro).collect();
        let churned: Vec<&MerchantOutcome> = pro.iter().copied().filter(|o| o.churned()).collect();
        let retained: Vec<&MerchantOutcome> = pro.iter().copied().filter(|o| !o.churned()).collect();

        let in_cliff = churned
            .iter()
            .filter(|o| o.cancel_day().is_some_and(|d| cliff.contains(d)))
            .count();

        let mut app_event_counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in &self.app_events {
            let key = AppEventKind::from_raw(&row.event_type)
                .map(|k| k.canonical())
                .unwrap_or("unrecognised");
            *app_event_counts.entry(key.to_string()).or_default() += 1;
        }

        RunSummary {
            rows:              self.row_counts(),
            pro_merchants:     pro.len(),
            churned_merchants: churned.len(),
            churn_rate:        ratio(churned.len(), pro.len()),
            cliff_share:       ratio(in_cliff, churned.len()),
            app_event_counts,
            churned:           LabelStats::over(&churned),
            retained:          LabelStats::over(&retained),
        }
    }
}

fn next_id(len: usize) -> RowId {
    len as RowId + 1
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub merchants:           usize,
    pub subscription_events: usize,
    pub app_events:          usize,
    pub revenue:             usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStats {
    pub merchants:      usize,
    pub mean_fail_rate: f64,
    pub mean_roi_ratio: f64,
}

impl LabelStats {
    fn over(outcomes: &[&MerchantOutcome]) -> Self {
        let n = outcomes.len();
        let mean = |f: fn(&MerchantOutcome) -> Option<f64>| {
            if n == 0 {
                0.0
            } else {
                outcomes.iter().filter_map(|o| f(o)).sum::<f64>() / n as f64
            }
        };
        Self {
            merchants:      n,
            mean_fail_rate: mean(|o| o.fail_rate),
            mean_roi_ratio: mean(|o| o.roi_ratio),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub rows:              RowCounts,
    pub pro_merchants:     usize,
    pub churned_merchants: usize,
    /// Among paid-tier merchants.
    pub churn_rate:        f64,
    /// Share of cancellations inside the retention cliff.
    pub cliff_share:       f64,
    /// Keyed by canonical kind, parsed back from the dirty surface forms.
    pub app_event_counts:  BTreeMap<String, usize>,
    pub churned:           LabelStats,
    pub retained:          LabelStats,
}
