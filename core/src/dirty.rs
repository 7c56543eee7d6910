//! Canonical kinds and their noisy surface forms.
//!
//! Every categorical value has one canonical enum variant. What lands in the
//! tables is a surface form chosen from a fixed, weighted variant list, so the
//! text is dirty while the meaning stays unambiguous. `from_raw` goes the
//! other way for consumers that need to clean the data back up.

use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEventKind {
    DashboardView,
    SmsSent,
    SmsFailed,
    IntegrationError,
}

impl AppEventKind {
    pub const ALL: [AppEventKind; 4] = [
        Self::DashboardView,
        Self::SmsSent,
        Self::SmsFailed,
        Self::IntegrationError,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            Self::DashboardView    => "dashboard_view",
            Self::SmsSent          => "sms_sent",
            Self::SmsFailed        => "sms_failed",
            Self::IntegrationError => "integration_error",
        }
    }

    /// Surface forms with their selection weights.
    pub fn variants(&self) -> &'static [(&'static str, f64)] {
        const THIRD: f64 = 1.0 / 3.0;
        match self {
            Self::DashboardView => &[
                ("dashboard_view", THIRD),
                ("Dashboard_View", THIRD),
                ("DASHBOARD_VIEW", THIRD),
            ],
            Self::SmsSent => &[("sms_sent", THIRD), ("SMS_SENT", THIRD), ("smsSent", THIRD)],
            Self::SmsFailed => &[("sms_failed", THIRD), ("SMS_FAILED", THIRD), ("smsFail", THIRD)],
            Self::IntegrationError => &[
                ("integration_error", THIRD),
                ("INTEGRATION_ERROR", THIRD),
                ("integrationError", THIRD),
            ],
        }
    }

    /// JSON payload attached to the event when metadata is not dropped.
    pub fn metadata(&self) -> &'static str {
        match self {
            Self::DashboardView    => r#"{"page":"overview"}"#,
            Self::SmsSent          => r#"{"provider":"twilio"}"#,
            Self::SmsFailed        => r#"{"reason":"carrier_reject"}"#,
            Self::IntegrationError => r#"{"error":"webhook_timeout"}"#,
        }
    }

    /// Recover the canonical kind from any surface form.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match squash(raw).as_str() {
            "dashboardview"    => Some(Self::DashboardView),
            "smssent"          => Some(Self::SmsSent),
            "smsfailed" | "smsfail" => Some(Self::SmsFailed),
            "integrationerror" => Some(Self::IntegrationError),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    TrialStart,
    UpgradePro,
    Cancel,
}

impl SubscriptionKind {
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::TrialStart => "trial_start",
            Self::UpgradePro => "upgrade_pro",
            Self::Cancel     => "cancel",
        }
    }

    pub fn from_raw(raw: &str) -> Option<Self> {
        match squash(raw).as_str() {
            "trialstart" => Some(Self::TrialStart),
            "upgradepro" => Some(Self::UpgradePro),
            "cancel"     => Some(Self::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Pro,
}

/// Raw plan codes written on paid-tier subscription rows.
pub const PRO_PLAN_CODES: [(&str, f64); 6] = [
    ("pro",         0.35),
    ("PRO",         0.10),
    ("Pro Tier",    0.15),
    ("pro_plan_v2", 0.15),
    ("Pro",         0.15),
    ("PRO_TIER",    0.10),
];

impl PlanTier {
    pub fn from_raw(raw: &str) -> Option<Self> {
        let s = squash(raw);
        if s == "free" || s.starts_with("trial") {
            Some(Self::Free)
        } else if s.starts_with("pro") {
            Some(Self::Pro)
        } else {
            None
        }
    }
}

/// Pick a variant by cumulative weight for a uniform roll in [0, 1).
/// Pure so the mapping can be checked without a generator.
pub fn surface_form(variants: &'static [(&'static str, f64)], roll: f64) -> &'static str {
    let total: f64 = variants.iter().map(|(_, w)| w).sum();
    let target = roll.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    for (form, weight) in variants {
        cumulative += weight;
        if target < cumulative {
            return form;
        }
    }
    variants.last().map(|(form, _)| *form).unwrap_or("")
}

/// Applies the noise model on a merchant's stream.
pub struct DirtinessInjector {
    metadata_drop_probability: f64,
    duplicate_probability:     f64,
}

impl DirtinessInjector {
    pub fn new(metadata_drop_probability: f64, duplicate_probability: f64) -> Self {
        Self { metadata_drop_probability, duplicate_probability }
    }

    pub fn event_type(&self, kind: AppEventKind, rng: &mut SimRng) -> &'static str {
        surface_form(kind.variants(), rng.next_f64())
    }

    pub fn plan_code(&self, rng: &mut SimRng) -> &'static str {
        surface_form(&PRO_PLAN_CODES, rng.next_f64())
    }

    /// The kind's payload, or `None` when the drop roll hits.
    pub fn metadata(&self, kind: AppEventKind, rng: &mut SimRng) -> Option<&'static str> {
        if rng.chance(self.metadata_drop_probability) {
            None
        } else {
            Some(kind.metadata())
        }
    }

    /// End-of-day duplicate: repeat the last element verbatim.
    /// Returns whether a duplicate was appended.
    pub fn maybe_duplicate_last<T: Clone>(&self, rows: &mut Vec<T>, rng: &mut SimRng) -> bool {
        let Some(last) = rows.last().cloned() else {
            return false;
        };
        if rng.chance(self.duplicate_probability) {
            rows.push(last);
            true
        } else {
            false
        }
    }
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
