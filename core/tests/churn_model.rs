//! Statistical behaviour of the churn labeler.

use stockradar_core::{
    config::SimConfig,
    engine::SimEngine,
    latent::LatentTraits,
    rng::SimRng,
};

fn engine() -> SimEngine {
    SimEngine::new(SimConfig::default()).unwrap()
}

fn traits(tech_risk: f64, engagement: f64) -> LatentTraits {
    LatentTraits { tech_risk, engagement, roi_strength: 0.4 }
}

/// 80% of cancellations fall in the 60–90 day cliff.
#[test]
fn cancel_days_concentrate_in_the_cliff() {
    let engine = engine();
    let model = engine.churn_model();
    let mut rng = SimRng::new(0xC11F, 0);

    const N: usize = 10_000;
    let mut in_cliff = 0;
    for i in 0..N {
        // Upgrade lands 7..=21 days in, so cancels may start the day after.
        let earliest = 8 + (i % 15) as u32;
        let day = model.sample_cancel_day(earliest, &mut rng);
        assert!(day >= earliest, "day {day} precedes earliest {earliest}");
        assert!((15..=90).contains(&day), "day {day} outside both windows");
        if (60..=90).contains(&day) {
            in_cliff += 1;
        }
    }
    let share = in_cliff as f64 / N as f64;
    assert!((share - 0.80).abs() < 0.03, "cliff share {share:.3}, expected ~0.80");
}

/// The same property measured end to end. Most paid merchants recover far
/// more than they pay, so the default model churns few of them; raising the
/// probability floor yields enough cancellations to measure the timing.
#[test]
fn generated_cancellations_concentrate_in_the_cliff() {
    let mut config = SimConfig::default().with_seed(7).with_merchant_count(5_000);
    config.churn.probability_floor = 0.90;
    let cliff = config.churn.cliff;
    let dataset = SimEngine::new(config).unwrap().run();
    let summary = dataset.summary(cliff);

    assert!(summary.churned_merchants > 1_500, "only {} churners", summary.churned_merchants);
    assert!(
        (summary.cliff_share - 0.80).abs() < 0.03,
        "cliff share {:.3} over {} churners",
        summary.cliff_share,
        summary.churned_merchants
    );
}

#[test]
fn higher_tech_risk_always_raises_churn_probability() {
    let engine = engine();
    let model = engine.churn_model();
    for (roi, fail) in [(0.8, 0.05), (1.0, 0.10), (1.5, 0.20)] {
        let low = model.churn_probability(&traits(0.10, 0.5), roi, fail);
        let high = model.churn_probability(&traits(0.60, 0.5), roi, fail);
        assert!(high > low, "roi={roi} fail={fail}: {high} <= {low}");
    }
}

#[test]
fn higher_roi_always_lowers_churn_probability() {
    let engine = engine();
    let model = engine.churn_model();
    for tech in [0.1, 0.3, 0.6] {
        let poor = model.churn_probability(&traits(tech, 0.5), 0.6, 0.1);
        let good = model.churn_probability(&traits(tech, 0.5), 1.4, 0.1);
        assert!(good < poor, "tech_risk={tech}: {good} >= {poor}");
    }
}

#[test]
fn probability_stays_in_clamp_range() {
    let engine = engine();
    let model = engine.churn_model();
    let mut rng = SimRng::new(1, 1);
    for _ in 0..2_000 {
        let t = LatentTraits {
            tech_risk:    rng.next_f64(),
            engagement:   rng.next_f64(),
            roi_strength: rng.next_f64(),
        };
        let p = model.churn_probability(&t, rng.next_f64() * 10.0, rng.next_f64());
        assert!((0.02..=0.95).contains(&p), "p={p}");
    }
}

#[test]
fn churners_recover_less_than_retained() {
    let config = SimConfig::default().with_seed(2025).with_merchant_count(5_000);
    let cliff = config.churn.cliff;
    let summary = SimEngine::new(config).unwrap().run().summary(cliff);

    assert!(summary.churned.merchants > 0 && summary.retained.merchants > 0);
    assert!(
        summary.churned.mean_roi_ratio < summary.retained.mean_roi_ratio,
        "churned roi {:.2} vs retained {:.2}",
        summary.churned.mean_roi_ratio,
        summary.retained.mean_roi_ratio
    );
}
