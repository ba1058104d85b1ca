//! Property-based checks of the scoring and drop models.

use chrono::NaiveDate;
use fare_backend::algorithms::{
    rarity, robust_std, score, DropFactors, PackageDropModel, RecordDropModel, ANOMALY_THRESHOLD,
};
use fare_backend::models::PackageDraft;
use fare_backend::services::deduplicate;
use proptest::prelude::*;

fn draft(dest: &str, stay_nights: u32, pct_saved: f64) -> PackageDraft {
    let depart = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    PackageDraft {
        origin: "JFK".to_string(),
        dest: dest.to_string(),
        region: "ORL".to_string(),
        depart_date: depart,
        return_date: depart + chrono::Duration::days(i64::from(stay_nights)),
        stay_nights,
        flight_price: 100.0,
        hotel_total: 300.0,
        total_price: 400.0,
        pct_saved,
        rarity_score: 0.5,
        drop_probability: 0.5,
        is_hot_deal: false,
    }
}

proptest! {
    #[test]
    fn prop_rarity_is_monotone_in_price(
        history in prop::collection::vec(1.0..1000.0f64, 1..60),
        a in 1.0..1000.0f64,
        b in 1.0..1000.0f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let r_low = rarity(low, &history);
        let r_high = rarity(high, &history);
        prop_assert!(r_low <= r_high);
        prop_assert!((0.0..=1.0).contains(&r_low));
        prop_assert!((0.0..=1.0).contains(&r_high));
    }

    #[test]
    fn prop_max_of_history_has_rarity_one(
        history in prop::collection::vec(1.0..1000.0f64, 1..60),
    ) {
        let max = history.iter().copied().fold(f64::MIN, f64::max);
        prop_assert_eq!(rarity(max, &history), 1.0);
    }

    #[test]
    fn prop_anomaly_flag_matches_threshold(
        actual in 1.0..1000.0f64,
        expected in 1.0..1000.0f64,
        residuals in prop::collection::vec(-50.0..50.0f64, 1..40),
    ) {
        let s = score(actual, expected, &residuals);
        prop_assert_eq!(s.is_anomaly, s.z_score.abs() > ANOMALY_THRESHOLD);
        prop_assert!(robust_std(&residuals) >= 0.0);
        prop_assert!(((s.delta_pct) - (expected - actual) / expected).abs() < 1e-12);
    }

    #[test]
    fn prop_drop_probability_falls_with_savings(
        d1 in -1.0..1.0f64,
        d2 in -1.0..1.0f64,
        z in -5.0..5.0f64,
        r in 0.0..=1.0f64,
        days in 0i64..365,
    ) {
        let model = RecordDropModel::default();
        let (low, high) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
        let p_low = model.probability(&DropFactors { delta_pct: low, z_score: z, rarity: r, days_out: days });
        let p_high = model.probability(&DropFactors { delta_pct: high, z_score: z, rarity: r, days_out: days });
        prop_assert!(p_high <= p_low);
        prop_assert!((0.0..=1.0).contains(&p_low));
    }

    #[test]
    fn prop_drop_probability_rises_with_days_out(
        delta in -1.0..1.0f64,
        z in -5.0..5.0f64,
        r in 0.0..=1.0f64,
        days_a in 0i64..365,
        days_b in 0i64..365,
    ) {
        let model = RecordDropModel::default();
        let (near, far) = if days_a <= days_b { (days_a, days_b) } else { (days_b, days_a) };
        let p_near = model.probability(&DropFactors { delta_pct: delta, z_score: z, rarity: r, days_out: near });
        let p_far = model.probability(&DropFactors { delta_pct: delta, z_score: z, rarity: r, days_out: far });
        prop_assert!(p_near <= p_far);
    }

    #[test]
    fn prop_package_probability_in_unit_interval(
        delta in -1.0..1.0f64,
        rarity_score in 0.0..=1.0f64,
        pct_saved in 0.0..1.0f64,
    ) {
        let p = PackageDropModel::default().probability(delta, rarity_score, pct_saved);
        prop_assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn prop_deduplicate_keeps_one_best_per_key(
        entries in prop::collection::vec((0usize..3, 1u32..4, 0.0..1.0f64), 0..30),
    ) {
        let dests = ["MCO", "MIA", "TPA"];
        let candidates: Vec<PackageDraft> = entries
            .iter()
            .map(|&(d, nights, saved)| draft(dests[d], nights, saved))
            .collect();

        let survivors = deduplicate(candidates.clone());

        let mut keys: Vec<_> = survivors.iter().map(|p| p.key()).collect();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), survivors.len());

        for survivor in &survivors {
            let best = candidates
                .iter()
                .filter(|c| c.key() == survivor.key())
                .map(|c| c.pct_saved)
                .fold(f64::MIN, f64::max);
            prop_assert_eq!(survivor.pct_saved, best);
        }
    }
}
