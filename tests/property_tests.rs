//! Property-based tests for the pricing engine.
//!
//! These tests verify invariants hold under random inputs.

use lmsr_core::math;
use lmsr_core::*;
use proptest::prelude::*;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

const S: i128 = Fixed::SCALE;

fn engine() -> LmsrEngine {
    LmsrEngine::new(EngineConfig::default()).unwrap()
}

fn fine_engine() -> LmsrEngine {
    LmsrEngine::new(EngineConfig {
        log_precision: LogPrecision::Fine,
        ..EngineConfig::default()
    })
    .unwrap()
}

// Strategies for generating test data
fn quantity_strategy() -> impl Strategy<Value = Fixed> {
    (0i128..=10_000 * S).prop_map(Fixed::from_raw) // 0 to 10,000 shares
}

fn liquidity_strategy() -> impl Strategy<Value = Fixed> {
    (S / 10..=10_000 * S).prop_map(Fixed::from_raw) // b from 0.1 to 10,000
}

fn payment_strategy() -> impl Strategy<Value = Fixed> {
    (0i128..=1_000 * S).prop_map(Fixed::from_raw)
}

fn volume_strategy() -> impl Strategy<Value = Fixed> {
    (0i64..=1_000_000_000_000i64).prop_map(Fixed::from_units)
}

fn fee_strategy() -> impl Strategy<Value = Bps> {
    (0u32..=Bps::MAX).prop_map(Bps::new)
}

fn outcome_strategy() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Yes), Just(Outcome::No)]
}

proptest! {
    /// Prices always sum to 1 within 0.1%
    #[test]
    fn price_sum_near_one(
        q_yes in quantity_strategy(),
        q_no in quantity_strategy(),
        b in liquidity_strategy(),
    ) {
        let prices = engine().price(&MarketQuantities::new(q_yes, q_no), b).unwrap();
        let drift = (prices.yes.raw() + prices.no.raw() - S).abs();
        prop_assert!(drift < PRICE_SUM_TOLERANCE.raw(), "drift {} for {:?}", drift, prices);
        prop_assert!(prices.yes >= Fixed::ZERO && prices.yes <= Fixed::ONE);
        prop_assert!(prices.no >= Fixed::ZERO && prices.no <= Fixed::ONE);
    }

    /// Every reachable state passes validation
    #[test]
    fn valid_states_validate(
        q_yes in quantity_strategy(),
        q_no in quantity_strategy(),
        b in liquidity_strategy(),
    ) {
        prop_assert!(engine().validate_state(&MarketQuantities::new(q_yes, q_no), b));
        prop_assert!(fine_engine().validate_state(&MarketQuantities::new(q_yes, q_no), b));
    }

    /// Fresh market is exactly 50/50 for any b
    #[test]
    fn fresh_market_even(b in liquidity_strategy()) {
        let prices = engine().price(&MarketQuantities::zero(), b).unwrap();
        prop_assert_eq!(prices, PricePair::even());
    }

    /// The leading outcome is never the cheaper one
    #[test]
    fn leading_outcome_not_cheaper(
        q_yes in quantity_strategy(),
        q_no in quantity_strategy(),
        b in liquidity_strategy(),
    ) {
        let prices = engine().price(&MarketQuantities::new(q_yes, q_no), b).unwrap();
        if q_yes > q_no {
            prop_assert!(prices.yes >= prices.no);
        } else if q_no > q_yes {
            prop_assert!(prices.no >= prices.yes);
        }
    }

    /// b never decreases as volume grows
    #[test]
    fn dynamic_b_monotone_in_volume(
        v1 in volume_strategy(),
        v2 in volume_strategy(),
        tx in 0u64..1_000_000_000,
    ) {
        let engine = engine();
        let (lo, hi) = if v1 <= v2 { (v1, v2) } else { (v2, v1) };
        prop_assert!(engine.dynamic_b(lo, tx).unwrap() <= engine.dynamic_b(hi, tx).unwrap());
    }

    /// b never decreases as trades accumulate
    #[test]
    fn dynamic_b_monotone_in_tx_count(
        volume in volume_strategy(),
        t1 in 0u64..1_000_000_000,
        t2 in 0u64..1_000_000_000,
    ) {
        let engine = engine();
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        prop_assert!(engine.dynamic_b(volume, lo).unwrap() <= engine.dynamic_b(volume, hi).unwrap());
        prop_assert!(engine.dynamic_b(volume, lo).unwrap() >= engine.params().b0);
    }

    /// Cost never decreases when either quantity grows
    #[test]
    fn cost_monotone_in_each_quantity(
        q_yes in quantity_strategy(),
        q_no in quantity_strategy(),
        extra in quantity_strategy(),
        b in liquidity_strategy(),
    ) {
        let engine = engine();
        let base = MarketQuantities::new(q_yes, q_no);
        let cost = engine.cost(&base, b).unwrap();

        let more_yes = base.with_added(Outcome::Yes, extra).unwrap();
        let more_no = base.with_added(Outcome::No, extra).unwrap();
        prop_assert!(engine.cost(&more_yes, b).unwrap() >= cost);
        prop_assert!(engine.cost(&more_no, b).unwrap() >= cost);
    }

    /// Balanced market: YES and NO buy the same amount
    #[test]
    fn balanced_solver_symmetric(
        q in quantity_strategy(),
        pay in payment_strategy(),
        b in liquidity_strategy(),
    ) {
        let engine = engine();
        let balanced = MarketQuantities::new(q, q);
        let yes = engine.solve_shares(pay, Outcome::Yes, &balanced, b);
        let no = engine.solve_shares(pay, Outcome::No, &balanced, b);
        prop_assert_eq!(yes, no);
    }

    /// Solved shares never cost more than the payment and stay inside the bound
    #[test]
    fn solved_shares_affordable(
        q_yes in quantity_strategy(),
        q_no in quantity_strategy(),
        pay in payment_strategy(),
        b in liquidity_strategy(),
        outcome in outcome_strategy(),
    ) {
        let engine = engine();
        let q = MarketQuantities::new(q_yes, q_no);
        match engine.solve_shares(pay, outcome, &q, b) {
            Ok(shares) => {
                prop_assert!(shares >= Fixed::ZERO);
                prop_assert!(shares.raw() <= pay.raw() * 10);
                let before = engine.cost(&q, b).unwrap();
                let after = engine.cost(&q.with_added(outcome, shares).unwrap(), b).unwrap();
                prop_assert!(after.raw() - before.raw() <= pay.raw());
            }
            Err(LmsrError::SearchBoundExceeded { payment, bound }) => {
                prop_assert_eq!(payment, pay);
                prop_assert_eq!(bound.raw(), pay.raw() * 10);
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    /// Same inputs, same preview; fee and net always add up to the payment
    #[test]
    fn preview_deterministic(
        q_yes in quantity_strategy(),
        q_no in quantity_strategy(),
        pay in payment_strategy(),
        b in liquidity_strategy(),
        fee in fee_strategy(),
        outcome in outcome_strategy(),
    ) {
        let engine = engine();
        let q = MarketQuantities::new(q_yes, q_no);
        let first = engine.preview_trade(pay, outcome, &q, b, fee);
        let second = engine.preview_trade(pay, outcome, &q, b, fee);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(q, MarketQuantities::new(q_yes, q_no));

        if let Ok(preview) = first {
            prop_assert_eq!(preview.fee.raw() + preview.net_amount.raw(), pay.raw());
            prop_assert!(preview.new_price >= preview.current_price);
        }
    }

    /// exp never decreases over the exponents pricing feeds it
    #[test]
    fn exp_monotone(a in 0i128..=50 * S, b in 0i128..=50 * S) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(math::exp_approx(lo).unwrap() <= math::exp_approx(hi).unwrap());
        prop_assert!(math::exp_approx(lo).unwrap() >= S);
    }

    /// Fixed-point sqrt agrees with rust_decimal
    #[test]
    fn sqrt_matches_decimal(units in 0i64..=1_000_000_000i64, frac in 0i64..1_000_000i64) {
        let x = Fixed::from_raw(units as i128 * S + frac as i128 * 1_000_000_000_000);
        let ours = Fixed::from_raw(math::sqrt(x.raw()).unwrap()).to_decimal();
        let reference = x.to_decimal().sqrt().unwrap();
        prop_assert!((ours - reference).abs() < dec!(0.000000001), "{} vs {}", ours, reference);
    }

    /// Fine ln agrees with rust_decimal
    #[test]
    fn fine_ln_matches_decimal(raw in S / 100..=1_000_000 * S) {
        let x = Fixed::from_raw(raw);
        let ours = Fixed::from_raw(math::ln_fine(raw).unwrap()).to_decimal();
        let reference = x.to_decimal().ln();
        prop_assert!((ours - reference).abs() < dec!(0.000001), "{} vs {}", ours, reference);
    }

    /// Coarse ln stays within its bucket error of the real value
    #[test]
    fn coarse_ln_bounded_error(raw in S..=1_000_000 * S) {
        let x = Fixed::from_raw(raw);
        let ours = Fixed::from_raw(math::ln(raw).unwrap()).to_decimal();
        let reference = x.to_decimal().ln();
        // bucket offsets are rounded up slightly, widest gap below is 1 - 0.585 bits
        prop_assert!(ours <= reference + dec!(0.0001));
        prop_assert!(reference - ours < dec!(0.29));
    }
}

/// Fixed reference points
#[cfg(test)]
mod scenarios {
    use super::*;

    fn units(n: i64) -> Fixed {
        Fixed::from_units(n)
    }

    #[test]
    fn fresh_market_cost_is_b_ln2() {
        let cost = engine().cost(&MarketQuantities::zero(), units(100)).unwrap();
        // 100 * 0.693147180559945309
        assert_eq!(cost.raw(), 69_314_718_055_994_530_900);
        assert!(cost.to_decimal() > dec!(69.31) && cost.to_decimal() < dec!(69.32));
    }

    #[test]
    fn base_liquidity_exact() {
        assert_eq!(engine().dynamic_b(Fixed::ZERO, 0).unwrap(), units(100));
    }

    #[test]
    fn reference_dynamic_b() {
        // 100 * (1 + 0.05 * 1 + 0.02 * ln(11)), ln(11) from the coarse log2 (3.322 bits)
        let b = engine().dynamic_b(units(1_000_000), 10).unwrap();
        assert_eq!(b.raw(), 109_605_269_867_640_276_600);
        // the real value is 109.7958
        assert!(b.to_decimal() > dec!(109.5) && b.to_decimal() < dec!(109.8));
    }

    #[test]
    fn hundred_unit_payment_at_balanced_market() {
        let q = MarketQuantities::new(units(100), units(100));
        let preview = engine()
            .preview_trade(units(100), Outcome::Yes, &q, units(100), Bps::new(50))
            .unwrap();

        assert_eq!(preview.fee.to_decimal(), dec!(0.5));
        assert_eq!(preview.net_amount.to_decimal(), dec!(99.5));
        // at p = 0.5 each unit buys more than one share
        assert!(preview.expected_shares > preview.net_amount);
        assert!(preview.avg_price < Fixed::ONE);
        assert!(preview.avg_price > preview.current_price);
        assert!(preview.new_price > preview.current_price);
    }

    #[test]
    fn validate_state_edges() {
        let engine = engine();
        assert!(!engine.validate_state(&MarketQuantities::new(Fixed::from_raw(-1), Fixed::ZERO), units(100)));
        assert!(!engine.validate_state(&MarketQuantities::zero(), Fixed::ZERO));
        assert!(engine.validate_state(&MarketQuantities::zero(), units(100)));
    }

    #[test]
    fn extreme_quantities_saturate_without_overflow() {
        let engine = engine();
        let q = MarketQuantities::new(units(1_000_000_000), Fixed::ZERO);
        let prices = engine.price(&q, Fixed::from_raw(S / 10)).unwrap();
        assert!(prices.yes > prices.no);
        assert!(engine.cost(&q, Fixed::from_raw(S / 10)).is_ok());
    }
}
