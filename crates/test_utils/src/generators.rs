//! Property-Based Test Generators
//!
//! proptest strategies for claim inputs that respect the intake rules, plus
//! a few that deliberately break them.

use chrono::{Days, NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_claims::{DecisionAction, RiskLevel};

/// Positive INR amounts in paise, up to ₹10 crore
pub fn positive_inr_strategy() -> impl Strategy<Value = Money> {
    (1i64..10_000_000_000i64).prop_map(|paise| Money::inr(Decimal::new(paise, 2)))
}

/// INR amounts no larger than `coverage`
pub fn amount_within_strategy(coverage: Money) -> impl Strategy<Value = Money> {
    let ceiling: i64 = (coverage.amount() * Decimal::ONE_HUNDRED)
        .trunc()
        .try_into()
        .unwrap_or(i64::MAX)
        .max(1);
    (1i64..=ceiling).prop_map(|paise| Money::inr(Decimal::new(paise, 2)))
}

/// INR amounts strictly above `coverage`
pub fn amount_over_strategy(coverage: Money) -> impl Strategy<Value = Money> {
    (1i64..1_000_000_000i64)
        .prop_map(move |paise| Money::new(coverage.amount() + Decimal::new(paise, 2), Currency::INR))
}

/// Zero or negative amounts, always refused at intake
pub fn non_positive_amount_strategy() -> impl Strategy<Value = Money> {
    (-1_000_000_000i64..=0i64).prop_map(|paise| Money::inr(Decimal::new(paise, 2)))
}

/// Well-formed registry ids: `ABDM` and nine digits
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    "ABDM[0-9]{9}"
}

/// Strings that are not registry ids
pub fn malformed_record_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "ABDM[0-9]{1,8}",
        "ABDM[0-9]{10,14}",
        "[a-z]{4}[0-9]{9}",
        "[A-Z]{2}[0-9]{9}",
    ]
}

/// Incident dates from today back one year
pub fn incident_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..365).prop_map(|days_ago| Utc::now().date_naive() - Days::new(days_ago))
}

/// Valid IFSC codes: four letters, a zero, six alphanumerics
pub fn ifsc_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{4}0[A-Z0-9]{6}"
}

pub fn decision_strategy() -> impl Strategy<Value = DecisionAction> {
    prop_oneof![Just(DecisionAction::Approve), Just(DecisionAction::Reject)]
}

pub fn risk_level_strategy() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![
        Just(RiskLevel::Low),
        Just(RiskLevel::Medium),
        Just(RiskLevel::High),
        Just(RiskLevel::Critical),
    ]
}

/// Analysis backend replies in the structured shape, with any field values
pub fn structured_reply_strategy() -> impl Strategy<Value = String> {
    (
        -50i64..200,
        risk_level_strategy(),
        any::<bool>(),
        -50i64..200,
    )
        .prop_map(|(score, level, valid, confidence)| {
            serde_json::json!({
                "fraudScore": score,
                "riskLevel": level.as_str(),
                "isValidClaim": valid,
                "confidence": confidence,
                "summary": "generated",
            })
            .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_claims::analysis::parse_verdict;
    use domain_claims::{BankAccount, RecordId};

    use crate::assertions::assert_verdict_well_formed;
    use crate::fixtures::MoneyFixtures;

    proptest! {
        #[test]
        fn generated_amounts_stay_within_coverage(amount in amount_within_strategy(MoneyFixtures::coverage())) {
            prop_assert!(amount.is_positive());
            prop_assert!(amount.is_within(&MoneyFixtures::coverage()).unwrap());
        }

        #[test]
        fn generated_amounts_exceed_coverage(amount in amount_over_strategy(MoneyFixtures::coverage())) {
            prop_assert!(!amount.is_within(&MoneyFixtures::coverage()).unwrap());
        }

        #[test]
        fn generated_record_ids_parse(id in record_id_strategy()) {
            prop_assert!(RecordId::parse(&id).is_ok());
        }

        #[test]
        fn malformed_record_ids_are_refused(id in malformed_record_id_strategy()) {
            prop_assert!(RecordId::parse(&id).is_err());
        }

        #[test]
        fn generated_ifsc_codes_validate(ifsc in ifsc_strategy()) {
            let account = BankAccount::new("Priya Sharma", "50100012345678", ifsc);
            prop_assert!(account.validate().is_ok());
        }

        #[test]
        fn structured_replies_yield_bounded_verdicts(reply in structured_reply_strategy()) {
            let verdict = parse_verdict(&reply);
            assert_verdict_well_formed(&verdict);
        }
    }
}
