//! Implied interest rate of an amortized loan.
//!
//! Inverts the annuity formula `PV = PMT * (1 - (1+r)^-n) / r` for `r` with
//! Newton-Raphson. The solver is a small state machine
//! (seed → iterate → verify → accept or fallback) so that each transition
//! can be exercised on its own. A result that fails the present-value check
//! is replaced by a simple-interest approximation instead of surfacing an
//! error: a slightly approximate rate is preferable to no rate at all.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarFinanceError;
use crate::time_value::{compound_factor, discount_factor, present_value_of_annuity, MONTHS_PER_YEAR};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::SolarFinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_ITERATIONS: u32 = 100;

/// Newton stops once the step is smaller than this.
const STEP_TOLERANCE: Decimal = dec!(0.0000001);

/// Derivatives smaller than this are treated as flat.
const MIN_DERIVATIVE: Decimal = dec!(0.000000000001);

/// Maximum relative present-value error accepted from Newton.
const VERIFY_TOLERANCE: Decimal = dec!(0.01);

const SEED_CAP: Rate = dec!(0.5);
const SEED_WHEN_NON_POSITIVE: Rate = dec!(0.01);
const SEED_WHEN_TOO_HIGH: Rate = dec!(0.1);

const RESEED_LOW: Rate = dec!(0.001);
const RESEED_HIGH: Rate = dec!(0.5);

/// Monthly rate boundaries of the semaphore, in percent.
const SEMAPHORE_EXCELLENT_BELOW: Percent = dec!(1.5);
const SEMAPHORE_AVERAGE_UP_TO: Percent = dec!(2.0);

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// One amortized loan as quoted to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub financed_value: Money,
    pub installments: u32,
    pub installment_value: Money,
}

/// Three-level classification of a monthly interest rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSemaphore {
    Excellent,
    Average,
    Expensive,
}

/// Which path produced the reported rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMethod {
    /// Degenerate input or no markup over the financed value
    NoInterest,
    NewtonRaphson,
    SimpleInterestFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDetectionResult {
    pub monthly_rate_percent: Percent,
    /// Effective annual rate, `(1+r)^12 - 1`
    pub annual_rate_percent: Percent,
    /// `installment_value * installments - financed_value`
    pub total_interest: Money,
    pub semaphore: RateSemaphore,
    pub method: RateMethod,
    /// Newton steps taken (0 when the solver did not run)
    pub iterations: u32,
}

impl RateDetectionResult {
    fn no_interest() -> Self {
        Self {
            monthly_rate_percent: Decimal::ZERO,
            annual_rate_percent: Decimal::ZERO,
            total_interest: Decimal::ZERO,
            semaphore: RateSemaphore::Excellent,
            method: RateMethod::NoInterest,
            iterations: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Solver state machine
// ---------------------------------------------------------------------------

/// States of the annuity rate solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Seed,
    Iterate { rate: Rate, iteration: u32 },
    Verify { rate: Rate, iterations: u32 },
    Accept { rate: Rate, iterations: u32 },
    Fallback { rate: Rate, iterations: u32 },
}

impl SolverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SolverState::Accept { .. } | SolverState::Fallback { .. })
    }
}

/// Result of a single guarded Newton step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewtonStep {
    /// Step taken, keep iterating from the new rate
    Continue(Rate),
    /// Step below tolerance; the new rate is final
    Converged(Rate),
    /// Derivative flat or not representable; keep the current rate
    Stalled,
}

/// Newton-Raphson solver for the periodic rate of a level-payment loan.
///
/// Callers must have screened out degenerate loans (see [`detect_rate`]):
/// all three terms positive and total repaid above the financed value.
#[derive(Debug, Clone)]
pub struct AnnuityRateSolver {
    financed_value: Money,
    installments: u32,
    installment_value: Money,
}

impl AnnuityRateSolver {
    pub fn new(financed_value: Money, installments: u32, installment_value: Money) -> Self {
        Self {
            financed_value,
            installments,
            installment_value,
        }
    }

    fn total_paid(&self) -> Money {
        self.installment_value * Decimal::from(self.installments)
    }

    /// Closed-form approximation `2n(total - PV) / (PV(n+1))`, kept inside
    /// `(0, 0.5]`.
    pub fn seed(&self) -> Rate {
        let n = Decimal::from(self.installments);
        let raw = (dec!(2) * n * (self.total_paid() - self.financed_value))
            .checked_div(self.financed_value * (n + Decimal::ONE))
            .unwrap_or(Decimal::ZERO);

        if raw <= Decimal::ZERO {
            SEED_WHEN_NON_POSITIVE
        } else if raw > SEED_CAP {
            SEED_WHEN_TOO_HIGH
        } else {
            raw
        }
    }

    /// One Newton step on `f(r) = PMT * a(r) - PV`, with the result
    /// clamped into `(0, 1]`.
    pub fn step(&self, rate: Rate) -> NewtonStep {
        let n = Decimal::from(self.installments);
        if rate.is_zero() {
            return NewtonStep::Stalled;
        }
        let Some(discount) = discount_factor(rate, self.installments) else {
            return NewtonStep::Stalled;
        };
        let one_plus_r = Decimal::ONE + rate;

        let f = self.installment_value * (Decimal::ONE - discount) / rate - self.financed_value;

        // d/dr [(1 - v) / r] with v = (1+r)^-n
        let numerator = n * discount / one_plus_r * rate - (Decimal::ONE - discount);
        let Some(derivative) = rate
            .checked_mul(rate)
            .and_then(|r2| numerator.checked_div(r2))
            .and_then(|d| d.checked_mul(self.installment_value))
        else {
            return NewtonStep::Stalled;
        };
        if derivative.abs() < MIN_DERIVATIVE {
            return NewtonStep::Stalled;
        }

        let Some(delta) = f.checked_div(derivative) else {
            return NewtonStep::Stalled;
        };
        let mut next = rate - delta;
        if next <= Decimal::ZERO {
            next = RESEED_LOW;
        } else if next > Decimal::ONE {
            next = RESEED_HIGH;
        }

        if delta.abs() < STEP_TOLERANCE {
            NewtonStep::Converged(next)
        } else {
            NewtonStep::Continue(next)
        }
    }

    /// Recompute the present value at `rate` and reject it when the
    /// relative error exceeds 1%.
    pub fn verify(&self, rate: Rate, iterations: u32) -> SolarFinanceResult<Rate> {
        let relative_error = present_value_of_annuity(rate, self.installments, self.installment_value)
            .map(|pv| ((pv - self.financed_value) / self.financed_value).abs());

        match relative_error {
            Some(err) if err <= VERIFY_TOLERANCE => Ok(rate),
            Some(err) => Err(SolarFinanceError::ConvergenceFailure {
                function: "annuity_rate".into(),
                iterations,
                last_delta: err,
            }),
            None => Err(SolarFinanceError::ConvergenceFailure {
                function: "annuity_rate".into(),
                iterations,
                last_delta: Decimal::MAX,
            }),
        }
    }

    /// `total_interest / financed_value / installments`
    pub fn fallback_rate(&self) -> Rate {
        (self.total_paid() - self.financed_value) / self.financed_value
            / Decimal::from(self.installments)
    }

    pub fn transition(&self, state: SolverState) -> SolverState {
        match state {
            SolverState::Seed => SolverState::Iterate {
                rate: self.seed(),
                iteration: 0,
            },
            SolverState::Iterate { rate, iteration } if iteration >= MAX_ITERATIONS => {
                SolverState::Verify {
                    rate,
                    iterations: iteration,
                }
            }
            SolverState::Iterate { rate, iteration } => match self.step(rate) {
                NewtonStep::Continue(next) => SolverState::Iterate {
                    rate: next,
                    iteration: iteration + 1,
                },
                NewtonStep::Converged(next) => SolverState::Verify {
                    rate: next,
                    iterations: iteration + 1,
                },
                NewtonStep::Stalled => SolverState::Verify {
                    rate,
                    iterations: iteration,
                },
            },
            SolverState::Verify { rate, iterations } => match self.verify(rate, iterations) {
                Ok(rate) => SolverState::Accept { rate, iterations },
                Err(e) => {
                    tracing::debug!(
                        financed_value = %self.financed_value,
                        installments = self.installments,
                        installment_value = %self.installment_value,
                        error = %e,
                        "annuity rate rejected, using simple-interest approximation"
                    );
                    SolverState::Fallback {
                        rate: self.fallback_rate(),
                        iterations,
                    }
                }
            },
            terminal => terminal,
        }
    }

    /// Drive the state machine to a terminal state.
    pub fn solve(&self) -> SolverState {
        let mut state = SolverState::Seed;
        while !state.is_terminal() {
            state = self.transition(state);
        }
        state
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monthly rate semaphore: below 1.5% excellent, up to 2.0% average,
/// above that expensive.
pub fn classify_rate(monthly_rate_percent: Percent) -> RateSemaphore {
    if monthly_rate_percent < SEMAPHORE_EXCELLENT_BELOW {
        RateSemaphore::Excellent
    } else if monthly_rate_percent <= SEMAPHORE_AVERAGE_UP_TO {
        RateSemaphore::Average
    } else {
        RateSemaphore::Expensive
    }
}

/// Detect the monthly rate implied by a financed value, number of
/// installments and installment value.
///
/// Degenerate loans (any term non-positive, or total repaid not above the
/// financed value once rounded to cents) report a zero rate.
pub fn detect_rate(
    financed_value: Money,
    installments: u32,
    installment_value: Money,
) -> RateDetectionResult {
    if financed_value <= Decimal::ZERO || installments == 0 || installment_value <= Decimal::ZERO {
        return RateDetectionResult::no_interest();
    }

    let total_interest =
        (installment_value * Decimal::from(installments) - financed_value).round_dp(2);
    if total_interest <= Decimal::ZERO {
        return RateDetectionResult::no_interest();
    }

    let solver = AnnuityRateSolver::new(financed_value, installments, installment_value);
    let (rate, method, iterations) = match solver.solve() {
        SolverState::Accept { rate, iterations } => (rate, RateMethod::NewtonRaphson, iterations),
        SolverState::Fallback { rate, iterations } => {
            (rate, RateMethod::SimpleInterestFallback, iterations)
        }
        // solve() only returns terminal states
        _ => (solver.fallback_rate(), RateMethod::SimpleInterestFallback, 0),
    };

    let monthly_rate_percent = rate * dec!(100);
    let annual_rate_percent = compound_factor(rate, MONTHS_PER_YEAR)
        .and_then(|f| (f - Decimal::ONE).checked_mul(dec!(100)))
        .unwrap_or(Decimal::MAX);

    RateDetectionResult {
        monthly_rate_percent,
        annual_rate_percent,
        total_interest,
        semaphore: classify_rate(monthly_rate_percent),
        method,
        iterations,
    }
}

/// Rate detection wrapped in the standard computation envelope.
pub fn analyze_loan(terms: &LoanTerms) -> SolarFinanceResult<ComputationOutput<RateDetectionResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = detect_rate(terms.financed_value, terms.installments, terms.installment_value);

    if terms.financed_value <= Decimal::ZERO
        || terms.installments == 0
        || terms.installment_value <= Decimal::ZERO
    {
        warnings.push(
            "Financed value, installments and installment value must all be positive; \
             rate reported as 0"
                .into(),
        );
    } else {
        match result.method {
            RateMethod::NoInterest => warnings.push(
                "Installments do not exceed the financed value; no interest detected".into(),
            ),
            RateMethod::SimpleInterestFallback => warnings.push(
                "Newton-Raphson result failed the 1% present-value check; \
                 simple-interest approximation used"
                    .into(),
            ),
            RateMethod::NewtonRaphson => {}
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annuity rate inversion (Newton-Raphson with simple-interest fallback)",
        terms,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_repayment_has_no_interest() {
        let r = detect_rate(dec!(30000), 60, dec!(500));
        assert_eq!(r.monthly_rate_percent, Decimal::ZERO);
        assert_eq!(r.total_interest, Decimal::ZERO);
        assert_eq!(r.semaphore, RateSemaphore::Excellent);
        assert_eq!(r.method, RateMethod::NoInterest);
    }

    #[test]
    fn test_underpayment_has_no_interest() {
        let r = detect_rate(dec!(30000), 60, dec!(400));
        assert_eq!(r.monthly_rate_percent, Decimal::ZERO);
        assert_eq!(r.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_degenerate_inputs() {
        for (pv, n, pmt) in [
            (Decimal::ZERO, 48, dec!(100)),
            (dec!(-1000), 48, dec!(100)),
            (dec!(1000), 0, dec!(100)),
            (dec!(1000), 12, Decimal::ZERO),
            (dec!(1000), 12, dec!(-5)),
        ] {
            let r = detect_rate(pv, n, pmt);
            assert_eq!(r, RateDetectionResult::no_interest());
        }
    }

    #[test]
    fn test_one_percent_loan() {
        let r = detect_rate(dec!(30000), 48, dec!(789.91));
        assert_eq!(r.method, RateMethod::NewtonRaphson);
        assert!(
            (r.monthly_rate_percent - dec!(1.00)).abs() < dec!(0.01),
            "got {}",
            r.monthly_rate_percent
        );
        assert!(
            (r.annual_rate_percent - dec!(12.68)).abs() < dec!(0.05),
            "got {}",
            r.annual_rate_percent
        );
        assert_eq!(r.total_interest, dec!(7915.68));
        assert_eq!(r.semaphore, RateSemaphore::Excellent);
    }

    #[test]
    fn test_semaphore_thresholds() {
        assert_eq!(classify_rate(dec!(1.49)), RateSemaphore::Excellent);
        assert_eq!(classify_rate(dec!(1.5)), RateSemaphore::Average);
        assert_eq!(classify_rate(dec!(2.0)), RateSemaphore::Average);
        assert_eq!(classify_rate(dec!(2.01)), RateSemaphore::Expensive);
    }

    #[test]
    fn test_seed_clamping() {
        // 2*48*7915.68 / (30000*49) ≈ 0.517 > 0.5 => 0.1
        let solver = AnnuityRateSolver::new(dec!(30000), 48, dec!(789.91));
        assert_eq!(solver.seed(), dec!(0.1));

        // 2*12*12 / (1200*13) ≈ 0.0185 stays as is
        let solver = AnnuityRateSolver::new(dec!(1200), 12, dec!(101));
        let seed = solver.seed();
        assert!(seed > Decimal::ZERO && seed < dec!(0.02), "got {seed}");

        // Non-positive raw guess => 0.01
        let solver = AnnuityRateSolver::new(dec!(1200), 12, dec!(100));
        assert_eq!(solver.seed(), dec!(0.01));
    }

    #[test]
    fn test_step_reseeds_negative_rate() {
        // From 0.5 the tangent of this low-rate loan crosses zero far left
        let solver = AnnuityRateSolver::new(dec!(30000), 48, dec!(700));
        match solver.step(dec!(0.5)) {
            NewtonStep::Continue(r) | NewtonStep::Converged(r) => {
                assert!(r > Decimal::ZERO && r <= Decimal::ONE, "got {r}");
            }
            NewtonStep::Stalled => panic!("step should not stall"),
        }
    }

    #[test]
    fn test_step_survives_long_terms_at_high_rates() {
        // (1 + 1)^600 is not representable but its reciprocal underflows to 0
        let solver = AnnuityRateSolver::new(dec!(1000), 600, dec!(10));
        assert_eq!(solver.step(Decimal::ONE), NewtonStep::Continue(RESEED_LOW));
    }

    #[test]
    fn test_low_rate_over_thirty_years() {
        // Seed lands near 38% where the discount factor vanishes
        let solver = AnnuityRateSolver::new(dec!(30000), 360, dec!(99.27));
        assert!(solver.seed() > dec!(0.3));
        assert!(solver.verify(dec!(0.001), 1).is_ok());

        let r = detect_rate(dec!(30000), 360, dec!(99.27));
        assert_eq!(r.method, RateMethod::NewtonRaphson);
        assert!((r.monthly_rate_percent - dec!(0.10)).abs() < dec!(0.005), "got {}", r.monthly_rate_percent);
    }

    #[test]
    fn test_transitions_reach_accept() {
        let solver = AnnuityRateSolver::new(dec!(30000), 48, dec!(789.91));
        let state = solver.transition(SolverState::Seed);
        assert_eq!(
            state,
            SolverState::Iterate {
                rate: dec!(0.1),
                iteration: 0
            }
        );
        match solver.solve() {
            SolverState::Accept { rate, iterations } => {
                assert!((rate - dec!(0.01)).abs() < dec!(0.0001));
                assert!(iterations > 0 && iterations <= MAX_ITERATIONS);
            }
            other => panic!("expected Accept, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_rejects_wrong_rate() {
        let solver = AnnuityRateSolver::new(dec!(30000), 48, dec!(789.91));
        assert!(solver.verify(dec!(0.01), 5).is_ok());
        let err = solver.verify(dec!(0.02), 5).unwrap_err();
        assert!(matches!(err, SolarFinanceError::ConvergenceFailure { iterations: 5, .. }));
    }

    #[test]
    fn test_verify_failure_falls_back_to_simple_interest() {
        let solver = AnnuityRateSolver::new(dec!(30000), 48, dec!(789.91));
        let state = solver.transition(SolverState::Verify {
            rate: dec!(0.05),
            iterations: 3,
        });
        let expected = dec!(7915.68) / dec!(30000) / dec!(48);
        assert_eq!(
            state,
            SolverState::Fallback {
                rate: expected,
                iterations: 3
            }
        );
    }

    #[test]
    fn test_fallback_is_used_beyond_rate_ceiling() {
        // A single installment of three times the principal implies 200%
        // per month, outside the solver's clamp range.
        let r = detect_rate(dec!(1000), 1, dec!(3000));
        assert_eq!(r.method, RateMethod::SimpleInterestFallback);
        assert_eq!(r.monthly_rate_percent, dec!(200));
        assert_eq!(r.semaphore, RateSemaphore::Expensive);
    }

    #[test]
    fn test_iteration_cap_goes_to_verify() {
        let solver = AnnuityRateSolver::new(dec!(30000), 48, dec!(789.91));
        let state = solver.transition(SolverState::Iterate {
            rate: dec!(0.01),
            iteration: MAX_ITERATIONS,
        });
        assert_eq!(
            state,
            SolverState::Verify {
                rate: dec!(0.01),
                iterations: MAX_ITERATIONS
            }
        );
    }

    #[test]
    fn test_analyze_loan_warnings() {
        let out = analyze_loan(&LoanTerms {
            financed_value: dec!(30000),
            installments: 60,
            installment_value: dec!(500),
        })
        .unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("no interest"));

        let out = analyze_loan(&LoanTerms {
            financed_value: dec!(30000),
            installments: 48,
            installment_value: dec!(789.91),
        })
        .unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.result.method, RateMethod::NewtonRaphson);
    }
}
