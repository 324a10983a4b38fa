//! Bisection over a monotone function.
//!
//! The reverse sizing engine never inverts its formulas in closed form:
//! installment and cashflow are monotone in system power on the searched
//! interval, so bisection over power finds the size that hits a target.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Interval-width tolerance.
const SEARCH_TOLERANCE: Decimal = dec!(0.000001);

/// Maximum bisection iterations.
const SEARCH_MAX_ITER: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found {
        /// Midpoint of the final bracket
        x: Decimal,
        /// Bracket end with `f(x) <= target`
        x_below: Decimal,
        /// Bracket end with `f(x) >= target`
        x_above: Decimal,
        iterations: u32,
    },
    /// `f(lower)` and `f(upper)` lie on the same side of the target
    NotBracketed {
        at_lower: Decimal,
        at_upper: Decimal,
    },
}

impl SearchOutcome {
    pub fn found(&self) -> Option<Decimal> {
        match self {
            SearchOutcome::Found { x, .. } => Some(*x),
            SearchOutcome::NotBracketed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonotoneSearch {
    pub lower: Decimal,
    pub upper: Decimal,
    pub tolerance: Decimal,
    pub max_iterations: u32,
}

impl MonotoneSearch {
    pub fn new(lower: Decimal, upper: Decimal) -> Self {
        Self {
            lower: lower.min(upper),
            upper: upper.max(lower),
            tolerance: SEARCH_TOLERANCE,
            max_iterations: SEARCH_MAX_ITER,
        }
    }

    /// Find `x` in `[lower, upper]` with `f(x) = target`. `f` may be
    /// increasing or decreasing; the direction is read from the endpoints.
    pub fn solve<F>(&self, f: F, target: Decimal) -> SearchOutcome
    where
        F: Fn(Decimal) -> Decimal,
    {
        let at_lower = f(self.lower);
        let at_upper = f(self.upper);

        if at_lower == target {
            return exact(self.lower, 0);
        }
        if at_upper == target {
            return exact(self.upper, 0);
        }
        if (at_lower > target) == (at_upper > target) {
            return SearchOutcome::NotBracketed { at_lower, at_upper };
        }

        let increasing = at_lower < target;
        // `below` always satisfies f <= target, `above` f >= target
        let (mut below, mut above) = if increasing {
            (self.lower, self.upper)
        } else {
            (self.upper, self.lower)
        };

        for i in 1..=self.max_iterations {
            let mid = (below + above) / dec!(2);
            let value = f(mid);
            if value == target {
                return exact(mid, i);
            }
            if value < target {
                below = mid;
            } else {
                above = mid;
            }
            if (above - below).abs() < self.tolerance {
                return SearchOutcome::Found {
                    x: (below + above) / dec!(2),
                    x_below: below,
                    x_above: above,
                    iterations: i,
                };
            }
        }

        SearchOutcome::Found {
            x: (below + above) / dec!(2),
            x_below: below,
            x_above: above,
            iterations: self.max_iterations,
        }
    }
}

fn exact(x: Decimal, iterations: u32) -> SearchOutcome {
    SearchOutcome::Found {
        x,
        x_below: x,
        x_above: x,
        iterations,
    }
}
