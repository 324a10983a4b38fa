pub mod amortization;
pub mod rate_solver;
