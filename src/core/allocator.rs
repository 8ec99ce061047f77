use super::types::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationShape {
    /// Anchor the first year's removal at the previous phase's final annual
    /// removal so the curve continues without a kink.
    ContinuityFloor(f64),
    /// Anchor the first year's removal at `ratio` times the flat per-year
    /// average; the quadratic term covers the rest.
    MinReductionRatio(f64),
    /// No shape information: removals proportional to `t^2 + 1`.
    Proportional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub amounts: Vec<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Splits `total_amount` into one removal amount per year over `duration`
/// years, shaped small-early/large-late as `r(t) = a*t^2 + b`. The last
/// element absorbs the floating-point remainder, so the amounts always sum
/// to `total_amount` exactly.
pub fn allocate(
    duration: u32,
    total_amount: f64,
    shape: AllocationShape,
    phase_start_year: i32,
) -> Allocation {
    if duration == 0 {
        return Allocation {
            amounts: Vec::new(),
            diagnostics: Vec::new(),
        };
    }

    if duration == 1 {
        return Allocation {
            amounts: vec![total_amount],
            diagnostics: Vec::new(),
        };
    }

    let years = duration as f64;

    if total_amount <= 0.0 {
        // Residual target at or above the phase start; spread evenly and
        // surface it instead of inventing a correction.
        return force_exact_sum(
            vec![total_amount / years; duration as usize],
            total_amount,
            vec![Diagnostic::NonPositiveRemainder {
                phase_start_year,
                total_amount,
            }],
        );
    }

    let mut diagnostics = Vec::new();
    let amounts = match shape {
        AllocationShape::ContinuityFloor(floor) => {
            let b = floor.max(0.0);
            // t runs 0..D-1 so r(0) lands exactly on the continuity floor.
            let sum_squares = (years - 1.0) * years * (2.0 * years - 1.0) / 6.0;
            let a = (total_amount - years * b) / sum_squares;
            if a < 0.0 {
                diagnostics.push(Diagnostic::InvertedShape {
                    phase_start_year,
                    coefficient: a,
                });
            }
            (0..duration).map(|t| a * (t as f64).powi(2) + b).collect()
        }
        AllocationShape::MinReductionRatio(ratio) => {
            let min_reduction = ratio.max(0.0) * (total_amount / years);
            // t runs 1..=D; solve r(1) = min_reduction together with the sum
            // constraint.
            let sum_squares = years * (years + 1.0) * (2.0 * years + 1.0) / 6.0;
            let a = (total_amount - years * min_reduction) / (sum_squares - years);
            let b = min_reduction - a;
            if a < 0.0 {
                diagnostics.push(Diagnostic::InvertedShape {
                    phase_start_year,
                    coefficient: a,
                });
            }
            (1..=duration).map(|t| a * (t as f64).powi(2) + b).collect()
        }
        AllocationShape::Proportional => {
            let weight_sum: f64 = (1..=duration).map(|t| (t as f64).powi(2) + 1.0).sum();
            let scale = total_amount / weight_sum;
            (1..=duration)
                .map(|t| scale * ((t as f64).powi(2) + 1.0))
                .collect()
        }
    };

    force_exact_sum(amounts, total_amount, diagnostics)
}

fn force_exact_sum(
    mut amounts: Vec<f64>,
    total_amount: f64,
    diagnostics: Vec<Diagnostic>,
) -> Allocation {
    let sum: f64 = amounts.iter().sum();
    let diff = total_amount - sum;
    if let Some(last) = amounts.last_mut() {
        *last += diff;
    }
    Allocation {
        amounts,
        diagnostics,
    }
}
