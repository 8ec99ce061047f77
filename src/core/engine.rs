use super::allocator::{self, AllocationShape};
use super::types::{
    Diagnostic, EmissionInput, PathwayResult, ReductionModel, ValidationError, YearPoint,
};

pub const SBTI_ANNUAL_REDUCTION_RATE: f64 = 0.042;
pub const SBTI_NEAR_TERM_END_YEAR: i32 = 2030;

/// Cumulative-reduction milestones mandated by the national staged model.
const NATIONAL_MILESTONES: [(i32, f64); 3] = [(2030, 0.28), (2032, 0.32), (2035, 0.38)];

/// Fallback first-year anchor when a long-term phase has no preceding decay
/// year to take its continuity floor from.
const MIN_REDUCTION_RATIO: f64 = 0.3;

pub fn compute_pathway(input: &EmissionInput) -> Result<PathwayResult, ValidationError> {
    input.validate()?;

    let baseline = input.baseline_emissions();
    let residual = input.residual_emissions();

    let (model_rows, diagnostics) = match input.model {
        ReductionModel::Sbti => sbti_phases(input, baseline, residual),
        ReductionModel::NationalStaged => (
            staged_milestone_phase(input.base_year, input.target_year, baseline, residual),
            Vec::new(),
        ),
        ReductionModel::CustomTwoPhase { near_term, .. } => {
            two_phase_rows(
                input,
                baseline,
                residual,
                near_term.annual_reduction_rate,
                near_term.year,
            )
        }
    };

    Ok(assemble_pathway(input, baseline, residual, model_rows, diagnostics))
}

fn model_row(year: i32, emissions: f64, baseline: f64) -> YearPoint {
    YearPoint {
        year,
        emissions,
        reduction: Some((baseline - emissions) / baseline * 100.0),
        target: Some(emissions),
        annual_reduction: None,
        remaining_percentage: None,
    }
}

fn geometric_decay_phase(
    baseline: f64,
    start_emissions: f64,
    rate: f64,
    from_year: i32,
    to_year: i32,
) -> Vec<YearPoint> {
    let mut rows = Vec::new();
    let mut emissions = start_emissions;
    for year in (from_year + 1)..=to_year {
        emissions *= 1.0 - rate;
        rows.push(model_row(year, emissions, baseline));
    }
    rows
}

fn sbti_phases(
    input: &EmissionInput,
    baseline: f64,
    residual: f64,
) -> (Vec<YearPoint>, Vec<Diagnostic>) {
    // Plans starting at or after 2030 have no near-term decay segment and go
    // straight to the long-term phase.
    let near_end = input
        .target_year
        .min(SBTI_NEAR_TERM_END_YEAR)
        .max(input.base_year);
    let rows = geometric_decay_phase(
        baseline,
        baseline,
        SBTI_ANNUAL_REDUCTION_RATE,
        input.base_year,
        near_end,
    );

    if input.target_year <= near_end {
        return (rows, Vec::new());
    }

    append_allocator_phase(rows, baseline, residual, near_end, input.target_year)
}

fn two_phase_rows(
    input: &EmissionInput,
    baseline: f64,
    residual: f64,
    near_term_rate: f64,
    near_term_year: i32,
) -> (Vec<YearPoint>, Vec<Diagnostic>) {
    let rows = geometric_decay_phase(
        baseline,
        baseline,
        near_term_rate,
        input.base_year,
        near_term_year,
    );
    append_allocator_phase(rows, baseline, residual, near_term_year, input.target_year)
}

fn append_allocator_phase(
    mut rows: Vec<YearPoint>,
    baseline: f64,
    residual: f64,
    phase_boundary_year: i32,
    target_year: i32,
) -> (Vec<YearPoint>, Vec<Diagnostic>) {
    let start_year = phase_boundary_year + 1;
    let start_emissions = rows.last().map(|row| row.emissions).unwrap_or(baseline);
    let duration = (target_year - phase_boundary_year) as u32;

    let shape = match final_annual_removal(&rows, baseline) {
        Some(floor) => AllocationShape::ContinuityFloor(floor),
        None => AllocationShape::MinReductionRatio(MIN_REDUCTION_RATIO),
    };

    let allocation = allocator::allocate(duration, start_emissions - residual, shape, start_year);

    let mut emissions = start_emissions;
    for (offset, amount) in allocation.amounts.iter().enumerate() {
        emissions -= amount;
        rows.push(model_row(start_year + offset as i32, emissions, baseline));
    }

    (rows, allocation.diagnostics)
}

fn final_annual_removal(rows: &[YearPoint], baseline: f64) -> Option<f64> {
    match rows {
        [] => None,
        [only] => Some(baseline - only.emissions),
        [.., prev, last] => Some(prev.emissions - last.emissions),
    }
}

fn staged_milestone_phase(
    base_year: i32,
    target_year: i32,
    baseline: f64,
    residual: f64,
) -> Vec<YearPoint> {
    let final_fraction = (baseline - residual) / baseline;

    let mut knots = vec![(base_year, 0.0)];
    for (year, fraction) in NATIONAL_MILESTONES {
        if year > base_year && year < target_year {
            knots.push((year, fraction));
        }
    }
    knots.push((target_year, final_fraction));

    let mut rows = Vec::with_capacity((target_year - base_year) as usize);
    for year in (base_year + 1)..=target_year {
        let emissions = if year == target_year {
            // Pinned directly; interpolation never decides the endpoint.
            residual
        } else {
            let fraction = interpolate_fraction(&knots, year);
            (baseline * (1.0 - fraction)).max(residual)
        };
        rows.push(model_row(year, emissions, baseline));
    }
    rows
}

fn interpolate_fraction(knots: &[(i32, f64)], year: i32) -> f64 {
    for pair in knots.windows(2) {
        let (start_year, start_fraction) = pair[0];
        let (end_year, end_fraction) = pair[1];
        if year >= start_year && year <= end_year {
            let span = (end_year - start_year) as f64;
            let progress = (year - start_year) as f64 / span;
            return start_fraction + (end_fraction - start_fraction) * progress;
        }
    }
    knots.last().map(|&(_, fraction)| fraction).unwrap_or(0.0)
}

fn assemble_pathway(
    input: &EmissionInput,
    baseline: f64,
    residual: f64,
    model_rows: Vec<YearPoint>,
    diagnostics: Vec<Diagnostic>,
) -> PathwayResult {
    let mut historical = input.historical_data.clone();
    historical.sort_by_key(|point| point.year);

    let mut pathway: Vec<YearPoint> = historical
        .iter()
        .map(|point| YearPoint {
            year: point.year,
            emissions: point.emissions,
            reduction: None,
            target: None,
            annual_reduction: None,
            remaining_percentage: None,
        })
        .collect();

    pathway.push(model_row(input.base_year, baseline, baseline));
    pathway.extend(model_rows);

    for index in 0..pathway.len() {
        if index > 0 {
            pathway[index].annual_reduction =
                Some(pathway[index - 1].emissions - pathway[index].emissions);
        }
        if pathway[index].year >= input.base_year {
            pathway[index].remaining_percentage =
                Some(pathway[index].emissions / baseline * 100.0);
        }
    }

    // Rounding drift accumulated across phases must never reach the endpoint
    // the user configured.
    let pinned = residual.round();
    if let Some(index) = pathway
        .iter()
        .position(|row| row.year == input.target_year)
    {
        if pathway[index].emissions != pinned {
            pathway[index].emissions = pinned;
            pathway[index].reduction = Some((baseline - pinned) / baseline * 100.0);
            pathway[index].target = Some(pinned);
            pathway[index].remaining_percentage = Some(pinned / baseline * 100.0);
            if index > 0 {
                pathway[index].annual_reduction =
                    Some(pathway[index - 1].emissions - pinned);
            }
        }
    }

    PathwayResult {
        pathway,
        diagnostics,
    }
}
