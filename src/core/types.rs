use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NearTermTarget {
    pub year: i32,
    pub annual_reduction_rate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LongTermTarget {
    pub year: i32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ReductionModel {
    Sbti,
    NationalStaged,
    CustomTwoPhase {
        near_term: NearTermTarget,
        long_term: LongTermTarget,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HistoricalPoint {
    pub year: i32,
    pub emissions: f64,
}

#[derive(Debug, Clone)]
pub struct EmissionInput {
    pub scope1: f64,
    pub scope2: f64,
    pub base_year: i32,
    pub target_year: i32,
    pub residual_emission_percentage: f64,
    pub historical_data: Vec<HistoricalPoint>,
    pub model: ReductionModel,
}

impl EmissionInput {
    pub fn baseline_emissions(&self) -> f64 {
        self.scope1 + self.scope2
    }

    pub fn residual_emissions(&self) -> f64 {
        self.baseline_emissions() * self.residual_emission_percentage / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub year: i32,
    pub emissions: f64,
    pub reduction: Option<f64>,
    pub target: Option<f64>,
    pub annual_reduction: Option<f64>,
    pub remaining_percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Diagnostic {
    /// The quadratic coefficient came out negative, so the removal curve is
    /// front-loaded instead of back-loaded. Recoverable; the amounts still
    /// sum to the phase total.
    InvertedShape {
        phase_start_year: i32,
        coefficient: f64,
    },
    /// The phase was asked to remove a non-positive total (the residual
    /// target is at or above the phase's starting emissions). The amount is
    /// split evenly across the phase years.
    NonPositiveRemainder {
        phase_start_year: i32,
        total_amount: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayResult {
    pub pathway: Vec<YearPoint>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("targetYear ({target_year}) must be greater than baseYear ({base_year})")]
    TargetYearNotAfterBaseYear { base_year: i32, target_year: i32 },
    #[error("residualEmissionPercentage must be between 0 and 100, got {value}")]
    ResidualPercentageOutOfRange { value: f64 },
    #[error("{field} must be a finite non-negative number, got {value}")]
    InvalidScopeEmissions { field: &'static str, value: f64 },
    #[error("baseline emissions (scope1 + scope2) must be greater than zero")]
    ZeroBaseline,
    #[error("historical year {year} must be before baseYear {base_year}")]
    HistoricalYearNotBeforeBaseYear { year: i32, base_year: i32 },
    #[error("historical emissions for year {year} must be finite and non-negative, got {value}")]
    InvalidHistoricalEmissions { year: i32, value: f64 },
    #[error(
        "nearTerm year {year} must lie strictly between baseYear {base_year} and targetYear {target_year}"
    )]
    NearTermYearOutOfRange {
        year: i32,
        base_year: i32,
        target_year: i32,
    },
    #[error("nearTerm annualReductionRate must be in [0, 1), got {value}")]
    NearTermRateOutOfRange { value: f64 },
    #[error("longTerm year {year} must equal targetYear {target_year}")]
    LongTermYearMismatch { year: i32, target_year: i32 },
}

impl EmissionInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("scope1", self.scope1), ("scope2", self.scope2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidScopeEmissions { field, value });
            }
        }

        if self.baseline_emissions() <= 0.0 {
            return Err(ValidationError::ZeroBaseline);
        }

        if self.target_year <= self.base_year {
            return Err(ValidationError::TargetYearNotAfterBaseYear {
                base_year: self.base_year,
                target_year: self.target_year,
            });
        }

        if !self.residual_emission_percentage.is_finite()
            || !(0.0..=100.0).contains(&self.residual_emission_percentage)
        {
            return Err(ValidationError::ResidualPercentageOutOfRange {
                value: self.residual_emission_percentage,
            });
        }

        for point in &self.historical_data {
            if point.year >= self.base_year {
                return Err(ValidationError::HistoricalYearNotBeforeBaseYear {
                    year: point.year,
                    base_year: self.base_year,
                });
            }
            if !point.emissions.is_finite() || point.emissions < 0.0 {
                return Err(ValidationError::InvalidHistoricalEmissions {
                    year: point.year,
                    value: point.emissions,
                });
            }
        }

        if let ReductionModel::CustomTwoPhase {
            near_term,
            long_term,
        } = self.model
        {
            if near_term.year <= self.base_year || near_term.year >= self.target_year {
                return Err(ValidationError::NearTermYearOutOfRange {
                    year: near_term.year,
                    base_year: self.base_year,
                    target_year: self.target_year,
                });
            }
            if !near_term.annual_reduction_rate.is_finite()
                || !(0.0..1.0).contains(&near_term.annual_reduction_rate)
            {
                return Err(ValidationError::NearTermRateOutOfRange {
                    value: near_term.annual_reduction_rate,
                });
            }
            if long_term.year != self.target_year {
                return Err(ValidationError::LongTermYearMismatch {
                    year: long_term.year,
                    target_year: self.target_year,
                });
            }
        }

        Ok(())
    }
}
