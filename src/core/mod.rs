mod allocator;
mod engine;
mod types;

pub use allocator::{Allocation, AllocationShape, allocate};
pub use engine::{SBTI_ANNUAL_REDUCTION_RATE, SBTI_NEAR_TERM_END_YEAR, compute_pathway};
pub use types::{
    Diagnostic, EmissionInput, HistoricalPoint, LongTermTarget, NearTermTarget, PathwayResult,
    ReductionModel, ValidationError, YearPoint,
};
