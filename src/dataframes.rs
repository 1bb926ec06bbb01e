//! Export the arrays of an equilibrium record as a `DataFrame`.
use polars::prelude::{DataFrame, NamedFrom, PolarsResult, Series};

use crate::record::EquilibriumRecord;

/// Put the five flux-surface profiles of `record` into a dataframe
///
/// The columns are `fpol`, `pres`, `ffprime`, `pprime` and `qpsi`, each with one
/// row per point of the uniform flux grid (`nw` rows). This returns an error if the
/// profiles do not all have the same length.
pub fn profiles_to_dataframe(record: &EquilibriumRecord) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new("fpol", record.fpol.as_slice()),
        Series::new("pres", record.pres.as_slice()),
        Series::new("ffprime", record.ffprime.as_slice()),
        Series::new("pprime", record.pprime.as_slice()),
        Series::new("qpsi", record.qpsi.as_slice()),
    ])
}

/// Put a boundary polyline into a dataframe with columns `r` and `z`
///
/// Use with `record.rbbbs`/`record.zbbbs` for the plasma boundary or
/// `record.rlim`/`record.zlim` for the limiter. This returns an error if `r` and
/// `z` differ in length.
pub fn boundary_to_dataframe(r: &[f64], z: &[f64]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new("r", r),
        Series::new("z", z),
    ])
}
