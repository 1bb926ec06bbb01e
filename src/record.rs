//! The in-memory form of a G-EQDSK equilibrium.
//!
//! A file maps onto an [`EquilibriumRecord`] by position, not by name: the 20 scalar
//! slots, the profile arrays, the flux grid and the two boundary polylines are always
//! read and written in the same order. That order is held in [`SCALAR_LAYOUT`] and in
//! the codec functions in [`crate::de`] and [`crate::ser`].
//!
//! ```
//! # use geqdsk::record::{EquilibriumRecord, ScalarSlot};
//! let mut rec = EquilibriumRecord::new(3, 4);
//! rec.set_scalar(ScalarSlot::Bcentr, -2.1);
//! assert_eq!(rec.scalars.bcentr, -2.1);
//! assert_eq!(rec.psirz.nrows(), 3);
//! assert_eq!(rec.psirz.ncols(), 4);
//! ```
use std::fmt::Display;

use crate::eqdsk_error::{EError, EResult};

/// Contents of the first line of a file: the free-text case label and the three
/// trailing integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub case: Vec<String>,
    pub idum: i64,
    pub nw: usize,
    pub nh: usize,
}

/// Names of the scalar values stored in the scalar block.
///
/// Several names occupy more than one slot in [`SCALAR_LAYOUT`]; see there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarSlot {
    Rdim,
    Zdim,
    Rcentr,
    Rleft,
    Zmid,
    Rmaxis,
    Zmaxis,
    Simag,
    Sibry,
    Bcentr,
    Current,
    Xdum,
}

impl Display for ScalarSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ScalarSlot {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarSlot::Rdim => "rdim",
            ScalarSlot::Zdim => "zdim",
            ScalarSlot::Rcentr => "rcentr",
            ScalarSlot::Rleft => "rleft",
            ScalarSlot::Zmid => "zmid",
            ScalarSlot::Rmaxis => "rmaxis",
            ScalarSlot::Zmaxis => "zmaxis",
            ScalarSlot::Simag => "simag",
            ScalarSlot::Sibry => "sibry",
            ScalarSlot::Bcentr => "bcentr",
            ScalarSlot::Current => "current",
            ScalarSlot::Xdum => "xdum",
        }
    }
}

/// The on-disk order of the 20 values in the scalar block.
///
/// `simag`, `rmaxis`, `zmaxis` and `sibry` appear twice and `xdum` five times. When
/// reading, the last occurrence of a name sets its value; when writing, every slot
/// gets the one stored value.
pub const SCALAR_LAYOUT: [ScalarSlot; 20] = [
    ScalarSlot::Rdim, ScalarSlot::Zdim, ScalarSlot::Rcentr, ScalarSlot::Rleft, ScalarSlot::Zmid,
    ScalarSlot::Rmaxis, ScalarSlot::Zmaxis, ScalarSlot::Simag, ScalarSlot::Sibry, ScalarSlot::Bcentr,
    ScalarSlot::Current, ScalarSlot::Simag, ScalarSlot::Xdum, ScalarSlot::Rmaxis, ScalarSlot::Xdum,
    ScalarSlot::Zmaxis, ScalarSlot::Xdum, ScalarSlot::Sibry, ScalarSlot::Xdum, ScalarSlot::Xdum,
];

/// The geometry and field scalars of an equilibrium.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scalars {
    pub rdim: f64,
    pub zdim: f64,
    pub rcentr: f64,
    pub rleft: f64,
    pub zmid: f64,
    pub rmaxis: f64,
    pub zmaxis: f64,
    pub simag: f64,
    pub sibry: f64,
    pub bcentr: f64,
    pub current: f64,
    pub xdum: f64,
}

impl Scalars {
    pub fn get(&self, slot: ScalarSlot) -> f64 {
        match slot {
            ScalarSlot::Rdim => self.rdim,
            ScalarSlot::Zdim => self.zdim,
            ScalarSlot::Rcentr => self.rcentr,
            ScalarSlot::Rleft => self.rleft,
            ScalarSlot::Zmid => self.zmid,
            ScalarSlot::Rmaxis => self.rmaxis,
            ScalarSlot::Zmaxis => self.zmaxis,
            ScalarSlot::Simag => self.simag,
            ScalarSlot::Sibry => self.sibry,
            ScalarSlot::Bcentr => self.bcentr,
            ScalarSlot::Current => self.current,
            ScalarSlot::Xdum => self.xdum,
        }
    }

    pub fn set(&mut self, slot: ScalarSlot, value: f64) {
        let field = match slot {
            ScalarSlot::Rdim => &mut self.rdim,
            ScalarSlot::Zdim => &mut self.zdim,
            ScalarSlot::Rcentr => &mut self.rcentr,
            ScalarSlot::Rleft => &mut self.rleft,
            ScalarSlot::Zmid => &mut self.zmid,
            ScalarSlot::Rmaxis => &mut self.rmaxis,
            ScalarSlot::Zmaxis => &mut self.zmaxis,
            ScalarSlot::Simag => &mut self.simag,
            ScalarSlot::Sibry => &mut self.sibry,
            ScalarSlot::Bcentr => &mut self.bcentr,
            ScalarSlot::Current => &mut self.current,
            ScalarSlot::Xdum => &mut self.xdum,
        };
        *field = value;
    }
}

/// A 2D array stored row-major: element `(i, j)` lives at flat index `i * ncols + j`.
///
/// This is the order `psirz` has on disk, with rows along `nw` and the `nh` index
/// varying fastest.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FluxGrid {
    nrows: usize,
    ncols: usize,
    values: Vec<f64>,
}

impl FluxGrid {
    /// Create a grid of zeros.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self { nrows, ncols, values: vec![0.0; nrows * ncols] }
    }

    /// Wrap a flat row-major vector. Returns `None` if its length is not `nrows * ncols`.
    pub fn from_flat(nrows: usize, ncols: usize, values: Vec<f64>) -> Option<Self> {
        if values.len() == nrows * ncols {
            Some(Self { nrows, ncols, values })
        } else {
            None
        }
    }

    /// Build a grid from rows, which must all have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Option<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut values = Vec::with_capacity(nrows * ncols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != ncols {
                return None;
            }
            values.extend_from_slice(row);
        }
        Some(Self { nrows, ncols, values })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.nrows && j < self.ncols {
            self.values.get(i * self.ncols + j).copied()
        } else {
            None
        }
    }

    /// Set element `(i, j)`.
    ///
    /// # Panics
    /// Panics if `(i, j)` is outside the grid.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.nrows && j < self.ncols, "index ({i}, {j}) out of bounds for a {}x{} grid", self.nrows, self.ncols);
        self.values[i * self.ncols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Iterate over the rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.nrows).map(move |i| self.row(i))
    }

    /// The values in on-disk order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn push_row(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.ncols);
        self.values.extend(row);
        self.nrows += 1;
    }

    pub(crate) fn with_row_capacity(nrows: usize, ncols: usize) -> Self {
        Self { nrows: 0, ncols, values: Vec::with_capacity(nrows.saturating_mul(ncols).min(1 << 20)) }
    }
}

/// The plasma boundary and limiter polylines as read from the end of a file.
///
/// A count of zero or less is kept as read, while its `r`/`z` arrays hold the single
/// placeholder point `[0.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundaries {
    pub nbbbs: i64,
    pub limitr: i64,
    pub rbbbs: Vec<f64>,
    pub zbbbs: Vec<f64>,
    pub rlim: Vec<f64>,
    pub zlim: Vec<f64>,
}

/// A complete G-EQDSK equilibrium.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquilibriumRecord {
    /// Free-text case label from the header. Not written back out.
    pub case: Vec<String>,
    /// Third-to-last integer of the header. Not written back out.
    pub idum: i64,
    pub nw: usize,
    pub nh: usize,
    pub scalars: Scalars,
    pub fpol: Vec<f64>,
    pub pres: Vec<f64>,
    pub ffprime: Vec<f64>,
    pub pprime: Vec<f64>,
    pub psirz: FluxGrid,
    pub qpsi: Vec<f64>,
    pub nbbbs: i64,
    pub limitr: i64,
    pub rbbbs: Vec<f64>,
    pub zbbbs: Vec<f64>,
    pub rlim: Vec<f64>,
    pub zlim: Vec<f64>,
}

impl EquilibriumRecord {
    /// Create an all-zero record on an `nw` by `nh` grid with placeholder boundaries.
    pub fn new(nw: usize, nh: usize) -> Self {
        Self {
            case: vec![],
            idum: 0,
            nw,
            nh,
            scalars: Scalars::default(),
            fpol: vec![0.0; nw],
            pres: vec![0.0; nw],
            ffprime: vec![0.0; nw],
            pprime: vec![0.0; nw],
            psirz: FluxGrid::new(nw, nh),
            qpsi: vec![0.0; nw],
            nbbbs: 0,
            limitr: 0,
            rbbbs: vec![0.0],
            zbbbs: vec![0.0],
            rlim: vec![0.0],
            zlim: vec![0.0],
        }
    }

    pub fn scalar(&self, slot: ScalarSlot) -> f64 {
        self.scalars.get(slot)
    }

    pub fn set_scalar(&mut self, slot: ScalarSlot, value: f64) {
        self.scalars.set(slot, value)
    }

    /// Replace the plasma boundary, keeping `nbbbs` in step with it.
    pub fn set_plasma_boundary(&mut self, r: Vec<f64>, z: Vec<f64>) {
        self.nbbbs = r.len() as i64;
        self.rbbbs = r;
        self.zbbbs = z;
    }

    /// Replace the limiter, keeping `limitr` in step with it.
    pub fn set_limiter(&mut self, r: Vec<f64>, z: Vec<f64>) {
        self.limitr = r.len() as i64;
        self.rlim = r;
        self.zlim = z;
    }

    /// `true` if the file declared a plasma boundary, i.e. `rbbbs`/`zbbbs` are not the placeholder.
    pub fn has_plasma_boundary(&self) -> bool {
        self.nbbbs > 0
    }

    /// `true` if the file declared a limiter, i.e. `rlim`/`zlim` are not the placeholder.
    pub fn has_limiter(&self) -> bool {
        self.limitr > 0
    }

    /// The `(nbbbs, limitr)` counts a serializer will write for this record.
    ///
    /// These are the lengths of the stored arrays, so a record holding the placeholder
    /// boundary reports 1 even though `nbbbs` is 0.
    pub fn written_boundary_counts(&self) -> (usize, usize) {
        (self.rbbbs.len(), self.rlim.len())
    }

    /// Check that every array has the length the record's dimensions require and that
    /// no value is infinite.
    pub fn validate(&self) -> EResult<()> {
        let profiles: [(&'static str, &Vec<f64>); 5] = [
            ("fpol", &self.fpol),
            ("pres", &self.pres),
            ("ffprime", &self.ffprime),
            ("pprime", &self.pprime),
            ("qpsi", &self.qpsi),
        ];
        for (field, values) in profiles {
            check_len(field, self.nw, values.len())?;
        }

        check_len("psirz rows", self.nw, self.psirz.nrows())?;
        check_len("psirz columns", self.nh, self.psirz.ncols())?;
        check_len("psirz values", self.nw.saturating_mul(self.nh), self.psirz.as_slice().len())?;
        check_len("zbbbs", self.rbbbs.len(), self.zbbbs.len())?;
        check_len("zlim", self.rlim.len(), self.zlim.len())?;

        // NaN has a text form; infinities do not.
        let scalars = SCALAR_LAYOUT.iter().map(|&slot| self.scalar(slot));
        let arrays = [&self.fpol, &self.pres, &self.ffprime, &self.pprime, &self.qpsi, &self.rbbbs, &self.zbbbs, &self.rlim, &self.zlim];
        let all_values = scalars
            .chain(arrays.into_iter().flatten().copied())
            .chain(self.psirz.as_slice().iter().copied());
        for value in all_values {
            if value.is_infinite() {
                return Err(EError::NonFiniteValue { value });
            }
        }
        Ok(())
    }

    pub(crate) fn from_parts(header: Header, scalars: Scalars, profiles: Profiles, boundaries: Boundaries) -> Self {
        Self {
            case: header.case,
            idum: header.idum,
            nw: header.nw,
            nh: header.nh,
            scalars,
            fpol: profiles.fpol,
            pres: profiles.pres,
            ffprime: profiles.ffprime,
            pprime: profiles.pprime,
            psirz: profiles.psirz,
            qpsi: profiles.qpsi,
            nbbbs: boundaries.nbbbs,
            limitr: boundaries.limitr,
            rbbbs: boundaries.rbbbs,
            zbbbs: boundaries.zbbbs,
            rlim: boundaries.rlim,
            zlim: boundaries.zlim,
        }
    }
}

/// The profile arrays and flux grid, in the order they are read.
#[derive(Debug, Clone, PartialEq)]
pub struct Profiles {
    pub fpol: Vec<f64>,
    pub pres: Vec<f64>,
    pub ffprime: Vec<f64>,
    pub pprime: Vec<f64>,
    pub psirz: FluxGrid,
    pub qpsi: Vec<f64>,
}

fn check_len(field: &'static str, expected: usize, found: usize) -> EResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(EError::ShapeMismatch { field, expected, found })
    }
}
