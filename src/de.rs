//! Read G-EQDSK equilibrium files
//!
//! # Basic usage
//!
//! The simplest entry points read a whole file into an [`EquilibriumRecord`]:
//!
//! ```
//! use geqdsk::de::from_str;
//!
//! let text = "  EFIT  0 2 1
//!  1.0 2.0 3.0 4.0 5.0 6.0 7.0 8.0 9.0 10.0 11.0 12.0 13.0 14.0 15.0 16.0 17.0 18.0 19.0 20.0
//!  1 2 3 4 5 6 7 8 9 10 11 12
//!  0 0
//! ";
//! let rec = from_str(text).unwrap();
//! assert_eq!(rec.nw, 2);
//! assert_eq!(rec.scalars.bcentr, 10.0);
//! assert_eq!(rec.fpol, vec![1.0, 2.0]);
//! assert_eq!(rec.psirz.row(1), &[10.0]);
//! assert_eq!(rec.rbbbs, vec![0.0]);
//! ```
//!
//! # Reading a file piece by piece
//!
//! The section readers are public so that a file can be read one piece at a time.
//! They all share one [`TokenStream`] and **must** be called in file order: header,
//! [`read_scalars`], the profiles ([`read_profiles`], or [`read_1d`] and [`read_2d`]
//! in the same order), then [`read_boundaries`]. Calling them in any other order
//! assigns values to the wrong fields; nothing in the stream can detect that.
//!
//! ```
//! use geqdsk::de::{read_header, read_scalars, read_1d, read_2d};
//! use geqdsk::tokens::TokenStream;
//!
//! let mut input = "case 0 1 2\n 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n 1 2 3 4 5 6 7\n".as_bytes();
//! let header = read_header(&mut input).unwrap();
//! let mut tokens = TokenStream::new(input);
//! let scalars = read_scalars(&mut tokens).unwrap();
//! let fpol = read_1d(&mut tokens, header.nw, "fpol").unwrap();
//! let pres = read_1d(&mut tokens, header.nw, "pres").unwrap();
//! let ffprime = read_1d(&mut tokens, header.nw, "ffprime").unwrap();
//! let pprime = read_1d(&mut tokens, header.nw, "pprime").unwrap();
//! let psirz = read_2d(&mut tokens, header.nw, header.nh, "psirz").unwrap();
//! assert_eq!(psirz.row(0), &[5.0, 6.0]);
//! ```
//!
//! # Adjusting read settings
//!
//! By default the text `NaN` is replaced with `-0.00000e0` before a line is scanned,
//! so NaNs written by other codes read as zeros. This can be turned off with
//! [`DeSettings`], in which case the NaN text is skipped like any other non-number:
//!
//! ```
//! use geqdsk::de::{from_str_custom, DeSettings};
//!
//! let settings = DeSettings::default().replace_nan(false);
//! let res = from_str_custom("case 0 1 1\n NaN\n", settings);
//! assert!(res.is_err());
//! ```
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::eqdsk_error::{EError, EResult};
use crate::parsing;
use crate::record::{Boundaries, EquilibriumRecord, FluxGrid, Header, Profiles, Scalars, SCALAR_LAYOUT};
use crate::tokens::TokenStream;

/// Settings for reading G-EQDSK files
///
/// To use, instantiate the default version with `DeSettings::default()` and
/// modify the desired settings with the public methods:
///
/// ```
/// # use geqdsk::de::DeSettings;
///
/// let settings = DeSettings::default().replace_nan(false);
/// ```
#[derive(Debug, Clone)]
pub struct DeSettings {
    pub(crate) replace_nan: bool,
}

impl DeSettings {
    /// Set whether to read the text `NaN` as a negative zero.
    ///
    /// Default is `true`.
    pub fn replace_nan(mut self, replace_nan: bool) -> Self {
        self.replace_nan = replace_nan;
        self
    }
}

impl Default for DeSettings {
    fn default() -> Self {
        Self { replace_nan: true }
    }
}

/// Read an equilibrium from a string in memory.
pub fn from_str(s: &str) -> EResult<EquilibriumRecord> {
    from_str_custom(s, DeSettings::default())
}

/// Read an equilibrium from a string in memory with customized settings.
pub fn from_str_custom(s: &str, settings: DeSettings) -> EResult<EquilibriumRecord> {
    from_reader_custom(s.as_bytes(), settings)
}

/// Read an equilibrium from a file.
///
/// The file is closed before this returns, whether or not the read succeeded.
pub fn from_path<P: AsRef<Path>>(path: P) -> EResult<EquilibriumRecord> {
    from_path_custom(path, DeSettings::default())
}

/// Read an equilibrium from a file with customized settings.
pub fn from_path_custom<P: AsRef<Path>>(path: P, settings: DeSettings) -> EResult<EquilibriumRecord> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading G-EQDSK file");
    let f = File::open(path)?;
    from_reader_custom(BufReader::new(f), settings)
}

/// Read an equilibrium from any buffered reader.
pub fn from_reader<R: BufRead>(reader: R) -> EResult<EquilibriumRecord> {
    from_reader_custom(reader, DeSettings::default())
}

/// Read an equilibrium from any buffered reader with customized settings.
///
/// Sections are read in file order from a single token stream: header, scalars,
/// profiles, then boundaries. Any failure aborts the read.
pub fn from_reader_custom<R: BufRead>(mut reader: R, settings: DeSettings) -> EResult<EquilibriumRecord> {
    let header = read_header(&mut reader)?;
    debug!(nw = header.nw, nh = header.nh, idum = header.idum, "read header");

    let mut tokens = TokenStream::continuing(reader, settings, 1);
    let scalars = read_scalars(&mut tokens)?;
    let profiles = read_profiles(&mut tokens, header.nw, header.nh)?;
    debug!(tokens = tokens.tokens_consumed(), line = tokens.line_number(), "read scalars and profiles");
    let boundaries = read_boundaries(&mut tokens)?;
    debug!(nbbbs = boundaries.nbbbs, limitr = boundaries.limitr, "read boundaries");

    Ok(EquilibriumRecord::from_parts(header, scalars, profiles, boundaries))
}

/// Read and parse the first line of the input.
///
/// Returns [`EError::EmptyInput`] if there is no first line at all.
pub fn read_header<R: BufRead>(reader: &mut R) -> EResult<Header> {
    let mut line = String::new();
    let nbytes = reader.read_line(&mut line)?;
    if nbytes == 0 {
        return Err(EError::EmptyInput);
    }
    parsing::parse_header(&line)
}

/// Read the 20 values of the scalar block.
///
/// Values go into their slots in [`SCALAR_LAYOUT`] order, so for names that appear
/// more than once the later value is kept.
pub fn read_scalars<R: BufRead>(tokens: &mut TokenStream<R>) -> EResult<Scalars> {
    let mut scalars = Scalars::default();
    for (i, slot) in SCALAR_LAYOUT.iter().enumerate() {
        let v = tokens.require_value(slot.name(), SCALAR_LAYOUT.len(), i)?;
        scalars.set(*slot, v);
    }
    Ok(scalars)
}

/// Read `n` values into a 1D array.
pub fn read_1d<R: BufRead>(tokens: &mut TokenStream<R>, n: usize, field: &'static str) -> EResult<Vec<f64>> {
    let mut values = Vec::with_capacity(n.min(1 << 16));
    for i in 0..n {
        values.push(tokens.require_value(field, n, i)?);
    }
    Ok(values)
}

/// Read an `nx` by `ny` array as `nx` consecutive rows of `ny` values.
///
/// The second index varies fastest: element `(i, j)` is the `(i * ny + j)`-th value read.
pub fn read_2d<R: BufRead>(tokens: &mut TokenStream<R>, nx: usize, ny: usize, field: &'static str) -> EResult<FluxGrid> {
    let mut grid = FluxGrid::with_row_capacity(nx, ny);
    for i in 0..nx {
        let row = read_1d(tokens, ny, field)
            .map_err(|e| match e {
                EError::TokenExhaustion { field, expected: _, found } => {
                    EError::TokenExhaustion { field, expected: nx.saturating_mul(ny), found: i.saturating_mul(ny).saturating_add(found) }
                },
                _ => e
            })?;
        grid.push_row(row);
    }
    Ok(grid)
}

/// Read `fpol`, `pres`, `ffprime`, `pprime`, `psirz` and `qpsi`, in that order.
pub fn read_profiles<R: BufRead>(tokens: &mut TokenStream<R>, nw: usize, nh: usize) -> EResult<Profiles> {
    let fpol = read_1d(tokens, nw, "fpol")?;
    let pres = read_1d(tokens, nw, "pres")?;
    let ffprime = read_1d(tokens, nw, "ffprime")?;
    let pprime = read_1d(tokens, nw, "pprime")?;
    let psirz = read_2d(tokens, nw, nh, "psirz")?;
    let qpsi = read_1d(tokens, nw, "qpsi")?;
    Ok(Profiles { fpol, pres, ffprime, pprime, psirz, qpsi })
}

/// Read the boundary counts followed by the plasma boundary and limiter (R, Z) pairs.
///
/// The counts are truncated to integers. A count of zero or less reads no pairs and
/// gives the one-point placeholder `[0.0]` for both of its arrays.
pub fn read_boundaries<R: BufRead>(tokens: &mut TokenStream<R>) -> EResult<Boundaries> {
    let nbbbs = tokens.require_value("nbbbs", 2, 0)?.trunc() as i64;
    let limitr = tokens.require_value("limitr", 2, 1)?.trunc() as i64;

    let (rbbbs, zbbbs) = read_rz_pairs(tokens, nbbbs, "rbbbs/zbbbs")?;
    let (rlim, zlim) = read_rz_pairs(tokens, limitr, "rlim/zlim")?;

    Ok(Boundaries { nbbbs, limitr, rbbbs, zbbbs, rlim, zlim })
}

fn read_rz_pairs<R: BufRead>(tokens: &mut TokenStream<R>, count: i64, field: &'static str) -> EResult<(Vec<f64>, Vec<f64>)> {
    if count <= 0 {
        return Ok((vec![0.0], vec![0.0]));
    }

    let n = count as usize;
    let mut r = Vec::with_capacity(n.min(1 << 16));
    let mut z = Vec::with_capacity(n.min(1 << 16));
    for i in 0..n {
        r.push(tokens.require_value(field, 2 * n, 2 * i)?);
        z.push(tokens.require_value(field, 2 * n, 2 * i + 1)?);
    }
    Ok((r, z))
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Write};
    use stringreader::StringReader;

    use super::*;

    fn scalar_block(values: &[f64; 20]) -> String {
        let mut s = String::new();
        for chunk in values.chunks(5) {
            for v in chunk {
                s.push_str(&format!(" {v:.9E}"));
            }
            s.push('\n');
        }
        s
    }

    fn scenario_one_text(boundary: &str) -> String {
        let mut s = "  TEST 0 2 2\n".to_string();
        s.push_str(&scalar_block(&[0.0; 20]));
        s.push_str(" 1 2 3 4 5\n 6 7 8 9 10\n 11 12 13 14\n");
        s.push_str(boundary);
        s
    }

    #[test]
    fn test_scenario_one() -> EResult<()> {
        let rec = from_str(&scenario_one_text("0 0\n"))?;
        assert_eq!(rec.nw, 2);
        assert_eq!(rec.nh, 2);
        assert_eq!(rec.case, vec!["TEST"]);
        assert_eq!(rec.scalars, Scalars::default());
        assert_eq!(rec.fpol, vec![1.0, 2.0]);
        assert_eq!(rec.pres, vec![3.0, 4.0]);
        assert_eq!(rec.ffprime, vec![5.0, 6.0]);
        assert_eq!(rec.pprime, vec![7.0, 8.0]);
        assert_eq!(rec.psirz, FluxGrid::from_rows(&[[9.0, 10.0], [11.0, 12.0]]).unwrap());
        assert_eq!(rec.qpsi, vec![13.0, 14.0]);
        assert_eq!(rec.nbbbs, 0);
        assert_eq!(rec.limitr, 0);
        assert_eq!(rec.rbbbs, vec![0.0]);
        assert_eq!(rec.zbbbs, vec![0.0]);
        assert_eq!(rec.rlim, vec![0.0]);
        assert_eq!(rec.zlim, vec![0.0]);
        Ok(())
    }

    #[test]
    fn test_negative_counts_are_placeholders() -> EResult<()> {
        let rec = from_str(&scenario_one_text("-3 -1\n"))?;
        assert_eq!(rec.nbbbs, -3);
        assert_eq!(rec.limitr, -1);
        assert_eq!(rec.rbbbs, vec![0.0]);
        assert_eq!(rec.zlim, vec![0.0]);
        assert!(!rec.has_plasma_boundary());
        Ok(())
    }

    #[test]
    fn test_boundary_pairs() -> EResult<()> {
        let rec = from_str(&scenario_one_text("3\t2\n 1.0 0.1 2.0 0.2 3.0\n 0.3\n 5.0-5.0 6.0-6.0\n"))?;
        assert_eq!(rec.nbbbs, 3);
        assert_eq!(rec.rbbbs, vec![1.0, 2.0, 3.0]);
        assert_eq!(rec.zbbbs, vec![0.1, 0.2, 0.3]);
        assert_eq!(rec.limitr, 2);
        assert_eq!(rec.rlim, vec![5.0, 6.0]);
        assert_eq!(rec.zlim, vec![-5.0, -6.0]);

        // A genuine single point differs from the placeholder only in its count
        let rec = from_str(&scenario_one_text("1 0\n 0.0 0.0\n"))?;
        assert_eq!(rec.rbbbs, vec![0.0]);
        assert!(rec.has_plasma_boundary());
        assert!(!rec.has_limiter());
        Ok(())
    }

    #[test]
    fn test_counts_are_truncated() -> EResult<()> {
        let rec = from_str(&scenario_one_text("2.9 0.5\n 1.0 0.1 2.0 0.2\n"))?;
        assert_eq!(rec.nbbbs, 2);
        assert_eq!(rec.limitr, 0);
        assert_eq!(rec.rbbbs, vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_duplicate_scalars() -> EResult<()> {
        let mut values = [0.0; 20];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i + 1) as f64;
        }
        let mut s = "case 0 1 1\n".to_string();
        s.push_str(&scalar_block(&values));
        s.push_str(" 0 0 0 0 0 0\n 0 0\n");
        let rec = from_str(&s)?;
        assert_eq!(rec.scalars.rdim, 1.0);
        assert_eq!(rec.scalars.rleft, 4.0);
        assert_eq!(rec.scalars.bcentr, 10.0);
        assert_eq!(rec.scalars.current, 11.0);
        // second occurrences win
        assert_eq!(rec.scalars.simag, 12.0);
        assert_eq!(rec.scalars.rmaxis, 14.0);
        assert_eq!(rec.scalars.zmaxis, 16.0);
        assert_eq!(rec.scalars.sibry, 18.0);
        assert_eq!(rec.scalars.xdum, 20.0);
        Ok(())
    }

    #[test]
    fn test_nan_bcentr() -> EResult<()> {
        let mut s = "case 0 1 1\n".to_string();
        s.push_str(" 1.0 2.0 3.0 4.0 5.0\n 6.0 7.0 8.0 9.0 NaN\n 11.0 12.0 13.0 14.0 15.0\n 16.0 17.0 18.0 19.0 20.0\n");
        s.push_str(" 0 0 0 0 0 0\n 0 0\n");
        let rec = from_str(&s)?;
        assert_eq!(rec.scalars.bcentr, 0.0);
        assert!(rec.scalars.bcentr.is_sign_negative());
        assert_eq!(rec.scalars.sibry, 18.0);
        Ok(())
    }

    #[test]
    fn test_read_2d_row_major() -> EResult<()> {
        let mut tokens = TokenStream::new("1 2 3\n4 5 6\n".as_bytes());
        let grid = read_2d(&mut tokens, 2, 3, "psirz")?;
        assert_eq!(grid, FluxGrid::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap());

        // Swapping the dimensions without changing the data does not give back the same matrix
        let mut tokens = TokenStream::new("1 2 3\n4 5 6\n".as_bytes());
        let swapped = read_2d(&mut tokens, 3, 2, "psirz")?;
        assert_eq!(swapped, FluxGrid::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap());
        assert_ne!(swapped.get(0, 1), grid.get(1, 0));
        Ok(())
    }

    #[test]
    fn test_empty_input() {
        let res = from_str("");
        assert!(matches!(res, Err(EError::EmptyInput)), "Empty input did not give an EmptyInput error");
    }

    #[test]
    fn test_huge_grid_dimension() {
        let mut s = "c 0 3 9223372036854775807\n".to_string();
        s.push_str(&scalar_block(&[0.0; 20]));
        s.push_str(" 1 2 3 4 5 6 7 8 9 10 11 12 13\n");
        let res = from_str(&s);
        match &res {
            Err(EError::TokenExhaustion { field, expected, found }) => {
                assert_eq!(*field, "psirz");
                assert_eq!(*expected, usize::MAX, "Grid size should saturate rather than wrap");
                assert_eq!(*found, 1);
            },
            other => panic!("Expected TokenExhaustion, got {other:?}")
        }
        assert!(res.unwrap_err().is_exhaustion());

        let mut s = "c 0 2 9223372036854775807\n".to_string();
        s.push_str(&scalar_block(&[0.0; 20]));
        s.push_str(" 1 2 3 4 5 6 7 8 9\n");
        match from_str(&s) {
            Err(EError::TokenExhaustion { field, expected, .. }) => {
                assert_eq!(field, "psirz");
                assert_eq!(expected, usize::MAX - 1);
            },
            other => panic!("Expected TokenExhaustion, got {other:?}")
        }
    }

    #[test]
    fn test_malformed_header() {
        let res = from_str("EFIT 129\n 1 2 3\n");
        assert!(matches!(res, Err(EError::MalformedHeader { .. })), "Short header did not give a MalformedHeader error");
        assert!(!res.unwrap_err().is_exhaustion(), "A malformed header is not a short input");
    }

    #[test]
    fn test_truncated_inputs() {
        // Ends in the scalar block
        let res = from_str("case 0 2 2\n 1 2 3\n");
        match res {
            Err(EError::TokenExhaustion { field, expected, found }) => {
                assert_eq!(field, "rleft");
                assert_eq!(expected, 20);
                assert_eq!(found, 3);
            },
            other => panic!("Expected TokenExhaustion, got {other:?}")
        }

        // Ends partway through psirz
        let mut s = "case 0 2 2\n".to_string();
        s.push_str(&scalar_block(&[0.0; 20]));
        s.push_str(" 1 2 3 4 5 6 7 8 9 10 11\n");
        match from_str(&s) {
            Err(EError::TokenExhaustion { field, expected, found }) => {
                assert_eq!(field, "psirz");
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            },
            other => panic!("Expected TokenExhaustion, got {other:?}")
        }

        // Missing the boundary counts entirely
        let res = from_str(&scenario_one_text(""));
        assert!(matches!(res, Err(EError::TokenExhaustion { field: "nbbbs", .. })));

        // Fewer limiter pairs than declared
        let res = from_str(&scenario_one_text("0 2\n 1.0 2.0 3.0\n"));
        match res {
            Err(EError::TokenExhaustion { field, expected, found }) => {
                assert_eq!(field, "rlim/zlim");
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            },
            other => panic!("Expected TokenExhaustion, got {other:?}")
        }
    }

    #[test]
    fn test_from_reader() -> EResult<()> {
        let reader = BufReader::new(StringReader::new("case 0 1 1\n 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n 1 2 3 4 5 6\n 1 0\n 7 8\n"));
        let rec = from_reader(reader)?;
        assert_eq!(rec.psirz.as_slice(), &[5.0]);
        assert_eq!(rec.qpsi, vec![6.0]);
        assert_eq!(rec.rbbbs, vec![7.0]);
        assert_eq!(rec.zbbbs, vec![8.0]);
        assert_eq!(rec.rlim, vec![0.0]);
        Ok(())
    }

    #[test]
    fn test_from_path() -> EResult<()> {
        let mut f = tempfile::NamedTempFile::new()?;
        f.write_all(scenario_one_text("1 1\n 1.5 -0.5 2.5 -1.5\n").as_bytes())?;
        f.flush()?;

        let rec = from_path(f.path())?;
        assert_eq!(rec.qpsi, vec![13.0, 14.0]);
        assert_eq!(rec.rlim, vec![2.5]);
        assert_eq!(rec.zlim, vec![-1.5]);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = from_path(dir.path().join("does_not_exist.geqdsk"));
        assert!(matches!(res, Err(EError::IoError(_))), "Missing file did not give an IoError");
    }
}
