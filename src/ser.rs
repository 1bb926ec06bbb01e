//! Write G-EQDSK equilibrium files
//!
//! # Basic usage
//!
//! ```
//! use geqdsk::record::EquilibriumRecord;
//! use geqdsk::ser::{to_string_custom, SerSettings};
//!
//! let mut rec = EquilibriumRecord::new(2, 2);
//! rec.fpol = vec![1.0, -2.0];
//! let settings = SerSettings::default().date("01/02/2023");
//! let s = to_string_custom(&rec, &settings).unwrap();
//! assert!(s.starts_with(" GEQDSK-RS 01/02/2023 # 0 0 2 2\n"));
//! ```
//!
//! # Layout
//!
//! Every number is written as a sign character (a space for values that are not
//! negative) followed by the magnitude in `%.10E` style, e.g. ` 1.0000000000E+00` or
//! `-2.5000000000E-03`. Numbers are not otherwise separated. A [`ColumnCounter`]
//! starts a new line after every fifth number, and a single counter runs through the
//! scalars and all the profile arrays, so lines break wherever the fifth number
//! happens to fall. The two boundary polylines each start with a fresh counter and
//! end with a line break.
//!
//! The header holds a product tag and a date in place of the case label, and `idum`
//! is always written as 0. Reading a written file back therefore gives a different
//! `case` and `idum` from the record that was written.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use itertools::Itertools;
use ryu_floating_decimal::d2d;
use tracing::{debug, warn};

use crate::eqdsk_error::{EError, EResult};
use crate::record::{EquilibriumRecord, FluxGrid, SCALAR_LAYOUT};

/// The product tag written at the start of the header line unless overridden.
pub const DEFAULT_TAG: &str = "GEQDSK-RS";

/// Settings for writing G-EQDSK files
///
/// To use, instantiate the default version with `SerSettings::default()` and
/// modify the desired settings with the public methods:
///
/// ```
/// # use geqdsk::ser::SerSettings;
///
/// let settings = SerSettings::default()
///     .tag("MYCODE")
///     .date("16/10/2026")
///     .precision(9);
/// ```
#[derive(Debug, Clone)]
pub struct SerSettings {
    tag: String,
    date: Option<String>,
    precision: u32,
    values_per_line: usize,
}

impl SerSettings {
    /// Set the product tag written at the start of the header line.
    ///
    /// Default is [`DEFAULT_TAG`]. The tag should not contain whitespace.
    pub fn tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the date written in the header line.
    ///
    /// Default is the current UTC date as `dd/mm/YYYY`.
    pub fn date<S: Into<String>>(mut self, date: S) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the number of mantissa digits after the decimal point, between 1 and 16.
    ///
    /// Default is 10, which gives 17 characters per number including the sign.
    /// A precision of 9 gives the 16-character columns of a Fortran `5e16.9` layout.
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision.clamp(1, 16);
        self
    }

    /// Set how many numbers are written on each line.
    ///
    /// Default is 5.
    pub fn values_per_line(mut self, n: usize) -> Self {
        self.values_per_line = n.max(1);
        self
    }

    fn header_date(&self) -> String {
        self.date.clone().unwrap_or_else(today_dmy)
    }
}

impl Default for SerSettings {
    fn default() -> Self {
        Self { tag: DEFAULT_TAG.to_string(), date: None, precision: 10, values_per_line: 5 }
    }
}

/// Write a record to a string.
pub fn to_string(record: &EquilibriumRecord) -> EResult<String> {
    to_string_custom(record, &SerSettings::default())
}

/// Write a record to a string with customized settings.
pub fn to_string_custom(record: &EquilibriumRecord, settings: &SerSettings) -> EResult<String> {
    let bytes = to_bytes_custom(record, settings)?;
    String::from_utf8(bytes)
        .map_err(|e| EError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Write a record to a byte vector.
pub fn to_bytes(record: &EquilibriumRecord) -> EResult<Vec<u8>> {
    to_bytes_custom(record, &SerSettings::default())
}

/// Write a record to a byte vector with customized settings.
pub fn to_bytes_custom(record: &EquilibriumRecord, settings: &SerSettings) -> EResult<Vec<u8>> {
    let mut buf = vec![];
    to_writer_custom(record, &mut buf, settings)?;
    Ok(buf)
}

/// Write a record to a file, replacing any existing file.
pub fn to_path<P: AsRef<Path>>(record: &EquilibriumRecord, path: P) -> EResult<()> {
    to_path_custom(record, path, &SerSettings::default())
}

/// Write a record to a file with customized settings.
///
/// The file is closed before this returns, whether or not the write succeeded.
pub fn to_path_custom<P: AsRef<Path>>(record: &EquilibriumRecord, path: P, settings: &SerSettings) -> EResult<()> {
    let path = path.as_ref();
    // Check the record before creating (and truncating) the file
    record.validate()?;
    debug!(path = %path.display(), "writing G-EQDSK file");
    let f = File::create(path)?;
    to_writer_custom(record, BufWriter::new(f), settings)
}

/// Write a record to any writer.
pub fn to_writer<W: Write>(record: &EquilibriumRecord, writer: W) -> EResult<()> {
    to_writer_custom(record, writer, &SerSettings::default())
}

/// Write a record to any writer with customized settings.
///
/// Returns [`EError::ShapeMismatch`] without writing anything if an array does not
/// fit the record's `nw`/`nh`, and [`EError::NonFiniteValue`] if any value is infinite.
pub fn to_writer_custom<W: Write>(record: &EquilibriumRecord, writer: W, settings: &SerSettings) -> EResult<()> {
    record.validate()?;
    warn_on_count_mismatch(record);

    let mut w = NumberWriter::new(writer, settings.precision);
    let header = format!(" {} {} # 0 0 {} {}\n", settings.tag, settings.header_date(), record.nw, record.nh);
    w.write_raw(header.as_bytes())?;

    let mut counter = ColumnCounter::new(settings.values_per_line);
    for slot in SCALAR_LAYOUT {
        w.write_number(record.scalar(slot), &mut counter)?;
    }
    w.write_1d(&record.fpol, &mut counter)?;
    w.write_1d(&record.pres, &mut counter)?;
    w.write_1d(&record.ffprime, &mut counter)?;
    w.write_1d(&record.pprime, &mut counter)?;
    w.write_2d(&record.psirz, &mut counter)?;
    w.write_1d(&record.qpsi, &mut counter)?;

    let (nbbbs, limitr) = record.written_boundary_counts();
    let counts = format!("\n{nbbbs}\t{limitr}\n");
    w.write_raw(counts.as_bytes())?;

    let mut counter = ColumnCounter::new(settings.values_per_line);
    w.write_boundary(&record.rbbbs, &record.zbbbs, &mut counter)?;
    let mut counter = ColumnCounter::new(settings.values_per_line);
    w.write_boundary(&record.rlim, &record.zlim, &mut counter)?;

    w.flush()
}

fn warn_on_count_mismatch(record: &EquilibriumRecord) {
    let (nbbbs, limitr) = record.written_boundary_counts();
    if record.nbbbs != nbbbs as i64 {
        warn!(stored = record.nbbbs, written = nbbbs, "plasma boundary count differs from the rbbbs length; writing the length");
    }
    if record.limitr != limitr as i64 {
        warn!(stored = record.limitr, written = limitr, "limiter count differs from the rlim length; writing the length");
    }
}

/// Tracks the position on the current output line and decides where line breaks go.
///
/// One counter is shared across every array written between two resets; it does not
/// restart when one array ends and the next begins.
#[derive(Debug, Clone)]
pub struct ColumnCounter {
    per_line: usize,
    col: usize,
}

impl ColumnCounter {
    pub fn new(per_line: usize) -> Self {
        Self { per_line: per_line.max(1), col: 0 }
    }

    /// Return to the start of a line.
    pub fn reset(&mut self) {
        self.col = 0;
    }

    /// How many numbers have been written on the current line.
    pub fn column(&self) -> usize {
        self.col
    }

    // Count one number; `true` means a line break goes after it.
    fn advance(&mut self) -> bool {
        self.col += 1;
        if self.col == self.per_line {
            self.col = 0;
            true
        } else {
            false
        }
    }
}

impl Default for ColumnCounter {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Writes fixed-width numbers, breaking lines as directed by a [`ColumnCounter`].
pub struct NumberWriter<W: Write> {
    buf: W,
    precision: u32,
}

impl<W: Write> NumberWriter<W> {
    pub fn new(buf: W, precision: u32) -> Self {
        Self { buf, precision: precision.clamp(1, 16) }
    }

    pub fn into_inner(self) -> W {
        self.buf
    }

    pub fn write_number(&mut self, v: f64, counter: &mut ColumnCounter) -> EResult<()> {
        serialize_real_exp(&mut self.buf, v, self.precision)?;
        if counter.advance() {
            self.buf.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn write_1d(&mut self, values: &[f64], counter: &mut ColumnCounter) -> EResult<()> {
        for &v in values {
            self.write_number(v, counter)?;
        }
        Ok(())
    }

    /// Write a grid row by row, so the column index varies fastest.
    pub fn write_2d(&mut self, grid: &FluxGrid, counter: &mut ColumnCounter) -> EResult<()> {
        for row in grid.rows() {
            self.write_1d(row, counter)?;
        }
        Ok(())
    }

    /// Write a polyline as (R, Z) pairs followed by a line break.
    pub fn write_boundary(&mut self, r: &[f64], z: &[f64], counter: &mut ColumnCounter) -> EResult<()> {
        for &v in r.iter().interleave(z.iter()) {
            self.write_number(v, counter)?;
        }
        self.buf.write_all(b"\n")?;
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> EResult<()> {
        self.buf.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> EResult<()> {
        self.buf.flush()?;
        Ok(())
    }
}

/// Write one number as a sign character followed by `precision` digits after the
/// decimal point in exponential notation.
///
/// The exponent always has a sign and at least two digits. NaN is written as the text
/// `NaN` padded to the same width; infinities cannot be written.
pub fn serialize_real_exp<W: Write>(mut buf: W, v: f64, precision: u32) -> EResult<()> {
    if v.is_infinite() {
        return Err(EError::NonFiniteValue { value: v });
    }

    // leading digit, point, digits, 'E', exponent sign, 2 exponent digits
    let width = precision as usize + 6;
    if v.is_nan() {
        write!(buf, " {:>width$}", "NaN")?;
        return Ok(());
    }

    let sign = if v < 0.0 { b"-" } else { b" " };
    buf.write_all(sign)?;

    let n_sig = precision + 1;
    let (digits, exponent) = round_to_sig_digits(v.abs(), n_sig);

    let mut b = itoa::Buffer::new();
    let s = b.format(digits);
    let d_bytes = s.as_bytes();

    // Only zero has fewer digits than requested; pad it out.
    let mut mantissa = Vec::with_capacity(n_sig as usize);
    for _ in d_bytes.len()..n_sig as usize {
        mantissa.push(b'0');
    }
    mantissa.extend_from_slice(d_bytes);

    buf.write_all(&mantissa[..1])?;
    buf.write_all(b".")?;
    buf.write_all(&mantissa[1..])?;
    buf.write_all(b"E")?;
    buf.write_all(if exponent < 0 { b"-" } else { b"+" })?;

    let mut b = itoa::Buffer::new();
    let s = b.format(exponent.unsigned_abs());
    if s.len() < 2 {
        buf.write_all(b"0")?;
    }
    buf.write_all(s.as_bytes())?;
    Ok(())
}

/// Round a non-negative finite value to `n_sig` significant decimal digits.
///
/// Returns the digits as an integer with exactly `n_sig` digits (or 0 for zero) and
/// the power of ten of the leading digit.
///
/// The rounding is half-up on the shortest decimal that reads back as `v`, not on the
/// exact binary value. The two only disagree when that shortest decimal ends exactly
/// on a half at the cut, so the last digit can be one higher than C's `%.*E` would
/// give (`1.00000000135` writes as `1.0000000014E+00`, where C gives `...13`). Either
/// way the written value is within one unit in the last written digit.
fn round_to_sig_digits(v: f64, n_sig: u32) -> (u64, i32) {
    if v == 0.0 {
        return (0, 0);
    }

    // Shortest round-trip decimal: v == mantissa * 10^exponent
    let v = d2d(v);
    let mut b = itoa::Buffer::new();
    let n_digits = b.format(v.mantissa).len() as u32;
    let mut exponent = v.exponent + n_digits as i32 - 1;

    let digits = if n_digits > n_sig {
        let div = 10u64.pow(n_digits - n_sig);
        let mut q = v.mantissa / div;
        if (v.mantissa % div) * 2 >= div {
            q += 1;
        }
        if q == 10u64.pow(n_sig) {
            q /= 10;
            exponent += 1;
        }
        q
    } else {
        v.mantissa * 10u64.pow(n_sig - n_digits)
    };

    (digits, exponent)
}

/// Today's UTC date as `dd/mm/YYYY`.
fn today_dmy() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (y, m, d) = civil_from_days((secs / 86_400) as i64);
    format!("{d:02}/{m:02}/{y:04}")
}

// Proleptic Gregorian (year, month, day) for a count of days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400;
    (if m <= 2 { y + 1 } else { y }, m, d)
}
