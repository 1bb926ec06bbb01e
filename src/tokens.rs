//! A forward-only stream of the numbers in a G-EQDSK file.
//!
//! Every section reader after the header pulls its values from one shared
//! [`TokenStream`], so the order in which the readers are called *is* the file layout.
//! The stream reads lines lazily and cannot be rewound; to read again, open a new one.
use std::collections::VecDeque;
use std::io::BufRead;

use tracing::trace;

use crate::de::DeSettings;
use crate::eqdsk_error::{EError, EResult};
use crate::parsing;

/// Lazily scans lines from a reader and yields the numbers found in them.
pub struct TokenStream<R: BufRead> {
    reader: R,
    pending: VecDeque<f64>,
    line_buf: String,
    line_num: usize,
    consumed: usize,
    exhausted: bool,
    settings: DeSettings,
}

impl<R: BufRead> TokenStream<R> {
    /// Create a stream over the remaining lines of `reader`.
    pub fn new(reader: R) -> Self {
        Self::new_custom(reader, DeSettings::default())
    }

    /// Create a stream with customized settings.
    pub fn new_custom(reader: R, settings: DeSettings) -> Self {
        Self { reader, pending: VecDeque::new(), line_buf: String::new(), line_num: 0, consumed: 0, exhausted: false, settings }
    }

    /// Create a stream that continues after `lines_already_read` lines of the same
    /// input, so that reported line numbers match the file.
    pub(crate) fn continuing(reader: R, settings: DeSettings, lines_already_read: usize) -> Self {
        let mut s = Self::new_custom(reader, settings);
        s.line_num = lines_already_read;
        s
    }

    /// Return the next number, or `None` once the input is used up.
    pub fn next_value(&mut self) -> EResult<Option<f64>> {
        while self.pending.is_empty() {
            if !self.fill()? {
                return Ok(None);
            }
        }

        let v = self.pending.pop_front();
        if v.is_some() {
            self.consumed += 1;
        }
        Ok(v)
    }

    /// Return the next number, failing with [`EError::TokenExhaustion`] if there is none.
    ///
    /// `field`, `expected` and `found` describe the read in progress for the error.
    pub fn require_value(&mut self, field: &'static str, expected: usize, found: usize) -> EResult<f64> {
        self.next_value()?
            .ok_or(EError::TokenExhaustion { field, expected, found })
    }

    /// The number of values handed out so far.
    pub fn tokens_consumed(&self) -> usize {
        self.consumed
    }

    /// The line number (1-based, counting the header) of the last line scanned.
    pub fn line_number(&self) -> usize {
        self.line_num
    }

    /// `true` once the underlying reader has hit end of input and no values remain.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending.is_empty()
    }

    // Read and scan one more line. Returns `false` at end of input.
    fn fill(&mut self) -> EResult<bool> {
        if self.exhausted {
            return Ok(false);
        }

        self.line_buf.clear();
        let nbytes = self.reader.read_line(&mut self.line_buf)?;
        if nbytes == 0 {
            self.exhausted = true;
            return Ok(false);
        }

        self.line_num += 1;
        let values = parsing::scan_line(&self.line_buf, self.settings.replace_nan)?;
        trace!(line = self.line_num, n = values.len(), "scanned line");
        self.pending.extend(values);
        Ok(true)
    }
}

impl<R: BufRead> Iterator for TokenStream<R> {
    type Item = EResult<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}
