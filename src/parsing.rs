use pest::Parser;

use crate::eqdsk_error::{EError, EResult};
use crate::record::Header;

/// The text substituted for `NaN` before a line is scanned, so that NaN
/// reads deterministically as a (negative) zero.
pub(crate) const NAN_SUBSTITUTE: &str = "-0.00000e0";

#[derive(Parser)]
#[grammar = "eqdsk.pest"]
pub(crate) struct EqdskParser;

/// Find every number in `line`, in order.
///
/// Numbers may touch each other as long as the later one is signed, e.g.
/// `1.0E+00-2.0E+00` yields `1.0` and `-2.0`. Any text that does not start
/// a number is skipped.
pub(crate) fn scan_line(line: &str, replace_nan: bool) -> EResult<Vec<f64>> {
    let line = if replace_nan && line.contains("NaN") {
        std::borrow::Cow::Owned(line.replace("NaN", NAN_SUBSTITUTE))
    } else {
        std::borrow::Cow::Borrowed(line)
    };

    let tree = EqdskParser::parse(Rule::line, &line)
        .map_err(|e| EError::from_pest(e, &line))?
        .next()
        .ok_or_else(|| EError::ParsingError { s: line.to_string(), reason: "empty parse tree".to_string() })?;

    tree.into_inner()
        .filter(|pair| pair.as_rule() == Rule::number)
        .map(|pair| parse_number(pair.as_str()))
        .collect()
}

fn parse_number(s: &str) -> EResult<f64> {
    s.parse::<f64>()
        .map_err(|e| EError::ParsingError { s: s.to_string(), reason: e.to_string() })
}

/// Parse the first line of a G-EQDSK file.
///
/// The last three whitespace-separated tokens are `idum`, `nw` and `nh`; everything
/// before them is the case label.
pub(crate) fn parse_header(line: &str) -> EResult<Header> {
    let conts: Vec<&str> = line.split_whitespace().collect();
    if conts.len() < 3 {
        return Err(EError::MalformedHeader {
            line: line.to_string(),
            reason: format!("expected at least 3 tokens, found {}", conts.len())
        });
    }

    let n = conts.len();
    let idum = parse_header_int(line, conts[n-3], "idum")?;
    let nw = parse_header_dim(line, conts[n-2], "nw")?;
    let nh = parse_header_dim(line, conts[n-1], "nh")?;
    let case = conts[..n-3].iter().map(|s| s.to_string()).collect();

    Ok(Header { case, idum, nw, nh })
}

fn parse_header_int(line: &str, s: &str, name: &str) -> EResult<i64> {
    s.parse::<i64>()
        .map_err(|e| EError::MalformedHeader { line: line.to_string(), reason: format!("could not parse {name} from '{s}': {e}") })
}

fn parse_header_dim(line: &str, s: &str, name: &str) -> EResult<usize> {
    let v = parse_header_int(line, s, name)?;
    usize::try_from(v)
        .map_err(|_| EError::MalformedHeader { line: line.to_string(), reason: format!("{name} must not be negative, got {v}") })
}
