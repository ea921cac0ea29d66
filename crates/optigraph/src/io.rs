//! Text formats: the batch input file, target matrices, edges lines and the
//! sifter's positional arguments.
//!
//! Batch file
//! - line 1: `P BS DC W`
//! - next `P` lines: `P` complex numbers each, the target matrix row by row.
//!   A complex number is `(re,im)`, `(re)` or a bare real `re`.
//! - remaining lines: one topology per line, `P + 2(BS+DC+W)` integers.
//!
//! Blank lines are skipped everywhere. Line numbers in errors are 1-based.

use std::io::{BufRead, Lines};
use std::iter::Enumerate;

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::{FormatError, SiftArgsError};
use crate::topology::{ElementCounts, SiftMask};

/// `P BS DC W` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchHeader {
    pub ports: usize,
    pub counts: ElementCounts,
}

impl BatchHeader {
    /// Length of one edges line.
    pub fn node_count(&self) -> usize {
        self.ports + 2 * self.counts.total()
    }
}

fn parse_usize(tok: &str, line: usize) -> Result<usize, FormatError> {
    tok.parse()
        .map_err(|_| FormatError::malformed(line, format!("{tok:?} is not a non-negative integer")))
}

pub fn parse_header(text: &str, line: usize) -> Result<BatchHeader, FormatError> {
    let nums = text
        .split_whitespace()
        .map(|t| parse_usize(t, line))
        .collect::<Result<Vec<_>, _>>()?;
    let [ports, bs, dc, w] = nums[..] else {
        return Err(FormatError::malformed(
            line,
            format!("header needs 4 integers P BS DC W, got {}", nums.len()),
        ));
    };
    let counts = ElementCounts::new(bs, dc, w);
    if counts.checked_node_count(ports).is_none() || ports.checked_mul(ports).is_none() {
        return Err(FormatError::malformed(
            line,
            format!("header {ports} {bs} {dc} {w} overflows the node index range"),
        ));
    }
    Ok(BatchHeader { ports, counts })
}

/// Parse `(re,im)`, `(re)` or `re`.
pub fn parse_complex(tok: &str) -> Option<Complex64> {
    let tok = tok.trim();
    match tok.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => match inner.split_once(',') {
            Some((re, im)) => Some(Complex64::new(re.trim().parse().ok()?, im.trim().parse().ok()?)),
            None => Some(Complex64::new(inner.trim().parse().ok()?, 0.0)),
        },
        None => Some(Complex64::new(tok.parse().ok()?, 0.0)),
    }
}

/// Split on whitespace outside parentheses, so `(1, 0)` stays one token.
fn complex_tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    out.push(&text[s..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        out.push(&text[s..]);
    }
    out
}

/// One matrix row of exactly `cols` complex entries.
pub fn parse_row(text: &str, cols: usize, line: usize) -> Result<Vec<Complex64>, FormatError> {
    let toks = complex_tokens(text);
    if toks.len() != cols {
        return Err(FormatError::malformed(
            line,
            format!("expected {cols} complex entries, got {}", toks.len()),
        ));
    }
    toks.iter()
        .map(|t| {
            parse_complex(t)
                .ok_or_else(|| FormatError::malformed(line, format!("{t:?} is not a complex number")))
        })
        .collect()
}

/// Edges line of exactly `nodes` integers.
pub fn parse_edges(text: &str, nodes: usize, line: usize) -> Result<Vec<usize>, FormatError> {
    let edges = text
        .split_whitespace()
        .map(|t| parse_usize(t, line))
        .collect::<Result<Vec<_>, _>>()?;
    if edges.len() != nodes {
        return Err(FormatError::malformed(
            line,
            format!("expected {nodes} edges, got {}", edges.len()),
        ));
    }
    Ok(edges)
}

/// Whitespace-separated edges, the sifter's output line.
pub fn format_edges(edges: &[usize]) -> String {
    let mut s = String::with_capacity(edges.len() * 3);
    for (k, e) in edges.iter().enumerate() {
        if k > 0 {
            s.push(' ');
        }
        s.push_str(&e.to_string());
    }
    s
}

/// Next non-blank line with its 1-based number.
fn next_content<R: BufRead>(
    lines: &mut Enumerate<Lines<R>>,
) -> Result<Option<(usize, String)>, FormatError> {
    for (k, line) in lines.by_ref() {
        let line = line?;
        if !line.trim().is_empty() {
            return Ok(Some((k + 1, line)));
        }
    }
    Ok(None)
}

fn read_rows<R: BufRead>(
    lines: &mut Enumerate<Lines<R>>,
    ports: usize,
) -> Result<DMatrix<Complex64>, FormatError> {
    let mut m = DMatrix::zeros(ports, ports);
    for i in 0..ports {
        let Some((line, text)) = next_content(lines)? else {
            return Err(FormatError::TargetRows {
                expected: ports,
                got: i,
            });
        };
        for (j, z) in parse_row(&text, ports, line)?.into_iter().enumerate() {
            m[(i, j)] = z;
        }
    }
    Ok(m)
}

/// Read a standalone `ports × ports` complex matrix.
pub fn read_matrix<R: BufRead>(reader: R, ports: usize) -> Result<DMatrix<Complex64>, FormatError> {
    read_rows(&mut reader.lines().enumerate(), ports)
}

/// One parsed topology line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeLine {
    pub line: usize,
    pub edges: Vec<usize>,
}

/// Lazily parsed topology lines of a batch file.
pub struct EdgeLines<R> {
    lines: Enumerate<Lines<R>>,
    nodes: usize,
}

impl<R: BufRead> EdgeLines<R> {
    /// Number of topology lines left, without parsing them.
    pub fn count_remaining(mut self) -> Result<u64, FormatError> {
        let mut n = 0;
        while next_content(&mut self.lines)?.is_some() {
            n += 1;
        }
        Ok(n)
    }
}

impl<R: BufRead> Iterator for EdgeLines<R> {
    type Item = Result<EdgeLine, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        match next_content(&mut self.lines) {
            Ok(Some((line, text))) => {
                Some(parse_edges(&text, self.nodes, line).map(|edges| EdgeLine { line, edges }))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read the header and target matrix; the topology lines follow lazily.
pub fn read_batch<R: BufRead>(
    reader: R,
) -> Result<(BatchHeader, DMatrix<Complex64>, EdgeLines<R>), FormatError> {
    let mut lines = reader.lines().enumerate();
    let (line, text) = next_content(&mut lines)?.ok_or(FormatError::Empty)?;
    let header = parse_header(&text, line)?;
    if header.ports == 0 {
        return Err(FormatError::malformed(line, "P must be positive"));
    }
    let target = read_rows(&mut lines, header.ports)?;
    let nodes = header.node_count();
    Ok((header, target, EdgeLines { lines, nodes }))
}

/// Sifter positional arguments: `P BS DC W` then a `P × P` 0/1 matrix in
/// row-major order. Arguments past the matrix are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiftArgs {
    pub ports: usize,
    pub counts: ElementCounts,
    pub matrix: Vec<bool>,
}

impl SiftArgs {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, SiftArgsError> {
        if args.len() < 4 {
            return Err(SiftArgsError::TooFewArguments);
        }
        let int = |index: usize| -> Result<usize, SiftArgsError> {
            let token = args[index].as_ref();
            token.trim().parse().map_err(|_| SiftArgsError::NotAnInteger {
                index,
                token: token.to_string(),
            })
        };
        let (ports, bs, dc, w) = (int(0)?, int(1)?, int(2)?, int(3)?);
        let counts = ElementCounts::new(bs, dc, w);
        let too_large = SiftArgsError::TooLarge {
            ports,
            elements: [bs, dc, w],
        };
        if counts.checked_node_count(ports).is_none() {
            return Err(too_large);
        }
        let expected = ports.checked_mul(ports).ok_or(too_large)?;
        let got = args.len() - 4;
        if got == 0 && expected > 0 {
            return Err(SiftArgsError::MatrixMissing);
        }
        if got < expected {
            return Err(SiftArgsError::MatrixIncomplete { expected, got });
        }
        let matrix = (4..4 + expected)
            .map(|k| int(k).map(|v| v != 0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ports,
            counts,
            matrix,
        })
    }

    pub fn node_count(&self) -> usize {
        self.ports + 2 * self.counts.total()
    }

    /// Leading 4×4 block of the matrix as a sift mask.
    pub fn mask(&self) -> SiftMask {
        SiftMask::from_port_matrix(self.ports, &self.matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const BATCH: &str = "4 1 0 0\n\
        (1,0) 0 0 0\n\
        0 (1, 0) 0 0\n\
        0 0 (0,-1) 0\n\
        0 0 0 (0.5)\n\
        \n\
        2 3 0 1 4 5\n\
        0 1 2 3 4 5\n";

    #[test]
    fn complex_forms() {
        assert_eq!(parse_complex("(1.5,-2)"), Some(Complex64::new(1.5, -2.0)));
        assert_eq!(parse_complex("(0.25)"), Some(Complex64::new(0.25, 0.0)));
        assert_eq!(parse_complex("-3"), Some(Complex64::new(-3.0, 0.0)));
        assert_eq!(parse_complex("( 1 , 2 )"), Some(Complex64::new(1.0, 2.0)));
        assert_eq!(parse_complex("(1,2"), None);
        assert_eq!(parse_complex("x"), None);
    }

    #[test]
    fn reads_header_target_and_lines() {
        let (header, target, lines) = read_batch(Cursor::new(BATCH)).unwrap();
        assert_eq!(header.ports, 4);
        assert_eq!(header.counts, ElementCounts::new(1, 0, 0));
        assert_eq!(header.node_count(), 6);
        assert_eq!(target[(1, 1)], Complex64::new(1.0, 0.0));
        assert_eq!(target[(2, 2)], Complex64::new(0.0, -1.0));
        assert_eq!(target[(3, 3)], Complex64::new(0.5, 0.0));
        let lines: Vec<_> = lines.collect::<Result<_, _>>().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 7);
        assert_eq!(lines[0].edges, vec![2, 3, 0, 1, 4, 5]);
    }

    #[test]
    fn short_edges_line_reports_its_number() {
        let text = "2 0 0 0\n1 0\n0 1\n0 1\n1\n";
        let (_, _, lines) = read_batch(Cursor::new(text)).unwrap();
        let results: Vec<_> = lines.collect();
        assert!(results[0].is_ok());
        match &results[1] {
            Err(FormatError::Malformed { line, .. }) => assert_eq!(*line, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn counts_topology_lines_without_parsing() {
        let (_, _, lines) = read_batch(Cursor::new(BATCH)).unwrap();
        assert_eq!(lines.count_remaining().unwrap(), 2);
        let bad = format!("{BATCH}\n1 2 x\n");
        let (_, _, lines) = read_batch(Cursor::new(bad)).unwrap();
        assert_eq!(lines.count_remaining().unwrap(), 3);
    }

    #[test]
    fn header_and_matrix_errors() {
        assert!(matches!(read_batch(Cursor::new("\n\n")), Err(FormatError::Empty)));
        assert!(matches!(
            read_batch(Cursor::new("4 1 0\n")),
            Err(FormatError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            read_batch(Cursor::new("2 0 0 0\n1 0\n")),
            Err(FormatError::TargetRows { expected: 2, got: 1 })
        ));
        assert!(matches!(
            read_batch(Cursor::new("2 0 0 0\n1 0 0\n0 1\n")),
            Err(FormatError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn reads_matrix_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "(0,1) 0\n\n0 (0,1)").unwrap();
        let file = std::fs::File::open(f.path()).unwrap();
        let m = read_matrix(std::io::BufReader::new(file), 2).unwrap();
        assert_eq!(m[(0, 0)], Complex64::new(0.0, 1.0));
        assert_eq!(m[(1, 1)], Complex64::new(0.0, 1.0));
        assert_eq!(m[(0, 1)], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn edges_format_is_space_separated() {
        assert_eq!(format_edges(&[3, 10, 0]), "3 10 0");
        assert_eq!(format_edges(&[]), "");
    }

    #[test]
    fn sift_args_exit_codes() {
        let too_few = SiftArgs::parse(&["4", "1", "0"]).unwrap_err();
        assert_eq!(too_few.exit_code(), 1);
        let missing = SiftArgs::parse(&["2", "1", "0", "0"]).unwrap_err();
        assert_eq!(missing.exit_code(), 2);
        let partial = SiftArgs::parse(&["2", "1", "0", "0", "1", "0"]).unwrap_err();
        assert_eq!(partial, SiftArgsError::MatrixIncomplete { expected: 4, got: 2 });
        assert_eq!(partial.exit_code(), 3);
        let bad = SiftArgs::parse(&["2", "x", "0", "0"]).unwrap_err();
        assert_eq!(bad.exit_code(), 4);
    }

    #[test]
    fn oversized_sift_args_are_rejected() {
        let max = usize::MAX.to_string();
        let half = (usize::MAX / 2).to_string();
        let wide = SiftArgs::parse(&[max.as_str(), "1", "0", "0"]).unwrap_err();
        assert!(matches!(wide, SiftArgsError::TooLarge { .. }));
        assert_eq!(wide.exit_code(), 5);
        let squared = SiftArgs::parse(&["4294967296", "1", "0", "0"]).unwrap_err();
        assert_eq!(squared.exit_code(), 5);
        let elements = SiftArgs::parse(&["4", half.as_str(), "1", "0"]).unwrap_err();
        assert_eq!(
            elements,
            SiftArgsError::TooLarge {
                ports: 4,
                elements: [usize::MAX / 2, 1, 0],
            }
        );
    }

    #[test]
    fn oversized_header_is_malformed() {
        let text = format!("4 {} 0 2\n", usize::MAX / 2);
        assert!(matches!(
            read_batch(Cursor::new(text)),
            Err(FormatError::Malformed { line: 1, .. })
        ));
        let text = format!("{} 0 0 0\n", usize::MAX);
        assert!(matches!(
            read_batch(Cursor::new(text)),
            Err(FormatError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn sift_args_row_major_mask() {
        let mut args: Vec<String> = ["4", "3", "0", "0"].iter().map(|s| s.to_string()).collect();
        let mut bits = vec!["1"; 16];
        bits[1] = "0"; // row 0, column 1
        bits[8] = "0"; // row 2, column 0
        args.extend(bits.iter().map(|s| s.to_string()));
        let sa = SiftArgs::parse(&args).unwrap();
        assert_eq!(sa.node_count(), 10);
        let mask = sa.mask();
        assert!(!mask.get(0, 1));
        assert!(!mask.get(2, 0));
        assert!(mask.get(1, 0));
        assert!(mask.get(3, 3));
    }
}
