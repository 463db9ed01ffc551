//! PLA (Programmable Logic Array) file support (§6 "PLA file format").
//!
//! Grounded on `espresso-logic`'s `src/pla.rs`: the same directive-driven
//! line reader (`.i`/`.o`/`.p`/`.e`, `#` comments, blank lines skipped), cut
//! down to what this engine needs — PLA cubes are always boolean (`spec.md`
//! §6 restricts product-line characters to `{0,1,-}`), so reading builds a
//! fresh [`Manager::new_bdd`] and one [`Diagram`] per output column rather
//! than the teacher's dynamic `Cover`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::apply::{Fold, Op};
use crate::diagram::Diagram;
use crate::error::{PlaError, PlaReadError, PlaWriteError};
use crate::manager::Manager;

fn parse_directive(parts: &[&str], key: &str) -> Result<usize, PlaError> {
    parts
        .get(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| PlaError::InvalidDirective {
            key: key.to_string(),
            value: parts.get(1).copied().unwrap_or("").to_string(),
        })
}

/// Splits a product line into its input/output halves, accepting either a
/// single `ni+no`-character token or two whitespace-separated tokens.
fn split_cube(parts: &[&str], ni: usize, no: usize) -> Result<(String, String), PlaError> {
    match parts {
        [a, b] => Ok((a.to_string(), b.to_string())),
        [joined] if joined.len() == ni + no => {
            let (i, o) = joined.split_at(ni);
            Ok((i.to_string(), o.to_string()))
        }
        _ => Err(PlaError::CubeDimensionMismatch {
            expected: (ni, no),
            actual: (parts.first().map_or(0, |s| s.len()), parts.get(1).map_or(0, |s| s.len())),
        }),
    }
}

fn literal(manager: &Manager, index: usize, ch: char) -> Result<Option<Diagram>, PlaReadError> {
    match ch {
        '1' => Ok(Some(manager.variable(index)?)),
        '0' => {
            let x = manager.variable(index)?;
            Ok(Some(manager.apply(Op::Not, &x, &x)?))
        }
        '-' => Ok(None),
        c => Err(PlaError::InvalidInputCharacter {
            character: c,
            position: index,
        }
        .into()),
    }
}

/// Reads a PLA-format two-level boolean cover, building one diagram per
/// output column: a product line contributes to column `j`'s OR-of-cubes
/// exactly when its output character at `j` is `1`. A `-` or `0` in the
/// output column means this product does not constrain that function
/// (§9 "open question (b)"), so it is simply omitted from that column's
/// term list rather than recorded as an explicit off-set entry.
pub fn from_pla_reader<R: BufRead>(
    reader: R,
    fold: Fold,
) -> Result<(Manager, Vec<Diagram>), PlaReadError> {
    let mut num_inputs: Option<usize> = None;
    let mut num_outputs: Option<usize> = None;
    let mut declared_products: Option<usize> = None;
    let mut product_lines_read: usize = 0;

    let mut manager: Option<Manager> = None;
    let mut terms: Vec<Vec<Diagram>> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('.') {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.first().copied() {
                Some(".i") => num_inputs = Some(parse_directive(&parts, ".i")?),
                Some(".o") => num_outputs = Some(parse_directive(&parts, ".o")?),
                Some(".p") => declared_products = Some(parse_directive(&parts, ".p")?),
                Some(".e") => break,
                _ => {}
            }
            continue;
        }

        let ni = num_inputs.ok_or(PlaError::MissingInputDirective)?;
        let no = num_outputs.ok_or(PlaError::MissingOutputDirective)?;
        let m = match &manager {
            Some(m) => m.clone(),
            None => {
                let m = Manager::new_bdd(ni, None)?;
                terms = vec![Vec::new(); no];
                manager = Some(m.clone());
                m
            }
        };

        let parts: Vec<&str> = line.split_whitespace().collect();
        let (input_str, output_str) = split_cube(&parts, ni, no)?;
        if input_str.len() != ni || output_str.len() != no {
            return Err(PlaError::CubeDimensionMismatch {
                expected: (ni, no),
                actual: (input_str.len(), output_str.len()),
            }
            .into());
        }

        let mut literals = Vec::new();
        for (pos, ch) in input_str.chars().enumerate() {
            if let Some(lit) = literal(&m, pos, ch)? {
                literals.push(lit);
            }
        }
        let cube = if literals.is_empty() {
            m.constant(1)?
        } else {
            m.fold(Op::And, &literals, fold)?
        };

        for (j, ch) in output_str.chars().enumerate() {
            match ch {
                '1' => terms[j].push(cube.clone()),
                '0' | '-' => {}
                c => {
                    return Err(PlaError::InvalidOutputCharacter {
                        character: c,
                        position: j,
                    }
                    .into())
                }
            }
        }
        product_lines_read += 1;
    }

    let manager = manager.ok_or(PlaError::MissingInputDirective)?;
    if let Some(declared) = declared_products {
        if declared != product_lines_read {
            return Err(PlaError::ProductCountMismatch {
                declared,
                actual: product_lines_read,
            }
            .into());
        }
    }

    let outputs = terms
        .into_iter()
        .map(|column| {
            if column.is_empty() {
                manager.constant(0).map_err(PlaReadError::from)
            } else {
                manager.fold(Op::Or, &column, fold).map_err(PlaReadError::from)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((manager, outputs))
}

/// Convenience wrapper over [`from_pla_reader`] for an in-memory string.
pub fn from_pla_str(s: &str, fold: Fold) -> Result<(Manager, Vec<Diagram>), PlaReadError> {
    from_pla_reader(s.as_bytes(), fold)
}

/// Convenience wrapper over [`from_pla_reader`] for a file path.
pub fn from_pla_file<P: AsRef<Path>>(path: P, fold: Fold) -> Result<(Manager, Vec<Diagram>), PlaReadError> {
    let file = File::open(path)?;
    from_pla_reader(BufReader::new(file), fold)
}

/// Writes `outputs` as a PLA cover: one product line per on-set point of
/// each output column, all other columns `0` on that line. Not a minimizer
/// — every point `satisfy_all` enumerates becomes its own line.
pub fn to_pla_writer<W: Write>(manager: &Manager, outputs: &[Diagram], w: &mut W) -> Result<(), PlaWriteError> {
    let ni = manager.var_count();
    let no = outputs.len();
    let mut lines: Vec<(Vec<u32>, usize)> = Vec::new();
    for (j, f) in outputs.iter().enumerate() {
        for row in manager.satisfy_all(f, 1)? {
            lines.push((row, j));
        }
    }
    writeln!(w, ".i {}", ni)?;
    writeln!(w, ".o {}", no)?;
    writeln!(w, ".p {}", lines.len())?;
    for (row, j) in &lines {
        let input_str: String = row.iter().map(|&v| if v == 1 { '1' } else { '0' }).collect();
        let mut output_chars = vec!['0'; no];
        output_chars[*j] = '1';
        writeln!(w, "{} {}", input_str, output_chars.into_iter().collect::<String>())?;
    }
    writeln!(w, ".e")?;
    Ok(())
}

/// Convenience wrapper over [`to_pla_writer`] for a file path.
pub fn to_pla_file<P: AsRef<Path>>(manager: &Manager, outputs: &[Diagram], path: P) -> Result<(), PlaWriteError> {
    let file = File::create(path)?;
    to_pla_writer(manager, outputs, &mut BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Value;

    #[test]
    fn reads_a_single_output_cover_and_matches_the_on_set() {
        let pla = ".i 3\n.o 1\n.p 2\n10- 1\n-11 1\n.e\n";
        let (m, outputs) = from_pla_str(pla, Fold::Tree).unwrap();
        let f = &outputs[0];
        assert_eq!(m.evaluate(f, &[1, 0, 0]).unwrap(), Value::Val(1));
        assert_eq!(m.evaluate(f, &[1, 0, 1]).unwrap(), Value::Val(1));
        assert_eq!(m.evaluate(f, &[0, 1, 1]).unwrap(), Value::Val(1));
        assert_eq!(m.evaluate(f, &[0, 0, 0]).unwrap(), Value::Val(0));
    }

    #[test]
    fn product_count_mismatch_is_rejected() {
        let pla = ".i 1\n.o 1\n.p 2\n1 1\n.e\n";
        let err = from_pla_str(pla, Fold::Left).unwrap_err();
        assert!(matches!(err, PlaReadError::Pla(PlaError::ProductCountMismatch { .. })));
    }

    #[test]
    fn round_trips_through_a_file() {
        let pla = ".i 2\n.o 2\n.p 2\n01 10\n10 01\n.e\n";
        let (m, outputs) = from_pla_str(pla, Fold::Tree).unwrap();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        to_pla_file(&m, &outputs, tmp.path()).unwrap();
        let (m2, outputs2) = from_pla_file(tmp.path(), Fold::Tree).unwrap();
        for x in [[0u32, 1], [1, 0], [0, 0], [1, 1]] {
            for j in 0..2 {
                assert_eq!(
                    m.evaluate(&outputs[j], &x).unwrap(),
                    m2.evaluate(&outputs2[j], &x).unwrap()
                );
            }
        }
    }
}
