use crate::error::{CliError, Result};
use anyhow::anyhow;
use geomopt::core::models::geometry::Geometry;
use std::path::Path;

/// An XYZ-format structure: element symbols plus the geometry they label.
#[derive(Debug, Clone)]
pub struct XyzSystem {
    pub comment: String,
    pub elements: Vec<String>,
    pub geometry: Geometry,
}

/// Reads a structure in XYZ format: atom count, comment line, then one
/// `element x y z` line per atom.
pub fn read_xyz(path: &Path) -> Result<XyzSystem> {
    let content = std::fs::read_to_string(path)?;
    parse_xyz(&content).map_err(|source| CliError::FileParsing {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_xyz(content: &str) -> std::result::Result<XyzSystem, anyhow::Error> {
    let mut lines = content.lines();
    let count: usize = lines
        .next()
        .ok_or_else(|| anyhow!("empty file"))?
        .trim()
        .parse()
        .map_err(|_| anyhow!("first line must be the atom count"))?;
    let comment = lines.next().unwrap_or("").trim().to_string();

    let mut elements = Vec::with_capacity(count);
    let mut positions = Vec::with_capacity(count);
    for (index, line) in lines.filter(|l| !l.trim().is_empty()).enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(anyhow!("atom line {} has fewer than 4 fields", index + 1));
        }
        let parse = |f: &str| {
            f.parse::<f64>()
                .map_err(|_| anyhow!("bad coordinate '{}' on atom line {}", f, index + 1))
        };
        elements.push(fields[0].to_string());
        positions.push([parse(fields[1])?, parse(fields[2])?, parse(fields[3])?]);
    }
    if positions.len() != count {
        return Err(anyhow!(
            "header declares {} atoms but {} atom lines follow",
            count,
            positions.len()
        ));
    }

    let geometry = Geometry::from_positions(&positions)?;
    Ok(XyzSystem {
        comment,
        elements,
        geometry,
    })
}

/// Writes a structure back out in XYZ format.
pub fn write_xyz(path: &Path, system: &XyzSystem) -> Result<()> {
    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n", system.elements.len(), system.comment));
    for (index, element) in system.elements.iter().enumerate() {
        let position = system.geometry.position(index);
        out.push_str(&format!(
            "{} {:.10} {:.10} {:.10}\n",
            element, position.x, position.y, position.z
        ));
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
2
argon dimer
Ar 0.0 0.0 0.0
Ar 1.5 0.0 0.0
";

    #[test]
    fn parses_a_well_formed_file() {
        let system = parse_xyz(SAMPLE).unwrap();
        assert_eq!(system.comment, "argon dimer");
        assert_eq!(system.elements, vec!["Ar", "Ar"]);
        assert_eq!(system.geometry.atom_count(), 2);
        assert_eq!(system.geometry.position(1).x, 1.5);
    }

    #[test]
    fn rejects_a_count_mismatch() {
        let err = parse_xyz("3\ncomment\nAr 0 0 0\n").unwrap_err();
        assert!(err.to_string().contains("declares 3 atoms"));
    }

    #[test]
    fn rejects_a_malformed_coordinate() {
        let err = parse_xyz("1\ncomment\nAr 0 zero 0\n").unwrap_err();
        assert!(err.to_string().contains("bad coordinate"));
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xyz");

        let system = parse_xyz(SAMPLE).unwrap();
        write_xyz(&path, &system).unwrap();
        let reread = read_xyz(&path).unwrap();

        assert_eq!(reread.elements, system.elements);
        assert!(
            (reread.geometry.coords() - system.geometry.coords()).norm() < 1e-12
        );
    }
}
