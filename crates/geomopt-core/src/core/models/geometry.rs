use nalgebra::{DVector, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GeometryError {
    #[error("Coordinate vector length {0} is not a multiple of 3")]
    NotAtomSized(usize),

    #[error("A geometry must contain at least one atom")]
    Empty,

    #[error("Displacement dimension {actual} does not match geometry dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Atomic positions flattened to a single coordinate vector.
///
/// Atom `i` occupies components `3i..3i + 3`, in the same ordering as the
/// force vectors supplied by the solver. The flattened layout is fixed at
/// construction; every relaxation step mutates it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    coords: DVector<f64>,
}

impl Geometry {
    pub fn new(coords: DVector<f64>) -> Result<Self, GeometryError> {
        if coords.is_empty() {
            return Err(GeometryError::Empty);
        }
        if coords.len() % 3 != 0 {
            return Err(GeometryError::NotAtomSized(coords.len()));
        }
        Ok(Self { coords })
    }

    pub fn from_positions(positions: &[[f64; 3]]) -> Result<Self, GeometryError> {
        if positions.is_empty() {
            return Err(GeometryError::Empty);
        }
        let coords = DVector::from_iterator(
            positions.len() * 3,
            positions.iter().flat_map(|p| p.iter().copied()),
        );
        Ok(Self { coords })
    }

    pub fn atom_count(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    pub fn coords(&self) -> &DVector<f64> {
        &self.coords
    }

    pub fn position(&self, atom: usize) -> Vector3<f64> {
        let base = atom * 3;
        Vector3::new(
            self.coords[base],
            self.coords[base + 1],
            self.coords[base + 2],
        )
    }

    /// Applies a displacement in place.
    pub fn displace(&mut self, displacement: &DVector<f64>) -> Result<(), GeometryError> {
        if displacement.len() != self.coords.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.coords.len(),
                actual: displacement.len(),
            });
        }
        self.coords += displacement;
        Ok(())
    }
}
