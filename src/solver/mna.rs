//! MNA system assembly.
//!
//! [`Stamper`] is the only way devices write into the coefficient system.
//! Every helper goes through [`Stamper::stamp_a`] / [`Stamper::stamp_b`], so
//! dropping ground contributions and rejecting non-finite values happens in
//! exactly one place.

use crate::circuit::{BranchId, MatrixIndex, NodeId};
use crate::error::{Result, VoltaicError};

use super::linalg::{self, DenseMatrix};

/// MNA matrix system Ax = b.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    /// Coefficient matrix A
    pub a: DenseMatrix,
    /// Right-hand side b
    pub b: Vec<f64>,
}

impl MnaSystem {
    /// Create a zeroed system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: DenseMatrix::zeros(size),
            b: vec![0.0; size],
        }
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.b.len()
    }

    /// Clear the matrix and vector to zero.
    pub fn clear(&mut self) {
        self.a.clear();
        self.b.fill(0.0);
    }

    /// Add `value` to every diagonal entry.
    pub fn add_diagonal(&mut self, value: f64) {
        for i in 0..self.size() {
            self.a.add(i, i, value);
        }
    }

    /// Solve the assembled system, consuming a copy of the matrix.
    pub fn solve(&self) -> Result<Vec<f64>> {
        let mut a = self.a.clone();
        let mut x = self.b.clone();
        linalg::solve_in_place(&mut a, &mut x)?;
        Ok(x)
    }
}

/// Write access to an [`MnaSystem`] for one stamping pass.
pub struct Stamper<'a> {
    system: &'a mut MnaSystem,
    source_factor: f64,
    gmin: f64,
}

impl<'a> Stamper<'a> {
    /// Wrap a system. `source_factor` scales independent sources; `gmin` is
    /// the conductance floor devices put across their junctions.
    pub fn new(system: &'a mut MnaSystem, source_factor: f64, gmin: f64) -> Self {
        Self {
            system,
            source_factor,
            gmin,
        }
    }

    /// Scale applied to independent sources (1 outside source stepping).
    pub fn source_factor(&self) -> f64 {
        self.source_factor
    }

    /// Minimum junction conductance.
    pub fn gmin(&self) -> f64 {
        self.gmin
    }

    /// Add to A[i, j]. Dropped when either index is ground.
    pub fn stamp_a(&mut self, i: impl MatrixIndex, j: impl MatrixIndex, value: f64) -> Result<()> {
        if let (Some(r), Some(c)) = (i.row(), j.row()) {
            if !value.is_finite() {
                return Err(VoltaicError::overflow(format!("A[{r},{c}]"), value));
            }
            self.system.a.add(r, c, value);
        }
        Ok(())
    }

    /// Add to b[i]. Dropped when the index is ground.
    pub fn stamp_b(&mut self, i: impl MatrixIndex, value: f64) -> Result<()> {
        if let Some(r) = i.row() {
            if !value.is_finite() {
                return Err(VoltaicError::overflow(format!("b[{r}]"), value));
            }
            self.system.b[r] += value;
        }
        Ok(())
    }

    /// Stamp a conductance between two nodes.
    ///   A[n1,n1] += g, A[n2,n2] += g, A[n1,n2] -= g, A[n2,n1] -= g
    pub fn stamp_conductance(&mut self, n1: NodeId, n2: NodeId, g: f64) -> Result<()> {
        self.stamp_a(n1, n1, g)?;
        self.stamp_a(n1, n2, -g)?;
        self.stamp_a(n2, n1, -g)?;
        self.stamp_a(n2, n2, g)
    }

    /// Stamp a VCCS: a current `gm * (V[n3] - V[n4])` flowing from n1
    /// through the device to n2.
    pub fn stamp_transconductance(
        &mut self,
        n1: NodeId,
        n2: NodeId,
        n3: NodeId,
        n4: NodeId,
        gm: f64,
    ) -> Result<()> {
        self.stamp_a(n1, n3, gm)?;
        self.stamp_a(n1, n4, -gm)?;
        self.stamp_a(n2, n3, -gm)?;
        self.stamp_a(n2, n4, gm)
    }

    /// Stamp the coupling of a branch current and the constraint
    /// V[n1] - V[n2] = v. `v` is used as given; independent sources scale
    /// it by [`Stamper::source_factor`] themselves.
    pub fn stamp_voltage_source(&mut self, n1: NodeId, n2: NodeId, branch: BranchId, v: f64) -> Result<()> {
        self.stamp_a(n1, branch, 1.0)?;
        self.stamp_a(branch, n1, 1.0)?;
        self.stamp_a(n2, branch, -1.0)?;
        self.stamp_a(branch, n2, -1.0)?;
        self.stamp_b(branch, v)
    }

    /// Stamp a fixed current flowing from n1 through the device to n2.
    pub fn stamp_current_source(&mut self, n1: NodeId, n2: NodeId, i: f64) -> Result<()> {
        self.stamp_b(n1, -i)?;
        self.stamp_b(n2, i)
    }
}
