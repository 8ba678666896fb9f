//! Dense linear algebra: row-major matrix, Gaussian elimination and LU
//! factorization, both with partial pivoting.

use crate::error::{Result, VoltaicError};

/// Pivots smaller than this are treated as zero.
const PIVOT_EPSILON: f64 = 1e-300;

/// Dense square matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DenseMatrix {
    /// Create a zeroed `size x size` matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Build a matrix from rows. Fails if the rows do not form a square.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        let mut m = Self::zeros(size);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(VoltaicError::DimensionMismatch {
                    expected: size,
                    found: row.len(),
                });
            }
            m.data[i * size..(i + 1) * size].copy_from_slice(row);
        }
        Ok(m)
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Set every entry to zero.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] += value;
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len(self.size, x.len())?;
        let n = self.size;
        Ok((0..n)
            .map(|i| (0..n).map(|j| self.data[i * n + j] * x[j]).sum())
            .collect())
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let n = self.size;
        for j in 0..n {
            self.data.swap(a * n + j, b * n + j);
        }
    }

    /// Row index of the largest |value| in column `k` at or below the diagonal.
    fn pivot_row(&self, k: usize) -> (usize, f64) {
        let n = self.size;
        let mut max_row = k;
        let mut max_val = self.data[k * n + k].abs();
        for i in (k + 1)..n {
            let val = self.data[i * n + k].abs();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }
        (max_row, max_val)
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(VoltaicError::DimensionMismatch { expected, found });
    }
    Ok(())
}

fn check_finite(value: f64, row: usize) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(VoltaicError::overflow(format!("solution row {row}"), value))
    }
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// Both `a` and `b` are overwritten; on success `b` holds `x`.
pub fn solve_in_place(a: &mut DenseMatrix, b: &mut [f64]) -> Result<()> {
    let n = a.size;
    check_len(n, b.len())?;

    for k in 0..n {
        let (max_row, max_val) = a.pivot_row(k);
        if !max_val.is_finite() {
            return Err(VoltaicError::overflow(format!("pivot column {k}"), max_val));
        }
        if max_val < PIVOT_EPSILON {
            return Err(VoltaicError::SingularMatrix { column: k });
        }
        if max_row != k {
            a.swap_rows(k, max_row);
            b.swap(k, max_row);
        }

        let pivot = a.data[k * n + k];
        for i in (k + 1)..n {
            let factor = a.data[i * n + k] / pivot;
            if factor == 0.0 {
                continue;
            }
            a.data[i * n + k] = 0.0;
            for j in (k + 1)..n {
                a.data[i * n + j] -= factor * a.data[k * n + j];
            }
            b[i] -= factor * b[k];
        }
    }

    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a.data[i * n + j] * b[j];
        }
        b[i] = check_finite(sum / a.data[i * n + i], i)?;
    }

    Ok(())
}

/// Reusable LU factorization `P A = L U`.
#[derive(Debug, Clone)]
pub struct LuSolver {
    lu: DenseMatrix,
    pivots: Vec<usize>,
}

impl LuSolver {
    /// Factor `a` with partial pivoting. `a` itself is left untouched.
    pub fn factor(a: &DenseMatrix) -> Result<Self> {
        let n = a.size;
        let mut lu = a.clone();
        let mut pivots: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let (max_row, max_val) = lu.pivot_row(k);
            if !max_val.is_finite() {
                return Err(VoltaicError::overflow(format!("pivot column {k}"), max_val));
            }
            if max_val < PIVOT_EPSILON {
                return Err(VoltaicError::SingularMatrix { column: k });
            }
            if max_row != k {
                pivots.swap(k, max_row);
                lu.swap_rows(k, max_row);
            }

            let pivot = lu.data[k * n + k];
            for i in (k + 1)..n {
                let factor = lu.data[i * n + k] / pivot;
                lu.data[i * n + k] = factor;
                for j in (k + 1)..n {
                    lu.data[i * n + j] -= factor * lu.data[k * n + j];
                }
            }
        }

        Ok(Self { lu, pivots })
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.lu.size
    }

    /// Solve `A x = b` using the stored factors.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let n = self.lu.size;
        check_len(n, b.len())?;
        let lu = &self.lu.data;

        // Forward substitution (L * y = Pb)
        let mut x: Vec<f64> = self.pivots.iter().map(|&p| b[p]).collect();
        for i in 0..n {
            for j in 0..i {
                x[i] -= lu[i * n + j] * x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                x[i] -= lu[i * n + j] * x[j];
            }
            x[i] = check_finite(x[i] / lu[i * n + i], i)?;
        }

        Ok(x)
    }
}
