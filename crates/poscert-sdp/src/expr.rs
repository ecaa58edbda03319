//! One row of the SDP: a linear expression in matrix and scalar unknowns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SdpError;

/// How the expression relates to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConditionKind {
    Eq,
    Geq,
    /// `|expr| <= range`, used to soften exact equalities for interior
    /// point solvers.
    InRange(f64),
}

/// `sum_i <C_i, X_i> + sum_j c_j * s_j + constant  (kind)  0`, where the
/// `X_i` are shared PSD matrix unknowns and the `s_j` are free scalars.
/// Matrix coefficients are stored symmetrized: an off-diagonal contribution
/// is split evenly across the two mirror cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearMatrixExpression {
    matrix_size: usize,
    matrix_coefficients: BTreeMap<usize, Vec<Vec<f64>>>,
    free_coefficients: BTreeMap<usize, f64>,
    constant: f64,
    kind: Option<ConditionKind>,
}

impl LinearMatrixExpression {
    pub fn new(matrix_size: usize) -> Self {
        Self {
            matrix_size,
            matrix_coefficients: BTreeMap::new(),
            free_coefficients: BTreeMap::new(),
            constant: 0.0,
            kind: None,
        }
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix_size
    }

    pub fn add_matrix_entry(
        &mut self,
        matrix: usize,
        row: usize,
        col: usize,
        coefficient: f64,
    ) -> Result<(), SdpError> {
        if row >= self.matrix_size || col >= self.matrix_size {
            return Err(SdpError::IndexOutOfRange {
                row,
                col,
                size: self.matrix_size,
            });
        }
        let cells = self
            .matrix_coefficients
            .entry(matrix)
            .or_insert_with(|| vec![vec![0.0; self.matrix_size]; self.matrix_size]);
        if row == col {
            cells[row][col] += coefficient;
        } else {
            cells[row][col] += coefficient / 2.0;
            cells[col][row] += coefficient / 2.0;
        }
        Ok(())
    }

    pub fn add_free_coefficient(&mut self, scalar: usize, coefficient: f64) {
        *self.free_coefficients.entry(scalar).or_insert(0.0) += coefficient;
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn set_kind(&mut self, kind: ConditionKind) {
        self.kind = Some(kind);
    }

    pub fn kind(&self) -> Option<ConditionKind> {
        self.kind
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn matrix_coefficients(&self) -> &BTreeMap<usize, Vec<Vec<f64>>> {
        &self.matrix_coefficients
    }

    pub fn free_coefficients(&self) -> &BTreeMap<usize, f64> {
        &self.free_coefficients
    }

    /// Plugs a candidate solution into the left-hand side.
    pub fn evaluate(&self, matrices: &[Vec<Vec<f64>>], scalars: &[f64]) -> f64 {
        let mut result = self.constant;
        for (&index, cells) in &self.matrix_coefficients {
            for (row, cell_row) in cells.iter().enumerate() {
                for (col, cell) in cell_row.iter().enumerate() {
                    result += cell * matrices[index][row][col];
                }
            }
        }
        for (&index, coefficient) in &self.free_coefficients {
            result += coefficient * scalars[index];
        }
        result
    }
}
