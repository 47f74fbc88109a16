/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Matrices assembled from blocks of other matrices.

use crate::{Invertible, Matrix, MatrixError, Operator, PositiveDefinite, Result, Shape, Square, Structure, Symmetric, Transpose};
use crate::memo::{known_size, memoize, stack_cols, stack_rows};

use std::fmt;

use ndarray::{s, Array1, Array2, ArrayView2};
use once_cell::sync::OnceCell;
use strumat_linalg as backend;

/// A square matrix with nonzero entries only in square blocks along its diagonal.
///
/// The blocks all carry at least the capabilities named by the [`Structure`]; the
/// matrix is invertible exactly when all of its blocks are.
#[derive(Debug)]
pub struct BlockDiagonal {
    blocks: Vec<Matrix>,
    sizes: Vec<usize>,
    structure: Structure,
    invertible: bool,
    array: OnceCell<Array2<f64>>,
}

impl BlockDiagonal {
    pub fn square(blocks: Vec<Matrix>) -> Result<Matrix> {
        BlockDiagonal::new(blocks, Structure::Square)
    }

    pub fn symmetric(blocks: Vec<Matrix>) -> Result<Matrix> {
        BlockDiagonal::new(blocks, Structure::Symmetric)
    }

    pub fn positive_definite(blocks: Vec<Matrix>) -> Result<Matrix> {
        BlockDiagonal::new(blocks, Structure::PositiveDefinite)
    }

    pub fn new(blocks: Vec<Matrix>, structure: Structure) -> Result<Matrix> {
        if blocks.is_empty() {
            return Err(invalid!("block diagonal matrix needs at least one block"));
        }
        for block in &blocks {
            let ok = match structure {
                Structure::Square => block.is_square(),
                Structure::Symmetric => block.is_symmetric(),
                Structure::PositiveDefinite => block.is_positive_definite(),
            };
            if !ok {
                return Err(invalid!("all blocks must be {} (got {})", structure_name(structure), block));
            }
        }
        let sizes = blocks.iter()
            .map(|block| known_size(block.shape(), "block diagonal block"))
            .collect::<Result<Vec<_>>>()?;
        let invertible = blocks.iter().all(Matrix::is_invertible);
        Ok(BlockDiagonal { blocks, sizes, structure, invertible, array: OnceCell::new() }.into())
    }

    pub fn blocks(&self) -> &[Matrix] { &self.blocks }

    pub fn structure(&self) -> Structure { self.structure }

    pub fn is_invertible(&self) -> bool { self.invertible }

    fn map_blocks(&self, structure: Structure, func: impl FnMut(&Matrix) -> Result<Matrix>) -> Result<Matrix> {
        let blocks = self.blocks.iter().map(func).collect::<Result<Vec<_>>>()?;
        BlockDiagonal::new(blocks, structure)
    }

    fn size(&self) -> usize { self.sizes.iter().sum() }
}

fn structure_name(structure: Structure) -> &'static str {
    match structure {
        Structure::Square => "square",
        Structure::Symmetric => "symmetric",
        Structure::PositiveDefinite => "positive definite",
    }
}

impl Operator for BlockDiagonal {
    fn kind(&self) -> &'static str {
        match self.structure {
            Structure::Square => "SquareBlockDiagonal",
            Structure::Symmetric => "SymmetricBlockDiagonal",
            Structure::PositiveDefinite => "PositiveDefiniteBlockDiagonal",
        }
    }

    fn shape(&self) -> Shape { (Some(self.size()), Some(self.size())) }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "block diagonal array", || {
            let arrays = self.blocks.iter().map(|b| b.array()).collect::<Result<Vec<_>>>()?;
            let views = arrays.iter().map(|a| a.view()).collect::<Vec<_>>();
            Ok(backend::block_diag(&views))
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        stack_rows(&self.sizes, other, other.ncols(), |index, part| self.blocks[index].dot(part))
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        stack_cols(&self.sizes, other, other.nrows(), |index, part| self.blocks[index].rdot(part))
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        self.map_blocks(self.structure.scaled(scalar), |block| block.scale(scalar))
    }

    fn diagonal(&self) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(self.size());
        let mut start = 0;
        for (block, &size) in self.blocks.iter().zip(&self.sizes) {
            out.slice_mut(s![start..start + size]).assign(&block.diagonal()?);
            start += size;
        }
        Ok(out)
    }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", blocks={}", self.blocks.len())
    }
}

impl Transpose for BlockDiagonal {
    fn transpose(&self) -> Result<Matrix> {
        self.map_blocks(self.structure, Matrix::transpose)
    }
}

impl Square for BlockDiagonal {
    fn log_abs_det(&self) -> Result<f64> {
        self.blocks.iter().map(Matrix::log_abs_det).sum()
    }
}

impl Invertible for BlockDiagonal {
    fn inv(&self) -> Result<Matrix> {
        self.map_blocks(self.structure, Matrix::inv)
    }
}

impl Symmetric for BlockDiagonal {
    fn eigval(&self) -> Result<Array1<f64>> {
        let mut out = Vec::with_capacity(self.size());
        for block in &self.blocks {
            out.extend(block.eigval()?.iter().cloned());
        }
        Ok(Array1::from(out))
    }

    fn eigvec(&self) -> Result<Matrix> {
        self.map_blocks(Structure::Square, Matrix::eigvec)
    }
}

impl PositiveDefinite for BlockDiagonal {
    /// Block-wise square root.
    ///
    /// Every block's root must itself be square, so this fails with
    /// [`MatrixError::Invalid`] when a block's root is a product chain
    /// (e.g. a positive definite `LowRankUpdate`).
    fn sqrt(&self) -> Result<Matrix> {
        self.map_blocks(Structure::Square, Matrix::sqrt)
    }
}

//---------------------------------------------------------

/// An explicit dense matrix of any shape.
#[derive(Debug)]
pub struct DenseRectangular {
    array: Array2<f64>,
}

impl DenseRectangular {
    pub fn new(array: Array2<f64>) -> Matrix {
        DenseRectangular { array }.into()
    }
}

impl Operator for DenseRectangular {
    fn kind(&self) -> &'static str { "DenseRectangular" }

    fn shape(&self) -> Shape {
        let (r, c) = self.array.dim();
        (Some(r), Some(c))
    }

    fn array(&self) -> Result<&Array2<f64>> { Ok(&self.array) }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(self.array.dot(&other)) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.dot(&self.array)) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        Ok(DenseRectangular::new(&self.array * scalar))
    }
}

impl Transpose for DenseRectangular {
    fn transpose(&self) -> Result<Matrix> {
        Ok(DenseRectangular::new(self.array.t().to_owned()))
    }
}

//---------------------------------------------------------

fn known_shapes(blocks: &[Matrix]) -> Result<Vec<(usize, usize)>> {
    if blocks.is_empty() {
        return Err(invalid!("block matrix needs at least one block"));
    }
    blocks.iter()
        .map(|block| match block.shape() {
            (Some(r), Some(c)) => Ok((r, c)),
            _ => Err(MatrixError::ImplicitSize { what: "block" }),
        })
        .collect()
}

/// Horizontal concatenation of blocks with a common number of rows.
#[derive(Debug)]
pub struct BlockRow {
    blocks: Vec<Matrix>,
    rows: usize,
    widths: Vec<usize>,
    array: OnceCell<Array2<f64>>,
}

impl BlockRow {
    pub fn new(blocks: Vec<Matrix>) -> Result<Matrix> {
        let shapes = known_shapes(&blocks)?;
        let rows = shapes[0].0;
        if let Some(&(r, _)) = shapes.iter().find(|&&(r, _)| r != rows) {
            return Err(invalid!("all blocks must have the same number of rows ({} != {})", r, rows));
        }
        let widths = shapes.iter().map(|&(_, c)| c).collect();
        Ok(BlockRow { blocks, rows, widths, array: OnceCell::new() }.into())
    }

    pub fn blocks(&self) -> &[Matrix] { &self.blocks }

    fn cols(&self) -> usize { self.widths.iter().sum() }
}

impl Operator for BlockRow {
    fn kind(&self) -> &'static str { "BlockRow" }

    fn shape(&self) -> Shape { (Some(self.rows), Some(self.cols())) }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "block row array", || {
            let eye = Array2::eye(self.rows);
            self.right_multiply(eye.view())
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((self.rows, other.ncols()));
        let mut start = 0;
        for (block, &width) in self.blocks.iter().zip(&self.widths) {
            out += &block.dot(other.slice(s![start..start + width, ..]))?;
            start += width;
        }
        Ok(out)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((other.nrows(), self.cols()));
        let mut start = 0;
        for (block, &width) in self.blocks.iter().zip(&self.widths) {
            out.slice_mut(s![.., start..start + width]).assign(&block.rdot(other)?);
            start += width;
        }
        Ok(out)
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let blocks = self.blocks.iter().map(|b| b.scale(scalar)).collect::<Result<Vec<_>>>()?;
        BlockRow::new(blocks)
    }
}

impl Transpose for BlockRow {
    fn transpose(&self) -> Result<Matrix> {
        let blocks = self.blocks.iter().map(Matrix::transpose).collect::<Result<Vec<_>>>()?;
        BlockColumn::new(blocks)
    }
}

/// Vertical concatenation of blocks with a common number of columns.
#[derive(Debug)]
pub struct BlockColumn {
    blocks: Vec<Matrix>,
    heights: Vec<usize>,
    cols: usize,
    array: OnceCell<Array2<f64>>,
}

impl BlockColumn {
    pub fn new(blocks: Vec<Matrix>) -> Result<Matrix> {
        let shapes = known_shapes(&blocks)?;
        let cols = shapes[0].1;
        if let Some(&(_, c)) = shapes.iter().find(|&&(_, c)| c != cols) {
            return Err(invalid!("all blocks must have the same number of columns ({} != {})", c, cols));
        }
        let heights = shapes.iter().map(|&(r, _)| r).collect();
        Ok(BlockColumn { blocks, heights, cols, array: OnceCell::new() }.into())
    }

    pub fn blocks(&self) -> &[Matrix] { &self.blocks }

    fn rows(&self) -> usize { self.heights.iter().sum() }
}

impl Operator for BlockColumn {
    fn kind(&self) -> &'static str { "BlockColumn" }

    fn shape(&self) -> Shape { (Some(self.rows()), Some(self.cols)) }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "block column array", || {
            let eye = Array2::eye(self.cols);
            self.left_multiply(eye.view())
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((self.rows(), other.ncols()));
        let mut start = 0;
        for (block, &height) in self.blocks.iter().zip(&self.heights) {
            out.slice_mut(s![start..start + height, ..]).assign(&block.dot(other)?);
            start += height;
        }
        Ok(out)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((other.nrows(), self.cols));
        let mut start = 0;
        for (block, &height) in self.blocks.iter().zip(&self.heights) {
            out += &block.rdot(other.slice(s![.., start..start + height]))?;
            start += height;
        }
        Ok(out)
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let blocks = self.blocks.iter().map(|b| b.scale(scalar)).collect::<Result<Vec<_>>>()?;
        BlockColumn::new(blocks)
    }
}

impl Transpose for BlockColumn {
    fn transpose(&self) -> Result<Matrix> {
        let blocks = self.blocks.iter().map(Matrix::transpose).collect::<Result<Vec<_>>>()?;
        BlockRow::new(blocks)
    }
}
