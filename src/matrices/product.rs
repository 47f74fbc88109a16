/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Matrix, Operator, Result, ScaledIdentity, Shape, Transpose};
use crate::memo::memoize;

use ndarray::{Array2, ArrayView2};
use once_cell::sync::OnceCell;

/// A lazy chain `M1 @ M2 @ ... @ Mk`.
#[derive(Debug)]
pub struct Product {
    factors: Vec<Matrix>,
    array: OnceCell<Array2<f64>>,
}

impl Product {
    /// Adjacent factors must agree on their inner dimension (where known).
    pub fn new(factors: Vec<Matrix>) -> Result<Matrix> {
        if factors.is_empty() {
            return Err(invalid!("a product needs at least one factor"));
        }
        for pair in factors.windows(2) {
            if let (Some(c), r) = (pair[0].cols(), pair[1].rows()) {
                if r != Some(c) {
                    return Err(crate::MatrixError::DimensionMismatch {
                        left: pair[0].shape(),
                        right: pair[1].shape(),
                    });
                }
            }
        }
        Ok(Product { factors, array: OnceCell::new() }.into())
    }

    pub fn factors(&self) -> &[Matrix] { &self.factors }
}

impl Operator for Product {
    fn kind(&self) -> &'static str { "Product" }

    fn shape(&self) -> Shape {
        let first = &self.factors[0];
        let last = &self.factors[self.factors.len() - 1];
        (first.rows(), last.cols())
    }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "product array", || {
            let (head, tail) = self.factors.split_at(1);
            let mut acc = head[0].array()?.clone();
            for factor in tail {
                acc = factor.rdot(acc.view())?;
            }
            Ok(acc)
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut acc = other.to_owned();
        for factor in self.factors.iter().rev() {
            acc = factor.dot(acc.view())?;
        }
        Ok(acc)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut acc = other.to_owned();
        for factor in &self.factors {
            acc = factor.rdot(acc.view())?;
        }
        Ok(acc)
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let mut factors = vec![ScaledIdentity::new(scalar, self.shape().0)?];
        factors.extend(self.factors.iter().cloned());
        Product::new(factors)
    }
}

impl Transpose for Product {
    fn transpose(&self) -> Result<Matrix> {
        let factors = self.factors.iter().rev()
            .map(|m| m.transpose())
            .collect::<Result<Vec<_>>>()?;
        Product::new(factors)
    }
}
