// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Least-squares fitting for the artifacts the services load.

use anyhow::{bail, Result};

use smartpath_traffic::model::LinearModel;

/// Fit `y = w . x + b` by ordinary least squares over the normal equations.
///
/// All feature rows must share one width. Fails on fewer rows than unknowns
/// or a singular system.
pub fn fit_least_squares(features: &[Vec<f64>], targets: &[f64]) -> Result<LinearModel> {
    if features.len() != targets.len() {
        bail!(
            "features and targets disagree: {} rows vs {} targets",
            features.len(),
            targets.len()
        );
    }
    let Some(width) = features.first().map(|row| row.len()) else {
        bail!("cannot fit on an empty dataset");
    };
    if width == 0 {
        bail!("cannot fit on zero-width feature rows");
    }
    if features.iter().any(|row| row.len() != width) {
        bail!("feature rows have mixed widths");
    }

    // unknowns: `width` weights plus the intercept
    let n = width + 1;
    if features.len() < n {
        bail!("need at least {n} rows to fit {width} weights and an intercept");
    }

    // accumulate X^T X and X^T y over rows augmented with a constant 1
    let mut a = vec![vec![0.0; n]; n];
    let mut b = vec![0.0; n];
    for (row, &y) in features.iter().zip(targets.iter()) {
        let mut augmented = Vec::with_capacity(n);
        augmented.extend_from_slice(row);
        augmented.push(1.0);
        for i in 0..n {
            for j in 0..n {
                a[i][j] += augmented[i] * augmented[j];
            }
            b[i] += augmented[i] * y;
        }
    }

    let mut solution = solve(a, b)?;
    let intercept = solution.pop().unwrap_or(0.0);
    Ok(LinearModel::new(solution, intercept))
}

/// Fit a single-feature model `next = slope * previous + intercept` from a
/// speed series, pairing each reading with its successor.
pub fn fit_lag1(series: &[f64]) -> Result<LinearModel> {
    if series.len() < 3 {
        bail!(
            "need at least three observations for a lag-1 fit, got {}",
            series.len()
        );
    }
    let xs = &series[..series.len() - 1];
    let ys = &series[1..];

    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x - x_mean;
        sxx += dx * dx;
        sxy += dx * (y - y_mean);
    }

    if sxx == 0.0 {
        bail!("speed series is constant; a lag-1 fit is undefined");
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    Ok(LinearModel::new(vec![slope], intercept))
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        // pivot on the largest magnitude at or below the diagonal
        let mut pivot = col;
        for row in (col + 1)..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            bail!("normal equations are singular; features are collinear");
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in (row + 1)..n {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}
