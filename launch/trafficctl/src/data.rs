// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! CSV speed matrices as the trainer consumes them.
//!
//! Layout: a header row of integer sensor ids, then one row per timestep
//! with one speed reading per sensor. Blank cells repeat the last seen value
//! in the same column; a column must not start blank.

use std::path::Path;

use anyhow::{bail, Context, Result};

pub struct SpeedMatrix {
    sensor_ids: Vec<i64>,
    rows: Vec<Vec<f64>>,
}

impl SpeedMatrix {
    pub fn load_csv(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read speed matrix {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("failed to parse speed matrix {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let header = match lines.next() {
            Some(header) => header,
            None => bail!("empty file"),
        };
        let sensor_ids = header
            .split(',')
            .enumerate()
            .map(|(idx, cell)| {
                cell.trim()
                    .parse::<i64>()
                    .with_context(|| format!("header column {idx} is not a sensor id: {cell:?}"))
            })
            .collect::<Result<Vec<i64>>>()?;

        let mut rows: Vec<Vec<f64>> = Vec::new();
        // last seen value per column, for forward fill
        let mut last_seen: Vec<Option<f64>> = vec![None; sensor_ids.len()];
        for (line_no, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != sensor_ids.len() {
                bail!(
                    "row {} has {} cells, header has {} sensors",
                    line_no + 2,
                    cells.len(),
                    sensor_ids.len()
                );
            }

            let mut row = Vec::with_capacity(cells.len());
            for (col, cell) in cells.iter().enumerate() {
                let cell = cell.trim();
                let value = if cell.is_empty() {
                    match last_seen[col] {
                        Some(value) => value,
                        None => bail!(
                            "row {} column {} is blank with no prior value",
                            line_no + 2,
                            col
                        ),
                    }
                } else {
                    cell.parse::<f64>().with_context(|| {
                        format!("row {} column {} is not a number: {cell:?}", line_no + 2, col)
                    })?
                };
                last_seen[col] = Some(value);
                row.push(value);
            }
            rows.push(row);
        }

        Ok(Self { sensor_ids, rows })
    }

    pub fn sensor_ids(&self) -> &[i64] {
        &self.sensor_ids
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// All readings of one sensor column, in timestep order.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[col]).collect()
    }
}
