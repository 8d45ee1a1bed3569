//! Reading-order models.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::KomaError;

/// A model that proposes a reading order for a set of rectangles.
///
/// `coords` is a list of `[a, b, w, h]` rows whose units depend on the
/// caller: pixel top-left + size for panels, normalized center + size for
/// bubbles. The result must be a permutation of `0..coords.len()`, listing
/// input positions in reading order.
pub trait Sequencer {
    fn predict(&mut self, coords: &[[f64; 4]]) -> Result<Vec<usize>, KomaError>;
}

impl<S: Sequencer + ?Sized> Sequencer for Box<S> {
    fn predict(&mut self, coords: &[[f64; 4]]) -> Result<Vec<usize>, KomaError> {
        (**self).predict(coords)
    }
}

/// Horizontal reading direction within a row.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReadingDirection {
    /// Left to right.
    #[default]
    Ltr,
    /// Right to left, as in most manga.
    Rtl,
}

/// Geometric stand-in for a learned sequencing model.
///
/// Items are taken top to bottom; an item joins the current row when it sits
/// at most `row_tolerance * mean item height` below the row's first item.
/// Each row is then read in `direction`.
#[derive(Clone, Debug)]
pub struct RowMajorSequencer {
    pub direction: ReadingDirection,
    pub row_tolerance: f64,
}

impl Default for RowMajorSequencer {
    fn default() -> Self {
        Self::new(ReadingDirection::default())
    }
}

impl RowMajorSequencer {
    pub fn new(direction: ReadingDirection) -> Self {
        Self {
            direction,
            row_tolerance: 0.5,
        }
    }

    pub fn with_row_tolerance(mut self, row_tolerance: f64) -> Self {
        self.row_tolerance = row_tolerance;
        self
    }
}

impl Sequencer for RowMajorSequencer {
    fn predict(&mut self, coords: &[[f64; 4]]) -> Result<Vec<usize>, KomaError> {
        if coords.is_empty() {
            return Ok(Vec::new());
        }

        let mean_height = coords.iter().map(|row| row[3].abs()).sum::<f64>() / coords.len() as f64;
        let tolerance = self.row_tolerance * mean_height;

        let mut by_vertical: Vec<usize> = (0..coords.len()).collect();
        by_vertical.sort_by(|&a, &b| {
            coords[a][1]
                .total_cmp(&coords[b][1])
                .then(coords[a][0].total_cmp(&coords[b][0]))
        });

        let mut rows: Vec<Vec<usize>> = Vec::new();
        let mut row_anchor = f64::NEG_INFINITY;
        for index in by_vertical {
            let y = coords[index][1];
            match rows.last_mut() {
                Some(row) if y - row_anchor <= tolerance => row.push(index),
                Some(_) | None => {
                    row_anchor = y;
                    rows.push(vec![index]);
                }
            }
        }

        let horizontal = |a: &usize, b: &usize| -> Ordering {
            let ord = coords[*a][0].total_cmp(&coords[*b][0]);
            match self.direction {
                ReadingDirection::Ltr => ord,
                ReadingDirection::Rtl => ord.reverse(),
            }
        };

        Ok(rows
            .into_iter()
            .flat_map(|mut row| {
                row.sort_by(|a, b| horizontal(a, b));
                row
            })
            .collect())
    }
}
