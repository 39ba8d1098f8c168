use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ROW_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RackError {
    #[error("Invalid rack position label '{0}'")]
    InvalidLabel(String),
    #[error("Unknown rack shape '{0}'")]
    UnknownShape(String),
}

/// Dimensions of a plate or rack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RackShape {
    number_rows: usize,
    number_columns: usize,
}

impl RackShape {
    pub const SHAPE_96: RackShape = RackShape {
        number_rows: 8,
        number_columns: 12,
    };
    pub const SHAPE_384: RackShape = RackShape {
        number_rows: 16,
        number_columns: 24,
    };

    pub fn new(number_rows: usize, number_columns: usize) -> Self {
        Self {
            number_rows,
            number_columns,
        }
    }

    pub fn name(&self) -> String {
        format!("{}x{}", self.number_rows, self.number_columns)
    }

    pub fn number_rows(&self) -> usize {
        self.number_rows
    }

    pub fn number_columns(&self) -> usize {
        self.number_columns
    }

    pub fn size(&self) -> usize {
        self.number_rows * self.number_columns
    }

    pub fn contains(&self, position: RackPosition) -> bool {
        position.row_index < self.number_rows && position.column_index < self.number_columns
    }

    /// All positions of the shape in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = RackPosition> + '_ {
        (0..self.number_rows).flat_map(move |row| {
            (0..self.number_columns).map(move |column| RackPosition::from_indices(row, column))
        })
    }
}

impl fmt::Display for RackShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RackShape {
    type Err = RackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rows, columns) = s
            .trim()
            .split_once('x')
            .ok_or_else(|| RackError::UnknownShape(s.to_string()))?;
        let rows = rows
            .parse()
            .map_err(|_| RackError::UnknownShape(s.to_string()))?;
        let columns = columns
            .parse()
            .map_err(|_| RackError::UnknownShape(s.to_string()))?;
        Ok(Self::new(rows, columns))
    }
}

/// A well coordinate. Ordering is row-major (`A1 < A2 < B1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RackPosition {
    pub row_index: usize,
    pub column_index: usize,
}

impl RackPosition {
    pub fn from_indices(row_index: usize, column_index: usize) -> Self {
        Self {
            row_index,
            column_index,
        }
    }

    pub fn from_label(label: &str) -> Result<Self, RackError> {
        let label = label.trim();
        let mut chars = label.chars();
        let letter = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| RackError::InvalidLabel(label.to_string()))?
            .to_ascii_uppercase();
        let number: usize = chars
            .as_str()
            .parse()
            .map_err(|_| RackError::InvalidLabel(label.to_string()))?;
        if number == 0 {
            return Err(RackError::InvalidLabel(label.to_string()));
        }
        Ok(Self::from_indices((letter as u8 - b'A') as usize, number - 1))
    }

    pub fn label(&self) -> String {
        let letter = ROW_LETTERS
            .get(self.row_index)
            .map(|&b| b as char)
            .unwrap_or('?');
        format!("{}{}", letter, self.column_index + 1)
    }
}

impl Ord for RackPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.row_index, self.column_index).cmp(&(other.row_index, other.column_index))
    }
}

impl PartialOrd for RackPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RackPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
