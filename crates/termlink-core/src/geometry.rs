//! Terminal geometry.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dimensions of a terminal window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl Dimensions {
    /// Create new dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Reject zero-sized windows, which no PTY backend accepts.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_default() {
        let dims = Dimensions::default();
        assert_eq!(dims.rows, 24);
        assert_eq!(dims.cols, 80);
    }

    #[test]
    fn test_dimensions_validate() {
        assert!(Dimensions::new(40, 120).validate().is_ok());
        assert!(matches!(
            Dimensions::new(0, 80).validate(),
            Err(Error::InvalidDimensions { rows: 0, cols: 80 })
        ));
        assert!(Dimensions::new(24, 0).validate().is_err());
    }

    #[test]
    fn test_dimensions_display() {
        assert_eq!(Dimensions::new(24, 80).to_string(), "24x80");
    }
}
