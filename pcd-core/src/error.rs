use thiserror::Error;

#[derive(Debug, Error)]
pub enum PcdError {
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("degenerate boundary: {found} of {total} points flagged")]
    DegenerateBoundary { found: usize, total: usize },

    #[error("no cluster with at least {min_points} points found (radius {radius})")]
    NoClusterFound { radius: f64, min_points: usize },

    #[error("invalid parameter: {0}")]
    Config(String),
}

impl PcdError {
    /// Errors caused by the shape of real scan data rather than by the caller.
    pub fn is_data_degeneracy(&self) -> bool {
        matches!(
            self,
            PcdError::DegenerateGeometry(_)
                | PcdError::DegenerateBoundary { .. }
                | PcdError::NoClusterFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PcdError>;

/// Checks that `fraction` lies in (0, 1].
pub fn check_fraction(name: &str, fraction: f64) -> Result<()> {
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(PcdError::Config(format!(
            "expected {name} in (0,1], got {fraction}"
        )))
    }
}

/// Checks that `radius` is finite and strictly positive.
pub fn check_radius(name: &str, radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(PcdError::Config(format!(
            "expected positive {name}, got {radius}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_bounds() {
        assert!(check_fraction("fraction", 1.0).is_ok());
        assert!(check_fraction("fraction", 0.3).is_ok());
        assert!(matches!(
            check_fraction("fraction", 0.0),
            Err(PcdError::Config(_))
        ));
        assert!(matches!(
            check_fraction("fraction", 1.5),
            Err(PcdError::Config(_))
        ));
    }

    #[test]
    fn radius_must_be_positive() {
        assert!(check_radius("radius", 0.1).is_ok());
        assert!(check_radius("radius", -0.1).is_err());
        assert!(check_radius("radius", 0.0).is_err());
        assert!(check_radius("radius", f64::NAN).is_err());
    }

    #[test]
    fn degeneracy_classification() {
        assert!(PcdError::DegenerateBoundary { found: 0, total: 10 }.is_data_degeneracy());
        assert!(PcdError::NoClusterFound {
            radius: 0.1,
            min_points: 250
        }
        .is_data_degeneracy());
        assert!(!PcdError::EmptyInput("bounding box").is_data_degeneracy());
        assert!(!PcdError::Config("x".into()).is_data_degeneracy());
    }
}
