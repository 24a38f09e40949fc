use serde::Serialize;

use crate::config::GridSpec;

/// Point of common coupling with the utility grid.
///
/// Sign convention:
/// - Positive values are imports (grid supplies the site)
/// - Negative values are exports (site feeds the grid)
#[derive(Debug, Clone, Serialize)]
pub struct GridConnection {
    connected: bool,
    max_import_kw: f64,
    max_export_kw: f64,
}

impl GridConnection {
    /// Creates a connection with the configured import/export limits.
    ///
    /// # Panics
    ///
    /// Panics if `max_import_kw` or `max_export_kw` is negative.
    pub fn new(spec: &GridSpec) -> Self {
        assert!(spec.max_import_kw >= 0.0);
        assert!(spec.max_export_kw >= 0.0);

        Self {
            connected: spec.connected,
            max_import_kw: spec.max_import_kw,
            max_export_kw: spec.max_export_kw,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns the maximum import limit in kW.
    pub fn max_import_kw(&self) -> f64 {
        self.max_import_kw
    }

    /// Returns the maximum export limit in kW (positive magnitude).
    pub fn max_export_kw(&self) -> f64 {
        self.max_export_kw
    }

    /// Clips a requested exchange to the connection limits.
    ///
    /// Returns 0 when disconnected.
    pub fn exchange(&self, requested_kw: f64) -> f64 {
        if !self.connected || !requested_kw.is_finite() {
            return 0.0;
        }
        requested_kw.clamp(-self.max_export_kw, self.max_import_kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(import: f64, export: f64) -> GridConnection {
        GridConnection::new(&GridSpec {
            connected: true,
            max_import_kw: import,
            max_export_kw: export,
        })
    }

    #[test]
    fn test_with_limits() {
        let g = grid(5.0, 3.0);
        assert_eq!(g.max_import_kw(), 5.0);
        assert_eq!(g.max_export_kw(), 3.0);
    }

    #[test]
    fn test_exchange_clips() {
        let g = grid(100.0, 50.0);
        assert_eq!(g.exchange(40.0), 40.0);
        assert_eq!(g.exchange(140.0), 100.0);
        assert_eq!(g.exchange(-20.0), -20.0);
        assert_eq!(g.exchange(-80.0), -50.0);
    }

    #[test]
    fn test_disconnected_exchanges_nothing() {
        let g = GridConnection::new(&GridSpec {
            connected: false,
            ..GridSpec::default()
        });
        assert_eq!(g.exchange(40.0), 0.0);
        assert_eq!(g.exchange(-40.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_negative_limit_panics() {
        grid(-1.0, 0.0);
    }
}
