//! Plot configuration shared across visualization functions
//!
//! This module defines the configuration used by the invariant-drift,
//! convergence and profile plots.

use plotters::prelude::*;

/// Configuration for customizing plots
///
/// # Fields
///
/// - `width`, `height`: Dimensions in pixels
/// - `title`: Plot title
/// - `xlabel`, `ylabel`: Axis labels
/// - `line_color`: Line color for single-series plots
/// - `series_colors`: Optional colors for multi-series plots (one per series)
/// - `background`: Background color
/// - `line_width`: Line thickness in pixels
/// - `show_grid`: Whether to show grid lines
///
/// # Example
///
/// ```rust,ignore
/// use avfet_rs::output::visualization::PlotConfig;
/// use plotters::prelude::*;
///
/// let mut config = PlotConfig::drift("Kepler, s = 1");
/// config.series_colors = Some(vec![RED, BLUE, GREEN, MAGENTA]);
/// config.width = 1920;
/// config.height = 1080;
/// ```
#[derive(Clone)]
pub struct PlotConfig {
    /// Image width in pixels (default: 1024)
    pub width: u32,

    /// Image height in pixels (default: 768)
    pub height: u32,

    /// Plot title (default: "Plot")
    pub title: String,

    /// X-axis label (default: auto-set by plot type)
    pub xlabel: String,

    /// Y-axis label (default: auto-set by plot type)
    pub ylabel: String,

    /// Line color for single-series plots (default: RED)
    pub line_color: RGBColor,

    /// Optional colors for multi-series plots (one per series)
    ///
    /// If None, uses the default palette: [RED, BLUE, GREEN, MAGENTA, CYAN, ...]
    pub series_colors: Option<Vec<RGBColor>>,

    /// Background color (default: WHITE)
    pub background: RGBColor,

    /// Line width in pixels (default: 2)
    pub line_width: u32,

    /// Show grid lines (default: true)
    pub show_grid: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "Plot".to_string(),
            xlabel: String::new(),
            ylabel: String::new(),
            line_color: RED,
            series_colors: None,
            background: WHITE,
            line_width: 2,
            show_grid: true,
        }
    }
}

/// Helper trait to accept both `String` and `None` for optional titles
pub trait IntoOptionalTitle {
    fn into_optional_title(self) -> Option<String>;
}

impl IntoOptionalTitle for &str {
    fn into_optional_title(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoOptionalTitle for String {
    fn into_optional_title(self) -> Option<String> {
        Some(self)
    }
}

impl<T: IntoOptionalTitle> IntoOptionalTitle for Option<T> {
    fn into_optional_title(self) -> Option<String> {
        self.and_then(|t| t.into_optional_title())
    }
}

/// Constant for no title (default title will be used)
///
/// # Example
///
/// ```rust,ignore
/// let config = PlotConfig::drift(NO_TITLE);
/// ```
pub const NO_TITLE: Option<&str> = None;

impl PlotConfig {
    fn titled(title: impl IntoOptionalTitle, default: &str, xlabel: &str, ylabel: &str) -> Self {
        Self {
            title: title
                .into_optional_title()
                .unwrap_or_else(|| default.to_string()),
            xlabel: xlabel.to_string(),
            ylabel: ylabel.to_string(),
            ..Self::default()
        }
    }

    /// Invariant drift `|I(t) - I(0)|` against time (log scale)
    pub fn drift(title: impl IntoOptionalTitle) -> Self {
        Self::titled(title, "Invariant drift", "t", "|I(t) - I(0)|")
    }

    /// Terminal error against step size (log-log)
    pub fn convergence(title: impl IntoOptionalTitle) -> Self {
        Self::titled(title, "Convergence", "dt", "error")
    }

    /// Spatial profiles of a grid model
    pub fn profile(title: impl IntoOptionalTitle) -> Self {
        Self::titled(title, "Profiles", "x", "u")
    }

    /// Create config with custom series colors
    pub fn series_colors(colors: Vec<RGBColor>) -> Self {
        Self {
            series_colors: Some(colors),
            ..Self::default()
        }
    }

    /// Get color for series at index i
    ///
    /// Uses custom colors if provided, otherwise falls back to default palette
    pub(crate) fn get_series_color(&self, series_index: usize) -> RGBColor {
        if let Some(colors) = &self.series_colors
            && series_index < colors.len()
        {
            return colors[series_index];
        }

        const PALETTE: [RGBColor; 8] = [
            RED,
            BLUE,
            GREEN,
            MAGENTA,
            CYAN,
            BLACK,
            RGBColor(255, 165, 0), // Orange
            RGBColor(128, 0, 128), // Purple
        ];

        PALETTE[series_index % PALETTE.len()]
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_config_default() {
        let config = PlotConfig::default();
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 768);
        assert!(config.show_grid);
    }

    #[test]
    fn test_drift_config_default_title() {
        let config = PlotConfig::drift(NO_TITLE);
        assert_eq!(config.title, "Invariant drift");
        assert_eq!(config.xlabel, "t");
    }

    #[test]
    fn test_convergence_config_with_string() {
        let config = PlotConfig::convergence(format!("Kepler, s = {}", 2));
        assert_eq!(config.title, "Kepler, s = 2");
        assert_eq!(config.xlabel, "dt");
    }

    #[test]
    fn test_default_palette_wraps() {
        let config = PlotConfig::profile("Burgers");
        assert_eq!(config.get_series_color(0), RED);
        assert_eq!(config.get_series_color(1), BLUE);
        assert_eq!(config.get_series_color(8), RED);
    }

    #[test]
    fn test_custom_colors() {
        let config = PlotConfig::series_colors(vec![BLACK, CYAN]);
        assert_eq!(config.get_series_color(0), BLACK);
        assert_eq!(config.get_series_color(1), CYAN);
        // Falls back to the palette past the custom list
        assert_eq!(config.get_series_color(2), GREEN);
    }
}
