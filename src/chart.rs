//! Chart result shaping.
//!
//! Maps a rectangular result set onto the {bar, line, pie} shapes the result
//! renderer draws. Row order is preserved; no implicit sorting happens here.

use serde_json::Value;

use crate::backend::types::Row;

/// Fixed slice/series palette; slice `i` gets `PALETTE[i % 5]`.
pub const PALETTE: [&str; 5] = ["#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8"];

/// One (x, y) point of a bar or line series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub x: String,
    pub y: f64,
}

/// One slice of a pie chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Share of the total, rounded to the nearest integer percent.
    pub percent: i64,
    pub color: &'static str,
}

/// Extract an ordered (x, y) series from `rows`, preserving row order.
///
/// Non-numeric y values count as zero rather than dropping the point, so the
/// x axis stays aligned with the result set.
#[must_use]
pub fn to_series(rows: &[Row], x_key: &str, y_key: &str) -> Vec<SeriesPoint> {
    rows.iter()
        .map(|row| SeriesPoint {
            x: label_of(row.get(x_key)),
            y: number_of(row.get(y_key)),
        })
        .collect()
}

/// Turn `rows` into pie slices sized by `y_key` and labeled by `x_key`.
#[must_use]
pub fn pie_slices(rows: &[Row], x_key: &str, y_key: &str) -> Vec<PieSlice> {
    let total: f64 = rows.iter().map(|row| number_of(row.get(y_key))).sum();

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let value = number_of(row.get(y_key));
            let percent = if total > 0.0 {
                (value / total * 100.0).round() as i64
            } else {
                0
            };
            PieSlice {
                label: label_of(row.get(x_key)),
                value,
                percent,
                color: PALETTE[i % PALETTE.len()],
            }
        })
        .collect()
}

fn label_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn number_of(value: Option<&Value>) -> f64 {
    match value {
        Some(v) => v
            .as_f64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .unwrap_or(0.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows_from(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_series_preserves_row_order() {
        let rows = rows_from(json!([
            {"month": "T9", "growth": 18.7},
            {"month": "T7", "growth": 12.5},
            {"month": "T8", "growth": 15.2},
        ]));
        let series = to_series(&rows, "month", "growth");
        assert_eq!(
            series.iter().map(|p| p.x.as_str()).collect::<Vec<_>>(),
            vec!["T9", "T7", "T8"]
        );
        assert!((series[0].y - 18.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_series_keeps_non_numeric_points() {
        let rows = rows_from(json!([{"x": "a", "y": "n/a"}, {"x": "b", "y": 2}]));
        let series = to_series(&rows, "x", "y");
        assert_eq!(series.len(), 2);
        assert!((series[0].y - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pie_percentages_round_to_integer() {
        let rows = rows_from(json!([
            {"branch": "A", "amount": 1.0},
            {"branch": "B", "amount": 2.0},
        ]));
        let slices = pie_slices(&rows, "branch", "amount");
        assert_eq!(slices[0].percent, 33);
        assert_eq!(slices[1].percent, 67);
    }

    #[test]
    fn test_pie_palette_cycles() {
        let rows = rows_from(json!([
            {"x": "a", "y": 1}, {"x": "b", "y": 1}, {"x": "c", "y": 1},
            {"x": "d", "y": 1}, {"x": "e", "y": 1}, {"x": "f", "y": 1},
        ]));
        let slices = pie_slices(&rows, "x", "y");
        assert_eq!(slices[0].color, PALETTE[0]);
        assert_eq!(slices[5].color, PALETTE[0]);
        assert_eq!(slices[4].color, PALETTE[4]);
    }

    #[test]
    fn test_pie_zero_total() {
        let rows = rows_from(json!([{"x": "a", "y": 0}]));
        let slices = pie_slices(&rows, "x", "y");
        assert_eq!(slices[0].percent, 0);
    }
}
