//! Table and chart fragments for query results.
//!
//! The table fragment is a self-contained HTMX island: the filter
//! input, header sort links and pager buttons all round-trip through
//! `/ui/chats/{chat}/messages/{id}/table` carrying the view state as
//! query parameters.

use std::fmt::Write as _;

use crate::backend::types::{ChartKind, ChartResult, ResultPayload, TableResult};
use crate::chart::{self, PALETTE};
use crate::table::{self, SortDirection, TableQuery};

use super::escape;

/// Render whichever payload shape the message carries.
pub fn render_payload(
    chat_id: &str,
    message_id: &str,
    payload: &ResultPayload,
    query: &TableQuery,
) -> String {
    match payload {
        ResultPayload::Table(t) => render_table(chat_id, message_id, t, query),
        ResultPayload::Chart(c) => render_chart(c),
    }
}

/// Render the interactive table fragment.
pub fn render_table(
    chat_id: &str,
    message_id: &str,
    table: &TableResult,
    query: &TableQuery,
) -> String {
    let view = table::process(&table.rows, &table.columns, query);
    let endpoint = table_endpoint(chat_id, message_id);

    let title = table.title.as_deref().map_or_else(String::new, |t| {
        format!(
            r#"    <h4 class="mb-2 text-sm font-semibold">{}</h4>
"#,
            escape(t)
        )
    });

    // Header cells toggle sort through the same endpoint.
    let mut header = String::new();
    for column in &table.columns {
        let next = query.clone().toggled(column);
        let marker = if query.sort.as_deref() == Some(column.as_str()) {
            match query.dir {
                SortDirection::Asc => " ▲",
                SortDirection::Desc => " ▼",
            }
        } else {
            ""
        };
        let _ = write!(
            header,
            r##"                <th class="cursor-pointer whitespace-nowrap px-3 py-2 text-left font-medium hover:text-primary"
                    hx-get="{url}"
                    hx-target="#data-{message_id}"
                    hx-swap="innerHTML">{name}{marker}</th>
"##,
            url = href(&endpoint, &query_params(&next)),
            message_id = escape(message_id),
            name = escape(column),
        );
    }

    let mut body = String::new();
    for row in &view.visible_rows {
        body.push_str("            <tr class=\"hover:bg-surfaceVariant\">\n");
        for column in &table.columns {
            let _ = write!(
                body,
                "                <td class=\"whitespace-nowrap px-3 py-2\">{}</td>\n",
                escape(&table::display_value(row.get(column))),
            );
        }
        body.push_str("            </tr>\n");
    }
    if view.visible_rows.is_empty() {
        let _ = write!(
            body,
            "            <tr><td colspan=\"{}\" class=\"px-3 py-4 text-center text-textMuted\">Không có dữ liệu phù hợp</td></tr>\n",
            table.columns.len().max(1),
        );
    }

    // Filter round-trips with sort kept and page reset server-side.
    let filter_input = format!(
        r##"    <input type="search" name="filter" value="{value}"
           placeholder="Lọc kết quả..."
           class="mb-2 w-full rounded-xl bg-surfaceVariant px-3 py-2 text-sm focus:outline-none focus:ring-2 focus:ring-primary"
           hx-get="{url}"
           hx-target="#data-{message_id}"
           hx-swap="innerHTML"
           hx-trigger="input changed delay:300ms"
           hx-include="this">
"##,
        value = escape(&query.filter),
        url = href(&endpoint, &sort_params(query)),
        message_id = escape(message_id),
    );

    let summary = if view.filtered_count == 0 {
        String::new()
    } else {
        format!(
            r#"        <span class="text-xs text-textMuted">Hiển thị {}-{} trong số {}</span>
"#,
            view.start_index(),
            view.end_index(),
            view.filtered_count,
        )
    };

    let mut pager = String::new();
    if view.total_pages > 1 {
        for page in table::page_numbers(view.total_pages, view.page) {
            let mut target = query.clone();
            target.page = page;
            let class = if page == view.page {
                "rounded-lg bg-primary px-2.5 py-1 text-xs text-white"
            } else {
                "rounded-lg px-2.5 py-1 text-xs hover:bg-surfaceVariant"
            };
            let _ = write!(
                pager,
                r##"            <button type="button" class="{class}"
                    hx-get="{url}"
                    hx-target="#data-{message_id}"
                    hx-swap="innerHTML">{page}</button>
"##,
                url = href(&endpoint, &query_params(&target)),
                message_id = escape(message_id),
            );
        }
    }

    format!(
        r#"{title}{filter_input}    <div class="overflow-x-auto rounded-xl bg-surfaceVariant/50">
        <table class="min-w-full text-sm">
            <thead class="text-textMuted">
                <tr>
{header}                </tr>
            </thead>
            <tbody>
{body}            </tbody>
        </table>
    </div>
    <div class="mt-2 flex items-center justify-between">
{summary}        <nav class="flex gap-1">
{pager}        </nav>
    </div>
"#,
    )
}

fn table_endpoint(chat_id: &str, message_id: &str) -> String {
    format!(
        "/ui/chats/{}/messages/{}/table",
        escape(chat_id),
        escape(message_id)
    )
}

/// Join an endpoint and its query string, omitting the `?` when there
/// are no parameters.
fn href(endpoint: &str, params: &str) -> String {
    if params.is_empty() {
        endpoint.to_string()
    } else {
        format!("{endpoint}?{params}")
    }
}

fn query_params(query: &TableQuery) -> String {
    let mut params = format!("page={}", query.page);
    if let Some(sort) = &query.sort {
        let _ = write!(params, "&sort={}&dir={}", urlencode(sort), dir_str(query.dir));
    }
    if !query.filter.is_empty() {
        let _ = write!(params, "&filter={}", urlencode(&query.filter));
    }
    params
}

/// Parameters kept when the filter input itself supplies `filter`.
fn sort_params(query: &TableQuery) -> String {
    match &query.sort {
        Some(sort) => format!("sort={}&dir={}", urlencode(sort), dir_str(query.dir)),
        None => String::new(),
    }
}

fn dir_str(dir: SortDirection) -> &'static str {
    match dir {
        SortDirection::Asc => "asc",
        SortDirection::Desc => "desc",
    }
}

fn urlencode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

/// Render a chart as inline SVG.
pub fn render_chart(result: &ChartResult) -> String {
    let title = format!(
        r#"    <h4 class="mb-2 text-sm font-semibold">{}</h4>
"#,
        escape(&result.title)
    );
    let svg = match result.chart_kind {
        ChartKind::Bar => bar_svg(result),
        ChartKind::Line => line_svg(result),
        ChartKind::Pie => pie_svg(result),
    };
    format!("{title}    <div class=\"overflow-x-auto\">{svg}</div>\n")
}

const CHART_W: f64 = 600.0;
const CHART_H: f64 = 300.0;
const MARGIN: f64 = 40.0;

fn bar_svg(result: &ChartResult) -> String {
    let series = chart::to_series(&result.rows, &result.x_key, &result.y_key);
    if series.is_empty() {
        return empty_chart();
    }
    let max = series.iter().map(|p| p.y).fold(f64::MIN, f64::max).max(1.0);
    let plot_w = CHART_W - 2.0 * MARGIN;
    let plot_h = CHART_H - 2.0 * MARGIN;
    let slot = plot_w / series.len() as f64;
    let bar_w = slot * 0.6;

    let mut shapes = String::new();
    for (i, point) in series.iter().enumerate() {
        let h = point.y / max * plot_h;
        let x = MARGIN + i as f64 * slot + (slot - bar_w) / 2.0;
        let y = CHART_H - MARGIN - h;
        let _ = write!(
            shapes,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{h:.1}" fill="{color}" rx="2"><title>{label}: {value}</title></rect>"#,
            color = PALETTE[0],
            label = escape(&point.x),
            value = point.y,
        );
        let _ = write!(
            shapes,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10" fill="currentColor">{}</text>"#,
            x + bar_w / 2.0,
            CHART_H - MARGIN + 14.0,
            escape(&point.x),
        );
    }
    svg_frame(&shapes)
}

fn line_svg(result: &ChartResult) -> String {
    let series = chart::to_series(&result.rows, &result.x_key, &result.y_key);
    if series.is_empty() {
        return empty_chart();
    }
    let max = series.iter().map(|p| p.y).fold(f64::MIN, f64::max).max(1.0);
    let plot_w = CHART_W - 2.0 * MARGIN;
    let plot_h = CHART_H - 2.0 * MARGIN;
    let step = if series.len() > 1 {
        plot_w / (series.len() - 1) as f64
    } else {
        0.0
    };

    let mut points = String::new();
    let mut labels = String::new();
    for (i, point) in series.iter().enumerate() {
        let x = MARGIN + i as f64 * step;
        let y = CHART_H - MARGIN - point.y / max * plot_h;
        let _ = write!(points, "{x:.1},{y:.1} ");
        let _ = write!(
            labels,
            r#"<circle cx="{x:.1}" cy="{y:.1}" r="3" fill="{color}"><title>{label}: {value}</title></circle><text x="{x:.1}" y="{ly:.1}" text-anchor="middle" font-size="10" fill="currentColor">{label}</text>"#,
            color = PALETTE[0],
            label = escape(&point.x),
            value = point.y,
            ly = CHART_H - MARGIN + 14.0,
        );
    }
    let shapes = format!(
        r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="2"/>{labels}"#,
        points = points.trim_end(),
        color = PALETTE[0],
    );
    svg_frame(&shapes)
}

fn pie_svg(result: &ChartResult) -> String {
    let slices = chart::pie_slices(&result.rows, &result.x_key, &result.y_key);
    let total: f64 = slices.iter().map(|s| s.value).sum();
    if slices.is_empty() || total <= 0.0 {
        return empty_chart();
    }

    let cx = CHART_W / 2.0;
    let cy = CHART_H / 2.0;
    let r = (CHART_H / 2.0) - 20.0;
    let mut angle = -std::f64::consts::FRAC_PI_2;

    let mut shapes = String::new();
    for slice in &slices {
        let sweep = slice.value / total * std::f64::consts::TAU;
        let end = angle + sweep;
        let (x1, y1) = (cx + r * angle.cos(), cy + r * angle.sin());
        let (x2, y2) = (cx + r * end.cos(), cy + r * end.sin());
        let large = i32::from(sweep > std::f64::consts::PI);
        let _ = write!(
            shapes,
            r#"<path d="M{cx:.1},{cy:.1} L{x1:.1},{y1:.1} A{r:.1},{r:.1} 0 {large} 1 {x2:.1},{y2:.1} Z" fill="{color}"><title>{label}: {percent}%</title></path>"#,
            color = slice.color,
            label = escape(&slice.label),
            percent = slice.percent,
        );
        // Percent label at the slice centroid.
        let mid = angle + sweep / 2.0;
        let (lx, ly) = (cx + r * 0.6 * mid.cos(), cy + r * 0.6 * mid.sin());
        let _ = write!(
            shapes,
            r##"<text x="{lx:.1}" y="{ly:.1}" text-anchor="middle" font-size="11" fill="#fff">{}%</text>"##,
            slice.percent,
        );
        angle = end;
    }
    svg_frame(&shapes)
}

fn svg_frame(shapes: &str) -> String {
    format!(
        r#"<svg viewBox="0 0 {CHART_W} {CHART_H}" width="100%" height="{CHART_H}" role="img">{shapes}</svg>"#,
    )
}

fn empty_chart() -> String {
    r#"<p class="text-sm text-textMuted">Không có dữ liệu để vẽ biểu đồ</p>"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> crate::backend::types::Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn sample_table() -> TableResult {
        TableResult {
            rows: vec![
                row(&[("name", json!("An")), ("balance", json!(100))]),
                row(&[("name", json!("Bình")), ("balance", json!(250))]),
            ],
            columns: vec!["name".to_string(), "balance".to_string()],
            title: Some("Số dư".to_string()),
            sql_query: None,
        }
    }

    #[test]
    fn test_table_renders_headers_rows_and_summary() {
        let html = render_table("c1", "m1", &sample_table(), &TableQuery::default());
        assert!(html.contains("Số dư"));
        assert!(html.contains(">name<"));
        assert!(html.contains(">An<"));
        assert!(html.contains("Hiển thị 1-2 trong số 2"));
        // Two pages are not needed for two rows.
        assert!(!html.contains("hx-get=\"/ui/chats/c1/messages/m1/table?page=2"));
    }

    #[test]
    fn test_table_header_toggles_sort_direction() {
        let query = TableQuery {
            sort: Some("name".to_string()),
            ..TableQuery::default()
        };
        let html = render_table("c1", "m1", &sample_table(), &query);
        // Active ascending column links to descending.
        assert!(html.contains("sort=name&dir=desc"));
        assert!(html.contains("name ▲"));
    }

    #[test]
    fn test_filter_url_omits_empty_query_string() {
        // No active sort: the filter input round-trips to the bare endpoint.
        let html = render_table("c1", "m1", &sample_table(), &TableQuery::default());
        assert!(html.contains("hx-get=\"/ui/chats/c1/messages/m1/table\""));
        assert!(!html.contains("table?\""));
    }

    #[test]
    fn test_table_escapes_cell_values() {
        let table = TableResult {
            rows: vec![row(&[("name", json!("<svg>"))])],
            columns: vec!["name".to_string()],
            title: None,
            sql_query: None,
        };
        let html = render_table("c1", "m1", &table, &TableQuery::default());
        assert!(html.contains("&lt;svg&gt;"));
    }

    #[test]
    fn test_urlencode_percent_escapes() {
        assert_eq!(urlencode("dư nợ"), "d%C6%B0%20n%E1%BB%A3");
        assert_eq!(urlencode("plain-text_1.ok~"), "plain-text_1.ok~");
    }

    #[test]
    fn test_bar_chart_has_one_rect_per_row() {
        let result = ChartResult {
            rows: vec![
                row(&[("month", json!("T1")), ("value", json!(10))]),
                row(&[("month", json!("T2")), ("value", json!(20))]),
            ],
            title: "CASA".to_string(),
            x_key: "month".to_string(),
            y_key: "value".to_string(),
            chart_kind: ChartKind::Bar,
            sql_query: None,
        };
        let html = render_chart(&result);
        assert_eq!(html.matches("<rect").count(), 2);
        assert!(html.contains(PALETTE[0]));
    }

    #[test]
    fn test_pie_chart_cycles_palette_and_shows_percent() {
        let rows: Vec<_> = (0..6)
            .map(|i| row(&[("k", json!(format!("s{i}"))), ("v", json!(10))]))
            .collect();
        let result = ChartResult {
            rows,
            title: "Tỷ trọng".to_string(),
            x_key: "k".to_string(),
            y_key: "v".to_string(),
            chart_kind: ChartKind::Pie,
            sql_query: None,
        };
        let html = render_chart(&result);
        assert_eq!(html.matches("<path").count(), 6);
        // Sixth slice wraps back to the first palette color.
        assert!(html.matches(PALETTE[0]).count() >= 2);
        assert!(html.contains("17%"));
    }

    #[test]
    fn test_empty_chart_degrades_to_message() {
        let result = ChartResult {
            rows: Vec::new(),
            title: "Trống".to_string(),
            x_key: "x".to_string(),
            y_key: "y".to_string(),
            chart_kind: ChartKind::Line,
            sql_query: None,
        };
        assert!(render_chart(&result).contains("Không có dữ liệu"));
    }
}
