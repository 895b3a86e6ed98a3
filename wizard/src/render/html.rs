// HTML renderer
//
// Keeps the wizard page as a small document model (visible step, status line, picker buttons,
// analytics panel) and produces markup fragments. Every backend- or user-supplied string is
// escaped before it is placed in markup.

use super::{
    loading_message, no_data_message, AnalyticsReport, Renderer, StatusKind, TableRow,
    RESULT_COLUMNS,
};
use crate::wizard::Step;

/// Escape text for use in HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub message: String,
    pub kind: StatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerButton {
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    step: Step,
    status: Option<StatusLine>,
    busy: bool,
    picker: Vec<PickerButton>,
    analytics_info: String,
    results_body: Vec<String>,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn picker_buttons(&self) -> &[PickerButton] {
        &self.picker
    }

    pub fn selected_buttons(&self) -> Vec<&str> {
        self.picker
            .iter()
            .filter(|b| b.selected)
            .map(|b| b.name.as_str())
            .collect()
    }

    /// Inner HTML of the analytics summary panel.
    pub fn analytics_info_html(&self) -> &str {
        &self.analytics_info
    }

    /// `<tr>` elements of the results table, in display order.
    pub fn result_rows_html(&self) -> &[String] {
        &self.results_body
    }

    pub fn status_html(&self) -> String {
        match &self.status {
            None => String::new(),
            Some(StatusLine {
                message,
                kind: StatusKind::Loading,
            }) => format!(
                "<div class=\"spinner\"></div>{}",
                escape_html(message)
            ),
            Some(StatusLine { message, .. }) => escape_html(message),
        }
    }

    pub fn picker_html(&self) -> String {
        let mut out = String::from("<div class=\"tables-grid\">");
        for (index, button) in self.picker.iter().enumerate() {
            let class = if button.selected {
                "table-button selected"
            } else {
                "table-button"
            };
            out.push_str(&format!(
                "<button type=\"button\" class=\"{}\" data-index=\"{}\">{}</button>",
                class,
                index,
                escape_html(&button.name)
            ));
        }
        out.push_str("</div>");
        out
    }

    /// Complete standalone page reflecting the current document state.
    pub fn to_page(&self) -> String {
        let hidden = |step: Step| if self.step == step { "step" } else { "step hidden" };
        let status_class = self.status.as_ref().map(|s| s.kind.as_class()).unwrap_or("");

        let mut header = String::new();
        for col in RESULT_COLUMNS {
            header.push_str(&format!("<th>{}</th>", escape_html(col)));
        }

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>Customer Analytics</title>\n<style>{css}</style>\n</head>\n<body>\n\
<section id=\"step1\" class=\"{s1}\">\n<h2>Connect to Database</h2>\n\
<div id=\"connection-status\" class=\"{status_class}\">{status}</div>\n</section>\n\
<section id=\"step2\" class=\"{s2}\">\n<h2>Select a Table</h2>\n\
<div id=\"tables-container\">{picker}</div>\n</section>\n\
<section id=\"step3\" class=\"{s3}\">\n<h2>Customer Analytics</h2>\n\
<div id=\"analytics-info\">{info}</div>\n\
<table>\n<thead><tr>{header}</tr></thead>\n<tbody id=\"results-body\">\n{rows}\n</tbody>\n</table>\n\
</section>\n</body>\n</html>\n",
            css = PAGE_CSS,
            s1 = hidden(Step::Connect),
            s2 = hidden(Step::SelectCollection),
            s3 = hidden(Step::ViewAnalytics),
            status_class = status_class,
            status = self.status_html(),
            picker = self.picker_html(),
            info = self.analytics_info,
            header = header,
            rows = self.results_body.join("\n"),
        )
    }
}

const PAGE_CSS: &str = ".hidden{display:none}\
.success{color:#1b7f3b}.error{color:#b00020}\
.table-button.selected{outline:2px solid #3367d6}\
.status-badge{padding:2px 6px;border-radius:4px}\
.status-active{background:#d7f5df}.status-new{background:#dbe9ff}\
.status-churned{background:#ffd9d9}";

fn row_html(row: &TableRow) -> String {
    let id_cell = match &row.customer_name {
        Some(name) => format!(
            "{}<div class=\"customer-name\">{}</div>",
            escape_html(&row.customer_id),
            escape_html(name)
        ),
        None => escape_html(&row.customer_id),
    };
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
<td><span class=\"status-badge status-{}\">{}</span></td></tr>",
        id_cell,
        escape_html(&row.total_orders),
        escape_html(&row.avg_order_gap),
        escape_html(&row.last_order_date),
        escape_html(&row.predicted_next_order_date),
        escape_html(&row.classification_tag),
        escape_html(&row.classification),
    )
}

impl Renderer for HtmlRenderer {
    fn show_step(&mut self, step: Step) {
        self.step = step;
    }

    fn render_status(&mut self, message: &str, kind: StatusKind) {
        self.status = Some(StatusLine {
            message: message.to_string(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn render_collection_picker(&mut self, names: &[String]) {
        self.picker = names
            .iter()
            .map(|name| PickerButton {
                name: name.clone(),
                selected: false,
            })
            .collect();
    }

    fn mark_selected(&mut self, index: Option<usize>) {
        for (i, button) in self.picker.iter_mut().enumerate() {
            button.selected = Some(i) == index;
        }
    }

    fn render_analytics_loading(&mut self, collection: &str) {
        self.analytics_info = format!(
            "<div class=\"spinner\"></div><p>{}</p>",
            escape_html(&loading_message(collection))
        );
        self.results_body.clear();
    }

    fn render_analytics_error(&mut self, message: &str) {
        self.analytics_info = format!(
            "<p class=\"error\">\u{2717} Error: {}</p>",
            escape_html(message)
        );
        self.results_body.clear();
    }

    fn render_results(&mut self, report: &AnalyticsReport) {
        self.results_body.clear();

        if report.rows.is_empty() {
            self.analytics_info = format!(
                "<p>{}</p>",
                escape_html(&no_data_message(&report.collection))
            );
            return;
        }

        self.analytics_info = format!(
            "<p><strong>Table:</strong> {}</p>\
<p><strong>Total Customers Analyzed:</strong> {}</p>\
<p><strong>Analysis Date:</strong> {}</p>",
            escape_html(&report.collection),
            report.rows.len(),
            escape_html(&report.rendered_at_display())
        );
        self.results_body = report.table_rows().iter().map(row_html).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::responses::AnalyticsRow;

    fn row(id: &str, class: &str) -> AnalyticsRow {
        AnalyticsRow {
            customer_id: id.to_string(),
            customer_name: None,
            total_orders: 5,
            avg_order_gap: None,
            last_order_date: None,
            predicted_next_order_date: None,
            customer_classification: class.to_string(),
        }
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape_html("<b>x</b> & \"y\" 'z'"),
            "&lt;b&gt;x&lt;/b&gt; &amp; &quot;y&quot; &#39;z&#39;"
        );
    }

    #[test]
    fn injected_customer_id_is_literal_text() {
        let mut r = HtmlRenderer::new();
        r.render_results(&AnalyticsReport::new("orders", vec![row("<b>x</b>", "ACTIVE")]));

        let rows = r.result_rows_html();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("<td>&lt;b&gt;x&lt;/b&gt;</td>"), "{}", rows[0]);
        assert!(!rows[0].contains("<b>"), "{}", rows[0]);
        assert!(rows[0].contains("<td>N/A</td>"));
        assert!(rows[0].contains("status-badge status-active\">ACTIVE<"));
    }

    #[test]
    fn customer_name_is_escaped_too() {
        let mut data = row("C1", "NEW");
        data.customer_name = Some("<img src=x onerror=alert(1)>".to_string());
        let mut r = HtmlRenderer::new();
        r.render_results(&AnalyticsReport::new("orders", vec![data]));
        assert!(!r.result_rows_html()[0].contains("<img"));
    }

    #[test]
    fn summary_shows_table_count_and_time() {
        let mut r = HtmlRenderer::new();
        let report = AnalyticsReport::new("orders", vec![row("a", "NEW"), row("b", "CHURNED")]);
        r.render_results(&report);

        let info = r.analytics_info_html();
        assert!(info.contains("<strong>Table:</strong> orders"), "{}", info);
        assert!(info.contains("<strong>Total Customers Analyzed:</strong> 2"), "{}", info);
        assert!(info.contains(&report.rendered_at_display()), "{}", info);
    }

    #[test]
    fn empty_report_shows_no_data_and_no_rows() {
        let mut r = HtmlRenderer::new();
        r.render_results(&AnalyticsReport::new("orders", vec![row("a", "NEW")]));
        r.render_results(&AnalyticsReport::new("<empty>", Vec::new()));

        assert!(r.result_rows_html().is_empty());
        assert_eq!(
            r.analytics_info_html(),
            "<p>No data available for analysis in &lt;empty&gt;</p>"
        );
    }

    #[test]
    fn picker_marks_exactly_one() {
        let mut r = HtmlRenderer::new();
        r.render_collection_picker(&["orders".to_string(), "customers".to_string()]);
        assert_eq!(r.picker_buttons().len(), 2);
        assert!(r.selected_buttons().is_empty());

        r.mark_selected(Some(0));
        r.mark_selected(Some(1));
        assert_eq!(r.selected_buttons(), vec!["customers"]);

        r.mark_selected(None);
        assert!(r.selected_buttons().is_empty());
    }

    #[test]
    fn rebuilding_picker_replaces_previous_content() {
        let mut r = HtmlRenderer::new();
        r.render_collection_picker(&["a".to_string(), "b".to_string(), "c".to_string()]);
        r.mark_selected(Some(2));
        r.render_collection_picker(&["<z>".to_string()]);

        assert_eq!(r.picker_buttons().len(), 1);
        assert!(r.selected_buttons().is_empty());
        assert!(r.picker_html().contains(">&lt;z&gt;</button>"));
    }

    #[test]
    fn loading_and_error_clear_rows() {
        let mut r = HtmlRenderer::new();
        r.render_results(&AnalyticsReport::new("orders", vec![row("a", "NEW")]));
        r.render_analytics_loading("customers");
        assert!(r.result_rows_html().is_empty());
        assert!(r.analytics_info_html().contains("Analyzing customers..."));

        r.render_analytics_error("HTTP Error 500");
        assert!(r.analytics_info_html().contains("Error: HTTP Error 500"));
        assert!(r.result_rows_html().is_empty());
    }

    #[test]
    fn page_hides_inactive_steps() {
        let mut r = HtmlRenderer::new();
        r.show_step(Step::SelectCollection);
        let page = r.to_page();
        assert!(page.contains("<section id=\"step1\" class=\"step hidden\">"));
        assert!(page.contains("<section id=\"step2\" class=\"step\">"));
        assert!(page.contains("<section id=\"step3\" class=\"step hidden\">"));
    }
}
