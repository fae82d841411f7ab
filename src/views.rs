//! HTML pages. Every interpolated value goes through `escape`.

use std::fmt::Write;

use crate::records::{FEATURE_NAMES, STORED_FIELDS};
use crate::store::StoredPrediction;

const TABLE_CLASSES: &str = "table table-bordered table-striped table-hover table-responsive";

pub fn escape(text: &str) -> String {
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

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n\
         <nav><a href=\"/\">Home</a> | <a href=\"/predict\">Predict</a> | \
         <a href=\"/manual-predictions\">Manual predictions</a></nav>\n\
         {body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = format!("<table class=\"{TABLE_CLASSES}\">\n<thead><tr>");
    for name in header {
        let _ = write!(html, "<th>{}</th>", escape(name));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

pub fn index() -> String {
    page(
        "Heart disease risk",
        "<h1>Heart disease risk</h1>\n\
         <p>Estimate heart disease risk from clinical measurements, one patient at a time \
         or from a CSV file.</p>\n\
         <p><a href=\"/predict\">Start a prediction</a></p>",
    )
}

pub fn predict_form() -> String {
    let mut inputs = String::new();
    for name in ["name", "email"] {
        let _ = writeln!(
            inputs,
            "<label>{name} <input type=\"text\" name=\"{name}\"></label><br>"
        );
    }
    for name in FEATURE_NAMES {
        let _ = writeln!(
            inputs,
            "<label>{name} <input type=\"text\" name=\"{name}\"></label><br>"
        );
    }

    page(
        "Predict",
        &format!(
            "<h1>Manual prediction</h1>\n\
             <form method=\"post\" action=\"/predict\" enctype=\"multipart/form-data\">\n\
             {inputs}<button type=\"submit\">Predict</button>\n</form>\n\
             <h1>CSV prediction</h1>\n\
             <form method=\"post\" action=\"/predict\" enctype=\"multipart/form-data\">\n\
             <input type=\"file\" name=\"file\" accept=\".csv\">\n\
             <button type=\"submit\">Upload</button>\n</form>"
        ),
    )
}

pub fn single_result(result: &str) -> String {
    page(
        "Result",
        &format!(
            "<h1>Result</h1>\n<p>Heart disease predicted: <strong>{}</strong></p>",
            escape(result)
        ),
    )
}

pub fn table_result(header: &[&str], rows: &[Vec<String>]) -> String {
    page(
        "Result",
        &format!("<h1>Result</h1>\n{}", table(header, rows)),
    )
}

pub fn error_result(message: &str) -> String {
    page(
        "Result",
        &format!(
            "<h1>Result</h1>\n<p class=\"error\">Error: {}</p>",
            escape(message)
        ),
    )
}

pub fn manual_predictions(predictions: &[StoredPrediction]) -> String {
    let header: Vec<&str> = STORED_FIELDS.iter().map(|(name, _)| *name).collect();
    let rows: Vec<Vec<String>> = predictions.iter().map(|p| p.values.clone()).collect();
    page(
        "Manual predictions",
        &format!("<h1>Manual predictions</h1>\n{}", table(&header, &rows)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn form_has_every_input() {
        let html = predict_form();
        for name in FEATURE_NAMES.iter().chain(&["name", "email", "file"]) {
            assert!(html.contains(&format!("name=\"{name}\"")), "{name}");
        }
    }

    #[test]
    fn table_cells_are_escaped() {
        let html = table_result(&["a"], &[vec!["<script>".to_string()]]);
        assert!(html.contains("<td>&lt;script&gt;</td>"));
        assert!(!html.contains("<td><script>"));
    }
}
