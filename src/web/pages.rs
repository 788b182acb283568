//! HTML rendering for the two demo pages. Pure string building, no I/O.

use std::fmt::Write;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use crate::common::ModelVariant;
use crate::handler::{DetectionFailure, DetectionOutcome, DetectionRequest, DetectionResult};

pub const NO_OBJECTS: &str = "No objects detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Minimal,
    Advanced,
}

impl PageKind {
    pub fn path(&self) -> &'static str {
        match self {
            PageKind::Minimal => "/",
            PageKind::Advanced => "/advanced",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            PageKind::Minimal => "/detect",
            PageKind::Advanced => "/advanced/detect",
        }
    }
}

/// Values the form is pre-filled with.
#[derive(Debug, Clone, Copy)]
pub struct FormDefaults {
    pub model: ModelVariant,
    pub threshold: f32,
    pub show_labels: bool,
    pub show_conf: bool,
}

impl From<&DetectionRequest> for FormDefaults {
    /// The submitted values, so a result page keeps the user's choices.
    fn from(request: &DetectionRequest) -> Self {
        Self {
            model: request.model,
            threshold: request.threshold,
            show_labels: request.show_labels,
            show_conf: request.show_conf,
        }
    }
}

/// The uploaded file, echoed back next to the detections.
#[derive(Debug, Clone)]
pub struct Original<'a> {
    pub file_name: &'a str,
    pub mime: &'a str,
    pub bytes: &'a [u8],
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", B64.encode(bytes))
}

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;max-width:1400px}\
.row{display:flex;gap:1.5rem;flex-wrap:wrap}.col{flex:1;min-width:320px}\
img{max-width:100%}figcaption{color:#666;text-align:center}\
.success{background:#e6f4ea;padding:.75rem}.error{background:#fce8e6;padding:.75rem}\
.info{background:#e8f0fe;padding:.75rem}.metrics{display:flex;gap:2rem}\
.metric b{display:block;font-size:1.5rem}table{border-collapse:collapse}\
td,th{border:1px solid #ddd;padding:.3rem .8rem}nav a{margin-right:1rem}";

fn layout(kind: PageKind, body: &str) -> String {
    let title = match kind {
        PageKind::Minimal => "YOLOv8 Object Detection",
        PageKind::Advanced => "YOLOv8 Object Detection Playground",
    };
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
<style>{STYLE}</style></head><body>\
<nav><a href=\"{}\">Simple</a><a href=\"{}\">Advanced</a></nav>\
<h1>📦 {title}</h1>{body}</body></html>",
        PageKind::Minimal.path(),
        PageKind::Advanced.path(),
    )
}

fn upload_form(kind: PageKind, defaults: &FormDefaults) -> String {
    let mut form = format!(
        "<form method=\"post\" action=\"{}\" enctype=\"multipart/form-data\">\
<p><label>Upload an image <input type=\"file\" name=\"image\" accept=\".jpg,.jpeg,.png\" required></label></p>",
        kind.action()
    );

    if kind == PageKind::Advanced {
        form.push_str("<p><label>Model <select name=\"model\">");
        for variant in ModelVariant::ALL {
            let _ = write!(
                form,
                "<option value=\"{}\"{}>{} ({})</option>",
                variant.id(),
                if variant == defaults.model { " selected" } else { "" },
                variant.display_name(),
                variant.description(),
            );
        }
        let _ = write!(
            form,
            "</select></label></p>\
<p><label>Confidence threshold <input type=\"number\" name=\"threshold\" min=\"0\" max=\"1\" step=\"0.05\" value=\"{:.2}\"></label></p>\
<p><label><input type=\"checkbox\" name=\"show_labels\" value=\"on\"{}> Show labels</label> \
<label><input type=\"checkbox\" name=\"show_conf\" value=\"on\"{}> Show confidence</label></p>",
            defaults.threshold,
            if defaults.show_labels { " checked" } else { "" },
            if defaults.show_conf { " checked" } else { "" },
        );
    }

    form.push_str("<p><button type=\"submit\">Detect objects</button></p></form>");
    form
}

/// Empty page, optionally with a message about a rejected upload.
pub fn render_form(kind: PageKind, defaults: &FormDefaults, notice: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(notice) = notice {
        let _ = write!(body, "<div class=\"error\">{}</div>", escape_html(notice));
    }
    body.push_str(&upload_form(kind, defaults));
    layout(kind, &body)
}

fn figure(src: &str, caption: &str) -> String {
    format!("<figure><img src=\"{src}\" alt=\"{caption}\"><figcaption>{caption}</figcaption></figure>")
}

fn failure_block(failure: &DetectionFailure) -> String {
    format!(
        "<div class=\"error\">{}</div><div class=\"info\">{}</div>",
        escape_html(&failure.message),
        escape_html(failure.hint()),
    )
}

fn annotated_uri(result: &DetectionResult) -> Result<String, DetectionFailure> {
    result
        .annotated_png()
        .map(|png| data_uri("image/png", &png))
        .map_err(|e| DetectionFailure::new(&e))
}

/// Minimal page: original, annotated image and inference time.
pub fn render_minimal_result(defaults: &FormDefaults, original: &Original, outcome: &DetectionOutcome) -> String {
    let mut body = upload_form(PageKind::Minimal, defaults);
    body.push_str(&figure(&data_uri(original.mime, original.bytes), "Original Image"));
    body.push_str("<h3>Detecting objects...</h3>");

    let result = match outcome {
        DetectionOutcome::Failed(failure) => {
            body.push_str(&failure_block(failure));
            return layout(PageKind::Minimal, &body);
        }
        DetectionOutcome::Detected(result) | DetectionOutcome::NoObjects(result) => result,
    };

    match annotated_uri(result) {
        Ok(uri) => {
            body.push_str(&figure(&uri, "Detected Objects"));
            let _ = write!(
                body,
                "<div class=\"success\">Inference Time: {}</div>",
                result.inference_time()
            );
            if matches!(outcome, DetectionOutcome::NoObjects(_)) {
                let _ = write!(body, "<div class=\"info\">{NO_OBJECTS}</div>");
            }
        }
        Err(failure) => body.push_str(&failure_block(&failure)),
    }
    layout(PageKind::Minimal, &body)
}

/// Advanced page: side-by-side images, summary metrics, results table and download.
pub fn render_advanced_result(defaults: &FormDefaults, original: &Original, outcome: &DetectionOutcome) -> String {
    let mut body = upload_form(PageKind::Advanced, defaults);

    let original_fig = figure(
        &data_uri(original.mime, original.bytes),
        &format!("Original Image ({})", escape_html(original.file_name)),
    );
    let result = match outcome {
        DetectionOutcome::Failed(failure) => {
            let _ = write!(body, "<div class=\"row\"><div class=\"col\">{original_fig}</div></div>");
            body.push_str(&failure_block(failure));
            return layout(PageKind::Advanced, &body);
        }
        DetectionOutcome::Detected(result) | DetectionOutcome::NoObjects(result) => result,
    };

    let annotated = match annotated_uri(result) {
        Ok(uri) => uri,
        Err(failure) => {
            body.push_str(&failure_block(&failure));
            return layout(PageKind::Advanced, &body);
        }
    };

    let _ = write!(
        body,
        "<div class=\"row\"><div class=\"col\">{original_fig}</div><div class=\"col\">{}</div></div>",
        figure(&annotated, &format!("Detected Objects ({})", escape_html(result.model.display_name()))),
    );

    let _ = write!(
        body,
        "<h3>Detection summary</h3><div class=\"metrics\">\
<div class=\"metric\">Inference Time<b>{}</b></div>\
<div class=\"metric\">Objects Detected<b>{}</b></div>\
<div class=\"metric\">Confidence Threshold<b>{}</b></div></div>",
        result.inference_time(),
        result.object_count(),
        result.threshold_used(),
    );

    if matches!(outcome, DetectionOutcome::NoObjects(_)) {
        let _ = write!(body, "<div class=\"info\">{NO_OBJECTS}</div>");
        return layout(PageKind::Advanced, &body);
    }

    body.push_str(&results_table(result));
    let _ = write!(
        body,
        "<p><a class=\"download\" href=\"{annotated}\" download=\"{}\">Download annotated image</a></p>",
        escape_html(&result.download_name()),
    );

    layout(PageKind::Advanced, &body)
}

fn results_table(result: &DetectionResult) -> String {
    let mut table = String::from(
        "<h3>Detected objects</h3><table class=\"results\">\
<thead><tr><th>#</th><th>Class</th><th>Confidence</th><th>Confidence %</th></tr></thead><tbody>",
    );
    for (i, object) in result.objects.iter().enumerate() {
        let _ = write!(
            table,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            i + 1,
            escape_html(&object.label),
            object.confidence,
            object.percentage(),
        );
    }
    table.push_str("</tbody></table>");
    table
}

/// Number of rows in a rendered results table.
pub fn count_result_rows(html: &str) -> usize {
    html.split("<tbody>")
        .nth(1)
        .map(|rows| rows.split("</tbody>").next().unwrap_or_default().matches("<tr>").count())
        .unwrap_or(0)
}
