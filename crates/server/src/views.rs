//! Server-rendered pages for the two navigable views.

use chrono::{Datelike, NaiveDate};
use client_core::SAMPLE_URL;
use shared::{
    domain::View,
    protocol::{Outcome, PredictionReport},
};

pub const APP_TITLE: &str = "SafeURL Predictor";
pub const APP_VERSION: &str = "1.0";

/// What the prediction view shows below the form.
#[derive(Debug, Clone, Default)]
pub struct PredictionPane<'a> {
    pub input: Option<&'a str>,
    pub report: Option<&'a PredictionReport>,
}

/// Renders the page for the selected view. Pure: no I/O happens here.
pub fn render_view(view: View, today: NaiveDate, pane: &PredictionPane<'_>) -> String {
    let content = match view {
        View::ProjectInfo => render_info(today),
        View::UrlPrediction => render_prediction(pane),
    };
    layout(view, today, &content)
}

fn layout(view: View, today: NaiveDate, content: &str) -> String {
    let nav: String = View::ALL
        .iter()
        .map(|candidate| {
            let current = if *candidate == view {
                r#" aria-current="page""#
            } else {
                ""
            };
            format!(
                r#"<li><a href="/?view={slug}"{current}>{label}</a></li>"#,
                slug = candidate.slug(),
                label = candidate.label(),
            )
        })
        .collect();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{APP_TITLE}</title>
</head>
<body>
<aside>
<h2>Navigation</h2>
<ul>{nav}</ul>
<hr>
<small>App Version {APP_VERSION} | {year}</small>
</aside>
<main>
{content}
</main>
</body>
</html>
"#,
        year = today.year(),
    )
}

fn render_info(today: NaiveDate) -> String {
    format!(
        r#"<h1>{APP_TITLE}: Project Overview</h1>
<section class="mission">
<h2>Project Mission</h2>
<p>This application is designed to analyze and classify URLs in real-time to determine if they are safe or malicious.
It uses a machine learning model hosted on HuggingFace Spaces.</p>
</section>
<h3>Student Information</h3>
<p class="info"><strong>Name:</strong> Chinedu Egbuna</p>
<p class="info"><strong>Course:</strong> Data Science Project</p>
<p class="info"><strong>Date:</strong> {date}</p>
"#,
        date = today.format("%B %d, %Y"),
    )
}

fn render_prediction(pane: &PredictionPane<'_>) -> String {
    let input = pane.input.unwrap_or(SAMPLE_URL);
    let mut html = format!(
        r#"<h1>URL Safety Checker</h1>
<h3>Enter a URL to check if it's safe.</h3>
<hr>
<form method="post" action="/predict">
<label for="url">URL to Analyze</label>
<input id="url" name="url" type="text" value="{value}" title="Paste a full URL">
<button type="submit">Analyze URL</button>
</form>
"#,
        value = escape_html(input),
    );

    if let Some(report) = pane.report {
        html.push_str(&render_report(report));
    }
    html
}

fn render_report(report: &PredictionReport) -> String {
    let mut html = String::from(r#"<section id="result">"#);

    if let Some(warning) = &report.warning {
        html.push_str(&format!(
            r#"<p class="warning">{}</p>"#,
            escape_html(warning)
        ));
    }

    match &report.outcome {
        None => html.push_str(&alert("error", &report.message)),
        Some(outcome) if outcome.is_verdict() => {
            html.push_str(r#"<p class="notice">Analysis complete!</p><h3>Result</h3>"#);
            html.push_str(&alert(tone(outcome), &report.message));
        }
        Some(outcome) => html.push_str(&alert(tone(outcome), &report.message)),
    }

    let echo = serde_json::to_string_pretty(&report.submitted)
        .unwrap_or_else(|_| report.submitted.url.clone());
    html.push_str(&format!(
        "<h3>Submitted URL</h3><pre class=\"echo\">{}</pre></section>",
        escape_html(&echo)
    ));
    html
}

fn alert(class: &str, message: &str) -> String {
    format!(
        r#"<p class="alert {class}"><strong>{}</strong></p>"#,
        escape_html(message)
    )
}

fn tone(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Benign => "success",
        Outcome::Unavailable => "warning",
        Outcome::Malicious | Outcome::RequestFailed { .. } | Outcome::ApiError { .. } => "error",
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
