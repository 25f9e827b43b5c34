//! Printable HTML report for a submitted review
//!
//! Self-contained page (inline CSS, no scripts) meant for the browser's
//! print dialog. Every piece of user-entered text goes through
//! [`html_escape`].

use std::fmt::Write;

use crate::auth::User;
use crate::employees::{Employee, EmployeeStatus};
use crate::evaluation::Evaluation;
use crate::rubric::{Category, Rating, ScoreCard};

const STYLE: &str = "body{font-family:Arial,sans-serif;margin:32px;color:#222}\
h1{font-size:22px;margin-bottom:4px}h2{font-size:16px;border-bottom:2px solid #2b4c7e;padding-bottom:4px;margin-top:28px}\
table{border-collapse:collapse;width:100%;margin-top:8px}th,td{border:1px solid #bbb;padding:6px 8px;text-align:left;vertical-align:top}\
th{background:#eef2f8}td.num{text-align:right;white-space:nowrap}.final{font-size:18px;font-weight:bold}\
.muted{color:#777}@media print{body{margin:12mm}}";

/// Escape text for use inside HTML element content and attribute values
pub fn html_escape(text: &str) -> String {
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

/// Escaped text, or a dash when blank. Newlines become line breaks.
fn text_or_dash(text: &str) -> String {
    if text.trim().is_empty() {
        "<span class=\"muted\">-</span>".to_string()
    } else {
        html_escape(text).replace('\n', "<br>")
    }
}

fn rating_cell(rating: Option<Rating>) -> String {
    match rating {
        Some(r) => html_escape(&r.to_string()),
        None => "<span class=\"muted\">-</span>".to_string(),
    }
}

pub fn render(review: &Evaluation, employee: Option<&Employee>, evaluator: Option<&User>) -> String {
    let mut out = String::with_capacity(16 * 1024);
    // Reports are only produced after submit, but a missing card still renders
    let card = review
        .score_card
        .clone()
        .unwrap_or_else(|| ScoreCard::compute(&review.scores));

    let employee_name = employee.map(|e| e.name.as_str()).unwrap_or("Unknown Employee");

    writeln!(out, "<!DOCTYPE html>").ok();
    writeln!(out, "<html lang=\"en\"><head><meta charset=\"utf-8\">").ok();
    writeln!(out, "<title>Performance Review - {}</title>", html_escape(employee_name)).ok();
    writeln!(out, "<style>{}</style></head><body>", STYLE).ok();
    writeln!(out, "<h1>Performance Review Report</h1>").ok();
    writeln!(
        out,
        "<p class=\"muted\">Status: {} &middot; Review ID: {}</p>",
        html_escape(review.status.name()),
        html_escape(&review.id)
    )
    .ok();

    write_employee(&mut out, review, employee, employee_name);
    write_details(&mut out, review, evaluator);
    write_legend(&mut out);

    for category in Category::ALL {
        write_category(&mut out, review, &card, category);
    }

    write_summary(&mut out, &card);
    write_narrative(&mut out, review);

    writeln!(out, "</body></html>").ok();
    out
}

fn write_row(out: &mut String, label: &str, value: &str) {
    writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", label, value).ok();
}

fn write_employee(out: &mut String, review: &Evaluation, employee: Option<&Employee>, name: &str) {
    writeln!(out, "<h2>Employee Information</h2><table>").ok();
    write_row(out, "Name", &html_escape(name));
    if let Some(e) = employee {
        write_row(out, "Email", &text_or_dash(&e.email));
        write_row(out, "Location", &text_or_dash(&e.location));
        let status = match e.status {
            EmployeeStatus::Active => "Active",
            EmployeeStatus::OnLeave => "On Leave",
            EmployeeStatus::Terminated => "Terminated",
        };
        write_row(out, "Employment Status", status);
    }
    write_row(out, "Position", &text_or_dash(&review.details.position));
    write_row(out, "Department", &text_or_dash(&review.details.department));
    let hired = review
        .details
        .date_hired
        .map(|d| d.to_string())
        .unwrap_or_default();
    write_row(out, "Date Hired", &text_or_dash(&hired));
    writeln!(out, "</table>").ok();
}

fn write_details(out: &mut String, review: &Evaluation, evaluator: Option<&User>) {
    let d = &review.details;
    writeln!(out, "<h2>Review Details</h2><table>").ok();
    write_row(out, "Immediate Supervisor", &text_or_dash(&d.immediate_supervisor));
    write_row(out, "Performance Coverage", &text_or_dash(&d.performance_coverage));
    let review_type = d.review_type.map(|t| format!("{:?}", t)).unwrap_or_default();
    write_row(out, "Review Type", &text_or_dash(&review_type));
    write_row(out, "Review Period", &text_or_dash(&d.review_period));
    let review_date = d.review_date.map(|d| d.to_string()).unwrap_or_default();
    write_row(out, "Review Date", &text_or_dash(&review_date));
    write_row(out, "Evaluator", &text_or_dash(evaluator.map(|u| u.name.as_str()).unwrap_or("")));
    let submitted = review
        .submitted_at
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default();
    write_row(out, "Submitted", &text_or_dash(&submitted));
    writeln!(out, "</table>").ok();
}

fn write_legend(out: &mut String) {
    writeln!(out, "<h2>Rating Scale</h2><table>").ok();
    writeln!(out, "<tr><th>Code</th><th>Rating</th><th>Score Range</th><th>Description</th></tr>").ok();
    for rating in Rating::ALL {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td>{}</td></tr>",
            rating.code(),
            rating.label(),
            rating.range(),
            rating.description()
        )
        .ok();
    }
    writeln!(out, "</table>").ok();
}

fn write_category(out: &mut String, review: &Evaluation, card: &ScoreCard, category: Category) {
    writeln!(
        out,
        "<h2>{} ({:.0}%)</h2><table>",
        html_escape(category.name()),
        category.weight() * 100.0
    )
    .ok();
    writeln!(out, "<tr><th>Criterion</th><th>Score</th><th>Rating</th><th>Comments</th></tr>").ok();
    for criterion in category.criteria() {
        let score = review.scores.get(criterion).copied();
        let score_text = score.map(|s| format!("{:.1}", s)).unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(criterion.label()),
            score_text,
            rating_cell(score.and_then(Rating::classify)),
            text_or_dash(review.comments.get(criterion).map(String::as_str).unwrap_or(""))
        )
        .ok();
    }
    if let Some(cs) = card.category(category) {
        writeln!(
            out,
            "<tr><th>Average</th><td class=\"num\">{:.2}</td><td colspan=\"2\">{}</td></tr>",
            cs.mean,
            rating_cell(cs.rating)
        )
        .ok();
    }
    writeln!(out, "</table>").ok();
}

fn write_summary(out: &mut String, card: &ScoreCard) {
    writeln!(out, "<h2>Weighted Summary</h2><table>").ok();
    writeln!(
        out,
        "<tr><th>Category</th><th>Average</th><th>Weight</th><th>Weighted Score</th><th>Rating</th></tr>"
    )
    .ok();
    for cs in &card.categories {
        writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.0}%</td><td class=\"num\">{:.2}</td><td>{}</td></tr>",
            html_escape(cs.category.name()),
            cs.mean,
            cs.weight * 100.0,
            cs.weighted,
            rating_cell(cs.rating)
        )
        .ok();
    }
    writeln!(
        out,
        "<tr class=\"final\"><td>Final Score</td><td class=\"num\" colspan=\"3\">{:.2} ({:.2}%)</td><td>{}</td></tr>",
        card.final_score,
        card.final_percentage,
        rating_cell(card.final_rating)
    )
    .ok();
    writeln!(out, "</table>").ok();
}

fn write_narrative(out: &mut String, review: &Evaluation) {
    let n = &review.narrative;
    writeln!(out, "<h2>Overall Assessment</h2><table>").ok();
    write_row(out, "Key Strengths", &text_or_dash(&n.key_strengths));
    write_row(out, "Areas for Improvement", &text_or_dash(&n.areas_for_improvement));
    write_row(out, "Development Goals", &text_or_dash(&n.development_goals));
    write_row(out, "Additional Comments", &text_or_dash(&n.additional_comments));
    writeln!(out, "</table>").ok();

    writeln!(out, "<h2>HR Review</h2><table>").ok();
    write_row(out, "Decision", &html_escape(review.status.name()));
    write_row(out, "HR Comments", &text_or_dash(&review.hr_comments));
    writeln!(out, "</table>").ok();
}
