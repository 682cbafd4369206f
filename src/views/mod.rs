//! Server-rendered pages. Every page goes through [`page`] so the banner and
//! styles stay in one place.

pub mod form;
pub mod report;
pub mod selector;

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, Options, Parser};

pub use form::{form_page, submitting_page};
pub use report::{ReportView, report_page};
pub use selector::selector_page;

const STYLES: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0; background: #f4f6f9; color: #1f2933; }
.banner { display: flex; align-items: center; justify-content: space-between; padding: 14px 28px; background: linear-gradient(135deg, #1e3a5f, #2f6690); color: #fff; }
.banner h1 { font-size: 20px; margin: 0; }
.banner .case { font-family: monospace; font-size: 14px; opacity: 0.9; }
main { max-width: 1080px; margin: 24px auto; padding: 0 16px; }
.card { background: #fff; border-radius: 10px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); padding: 24px; margin-bottom: 20px; }
.scenarios { display: flex; gap: 16px; }
.scenarios button { flex: 1; padding: 24px; font-size: 16px; border: 2px solid #2f6690; background: #fff; border-radius: 10px; cursor: pointer; }
.scenarios button:hover { background: #eaf1f8; }
.field { margin-bottom: 14px; }
.field label { display: block; font-weight: 600; margin-bottom: 4px; }
.field textarea, .field input[type=text], .field input[type=password] { width: 100%; box-sizing: border-box; padding: 8px; border: 1px solid #cbd2d9; border-radius: 6px; font: inherit; }
.error { background: #fdecea; color: #8a1c1c; border: 1px solid #f5c2c0; padding: 12px 16px; border-radius: 6px; margin-bottom: 16px; }
.actions { display: flex; gap: 12px; align-items: center; }
.primary { background: #2f6690; color: #fff; border: none; padding: 10px 20px; border-radius: 6px; cursor: pointer; }
.primary[disabled] { background: #9aa5b1; cursor: progress; }
.secondary { background: #fff; color: #2f6690; border: 1px solid #2f6690; padding: 10px 20px; border-radius: 6px; cursor: pointer; text-decoration: none; }
.tabs { display: flex; flex-wrap: wrap; gap: 4px; border-bottom: 2px solid #d9e2ec; margin-bottom: 16px; }
.tabs a { padding: 8px 14px; text-decoration: none; color: #52606d; border-radius: 6px 6px 0 0; }
.tabs a.active { background: #2f6690; color: #fff; }
.risk-dot { display: inline-block; width: 12px; height: 12px; border-radius: 50%; margin-right: 6px; vertical-align: middle; }
.risk-red { background: #d64545; }
.risk-yellow { background: #f0b429; }
.risk-green { background: #3ebd93; }
.risk-unknown { background: #9aa5b1; }
.badge { display: inline-block; padding: 2px 8px; border-radius: 10px; background: #fce8d5; color: #8d2b0b; font-size: 12px; margin-left: 8px; }
.markdown table { border-collapse: collapse; width: 100%; }
.markdown th, .markdown td { border: 1px solid #d9e2ec; padding: 6px 8px; text-align: left; vertical-align: top; }
.kpi { display: flex; gap: 24px; font-size: 13px; color: #52606d; border-top: 1px solid #d9e2ec; padding-top: 12px; margin-top: 20px; }
.attachments { font-size: 13px; color: #52606d; }
"#;

/// Shared shell. `case_id` is shown in the banner once a report exists.
pub fn page(title: &str, case_id: Option<&str>, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · Compliance Pack Generator" }
                style { (PreEscaped(STYLES)) }
            }
            body {
                header.banner {
                    h1 { "GDPR Compliance Pack Generator" }
                    @if let Some(case_id) = case_id {
                        span.case { (case_id) }
                    }
                }
                main { (body) }
            }
        }
    }
}

/// Markdown to HTML. Raw HTML in the source is rendered as text.
pub fn render_markdown(source: &str) -> Markup {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(source.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut out, parser);
    PreEscaped(out)
}
