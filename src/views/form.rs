use maud::{Markup, PreEscaped, display, html};
use uuid::Uuid;

use super::page;
use crate::models::{ACCEPTED_EXTENSIONS, AssessmentFields, FIELD_LABELS, Scenario};

// Lists the chosen files under the picker and locks the button once the
// form is posted.
const FORM_SCRIPT: &str = r#"
document.getElementById('attachments').addEventListener('change', function (e) {
  var list = document.getElementById('attachment-list');
  list.innerHTML = '';
  Array.prototype.forEach.call(e.target.files, function (f) {
    var li = document.createElement('li');
    li.textContent = f.name + ' (' + Math.round(f.size / 1024) + ' KB)';
    list.appendChild(li);
  });
});
document.getElementById('assessment').addEventListener('submit', function () {
  var button = document.getElementById('submit');
  button.disabled = true;
  button.textContent = 'Generating compliance pack...';
});
"#;

fn multiline(name: &str) -> bool {
    matches!(name, "data_type" | "storage" | "recipients" | "security")
}

fn accept_attr() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// The ten-question intake form. `values` is the draft of a failed attempt
/// or the scenario demo data.
pub fn form_page(
    session_id: Uuid,
    scenario: Scenario,
    values: &AssessmentFields,
    error: Option<&str>,
) -> Markup {
    page(
        "Assessment",
        None,
        html! {
            div.card {
                h2 { "Scenario: " (scenario.as_str()) }
                @if let Some(error) = error {
                    div.error role="alert" { (error) }
                }
                div.actions {
                    a.secondary href={ "/sessions/" (display(session_id)) "?demo=1" } { "Fill demo data" }
                    form method="post" action={ "/sessions/" (display(session_id)) "/back" } {
                        button.secondary type="submit" { "Back" }
                    }
                }
            }
            form #assessment .card method="post" enctype="multipart/form-data"
                action={ "/sessions/" (display(session_id)) "/submit" } {
                @for (name, label) in FIELD_LABELS {
                    div.field {
                        label for=(name) { (label) }
                        @let value = values.get(name).unwrap_or("");
                        @if multiline(name) {
                            textarea id=(name) name=(name) rows="3" required { (value) }
                        } @else {
                            input id=(name) type="text" name=(name) value=(value) required;
                        }
                    }
                }
                div.field {
                    label for="attachments" { "Regulation documents (optional)" }
                    input #attachments type="file" name="attachments" multiple accept=(accept_attr());
                    ul #attachment-list .attachments {}
                }
                div.actions {
                    button #submit .primary type="submit" { "Generate Compliance Pack" }
                }
            }
            script { (PreEscaped(FORM_SCRIPT)) }
        },
    )
}

/// Shown while a submission is in flight; polls until the state changes.
pub fn submitting_page(session_id: Uuid, scenario: Scenario) -> Markup {
    page(
        "Generating",
        None,
        html! {
            meta http-equiv="refresh" content={ "5;url=/sessions/" (display(session_id)) };
            div.card {
                h2 { "Generating compliance pack for " (scenario.as_str()) "..." }
                p { "Deep reasoning and web search can take several minutes. This page refreshes on its own." }
                button.primary type="button" disabled { "Generating..." }
            }
        },
    )
}
