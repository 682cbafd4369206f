use maud::{Markup, html};

use super::page;
use crate::models::Scenario;

/// Scenario choice plus the credential field. `action` is `/sessions` for a
/// fresh visitor and `/sessions/{id}/scenario` for an idle session.
pub fn selector_page(action: &str, has_credential: bool) -> Markup {
    page(
        "Select scenario",
        None,
        html! {
            form.card method="post" action=(action) {
                h2 { "1. OpenAI API Key" }
                div.field {
                    label for="api_key" { "API Key" }
                    input #api_key type="password" name="api_key" autocomplete="off"
                        placeholder=(if has_credential { "Stored for this session, leave blank to keep" } else { "sk-..." });
                }
                h2 { "2. Choose a scenario" }
                div.scenarios {
                    @for scenario in [Scenario::RnD, Scenario::Office] {
                        button type="submit" name="scenario" value=(scenario.as_str()) {
                            strong { (scenario.as_str()) }
                            br;
                            small { (blurb(scenario)) }
                        }
                    }
                }
            }
        },
    )
}

fn blurb(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::RnD => "Vehicle test data, sensor logging, algorithm validation",
        Scenario::Office => "HR, visitor management, IT and office SaaS tools",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_offers_both_scenarios() {
        let html = selector_page("/sessions", false).into_string();
        assert!(html.contains(r#"action="/sessions""#));
        assert!(html.contains(r#"value="R&amp;D""#));
        assert!(html.contains(r#"value="Office""#));
        assert!(html.contains(r#"type="password""#));
    }

    #[test]
    fn test_selector_hints_stored_credential() {
        let html = selector_page("/sessions/abc/scenario", true).into_string();
        assert!(html.contains("Stored for this session"));
    }
}
