// File: src/page.rs
// Purpose: Demo page linking the configured bundles

use maud::{html, Markup, DOCTYPE};

/// Index page with one `<link>` and one `<script>` per non-empty bundle URL
pub fn index(js_url: &str, css_url: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Combiner" }
                @if !css_url.is_empty() {
                    link rel="stylesheet" href=(css_url);
                }
            }
            body {
                h1 { "Combiner" }
                p { "JavaScript and CSS served as one bundle per type." }
                ul {
                    li { "JavaScript: " code { (display(js_url)) } }
                    li { "CSS: " code { (display(css_url)) } }
                }
                @if !js_url.is_empty() {
                    script src=(js_url) {}
                }
            }
        }
    }
}

fn display(url: &str) -> &str {
    if url.is_empty() {
        "(nothing registered)"
    } else {
        url
    }
}
