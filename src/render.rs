use handlebars::{Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext};
use scraper::Html;
use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::format::format_score_value;
use crate::views::{EventsView, NextMeetingView, ResultsMessageView, ResultsView, EVENTS_LOAD_ERROR};

/// Templates compiled into the binary, by registry name
const TEMPLATES: [(&str, &str); 11] = [
    ("next_meeting", include_str!("templates/next_meeting.hbs")),
    ("no_meeting", include_str!("templates/no_meeting.hbs")),
    ("events", include_str!("templates/events.hbs")),
    ("event_item", include_str!("templates/event_item.hbs")),
    ("status", include_str!("templates/status.hbs")),
    ("results", include_str!("templates/results.hbs")),
    ("champions", include_str!("templates/champions.hbs")),
    ("leaderboards", include_str!("templates/leaderboards.hbs")),
    ("best_in_class", include_str!("templates/best_in_class.hbs")),
    ("entries", include_str!("templates/entries.hbs")),
    ("results_message", include_str!("templates/results_message.hbs")),
];

/// Templates that are also included by other templates
const PARTIALS: [&str; 5] = ["event_item", "champions", "leaderboards", "best_in_class", "entries"];

// ============================================================================
// HELPERS
// ============================================================================

/// # score helper
/// formats a score the way the results tables show it: whole numbers
/// without decimals, others with one, absent scores as a dash
///
/// ### usage
/// ```handlebars
/// {{score value}}
/// ```
#[derive(Clone, Copy)]
pub struct ScoreHelper;

impl HelperDef for ScoreHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        helper: &Helper,
        _: &Handlebars,
        _: &Context,
        _: &mut RenderContext,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = helper
            .param(0)
            .map(|param| param.value().clone())
            .unwrap_or(serde_json::Value::Null);
        out.write(&format_score_value(&value))?;
        Ok(())
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Renders widget view models to HTML fragments. Every interpolated value
/// is HTML-escaped; only the pre-escaped JSON-LD bodies are emitted raw.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_helper("score", Box::new(ScoreHelper));
        for (name, source) in TEMPLATES {
            registry.register_template_string(name, source)?;
            if PARTIALS.contains(&name) {
                registry.register_partial(name, source)?;
            }
        }
        Ok(Renderer { registry })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        let html = self.registry.render(name, data)?;
        Ok(html)
    }

    /// Banner for the next meeting, or the placeholder when there is none
    pub fn render_next_meeting(&self, view: Option<&NextMeetingView>) -> Result<String> {
        match view {
            Some(view) => self.render("next_meeting", view),
            None => self.render("no_meeting", &json!({})),
        }
    }

    pub fn render_events(&self, view: &EventsView) -> Result<String> {
        self.render("events", view)
    }

    pub fn render_events_error(&self) -> Result<String> {
        self.render_status("events__error", EVENTS_LOAD_ERROR)
    }

    pub fn render_status(&self, class_name: &str, message: &str) -> Result<String> {
        self.render("status", &json!({ "class_name": class_name, "message": message }))
    }

    /// Full results page for the current selection
    pub fn render_results(&self, view: &ResultsView) -> Result<String> {
        self.render("results", view)
    }

    pub fn render_champions(&self, view: &ResultsView) -> Result<String> {
        self.render("champions", view)
    }

    pub fn render_leaderboards(&self, view: &ResultsView) -> Result<String> {
        self.render("leaderboards", view)
    }

    pub fn render_best_in_class(&self, view: &ResultsView) -> Result<String> {
        self.render("best_in_class", view)
    }

    pub fn render_entries(&self, view: &ResultsView) -> Result<String> {
        self.render("entries", view)
    }

    /// Same message in every results panel (load failure, empty dataset)
    pub fn render_results_message(&self, message: &str) -> Result<String> {
        self.render("results_message", &ResultsMessageView::new(message))
    }
}

/// Visible text of a rendered fragment with whitespace collapsed.
/// Script bodies are skipped.
pub fn text_content(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut words: Vec<&str> = Vec::new();
    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let in_script = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| element.name() == "script");
        if in_script {
            continue;
        }
        words.extend(text.split_whitespace());
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::RESULTS_LOAD_ERROR;

    #[test]
    fn test_templates_compile() {
        assert!(Renderer::new().is_ok());
    }

    #[test]
    fn test_no_meeting_placeholder() {
        let renderer = Renderer::new().unwrap();
        let html = renderer.render_next_meeting(None).unwrap();
        assert_eq!(
            text_content(&html),
            "Next Meeting No upcoming meeting scheduled Please check back soon."
        );
    }

    #[test]
    fn test_results_message_fills_every_panel() {
        let renderer = Renderer::new().unwrap();
        let html = renderer.render_results_message(RESULTS_LOAD_ERROR).unwrap();
        assert_eq!(html.matches(RESULTS_LOAD_ERROR).count(), 7);
        assert!(html.contains("id=\"panel-top5\""));
    }

    #[test]
    fn test_status_escapes_message() {
        let renderer = Renderer::new().unwrap();
        let html = renderer.render_status("note", "<b>hi</b>").unwrap();
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert_eq!(text_content(&html), "<b>hi</b>");
    }

    #[test]
    fn test_text_content_skips_scripts() {
        let html = "<p>One\n  two</p><script type=\"application/ld+json\">{\"a\":1}</script><p>three</p>";
        assert_eq!(text_content(html), "One two three");
    }
}
