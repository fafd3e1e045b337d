//! Server-side HTML for the chat surface.
//!
//! Every page is rendered in full on each request. User-supplied and
//! document text is always escaped; assistant answers are rendered from
//! markdown with raw HTML turned into plain text.

use pulldown_cmark::{html, CowStr, Event, Parser, Tag};
use uuid::Uuid;

use crate::citation::Citation;
use crate::session::{ChatRole, ChatSession, PRESET_QUESTIONS};

pub const PAGE_TITLE: &str = "KI-Studienberatung";
pub const HEADING: &str = "🎓 KI-System für Studierendenfragen";
pub const MISSING_KEY_MESSAGE: &str =
    "⚠️ Kein OpenAI API Key gefunden. Bitte überprüfen Sie die .env Datei.";
pub const INDEXING_MESSAGE: &str = "System wird initialisiert... Bitte warten.";
pub const DATABASE_FAILED_MESSAGE: &str = "Datenbank konnte nicht geladen werden.";
pub const INPUT_PLACEHOLDER: &str = "Stellen Sie Ihre Frage hier...";
pub const ANSWERING_MESSAGE: &str = "Suche in der SPO...";
pub const SOURCES_SUMMARY: &str = "Quellen anzeigen (Referenz)";

const WELCOME_MARKDOWN: &str = "Willkommen! Ich bin Ihr KI-Assistent für Fragen zur \
**Studien- und Prüfungsordnung (SPO)** und zum Studiengang **Maschinenbau & Mechatronik**.";

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; display: flex; min-height: 100vh; color: #262730; }
aside { width: 18rem; background: #f0f2f6; padding: 1.5rem; box-sizing: border-box; }
aside button { display: block; width: 100%; margin: 0.4rem 0; padding: 0.5rem; text-align: left;
  background: #fff; border: 1px solid #d0d3da; border-radius: 0.4rem; cursor: pointer; }
main { flex: 1; padding: 2rem 3rem; max-width: 60rem; }
.msg { padding: 0.75rem 1rem; margin: 0.75rem 0; border-radius: 0.5rem; }
.msg.user { background: #f0f2f6; }
.msg.assistant { background: #fff; border: 1px solid #e6e8ee; }
.role { font-size: 0.75rem; text-transform: uppercase; color: #808495; }
.error { background: #ffe9e9; color: #7d1a1a; padding: 0.75rem 1rem; border-radius: 0.5rem; margin: 0.75rem 0; }
.caption { color: #808495; font-size: 0.85rem; margin: 0.2rem 0 0.8rem; }
.busy { display: none; color: #808495; }
form.chat { display: flex; gap: 0.5rem; margin-top: 1.5rem; }
form.chat input { flex: 1; padding: 0.6rem; border: 1px solid #d0d3da; border-radius: 0.4rem; }
"#;

/// Shows the busy indicator and blocks double submission while a question
/// is being answered.
const BUSY_SCRIPT: &str = r#"
document.querySelectorAll('form[data-ask]').forEach(function (f) {
  f.addEventListener('submit', function () {
    document.getElementById('busy').style.display = 'block';
    document.querySelectorAll('form[data-ask] button').forEach(function (b) { b.disabled = true; });
  });
});
"#;

/// What happened to the question submitted with this request.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Answered; citations belong to the newest assistant turn.
    Answered { citations: Vec<Citation> },
    /// Generation failed; shown once, below the question.
    Failed { message: String },
}

/// Page shown when no API key is configured. No chat elements.
pub fn render_missing_key() -> String {
    let body = format!(
        "{}<div class=\"error\">{}</div>",
        header(),
        escape_html(MISSING_KEY_MESSAGE)
    );
    page(&main_only(&body), None)
}

/// Page shown while the index is being built; reloads itself.
pub fn render_indexing() -> String {
    let body = format!(
        "{}<p>⏳ {}</p>",
        header(),
        escape_html(INDEXING_MESSAGE)
    );
    page(&main_only(&body), Some(2))
}

/// Terminal page for a failed index build.
pub fn render_index_failed(error: &str) -> String {
    let body = format!(
        "{}<div class=\"error\">Fehler beim Laden der Dokumente: {}</div><div class=\"error\">{}</div>",
        header(),
        escape_html(error),
        escape_html(DATABASE_FAILED_MESSAGE)
    );
    page(&main_only(&body), None)
}

/// The chat page: preset sidebar, history, optional outcome of the latest
/// question, and the input box.
pub fn render_chat(session_id: Uuid, history: &ChatSession, outcome: Option<&TurnOutcome>) -> String {
    let action = format!("/chat/{}", session_id);

    let mut sidebar = String::from("<aside><h2>Einstellungen</h2><hr><h3>Häufig gestellte Fragen</h3>");
    sidebar.push_str(&format!(
        "<form method=\"post\" action=\"{}\" data-ask>",
        escape_html(&action)
    ));
    for question in PRESET_QUESTIONS {
        sidebar.push_str(&format!(
            "<button type=\"submit\" name=\"question\" value=\"{q}\">{q}</button>",
            q = escape_html(question)
        ));
    }
    sidebar.push_str("</form></aside>");

    let mut main = header();
    let turns = history.turns();
    for (i, turn) in turns.iter().enumerate() {
        main.push_str(&render_turn(turn.role, &turn.content));

        let is_last = i + 1 == turns.len();
        if is_last {
            match (turn.role, outcome) {
                (ChatRole::Assistant, Some(TurnOutcome::Answered { citations })) => {
                    main.push_str(&render_citations(citations));
                }
                (ChatRole::User, Some(TurnOutcome::Failed { message })) => {
                    main.push_str(&format!(
                        "<div class=\"error\">Ein Fehler ist aufgetreten: {}</div>",
                        escape_html(message)
                    ));
                }
                _ => {}
            }
        }
    }

    main.push_str(&format!(
        "<p id=\"busy\" class=\"busy\">{}</p>",
        escape_html(ANSWERING_MESSAGE)
    ));
    main.push_str(&format!(
        "<form class=\"chat\" method=\"post\" action=\"{}\" data-ask>\
         <input type=\"text\" name=\"question\" placeholder=\"{}\" autocomplete=\"off\" autofocus required>\
         <button type=\"submit\">Senden</button></form>",
        escape_html(&action),
        escape_html(INPUT_PLACEHOLDER)
    ));
    main.push_str(&format!("<script>{}</script>", BUSY_SCRIPT));

    page(&format!("{}<main>{}</main>", sidebar, main), None)
}

fn render_turn(role: ChatRole, content: &str) -> String {
    let body = match role {
        ChatRole::User => format!("<p>{}</p>", escape_html(content)),
        ChatRole::Assistant => markdown_to_html(content),
    };
    format!(
        "<div class=\"msg {role}\"><div class=\"role\">{role}</div>{body}</div>",
        role = role.as_str(),
        body = body
    )
}

fn render_citations(citations: &[Citation]) -> String {
    let mut out = format!("<details><summary>{}</summary>", escape_html(SOURCES_SUMMARY));
    for citation in citations {
        out.push_str(&markdown_to_html(&citation.label()));
        out.push_str(&format!(
            "<p class=\"caption\">{}</p>",
            escape_html(&citation.excerpt)
        ));
    }
    out.push_str("</details>");
    out
}

fn header() -> String {
    format!(
        "<h1>{}</h1>{}",
        escape_html(HEADING),
        markdown_to_html(WELCOME_MARKDOWN)
    )
}

fn main_only(body: &str) -> String {
    format!("<main>{}</main>", body)
}

fn page(body: &str, refresh_secs: Option<u32>) -> String {
    let refresh = refresh_secs
        .map(|s| format!("<meta http-equiv=\"refresh\" content=\"{}\">", s))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html lang=\"de\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">{}\
         <title>{}</title><style>{}</style></head><body>{}</body></html>",
        refresh, PAGE_TITLE, STYLE, body
    )
}

/// URL schemes allowed in rendered links and images.
const SAFE_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Render markdown to HTML, treating embedded HTML as literal text.
///
/// Link and image targets with a scheme other than [`SAFE_SCHEMES`] are
/// replaced by `#`; relative targets are kept.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

fn is_safe_url(url: &str) -> bool {
    // Browsers ignore whitespace and control characters inside the scheme.
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    match cleaned.find([':', '/', '?', '#']) {
        Some(pos) if cleaned[pos..].starts_with(':') => {
            let scheme = cleaned[..pos].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

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
