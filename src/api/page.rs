//! Server-rendered chat page

use crate::dialogue::SESSION_ENDED;
use crate::session::{SessionContext, Speaker};
use html_escape::{encode_double_quoted_attribute, encode_text};

const TITLE: &str = "💳 CardAssist: Card Management &amp; Knowledge Assistant";

const WELCOME: &str = r#"<section class="welcome">
<p><strong>Welcome to CardAssist!</strong><br>
I'm here to help you manage your cards and answer your questions. You can:</p>
<ul>
<li>Activate or deactivate a card (e.g., "Activate card 123456789")</li>
<li>Check card status (e.g., "What is the status of card 123456789?")</li>
<li>Ask about card management (e.g., "How do I change my PIN?")</li>
<li>Reset all cards (e.g., "Reset all cards")</li>
<li>End the session by saying "thanks" or "end"</li>
</ul>
<p>Start by typing your question below!</p>
</section>"#;

pub const ENDED_BANNER: &str = "👋 Session ended. Start a new conversation below.";

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
.turn{margin:.5rem 0}.banner{color:#555;font-style:italic}\
form{display:flex;gap:.5rem;margin-top:1rem}input[type=text]{flex:1;padding:.4rem}";

/// Escape `text` and keep its line breaks
fn paragraph(text: &str) -> String {
    encode_text(text).replace('\n', "<br>\n")
}

fn transcript_html(session: &SessionContext) -> String {
    let mut html = String::new();
    for entry in session.transcript() {
        let label = match entry.speaker {
            Speaker::User => "🧑 You:",
            Speaker::Assistant => "🤖 CardAssist:",
        };
        html.push_str("<div class=\"turn\"><strong>");
        html.push_str(label);
        html.push_str("</strong> ");
        html.push_str(&paragraph(&entry.text));
        html.push_str("</div>\n");

        if entry.speaker == Speaker::Assistant && entry.text == SESSION_ENDED && session.ended {
            html.push_str("<p class=\"banner\">");
            html.push_str(ENDED_BANNER);
            html.push_str("</p>\n");
        }
    }
    html
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>CardAssist Chatbot</title>\n<style>{STYLE}</style>\n</head>\n\
         <body>\n<h1>{TITLE}</h1>\n{body}\n</body>\n</html>\n"
    )
}

/// Full page for one session: welcome text, transcript, then the input form.
/// An ended session gets a link to a fresh one instead of the form.
pub fn render_session(session_id: &str, session: &SessionContext) -> String {
    let footer = if session.ended {
        "<p><a href=\"/\">Start a new conversation</a></p>".to_string()
    } else {
        format!(
            "<form method=\"post\" action=\"/s/{}/chat\">\n\
             <input type=\"text\" name=\"message\" placeholder=\"Type your message here...\" autofocus>\n\
             <button type=\"submit\">Send</button>\n</form>",
            encode_double_quoted_attribute(session_id)
        )
    };
    layout(&format!(
        "{WELCOME}\n<section class=\"transcript\">\n{}</section>\n{footer}",
        transcript_html(session)
    ))
}

pub fn render_not_found() -> String {
    layout("<p>That conversation does not exist.</p>\n<p><a href=\"/\">Start a new conversation</a></p>")
}
