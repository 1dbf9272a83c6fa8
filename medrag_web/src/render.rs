use medrag_core::{ChatMessage, Passage, Role};
use std::fmt::Write;

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn message_body(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

const STYLE: &str = "\
body{font-family:sans-serif;max-width:800px;margin:2rem auto;padding:0 1rem;}\
.message{padding:.75rem 1rem;margin:.5rem 0;border-radius:8px;}\
.user{background:#e3f2fd;}\
.assistant{background:#f1f8e9;}\
.error{background:#ffebee;color:#b71c1c;padding:.75rem 1rem;border-radius:8px;}\
.sources{font-size:.85rem;color:#555;}\
form{display:flex;gap:.5rem;margin-top:1rem;}\
input[type=text]{flex:1;padding:.5rem;}";

/// Render the chat page.
#[must_use]
pub fn render_page(
    messages: &[ChatMessage],
    error: Option<&str>,
    sources: Option<&[Passage]>,
) -> String {
    let mut html = String::with_capacity(2048);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Medical AI Assistant</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<h1>Medical AI Assistant</h1>\n");

    if let Some(error) = error {
        let _ = writeln!(html, "<div class=\"error\">{}</div>", escape_html(error));
    }

    html.push_str("<div id=\"chat\">\n");
    for message in messages {
        let (class, speaker) = match message.role {
            Role::User => ("user", "You"),
            Role::Assistant => ("assistant", "AI Assistant"),
            Role::System => continue,
        };
        let _ = writeln!(
            html,
            "<div class=\"message {class}\"><strong>{speaker}:</strong> {}</div>",
            message_body(&message.content)
        );
    }
    html.push_str("</div>\n");

    if let Some(passages) = sources.filter(|p| !p.is_empty()) {
        html.push_str("<div class=\"sources\"><strong>Sources:</strong><ul>\n");
        for passage in passages {
            let _ = writeln!(html, "<li>{}</li>", escape_html(&passage.source_label()));
        }
        html.push_str("</ul></div>\n");
    }

    html.push_str(
        "<form method=\"post\" action=\"/\">\n\
         <input type=\"text\" name=\"prompt\" placeholder=\"Ask a medical question...\" autofocus>\n\
         <button type=\"submit\">Ask</button>\n\
         </form>\n\
         <p><a href=\"/clear\">Clear conversation</a> | <a href=\"/export\">Export conversation</a></p>\n\
         </body>\n</html>\n",
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::PassageMetadata;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn newlines_become_breaks() {
        let page = render_page(&[ChatMessage::assistant("line one\nline two")], None, None);
        assert!(page.contains("line one<br>line two"));
    }

    #[test]
    fn user_text_is_not_injected() {
        let page = render_page(&[ChatMessage::user("<b>bold</b>")], None, None);
        assert!(page.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!page.contains("<b>bold</b>"));
    }

    #[test]
    fn error_banner_and_sources() {
        let sources = [Passage::new(
            "text",
            PassageMetadata {
                source: Some("guide.pdf".to_string()),
                page: Some(7),
            },
        )];
        let page = render_page(&[], Some("Database error."), Some(&sources));
        assert!(page.contains("<div class=\"error\">Database error.</div>"));
        assert!(page.contains("<li>guide.pdf p.7</li>"));
    }
}
