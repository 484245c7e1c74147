use handlebars::Handlebars;
use rust_embed::RustEmbed;
use serde_json::{Map, Value};

use common::contracts::{RenderedMessage, TemplateRenderer};
use common::{NotificationKind, NotifyError};

/// Embedded template assets, compiled into the worker binary so deployment
/// needs no template directory.
#[derive(RustEmbed)]
#[folder = "templates/"]
struct TemplateAssets;

/// Default subject and template name for each notification kind.
fn template_meta(kind: NotificationKind) -> (&'static str, &'static str) {
    use NotificationKind::*;
    match kind {
        ConfirmSignup => ("Confirm Your Email Address", "confirm_signup"),
        InviteUser => ("You've Been Invited", "invite_user"),
        MagicLink => ("Your Sign-In Link", "magic_link"),
        ChangeEmail => ("Confirm Your New Email Address", "change_email"),
        ResetPassword => ("Reset Your Password", "reset_password"),
        Reauthentication => ("Confirm Your Identity", "reauthentication"),
        PasswordChanged => ("Your Password Has Been Changed", "password_changed"),
        EmailChanged => ("Your Email Address Has Been Changed", "email_changed"),
        PhoneChanged => ("Your Phone Number Has Been Changed", "phone_changed"),
        IdentityLinked => ("A New Identity Has Been Linked", "identity_linked"),
        IdentityUnlinked => ("An Identity Has Been Unlinked", "identity_unlinked"),
    }
}

/// Handlebars-backed [`TemplateRenderer`].
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Load every embedded template. Fails if any registered kind is
    /// missing its asset, so a broken build is caught at startup rather
    /// than on the first send.
    pub fn new() -> Result<Self, NotifyError> {
        let mut handlebars = Handlebars::new();

        for file in TemplateAssets::iter() {
            let Some(content) = TemplateAssets::get(&file) else {
                continue;
            };
            let source = std::str::from_utf8(&content.data)
                .map_err(|e| NotifyError::Render(format!("template {file} is not UTF-8: {e}")))?;
            let name = file.trim_end_matches(".hbs").to_string();
            handlebars
                .register_template_string(&name, source)
                .map_err(|e| NotifyError::Render(format!("parsing template {file}: {e}")))?;
        }

        for kind in NotificationKind::ALL {
            let (_, template) = template_meta(*kind);
            if !handlebars.has_template(template) {
                return Err(NotifyError::Render(format!(
                    "no template registered for type: {kind}"
                )));
            }
        }

        Ok(Self { handlebars })
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(
        &self,
        kind: NotificationKind,
        data: &Map<String, Value>,
    ) -> Result<RenderedMessage, NotifyError> {
        let (default_subject, template) = template_meta(kind);

        // Allow subject override via data
        let subject = match data.get("Subject").and_then(Value::as_str) {
            Some(custom) if !custom.is_empty() => custom.to_string(),
            _ => default_subject.to_string(),
        };

        let html = self
            .handlebars
            .render(template, data)
            .map_err(|e| NotifyError::Render(format!("executing template {template}: {e}")))?;

        let text = html_to_text(&html);

        Ok(RenderedMessage {
            subject,
            html,
            text,
        })
    }
}

/// Derive a plain-text fallback from HTML: strip tags, decode the common
/// entities, collapse whitespace.
fn html_to_text(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(entries: Value) -> Map<String, Value> {
        match entries {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_every_kind_has_a_template() {
        let engine = TemplateEngine::new().unwrap();
        for kind in NotificationKind::ALL {
            let rendered = engine.render(*kind, &Map::new()).unwrap();
            assert!(!rendered.subject.is_empty());
            assert!(!rendered.html.is_empty());
        }
    }

    #[test]
    fn test_render_interpolates_data() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render(
                NotificationKind::ConfirmSignup,
                &data(json!({"ConfirmationURL": "https://example.com/confirm"})),
            )
            .unwrap();

        assert_eq!(rendered.subject, "Confirm Your Email Address");
        assert!(rendered.html.contains("https://example.com/confirm"));
        assert!(rendered.text.contains("https://example.com/confirm"));
    }

    #[test]
    fn test_subject_override() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render(
                NotificationKind::MagicLink,
                &data(json!({"Subject": "Custom subject"})),
            )
            .unwrap();
        assert_eq!(rendered.subject, "Custom subject");
    }

    #[test]
    fn test_empty_subject_override_is_ignored() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render(NotificationKind::MagicLink, &data(json!({"Subject": ""})))
            .unwrap();
        assert_eq!(rendered.subject, "Your Sign-In Link");
    }

    #[test]
    fn test_html_to_text_strips_and_decodes() {
        let text = html_to_text("<p>Hello &amp;\n  <b>world</b>&nbsp;&#39;quoted&#39;</p>");
        assert_eq!(text, "Hello & world 'quoted'");
    }

    #[test]
    fn test_html_to_text_collapses_whitespace() {
        let text = html_to_text("<div>\n  a\n\n   b\t c\n</div>");
        assert_eq!(text, "a b c");
    }
}
