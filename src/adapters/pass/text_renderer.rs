//! Plain-text pass renderer.
//!
//! Produces a fixed-layout text document. The token line is what a scanner
//! reads at the venue.

use async_trait::async_trait;

use crate::ports::{PassContent, PassDocument, PassRenderer, RenderError};

/// Template-based implementation of PassRenderer.
#[derive(Debug, Clone)]
pub struct TextPassRenderer {
    title: String,
}

impl Default for TextPassRenderer {
    fn default() -> Self {
        Self {
            title: "VISITOR PASS".to_string(),
        }
    }
}

impl TextPassRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the heading printed on every pass.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn layout(&self, content: &PassContent) -> String {
        let rule = "=".repeat(40);
        let mut doc = String::new();
        doc.push_str(&format!("{}\n{}\n{}\n\n", rule, self.title, rule));
        doc.push_str(&format!("Event:    {}\n", content.event_name));
        doc.push_str(&format!("Visitor:  {}\n", content.member_name));
        if let Some(business_type) = content.business_type {
            doc.push_str(&format!("Business: {}\n", business_type.display_name()));
        }
        doc.push_str(&format!("Pass no:  {}\n\n", content.registration_id));
        doc.push_str("Present this code at the entrance:\n");
        doc.push_str(&format!("{}\n", content.token));
        doc
    }
}

#[async_trait]
impl PassRenderer for TextPassRenderer {
    async fn render(&self, content: &PassContent) -> Result<PassDocument, RenderError> {
        if content.token.is_empty() {
            return Err(RenderError("pass token is empty".to_string()));
        }
        Ok(PassDocument {
            bytes: self.layout(content).into_bytes(),
            file_name: format!("pass-{}.txt", content.registration_id),
            content_type: "text/plain; charset=utf-8".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{BusinessType, RegistrationId};

    fn content(business_type: Option<BusinessType>) -> PassContent {
        PassContent {
            registration_id: RegistrationId::new(12),
            event_name: "Annual Trade Meet".to_string(),
            member_name: "Asha Traders".to_string(),
            business_type,
            token: "RDPASS.abc".to_string(),
        }
    }

    #[tokio::test]
    async fn pass_carries_token_and_names() {
        let doc = TextPassRenderer::new()
            .render(&content(Some(BusinessType::Trader)))
            .await
            .unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();

        assert!(text.contains("Annual Trade Meet"));
        assert!(text.contains("Asha Traders"));
        assert!(text.contains("Business: Trader"));
        assert!(text.contains("RDPASS.abc"));
        assert_eq!(doc.file_name, "pass-12.txt");
    }

    #[tokio::test]
    async fn business_line_is_omitted_when_unknown() {
        let doc = TextPassRenderer::new().render(&content(None)).await.unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();
        assert!(!text.contains("Business:"));
    }

    #[tokio::test]
    async fn empty_token_fails() {
        let mut c = content(None);
        c.token.clear();
        assert!(TextPassRenderer::new().render(&c).await.is_err());
    }
}
