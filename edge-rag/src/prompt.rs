//! Prompt template substitution.

use std::borrow::Cow;

/// Placeholder replaced by the packed context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";
/// Placeholder replaced by the user question.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// A prompt template with literal `{context}` and `{query}` placeholders.
///
/// Templates are not validated: one that lacks a placeholder renders without
/// that substitution point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate<'a> {
    template: Cow<'a, str>,
}

impl<'a> PromptTemplate<'a> {
    /// Wrap a template string.
    pub fn new(template: impl Into<Cow<'a, str>>) -> Self {
        Self { template: template.into() }
    }

    /// Whether both placeholders are present.
    pub fn has_placeholders(&self) -> bool {
        self.template.contains(CONTEXT_PLACEHOLDER) && self.template.contains(QUERY_PLACEHOLDER)
    }

    /// Substitute every placeholder occurrence in a single left-to-right pass.
    ///
    /// Substituted text is never rescanned, so a context that itself contains
    /// `{query}` is inserted verbatim. This differs from chaining
    /// `str::replace` for `{context}` and then `{query}`, which would also
    /// replace a `{query}` that arrived inside the context.
    pub fn render(&self, context: &str, query: &str) -> String {
        let mut rendered = String::with_capacity(self.template.len() + context.len() + query.len());
        let mut rest: &str = &self.template;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                rendered.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUERY_PLACEHOLDER) {
                rendered.push_str(query);
                rest = after;
            } else {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
        rendered.push_str(rest);

        rendered
    }
}
