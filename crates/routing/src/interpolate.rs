//! `{{var}}` interpolation against conversation context.
//!
//! Fails closed: an unresolved placeholder renders as the empty string,
//! so a half-configured template never breaks the pipeline.

use std::sync::OnceLock;

use regex::Regex;

use sb_domain::conversation::ConversationContext;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap())
}

/// Render `body`, resolving placeholders from context metadata first,
/// then the built-ins `user_name` (the user id when metadata has no
/// override) and `last_intent`.
pub fn interpolate(body: &str, ctx: &ConversationContext) -> String {
    placeholder_re()
        .replace_all(body, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            if let Some(value) = ctx.metadata.get(key) {
                return value.clone();
            }
            match key {
                "user_name" => ctx.user_id.clone(),
                "last_intent" => ctx.last_intent.clone().unwrap_or_default(),
                _ => String::new(),
            }
        })
        .into_owned()
}
