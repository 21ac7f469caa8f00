//! JSON-file-backed store for tenant rules and templates.
//!
//! Same shape as the conversation stores: everything in memory behind a
//! `parking_lot::RwLock`, flushed periodically and on shutdown.
//! `rules.json` and `templates.json` live under the configured state
//! path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use sb_domain::error::{Error, Result};

use crate::rules::BotRule;
use crate::templates::ResponseTemplate;

pub struct CustomLogicStore {
    rules_path: PathBuf,
    templates_path: PathBuf,
    rules: RwLock<HashMap<String, BotRule>>,
    templates: RwLock<HashMap<String, ResponseTemplate>>,
    /// Monotonic creation sequence shared by rules and templates, used
    /// as the recency tie-breaker.
    next_seq: AtomicU64,
}

impl CustomLogicStore {
    pub fn new(state_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_path).map_err(Error::Io)?;
        let rules_path = state_path.join("rules.json");
        let templates_path = state_path.join("templates.json");

        let rules: HashMap<String, BotRule> = load_map(&rules_path)?;
        let templates: HashMap<String, ResponseTemplate> = load_map(&templates_path)?;

        let max_seq = rules
            .values()
            .map(|r| r.created_seq)
            .chain(templates.values().map(|t| t.created_seq))
            .max()
            .unwrap_or(0);

        tracing::info!(
            rules = rules.len(),
            templates = templates.len(),
            "custom logic store loaded"
        );

        Ok(Self {
            rules_path,
            templates_path,
            rules: RwLock::new(rules),
            templates: RwLock::new(templates),
            next_seq: AtomicU64::new(max_seq + 1),
        })
    }

    fn take_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    // ── rules ───────────────────────────────────────────────────────

    /// Insert or replace a rule. A zero `created_seq` (fresh rule) gets
    /// the next sequence number; updates keep their original recency.
    pub fn upsert_rule(&self, mut rule: BotRule) -> BotRule {
        if rule.created_seq == 0 {
            rule.created_seq = self.take_seq();
        }
        self.rules.write().insert(rule.id.clone(), rule.clone());
        rule
    }

    pub fn remove_rule(&self, id: &str) -> bool {
        self.rules.write().remove(id).is_some()
    }

    /// Active rules for one tenant's bot.
    pub fn rules_for(&self, tenant_id: &str, bot_id: &str) -> Vec<BotRule> {
        self.rules
            .read()
            .values()
            .filter(|r| r.is_active && r.tenant_id == tenant_id && r.bot_id == bot_id)
            .cloned()
            .collect()
    }

    pub fn record_rule_execution(&self, id: &str) {
        let mut rules = self.rules.write();
        if let Some(rule) = rules.get_mut(id) {
            rule.execution_count += 1;
        }
    }

    // ── templates ───────────────────────────────────────────────────

    pub fn upsert_template(&self, mut template: ResponseTemplate) -> ResponseTemplate {
        if template.created_seq == 0 {
            template.created_seq = self.take_seq();
        }
        self.templates
            .write()
            .insert(template.id.clone(), template.clone());
        template
    }

    pub fn remove_template(&self, id: &str) -> bool {
        self.templates.write().remove(id).is_some()
    }

    /// Active templates for one tenant's bot.
    pub fn templates_for(&self, tenant_id: &str, bot_id: &str) -> Vec<ResponseTemplate> {
        self.templates
            .read()
            .values()
            .filter(|t| t.is_active && t.tenant_id == tenant_id && t.bot_id == bot_id)
            .cloned()
            .collect()
    }

    pub fn record_template_use(&self, id: &str) {
        let mut templates = self.templates.write();
        if let Some(template) = templates.get_mut(id) {
            template.usage_count += 1;
        }
    }

    // ── persistence ─────────────────────────────────────────────────

    pub fn flush(&self) -> Result<()> {
        write_map(&self.rules_path, &self.rules.read())?;
        write_map(&self.templates_path, &self.templates.read())?;
        Ok(())
    }
}

fn load_map<T: serde::de::DeserializeOwned>(path: &Path) -> Result<HashMap<String, T>> {
    if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    } else {
        Ok(HashMap::new())
    }
}

fn write_map<T: serde::Serialize>(path: &Path, map: &HashMap<String, T>) -> Result<()> {
    let json = serde_json::to_string_pretty(map)
        .map_err(|e| Error::Other(format!("serializing {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(Error::Io)?;
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
