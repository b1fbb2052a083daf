//! Rule parsing cache keyed by the raw rule string

use crate::error::Result;
use crate::record::Record;
use crate::rule::ast::AstNode;
use crate::rule::evaluator;
use crate::rule::parser;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

/// Entry limit of the global cache
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Parsed rules shared behind a read-mostly lock
///
/// Holds at most `max_entries` rules. Inserting into a full cache drops every
/// entry first, so callers that feed unbounded distinct rule strings keep a
/// bounded footprint.
#[derive(Debug)]
pub struct RuleCache {
    entries: RwLock<AHashMap<String, Arc<AstNode>>>,
    max_entries: usize,
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl RuleCache {
    pub fn with_max_entries(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: RwLock::new(AHashMap::with_capacity(max_entries.min(256))),
            max_entries,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Get or parse a rule string. Parse failures are returned and not cached.
    pub fn get_or_parse(&self, rule: &str) -> Result<Arc<AstNode>> {
        // Fast path: check read lock first
        {
            let entries = self.entries.read();
            if let Some(ast) = entries.get(rule) {
                return Ok(Arc::clone(ast));
            }
        }

        tracing::debug!(rule, "rule cache miss");
        let ast = Arc::new(parser::parse(rule)?);

        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries && !entries.contains_key(rule) {
            tracing::debug!(evicted = entries.len(), "rule cache full, clearing");
            entries.clear();
        }
        let entry = entries
            .entry(rule.to_string())
            .or_insert_with(|| Arc::clone(&ast));
        Ok(Arc::clone(entry))
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.entries.read().contains_key(rule)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Global rule cache with fast hashing (ahash), bounded by [`DEFAULT_MAX_ENTRIES`]
static RULE_CACHE: Lazy<RuleCache> = Lazy::new(RuleCache::default);

/// Get or parse a rule string through the global cache
#[inline]
pub fn get_or_parse(rule: &str) -> Result<Arc<AstNode>> {
    RULE_CACHE.get_or_parse(rule)
}

/// Check a rule string against a record, using the cached AST
#[inline]
pub fn check_rule(rule: &str, record: &Record) -> Result<bool> {
    let ast = get_or_parse(rule)?;
    Ok(evaluator::evaluate(&ast, record))
}

/// Clear the global rule cache
pub fn clear_cache() {
    RULE_CACHE.clear();
}

pub fn cache_size() -> usize {
    RULE_CACHE.len()
}
