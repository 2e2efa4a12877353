//! Parse-and-cache layer, matching the role of `SAFE_EXPR_CACHE` /
//! `@_cache(ttl=3600, maxsize=512)` on `safe_eval` in
//! `examples/original_source/src/utils/safe_eval.py`: re-parsing the same
//! transformer expression on every epoch would be wasted work, so parsed
//! ASTs are cached by source text with a bounded LRU instead of the
//! original's TTL+maxsize combo (an unbounded-lifetime program doesn't need
//! the TTL half of that policy).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::ast::Expr;
use crate::error::TransformError;
use crate::parser::Parser;

const DEFAULT_CACHE_SIZE: usize = 512;

pub struct TransformerCompiler {
    cache: Mutex<LruCache<String, Expr>>,
}

impl TransformerCompiler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity must be nonzero");
        TransformerCompiler {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the parsed form of `expr`, parsing and caching it on first
    /// use. Compile errors are never cached, matching the source's "only
    /// cache once proven safe" behavior.
    pub fn compile(&self, expr: &str) -> Result<Expr, TransformError> {
        let mut cache = self.cache.lock().expect("transformer cache poisoned");
        if let Some(cached) = cache.get(expr) {
            return Ok(cached.clone());
        }
        let parsed = Parser::parse(expr)?;
        cache.put(expr.to_string(), parsed.clone());
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect("transformer cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TransformerCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_compile_hits_cache_without_reparsing() {
        let compiler = TransformerCompiler::new();
        let a = compiler.compile("1 + 2").unwrap();
        let b = compiler.compile("1 + 2").unwrap();
        assert_eq!(a, b);
        assert_eq!(compiler.len(), 1);
    }

    #[test]
    fn invalid_expression_is_not_cached() {
        let compiler = TransformerCompiler::new();
        assert!(compiler.compile("1 +").is_err());
        assert!(compiler.is_empty());
    }

    #[test]
    fn eviction_respects_capacity() {
        let compiler = TransformerCompiler::with_capacity(1);
        compiler.compile("1").unwrap();
        compiler.compile("2").unwrap();
        assert_eq!(compiler.len(), 1);
    }
}
