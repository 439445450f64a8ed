// matcher.rs — Applicability predicate for a hook.
//
// A matcher pattern is a `;`-separated list of clauses. Every clause must
// hold for the hook to apply:
//
//   *               matches every event (same as an empty pattern)
//   tool:<regex>    regex over the event's tool name
//   path:<regex>    regex over the file path (no path → no match)
//   glob:<glob>     glob over the file path (no path → no match)
//   <regex>         regex over the tool name OR the file path
//
// Examples:
//   "_improved"                     → any event whose tool or path contains "_improved"
//   "tool:^(write|edit)$;glob:**/*.rs" → writes/edits to Rust files
//
// Patterns are validated when the descriptor is built, but the compiled
// form used at match time comes from the PatternCache on first use.

use hw_event::Event;

use crate::error::PatternError;
use crate::pattern_cache::{CompiledPattern, PatternCache};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Any,
    Tool(String),
    Path(String),
    Glob(String),
    ToolOrPath(String),
}

impl Clause {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            Clause::Any
        } else if let Some(re) = raw.strip_prefix("tool:") {
            Clause::Tool(re.to_string())
        } else if let Some(re) = raw.strip_prefix("path:") {
            Clause::Path(re.to_string())
        } else if let Some(g) = raw.strip_prefix("glob:") {
            Clause::Glob(g.to_string())
        } else {
            Clause::ToolOrPath(raw.to_string())
        }
    }

    /// Pattern id under which this clause is cached. Embeds the source, so a
    /// changed pattern never reuses a stale entry.
    fn pattern_id(&self) -> Option<String> {
        match self {
            Clause::Any => None,
            Clause::Tool(s) => Some(format!("match:tool:{}", s)),
            Clause::Path(s) => Some(format!("match:path:{}", s)),
            Clause::Glob(s) => Some(format!("match:glob:{}", s)),
            Clause::ToolOrPath(s) => Some(format!("match:any:{}", s)),
        }
    }

    fn compile(&self) -> Result<Option<CompiledPattern>, PatternError> {
        match self {
            Clause::Any => Ok(None),
            Clause::Glob(s) => CompiledPattern::glob(s).map(Some),
            Clause::Tool(s) | Clause::Path(s) | Clause::ToolOrPath(s) => {
                CompiledPattern::regex(s).map(Some)
            }
        }
    }

    fn matches(
        &self,
        hook_id: &str,
        event: &Event,
        cache: &PatternCache,
    ) -> Result<bool, PatternError> {
        let Some(pattern_id) = self.pattern_id() else {
            return Ok(true);
        };
        let compiled = cache.get_or_compile(hook_id, &pattern_id, || {
            self.compile()?.ok_or_else(|| PatternError::InvalidRegex {
                pattern: pattern_id.clone(),
                reason: "clause has no pattern".to_string(),
            })
        })?;

        let path_matches = || event.file_path().is_some_and(|p| compiled.is_match(p));
        Ok(match self {
            Clause::Any => true,
            Clause::Tool(_) => compiled.is_match(event.tool_name()),
            Clause::Path(_) | Clause::Glob(_) => path_matches(),
            Clause::ToolOrPath(_) => compiled.is_match(event.tool_name()) || path_matches(),
        })
    }
}

/// A parsed matcher pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookMatcher {
    source: String,
    clauses: Vec<Clause>,
}

impl HookMatcher {
    /// Parse and validate a matcher pattern.
    ///
    /// Every regex/glob is compiled once here to surface syntax errors at
    /// load time; the compiled value is discarded.
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let clauses: Vec<Clause> = source
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Clause::parse)
            .collect();

        for clause in &clauses {
            clause.compile()?;
        }

        Ok(Self {
            source: source.trim().to_string(),
            clauses,
        })
    }

    /// A matcher that accepts every event.
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            clauses: Vec::new(),
        }
    }

    /// The pattern as written in the manifest.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Decide whether the hook applies to `event`.
    pub fn matches(
        &self,
        hook_id: &str,
        event: &Event,
        cache: &PatternCache,
    ) -> Result<bool, PatternError> {
        for clause in &self.clauses {
            if !clause.matches(hook_id, event, cache)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
