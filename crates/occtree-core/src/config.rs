use std::env;

/// Tag used when the caller does not name one.
pub const DEFAULT_END_ITEM: &str = "Min_Eng";

/// Deepest `HAS_Parent` nesting an export descends into. Each level costs a
/// few stack frames, and blocking workers run on 2 MiB stacks.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do when no tagged neighbor supplies an attribute bag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Export an empty bag.
    #[default]
    Lenient,
    /// Fail the export with `MissingNeighbor`.
    Strict,
}

/// What to do when more than one tagged neighbor matches a (kind, tag) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    /// Use the first edge in store order and stop looking.
    #[default]
    FirstMatch,
    /// Scan every edge and fail with `AmbiguousMatch` on a second match.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub end_item: String,
    pub missing: MissingPolicy,
    pub ambiguity: AmbiguityPolicy,
    /// Deeper children fail the export with `DepthExceeded`.
    pub max_depth: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            end_item: DEFAULT_END_ITEM.to_string(),
            missing: MissingPolicy::Lenient,
            ambiguity: AmbiguityPolicy::FirstMatch,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ExportConfig {
    /// Defaults overridden by `OCCTREE_END_ITEM`, `OCCTREE_STRICT_MISSING`,
    /// `OCCTREE_STRICT_AMBIGUITY` and `OCCTREE_MAX_DEPTH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(end_item) = env::var("OCCTREE_END_ITEM") {
            if !end_item.trim().is_empty() {
                config.end_item = end_item.trim().to_string();
            }
        }
        if env_flag("OCCTREE_STRICT_MISSING") {
            config.missing = MissingPolicy::Strict;
        }
        if env_flag("OCCTREE_STRICT_AMBIGUITY") {
            config.ambiguity = AmbiguityPolicy::Strict;
        }
        if let Some(max_depth) = env::var("OCCTREE_MAX_DEPTH")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.max_depth = max_depth;
        }
        config
    }

    pub fn with_end_item(mut self, end_item: impl Into<String>) -> Self {
        self.end_item = end_item.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn strict(mut self) -> Self {
        self.missing = MissingPolicy::Strict;
        self.ambiguity = AmbiguityPolicy::Strict;
        self
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
