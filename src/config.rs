use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

use crate::render::RenderBudgets;

const DEFAULT_MAX_DURATION_MS: u64 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratedGraph {
    Tree,
    Graph,
    TernarySet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphSource {
    File(PathBuf),
    Generated {
        kind: GeneratedGraph,
        arity: usize,
        height: usize,
    },
}

impl GraphSource {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Generated {
                kind: GeneratedGraph::TernarySet,
                ..
            } => "ternary tree set".to_string(),
            Self::Generated {
                kind,
                arity,
                height,
            } => {
                let name = match kind {
                    GeneratedGraph::Graph => "graph",
                    _ => "tree",
                };
                format!("complete {arity}-ary {name}, {height} levels")
            }
        }
    }
}

// Durations are in milliseconds; 0 leaves that phase unbounded.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub nontree_links: bool,
    pub max_rotation_ms: u64,
    pub max_translation_ms: u64,
    pub max_completion_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            nontree_links: false,
            max_rotation_ms: DEFAULT_MAX_DURATION_MS,
            max_translation_ms: DEFAULT_MAX_DURATION_MS,
            max_completion_ms: DEFAULT_MAX_DURATION_MS,
        }
    }
}

impl RenderConfig {
    pub fn budgets(&self) -> RenderBudgets {
        RenderBudgets {
            rotation: budget(self.max_rotation_ms),
            translation: budget(self.max_translation_ms),
            completion: budget(self.max_completion_ms),
        }
    }
}

fn budget(ms: u64) -> Duration {
    if ms == 0 {
        Duration::MAX
    } else {
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "nontree_links": true, "max_completion_ms": 0 }"#)
                .expect("valid config");

        assert!(config.nontree_links);
        assert_eq!(config.max_rotation_ms, DEFAULT_MAX_DURATION_MS);

        let budgets = config.budgets();
        assert_eq!(budgets.rotation, Duration::from_millis(50));
        assert_eq!(budgets.completion, Duration::MAX);
    }
}
