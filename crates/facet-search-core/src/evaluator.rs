//! AST evaluation against an index snapshot
//!
//! Bottom-up set algebra over parent ids:
//! - `And` intersects its children, starting from the universe
//! - `Or` unions its children, starting from the empty set
//! - `Not` takes the complement within the universe

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::config::SearchConfig;
use crate::document::ParentId;
use crate::index::SearchIndex;
use crate::predicates::{EvalContext, resolve};
use crate::query::Node;

/// Evaluate with the default configuration and the current clock.
#[must_use]
pub fn evaluate(ast: &Node, index: &SearchIndex) -> BTreeSet<ParentId> {
    Evaluator::new(SearchConfig::default()).evaluate_at(ast, index, Utc::now())
}

/// Evaluate with a pinned clock for `older_than:`, `newer_than:` and
/// relative dates.
#[must_use]
pub fn evaluate_at(ast: &Node, index: &SearchIndex, now: DateTime<Utc>) -> BTreeSet<ParentId> {
    Evaluator::new(SearchConfig::default()).evaluate_at(ast, index, now)
}

/// Evaluator carrying the unit configuration (month and year lengths)
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    config: SearchConfig,
}

impl Evaluator {
    #[must_use]
    pub const fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn evaluate(&self, ast: &Node, index: &SearchIndex) -> BTreeSet<ParentId> {
        self.evaluate_at(ast, index, Utc::now())
    }

    #[must_use]
    pub fn evaluate_at(
        &self,
        ast: &Node,
        index: &SearchIndex,
        now: DateTime<Utc>,
    ) -> BTreeSet<ParentId> {
        let start = Instant::now();
        let ctx = EvalContext {
            index,
            config: &self.config,
            now,
        };
        let matched = eval_node(&ctx, ast);
        tracing::debug!(
            ast = %ast,
            matched = matched.len(),
            universe = index.parent_count(),
            elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
            "evaluated query"
        );
        matched
    }
}

fn eval_node(ctx: &EvalContext<'_>, node: &Node) -> BTreeSet<ParentId> {
    match node {
        Node::Predicate { field, op, value } => resolve(ctx, field, *op, value),
        Node::And { children } => {
            let mut acc = ctx.index.universe().clone();
            for child in children {
                if acc.is_empty() {
                    break;
                }
                let set = eval_node(ctx, child);
                acc.retain(|parent| set.contains(parent));
            }
            acc
        }
        Node::Or { children } => {
            let mut acc = BTreeSet::new();
            for child in children {
                acc.extend(eval_node(ctx, child));
            }
            acc
        }
        Node::Not { child } => {
            let excluded = eval_node(ctx, child);
            ctx.index
                .universe()
                .difference(&excluded)
                .cloned()
                .collect()
        }
    }
}
