//! Category suggestion scoring.
//!
//! Each candidate accumulates weighted signals from the item's name,
//! description (or tags), the candidate's specificity, and whether it is the
//! item's current category. Scores are soft-capped heuristics, not
//! probabilities; callers clamp for display.

use std::collections::HashSet;

use toolshare_core::defaults::{
    CONFIDENCE_DISPLAY_MAX, PATH_SEPARATOR, SCORE_DEPTH_CAP_LEVEL, SCORE_DEPTH_PER_LEVEL,
    SCORE_DESCRIPTION_TOKENS_MAX, SCORE_EXISTING_CATEGORY, SCORE_NAME_IN_PATH,
    SCORE_NAME_TOKENS_MAX,
};
use toolshare_core::{
    CandidateCategory, CategoryRef, CategorySuggestion, ItemContext, TaxonomyConfig,
    TaxonomyRecord,
};

/// Lowercase word tokens. Anything that is not a letter or digit separates.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn unique_tokens(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Matched tokens out of `tokens`, in order.
fn overlap<'a>(tokens: &'a [String], path_tokens: &HashSet<String>) -> Vec<&'a str> {
    tokens
        .iter()
        .filter(|t| path_tokens.contains(*t))
        .map(String::as_str)
        .collect()
}

/// Score every candidate. Output is in input order.
pub fn score(candidates: &[CandidateCategory], ctx: &ItemContext) -> Vec<CategorySuggestion> {
    let name = ctx.name.trim().to_lowercase();
    let name_tokens = unique_tokens(&ctx.name);

    let (context_tokens, context_label) = match ctx.description.as_deref() {
        Some(d) if !d.trim().is_empty() => (unique_tokens(d), "Description"),
        _ => (unique_tokens(&ctx.tags.join(" ")), "Tag"),
    };

    candidates
        .iter()
        .map(|candidate| {
            let path_lower = candidate.path.to_lowercase();
            let path_tokens: HashSet<String> = tokenize(&candidate.path).into_iter().collect();
            let mut confidence = 0.0;
            let mut reasons = Vec::new();

            if !name.is_empty() && path_lower.contains(&name) {
                confidence += SCORE_NAME_IN_PATH;
                reasons.push(format!("Item name \"{}\" appears in category path", ctx.name.trim()));
            }

            if !name_tokens.is_empty() {
                let matched = overlap(&name_tokens, &path_tokens);
                if !matched.is_empty() {
                    let fraction = matched.len() as f64 / name_tokens.len() as f64;
                    confidence += SCORE_NAME_TOKENS_MAX * fraction;
                    reasons.push(format!(
                        "Name keywords match {}/{}: {}",
                        matched.len(),
                        name_tokens.len(),
                        matched.join(", ")
                    ));
                }
            }

            if !context_tokens.is_empty() {
                let matched = overlap(&context_tokens, &path_tokens);
                if !matched.is_empty() {
                    let fraction = matched.len() as f64 / context_tokens.len() as f64;
                    confidence += SCORE_DESCRIPTION_TOKENS_MAX * fraction;
                    reasons.push(format!(
                        "{} keywords match {}/{}: {}",
                        context_label,
                        matched.len(),
                        context_tokens.len(),
                        matched.join(", ")
                    ));
                }
            }

            let capped_level = candidate.level.min(SCORE_DEPTH_CAP_LEVEL);
            if capped_level > 0 {
                confidence += SCORE_DEPTH_PER_LEVEL * capped_level as f64;
                reasons.push(format!("Specific category (level {})", candidate.level));
            }

            if ctx.existing_category_id == Some(candidate.id) {
                confidence += SCORE_EXISTING_CATEGORY;
                reasons.push("Current category".to_string());
            }

            CategorySuggestion {
                category_id: candidate.id,
                path: candidate.path.clone(),
                confidence,
                reasons,
                level: candidate.level,
            }
        })
        .collect()
}

/// Sort by confidence, highest first. Ties keep their input order.
pub fn rank(mut suggestions: Vec<CategorySuggestion>) -> Vec<CategorySuggestion> {
    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions
}

/// Clamp a confidence into `0..=100` for display.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, CONFIDENCE_DISPLAY_MAX)
}

/// The top suggestion, when the item has no category yet and the score
/// clears `threshold`.
pub fn auto_select<'a>(
    suggestions: &'a [CategorySuggestion],
    existing: Option<CategoryRef>,
    threshold: f64,
) -> Option<&'a CategorySuggestion> {
    if existing.is_some() {
        return None;
    }
    let mut best: Option<&CategorySuggestion> = None;
    for s in suggestions {
        if best.map_or(true, |b| s.confidence > b.confidence) {
            best = Some(s);
        }
    }
    best.filter(|s| s.confidence > threshold)
}

/// Active imported taxonomy entries as candidates.
pub fn candidates_from_records(records: &[TaxonomyRecord]) -> Vec<CandidateCategory> {
    records
        .iter()
        .filter(|r| r.is_active)
        .map(|r| CandidateCategory {
            id: CategoryRef::External(r.external_id),
            path: r.segments().join(PATH_SEPARATOR),
            level: r.level.max(1) as usize,
        })
        .collect()
}

/// Scorer bound to an auto-select threshold.
#[derive(Debug, Clone)]
pub struct CategoryScorer {
    threshold: f64,
}

impl CategoryScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &TaxonomyConfig) -> Self {
        Self::new(config.auto_select_threshold)
    }

    pub fn score(
        &self,
        candidates: &[CandidateCategory],
        ctx: &ItemContext,
    ) -> Vec<CategorySuggestion> {
        score(candidates, ctx)
    }

    /// Ranked suggestions, truncated to `limit`.
    pub fn suggest(
        &self,
        candidates: &[CandidateCategory],
        ctx: &ItemContext,
        limit: usize,
    ) -> Vec<CategorySuggestion> {
        let mut ranked = rank(score(candidates, ctx));
        ranked.truncate(limit);
        ranked
    }

    pub fn auto_select<'a>(
        &self,
        suggestions: &'a [CategorySuggestion],
        existing: Option<CategoryRef>,
    ) -> Option<&'a CategorySuggestion> {
        auto_select(suggestions, existing, self.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for CategoryScorer {
    fn default() -> Self {
        Self::from_config(&TaxonomyConfig::default())
    }
}
