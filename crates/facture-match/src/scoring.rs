//! Keyword scoring and category aggregation.
//!
//! Pure functions composed by the match engine: a keyword frequency map over
//! the dictionary, positional/frequency token scoring, per-category score
//! accumulation, and top-3 tier selection with normalized ratios.

use std::collections::HashMap;

use uuid::Uuid;

use facture_core::{CategoryTiers, DictionaryRule, KeywordSource, ScoredKeyword};

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Dictionary score assigned to tokens absent from the dictionary.
const UNKNOWN_TOKEN_SCORE: f64 = 0.3;

/// Keywords are only persisted when their score exceeds this floor.
const PERSIST_SCORE_FLOOR: f64 = 0.3;

/// Number of keywords persisted per line item.
const PERSIST_KEYWORD_LIMIT: usize = 3;

/// Lower-cased keyword occurrence counts across dictionary rules.
pub fn frequency_map(rules: &[DictionaryRule]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for rule in rules {
        *map.entry(rule.keyword.to_lowercase()).or_insert(0) += 1;
    }
    map
}

/// Score the tokens of a normalized name.
///
/// Token at position `i` (0-based) gets `position = max(0.1, 1.0 - 0.1*i)`.
/// Tokens present in the dictionary get `dict = 1.0 / count` (rare keywords
/// score high); absent tokens get a flat 0.3. The final score is
/// `round2(position * dict)`, always in (0, 1.0].
pub fn score_keywords(
    line_item_id: Uuid,
    normalized_name: &str,
    frequency: &HashMap<String, usize>,
) -> Vec<ScoredKeyword> {
    if normalized_name.is_empty() {
        return Vec::new();
    }

    normalized_name
        .split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            let position_score = (1.0 - index as f64 * 0.1).max(0.1);
            let dictionary_score = match frequency.get(token) {
                Some(&count) if count > 0 => 1.0 / count as f64,
                _ => UNKNOWN_TOKEN_SCORE,
            };

            ScoredKeyword {
                line_item_id,
                keyword: token.to_string(),
                score: round2(position_score * dictionary_score),
                source: KeywordSource::Extracted,
            }
        })
        .collect()
}

/// Group dictionary rules by lower-cased keyword for quick lookup.
pub fn rules_by_keyword(rules: &[DictionaryRule]) -> HashMap<String, Vec<&DictionaryRule>> {
    let mut map: HashMap<String, Vec<&DictionaryRule>> = HashMap::new();
    for rule in rules {
        map.entry(rule.keyword.to_lowercase()).or_default().push(rule);
    }
    map
}

/// Accumulated score for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category_name: String,
    pub score: f64,
}

/// Accumulate `keyword_score * rule_weight` into per-category totals.
///
/// The running total is rounded to two decimals after each addition, and
/// the accumulator is Vec-backed so category order is first-seen insertion
/// order — required for deterministic tie-breaking downstream.
pub fn category_scores(
    scored_keywords: &[ScoredKeyword],
    rules_map: &HashMap<String, Vec<&DictionaryRule>>,
) -> Vec<(String, CategoryScore)> {
    let mut totals: Vec<(String, CategoryScore)> = Vec::new();

    for keyword in scored_keywords {
        let Some(rules) = rules_map.get(&keyword.keyword) else {
            continue;
        };
        for rule in rules {
            let contribution = keyword.score * rule.weight;
            match totals.iter_mut().find(|(code, _)| *code == rule.category_code) {
                Some((_, entry)) => {
                    entry.score = round2(entry.score + contribution);
                }
                None => {
                    totals.push((
                        rule.category_code.clone(),
                        CategoryScore {
                            category_name: rule.category_name.clone(),
                            score: round2(contribution),
                        },
                    ));
                }
            }
        }
    }

    totals
}

/// Select the top three categories by score and compute contribution ratios.
///
/// Ratios are each category's share of the total across all categories,
/// rounded to two decimals. When rounding pushes the tier sum above 1.0,
/// the lowest-populated tier is recomputed as the remainder needed to reach
/// exactly 1.0 (third if present, else second, else main forced to 1.0).
/// This is a deliberate, testable policy. Ties keep first-seen order
/// (stable sort).
pub fn select_top_categories(scores: &[(String, CategoryScore)]) -> Option<CategoryTiers> {
    if scores.is_empty() {
        return None;
    }

    let mut sorted: Vec<&(String, CategoryScore)> = scores.iter().collect();
    sorted.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

    let total: f64 = sorted.iter().map(|(_, s)| s.score).sum();

    let tier = |index: usize| -> Option<(String, f64)> {
        sorted.get(index).map(|(code, s)| {
            let ratio = if total > 0.0 {
                round2(s.score / total)
            } else {
                0.0
            };
            (code.clone(), ratio)
        })
    };

    let (main_category, main_ratio) = tier(0)?;
    let second = tier(1);
    let third = tier(2);

    let mut main_ratio = main_ratio;
    let mut second_ratio = second.as_ref().map(|(_, r)| *r);
    let mut third_ratio = third.as_ref().map(|(_, r)| *r);

    let sum = main_ratio + second_ratio.unwrap_or(0.0) + third_ratio.unwrap_or(0.0);
    if sum > 1.0 {
        if third_ratio.is_some() {
            third_ratio = Some(round2(1.0 - main_ratio - second_ratio.unwrap_or(0.0)));
        } else if second_ratio.is_some() {
            second_ratio = Some(round2(1.0 - main_ratio));
        } else {
            main_ratio = 1.0;
        }
    }

    Some(CategoryTiers {
        main_category,
        main_ratio,
        second_category: second.map(|(code, _)| code),
        second_ratio,
        third_category: third.map(|(code, _)| code),
        third_ratio,
    })
}

/// The keywords worth persisting: score strictly above 0.3, sorted
/// descending, top three.
pub fn top_keywords_for_persistence(scored: &[ScoredKeyword]) -> Vec<ScoredKeyword> {
    let mut keep: Vec<ScoredKeyword> = scored
        .iter()
        .filter(|kw| kw.score > PERSIST_SCORE_FLOOR)
        .cloned()
        .collect();
    keep.sort_by(|a, b| b.score.total_cmp(&a.score));
    keep.truncate(PERSIST_KEYWORD_LIMIT);
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use facture_core::KeywordType;

    fn rule(keyword: &str, code: &str, name: &str, weight: f64) -> DictionaryRule {
        DictionaryRule {
            id: Uuid::new_v4(),
            category_code: code.to_string(),
            category_name: name.to_string(),
            keyword: keyword.to_string(),
            weight,
            keyword_type: KeywordType::Primary,
            is_active: true,
        }
    }

    #[test]
    fn test_frequency_map_lowercases_and_counts() {
        let rules = vec![
            rule("Cheese", "CAT_DAIRY", "Dairy", 1.0),
            rule("cheese", "CAT_PIZZA", "Pizza", 0.5),
            rule("crackers", "CAT_SNACKS", "Snacks", 1.0),
        ];
        let map = frequency_map(&rules);
        assert_eq!(map.get("cheese"), Some(&2));
        assert_eq!(map.get("crackers"), Some(&1));
    }

    #[test]
    fn test_score_keywords_position_decay() {
        let freq = HashMap::new();
        let scored = score_keywords(Uuid::new_v4(), "a b c", &freq);
        // All tokens miss the dictionary: dict score fixed at 0.3.
        assert_eq!(scored[0].score, round2(1.0 * 0.3));
        assert_eq!(scored[1].score, round2(0.9 * 0.3));
        assert_eq!(scored[2].score, round2(0.8 * 0.3));
    }

    #[test]
    fn test_score_keywords_position_floor() {
        let freq = HashMap::new();
        let name = "t0 t1 t2 t3 t4 t5 t6 t7 t8 t9 t10 t11";
        let scored = score_keywords(Uuid::new_v4(), name, &freq);
        // Position score bottoms out at 0.1 from index 9 onward.
        assert_eq!(scored[9].score, round2(0.1 * 0.3));
        assert_eq!(scored[11].score, round2(0.1 * 0.3));
    }

    #[test]
    fn test_score_keywords_dictionary_miss_is_always_point_three() {
        let freq = HashMap::new();
        let scored = score_keywords(Uuid::new_v4(), "quince kumquat", &freq);
        for (i, kw) in scored.iter().enumerate() {
            let position = (1.0 - i as f64 * 0.1).max(0.1);
            assert_eq!(kw.score, round2(position * 0.3));
        }
    }

    #[test]
    fn test_score_keywords_frequency_inverse() {
        let mut freq = HashMap::new();
        freq.insert("cheese".to_string(), 1);
        freq.insert("sauce".to_string(), 4);
        let scored = score_keywords(Uuid::new_v4(), "cheese sauce", &freq);
        assert_eq!(scored[0].score, 1.0); // 1.0 * (1/1)
        assert_eq!(scored[1].score, round2(0.9 * 0.25));
    }

    #[test]
    fn test_score_keywords_empty_name() {
        assert!(score_keywords(Uuid::new_v4(), "", &HashMap::new()).is_empty());
    }

    #[test]
    fn test_category_scores_accumulates_weighted() {
        let rules = vec![
            rule("cheese", "CAT_DAIRY", "Dairy", 1.0),
            rule("cheese", "CAT_PIZZA", "Pizza", 0.5),
        ];
        let rules_map = rules_by_keyword(&rules);
        let id = Uuid::new_v4();
        let scored = vec![ScoredKeyword {
            line_item_id: id,
            keyword: "cheese".to_string(),
            score: 1.0,
            source: KeywordSource::Extracted,
        }];

        let totals = category_scores(&scored, &rules_map);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].0, "CAT_DAIRY");
        assert_eq!(totals[0].1.score, 1.0);
        assert_eq!(totals[1].0, "CAT_PIZZA");
        assert_eq!(totals[1].1.score, 0.5);
    }

    #[test]
    fn test_category_scores_ignores_unknown_keywords() {
        let rules = vec![rule("cheese", "CAT_DAIRY", "Dairy", 1.0)];
        let rules_map = rules_by_keyword(&rules);
        let scored = vec![ScoredKeyword {
            line_item_id: Uuid::new_v4(),
            keyword: "bread".to_string(),
            score: 0.9,
            source: KeywordSource::Extracted,
        }];
        assert!(category_scores(&scored, &rules_map).is_empty());
    }

    #[test]
    fn test_select_top_categories_single_category_full_ratio() {
        let scores = vec![(
            "CAT_DAIRY".to_string(),
            CategoryScore {
                category_name: "Dairy".to_string(),
                score: 2.5,
            },
        )];
        let tiers = select_top_categories(&scores).unwrap();
        assert_eq!(tiers.main_category, "CAT_DAIRY");
        assert_eq!(tiers.main_ratio, 1.0);
        assert!(tiers.second_category.is_none());
        assert!(tiers.third_category.is_none());
    }

    #[test]
    fn test_select_top_categories_orders_by_score() {
        let scores = vec![
            (
                "CAT_A".to_string(),
                CategoryScore {
                    category_name: "A".to_string(),
                    score: 1.0,
                },
            ),
            (
                "CAT_B".to_string(),
                CategoryScore {
                    category_name: "B".to_string(),
                    score: 3.0,
                },
            ),
        ];
        let tiers = select_top_categories(&scores).unwrap();
        assert_eq!(tiers.main_category, "CAT_B");
        assert_eq!(tiers.main_ratio, 0.75);
        assert_eq!(tiers.second_category.as_deref(), Some("CAT_A"));
        assert_eq!(tiers.second_ratio, Some(0.25));
    }

    #[test]
    fn test_select_top_categories_ratio_sum_never_exceeds_one() {
        // 1/3 splits round to 0.33 + 0.33 + 0.33; also exercise a case that
        // rounds above 1.0 so the third tier absorbs the remainder.
        let scores = vec![
            (
                "CAT_A".to_string(),
                CategoryScore {
                    category_name: "A".to_string(),
                    score: 1.0,
                },
            ),
            (
                "CAT_B".to_string(),
                CategoryScore {
                    category_name: "B".to_string(),
                    score: 1.0,
                },
            ),
            (
                "CAT_C".to_string(),
                CategoryScore {
                    category_name: "C".to_string(),
                    score: 1.0,
                },
            ),
        ];
        let tiers = select_top_categories(&scores).unwrap();
        let sum = tiers.main_ratio
            + tiers.second_ratio.unwrap_or(0.0)
            + tiers.third_ratio.unwrap_or(0.0);
        assert!(sum <= 1.0 + f64::EPSILON);
    }

    #[test]
    fn test_select_top_categories_third_tier_absorbs_rounding() {
        // 0.335/0.335/0.33 of ~1.0 rounds main and second to 0.34 each,
        // pushing the sum to 1.01; the third tier is recomputed.
        let scores = vec![
            (
                "CAT_A".to_string(),
                CategoryScore {
                    category_name: "A".to_string(),
                    score: 0.335,
                },
            ),
            (
                "CAT_B".to_string(),
                CategoryScore {
                    category_name: "B".to_string(),
                    score: 0.335,
                },
            ),
            (
                "CAT_C".to_string(),
                CategoryScore {
                    category_name: "C".to_string(),
                    score: 0.33,
                },
            ),
        ];
        let tiers = select_top_categories(&scores).unwrap();
        assert_eq!(tiers.main_ratio, 0.34);
        assert_eq!(tiers.second_ratio, Some(0.34));
        assert_eq!(tiers.third_ratio, Some(round2(1.0 - 0.34 - 0.34)));
    }

    #[test]
    fn test_select_top_categories_caps_at_three() {
        let scores: Vec<(String, CategoryScore)> = (0..5)
            .map(|i| {
                (
                    format!("CAT_{i}"),
                    CategoryScore {
                        category_name: format!("Cat {i}"),
                        score: 5.0 - i as f64,
                    },
                )
            })
            .collect();
        let tiers = select_top_categories(&scores).unwrap();
        assert_eq!(tiers.main_category, "CAT_0");
        assert_eq!(tiers.second_category.as_deref(), Some("CAT_1"));
        assert_eq!(tiers.third_category.as_deref(), Some("CAT_2"));
    }

    #[test]
    fn test_select_top_categories_empty() {
        assert!(select_top_categories(&[]).is_none());
    }

    #[test]
    fn test_top_keywords_filter_and_limit() {
        let id = Uuid::new_v4();
        let mk = |kw: &str, score: f64| ScoredKeyword {
            line_item_id: id,
            keyword: kw.to_string(),
            score,
            source: KeywordSource::Extracted,
        };
        let scored = vec![
            mk("low", 0.3), // not strictly above the floor, dropped
            mk("a", 0.9),
            mk("b", 0.5),
            mk("c", 0.8),
            mk("d", 0.7),
        ];
        let kept = top_keywords_for_persistence(&scored);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].keyword, "a");
        assert_eq!(kept[1].keyword, "c");
        assert_eq!(kept[2].keyword, "d");
    }
}
