use crate::catalog::taxonomy::{
    Category, CategoryKind, Level, MAX_DEPTH, RawCategoryNode, TaxonomyError,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// Product names of this many characters or fewer produce no suggestions.
pub const MIN_QUERY_LEN: usize = 2;
pub const SUGGESTION_LIMIT: usize = 10;
pub const POPULAR_FALLBACK_LIMIT: usize = 5;
/// Tokens shorter than this are ignored when matching against category names.
const MIN_TOKEN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_level1: usize,
    pub total_level2: usize,
    pub total_level3: usize,
    pub total_keywords: usize,
    pub cache_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartSearchResult<'a> {
    pub exact: Vec<&'a Category>,
    pub suggestions: Vec<&'a Category>,
    pub popular: Vec<&'a Category>,
}

/// Read-only, id-keyed view over the three-level taxonomy.
///
/// Built once from the raw source; never patched afterwards. Share it behind an `Arc`
/// for concurrent readers.
#[derive(Debug)]
pub struct CategoryIndex {
    categories: HashMap<i64, Category>,
    /// Pre-order ids, so every listing follows the source ordering.
    order: Vec<i64>,
    roots: Vec<i64>,
    popular: Vec<i64>,
    total_keywords: usize,
}

impl CategoryIndex {
    pub fn build(nodes: &[RawCategoryNode]) -> Result<Self, TaxonomyError> {
        if nodes.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut categories: HashMap<i64, Category> = HashMap::new();
        let mut order = Vec::new();
        let mut roots = Vec::new();
        let mut keywords: HashSet<String> = HashSet::new();

        let mut stack: Vec<(&RawCategoryNode, Option<i64>, u8)> =
            nodes.iter().rev().map(|node| (node, None, 1)).collect();

        while let Some((node, parent, depth)) = stack.pop() {
            if depth > MAX_DEPTH {
                return Err(TaxonomyError::TooDeep { id: node.id, depth });
            }
            if categories.contains_key(&node.id) {
                return Err(TaxonomyError::DuplicateId(node.id));
            }

            let children: Vec<i64> = node.children.iter().map(|c| c.id).collect();
            let kind = match parent {
                None => {
                    roots.push(node.id);
                    CategoryKind::Level1 { children }
                }
                Some(parent) if depth < MAX_DEPTH => CategoryKind::Level2 { parent, children },
                Some(parent) => {
                    if let Some(child) = node.children.first() {
                        return Err(TaxonomyError::TooDeep {
                            id: child.id,
                            depth: depth + 1,
                        });
                    }
                    CategoryKind::Level3 { parent }
                }
            };

            let node_keywords: BTreeSet<String> = node
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            keywords.extend(node_keywords.iter().cloned());

            for child in node.children.iter().rev() {
                stack.push((child, Some(node.id), depth + 1));
            }

            order.push(node.id);
            categories.insert(
                node.id,
                Category {
                    id: node.id,
                    name: node.name.trim().to_string(),
                    keywords: node_keywords,
                    active: node.active,
                    popular: node.popular,
                    kind,
                },
            );
        }

        let mut index = Self {
            categories,
            order,
            roots,
            popular: Vec::new(),
            total_keywords: keywords.len(),
        };
        index.popular = index.pick_popular();

        let stats = index.get_stats();
        info!(
            "📚 Category index built: L1={} L2={} L3={} keywords={}",
            stats.total_level1, stats.total_level2, stats.total_level3, stats.total_keywords
        );
        Ok(index)
    }

    fn pick_popular(&self) -> Vec<i64> {
        let flagged: Vec<i64> = self
            .analyzable()
            .filter(|c| c.popular)
            .map(|c| c.id)
            .collect();
        if !flagged.is_empty() {
            return flagged;
        }
        self.analyzable()
            .take(POPULAR_FALLBACK_LIMIT)
            .map(|c| c.id)
            .collect()
    }

    fn iter_ordered(&self) -> impl Iterator<Item = &Category> {
        self.order.iter().filter_map(|id| self.categories.get(id))
    }

    fn analyzable(&self) -> impl Iterator<Item = &Category> {
        self.iter_ordered().filter(|c| c.is_analyzable())
    }

    pub fn find_category_by_id(&self, id: i64) -> Option<&Category> {
        self.categories.get(&id)
    }

    /// Names from the level-1 root down to `id`. Empty when the id is unknown.
    pub fn get_category_path(&self, id: i64) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.categories.get(&id);
        while let Some(category) = current {
            path.push(category.name.clone());
            current = category.parent_id().and_then(|p| self.categories.get(&p));
        }
        path.reverse();
        path
    }

    pub fn get_level1_categories(&self) -> Vec<&Category> {
        self.roots
            .iter()
            .filter_map(|id| self.categories.get(id))
            .collect()
    }

    pub fn get_level2_categories(&self, parent_id: Option<i64>) -> Vec<&Category> {
        self.by_level(Level::Two, parent_id)
    }

    pub fn get_level3_categories(&self, parent_id: Option<i64>) -> Vec<&Category> {
        self.by_level(Level::Three, parent_id)
    }

    fn by_level(&self, level: Level, parent_id: Option<i64>) -> Vec<&Category> {
        match parent_id {
            Some(parent) => self
                .categories
                .get(&parent)
                .map(|p| {
                    p.children()
                        .iter()
                        .filter_map(|id| self.categories.get(id))
                        .filter(|c| c.level() == level)
                        .collect()
                })
                .unwrap_or_default(),
            None => self.iter_ordered().filter(|c| c.level() == level).collect(),
        }
    }

    /// Every level-3 category below `id`, in source order.
    pub fn level3_descendants(&self, id: i64) -> Vec<&Category> {
        let mut found = Vec::new();
        let Some(root) = self.categories.get(&id) else {
            return found;
        };
        let mut stack: Vec<i64> = root.children().iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            let Some(category) = self.categories.get(&next) else {
                continue;
            };
            if category.level() == Level::Three {
                found.push(category);
            } else {
                stack.extend(category.children().iter().rev().copied());
            }
        }
        found
    }

    pub fn find_level3_categories(&self, substring: &str) -> Vec<&Category> {
        let needle = substring.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.iter_ordered()
            .filter(|c| c.level() == Level::Three)
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn suggest_level3_for_product(&self, product_name: &str) -> Vec<&Category> {
        let name = product_name.trim();
        if name.chars().count() <= MIN_QUERY_LEN {
            return Vec::new();
        }

        let mut scored: Vec<(u32, &Category)> = self
            .analyzable()
            .map(|c| (score_for_product(c, name), c))
            .filter(|(score, _)| *score > 0)
            .collect();
        // stable: equal scores keep source order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(SUGGESTION_LIMIT)
            .map(|(_, c)| c)
            .collect()
    }

    pub fn smart_search(&self, query: &str) -> SmartSearchResult<'_> {
        let needle = query.trim().to_lowercase();
        let popular: Vec<&Category> = self
            .popular
            .iter()
            .filter_map(|id| self.categories.get(id))
            .collect();

        if needle.is_empty() {
            return SmartSearchResult {
                exact: Vec::new(),
                suggestions: Vec::new(),
                popular,
            };
        }

        let exact: Vec<&Category> = self
            .analyzable()
            .filter(|c| c.name.to_lowercase() == needle)
            .collect();
        let suggestions = self
            .suggest_level3_for_product(&needle)
            .into_iter()
            .filter(|c| !exact.iter().any(|e| e.id == c.id))
            .collect();

        SmartSearchResult {
            exact,
            suggestions,
            popular,
        }
    }

    pub fn get_stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_level1: 0,
            total_level2: 0,
            total_level3: 0,
            total_keywords: self.total_keywords,
            cache_size: self.categories.len(),
        };
        for category in self.categories.values() {
            match category.level() {
                Level::One => stats.total_level1 += 1,
                Level::Two => stats.total_level2 += 1,
                Level::Three => stats.total_level3 += 1,
            }
        }
        stats
    }
}

/// Lowercased alphanumeric words, in order.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

/// Keyword hits weigh most, then whole-word name hits, then partial name hits.
pub(crate) fn score_for_product(category: &Category, product_name: &str) -> u32 {
    let product = product_name.to_lowercase();
    let name = category.name.to_lowercase();
    let name_words = tokenize(&name);

    let mut score = 0;
    for keyword in &category.keywords {
        if product.contains(keyword.as_str()) {
            score += 3;
        }
    }
    if !name.is_empty() && product.contains(&name) {
        score += 2;
    }
    for token in tokenize(&product) {
        if name_words.contains(&token) {
            score += 2;
        } else if name.contains(&token) {
            score += 1;
        }
    }
    score
}
