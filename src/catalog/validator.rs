// Decides whether a category can anchor a market analysis
use crate::catalog::index::{CategoryIndex, score_for_product};
use crate::catalog::taxonomy::{Category, Level};
use serde::Serialize;
use std::sync::Arc;

/// Upper bound on suggestions attached to a failed validation.
pub const MAX_SUGGESTIONS: usize = 5;
/// Suggestions offered alongside a corrective action.
pub const MAX_CORRECTIVE_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// 0 when the category does not exist.
    pub level: u8,
    pub message: String,
    pub suggestions: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectiveActions {
    pub primary_action: String,
    pub suggestions: Vec<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchValidation {
    pub id: i64,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiCompatibility {
    pub compatible: bool,
    pub reason: String,
    pub alternatives: Vec<Category>,
}

/// Validation never fails with an error; an unusable category is reported in the result.
#[derive(Debug, Clone)]
pub struct CategoryValidator {
    index: Arc<CategoryIndex>,
}

impl CategoryValidator {
    pub fn new(index: Arc<CategoryIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    pub fn validate_category_for_analysis(&self, id: i64) -> ValidationResult {
        let Some(category) = self.index.find_category_by_id(id) else {
            return missing(id);
        };

        if category.level() == Level::Three {
            return ValidationResult {
                is_valid: true,
                level: 3,
                message: format!("Category '{}' is valid for analysis", category.name),
                suggestions: Vec::new(),
            };
        }

        let suggestions = self
            .candidates_below(category)
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect();
        below_leaf(category, suggestions)
    }

    pub fn validate_with_product_context(&self, id: i64, product_name: &str) -> ValidationResult {
        let product_name = product_name.trim();
        let category = self.index.find_category_by_id(id);

        if product_name.is_empty() {
            return ValidationResult {
                is_valid: false,
                level: category.map(|c| c.level().as_u8()).unwrap_or(0),
                message: "A product name is required for analysis".to_string(),
                suggestions: Vec::new(),
            };
        }

        let Some(category) = category else {
            return missing(id);
        };
        if category.level() == Level::Three {
            return self.validate_category_for_analysis(id);
        }

        let mut ranked: Vec<(u32, &Category)> = self
            .candidates_below(category)
            .into_iter()
            .map(|c| (score_for_product(c, product_name), c))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        let suggestions = ranked
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, c)| c.clone())
            .collect();
        below_leaf(category, suggestions)
    }

    pub fn generate_corrective_actions(&self, id: i64, product_name: &str) -> CorrectiveActions {
        let validation = self.validate_with_product_context(id, product_name);
        if validation.is_valid {
            return CorrectiveActions {
                primary_action: "No action needed: the category is ready for analysis".to_string(),
                suggestions: Vec::new(),
            };
        }

        let (primary_action, suggestions) = match self.index.find_category_by_id(id) {
            _ if product_name.trim().is_empty() => (
                "Enter a product name before starting the analysis".to_string(),
                Vec::new(),
            ),
            None => (
                format!("Category {id} does not exist; pick a level-3 category from the suggestions"),
                self.index
                    .suggest_level3_for_product(product_name)
                    .into_iter()
                    .cloned()
                    .collect(),
            ),
            Some(category) => (
                format!(
                    "'{}' is a level-{} category; choose one of its level-3 subcategories",
                    category.name,
                    category.level().as_u8()
                ),
                validation.suggestions,
            ),
        };

        CorrectiveActions {
            primary_action,
            suggestions: suggestions
                .into_iter()
                .take(MAX_CORRECTIVE_SUGGESTIONS)
                .collect(),
        }
    }

    pub fn validate_categories_batch(&self, ids: &[i64]) -> Vec<BatchValidation> {
        ids.iter()
            .map(|&id| BatchValidation {
                id,
                is_valid: self
                    .index
                    .find_category_by_id(id)
                    .is_some_and(|c| c.level() == Level::Three),
            })
            .collect()
    }

    pub fn is_api_compatible(&self, id: i64) -> ApiCompatibility {
        let validation = self.validate_category_for_analysis(id);
        if !validation.is_valid {
            return ApiCompatibility {
                compatible: false,
                reason: validation.message,
                alternatives: validation.suggestions,
            };
        }

        match self.index.find_category_by_id(id) {
            Some(category) if !category.active => {
                let alternatives = category
                    .parent_id()
                    .map(|parent| self.index.get_level3_categories(Some(parent)))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|c| c.id != id && c.active)
                    .take(MAX_SUGGESTIONS)
                    .cloned()
                    .collect();
                ApiCompatibility {
                    compatible: false,
                    reason: format!("Category '{}' is flagged inactive", category.name),
                    alternatives,
                }
            }
            _ => ApiCompatibility {
                compatible: true,
                reason: validation.message,
                alternatives: Vec::new(),
            },
        }
    }

    /// Active leaves below `category`, or below its parent when it has none of its own.
    fn candidates_below(&self, category: &Category) -> Vec<&Category> {
        let own: Vec<&Category> = self
            .index
            .level3_descendants(category.id)
            .into_iter()
            .filter(|c| c.active)
            .collect();
        if !own.is_empty() {
            return own;
        }

        category
            .parent_id()
            .map(|parent| self.index.level3_descendants(parent))
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.active)
            .collect()
    }
}

fn missing(id: i64) -> ValidationResult {
    ValidationResult {
        is_valid: false,
        level: 0,
        message: format!("Category {id} does not exist"),
        suggestions: Vec::new(),
    }
}

fn below_leaf(category: &Category, suggestions: Vec<Category>) -> ValidationResult {
    let level = category.level().as_u8();
    ValidationResult {
        is_valid: false,
        level,
        message: format!(
            "Category '{}' is level {level}; analysis requires a level-3 category",
            category.name
        ),
        suggestions,
    }
}
