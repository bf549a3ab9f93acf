use crate::domain::models::{CyclePhase, MacroTargets, MealPlanRequest, MealSuggestion};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::nutrition_client::{
    Dish, DishSearchRequest, NutrientFilters, NutrientRange, NutritionClient,
};
use crate::infrastructure::supabase_client::BackendClient;
use std::collections::HashMap;
use std::sync::Arc;

const MEAL_CALORIE_SPLIT: [f64; 3] = [0.3, 0.4, 0.3];

const CALORIE_TOLERANCE: f64 = 50.0;
const PROTEIN_TOLERANCE: f64 = 5.0;
const CARBS_TOLERANCE: f64 = 10.0;
const FAT_TOLERANCE: f64 = 5.0;

const DIABETES_CARB_CEILING: f64 = 50.0;
const LUTEAL_CARB_CEILING: f64 = 60.0;
const MENSTRUATION_IRON_FLOOR: f64 = 2.0;

// Dishes at or above the cutoff are excluded for low-GI diets; a dish absent
// from the table counts as the cutoff itself and is therefore excluded.
const GI_CUTOFF: f64 = 55.0;
const DEFAULT_GI: f64 = 55.0;

const GI_TABLE_JSON: &str = include_str!("../../data/gi_table.json");

const NO_MATCH_NOTE: &str = "No matching dish found";

/// Builds a day of three meal suggestions against the user's calorie and
/// macro targets, narrowing candidates by health conditions and cycle phase.
pub struct MealSuggestionService {
    backend: Arc<dyn BackendClient>,
    nutrition: Arc<dyn NutritionClient>,
    gi_table: HashMap<String, f64>,
}

impl MealSuggestionService {
    pub fn new(backend: Arc<dyn BackendClient>, nutrition: Arc<dyn NutritionClient>) -> Self {
        Self {
            backend,
            nutrition,
            // The bundled table is compile-time known; a malformed one
            // degrades to GI-less filtering rather than failing construction.
            gi_table: serde_json::from_str(GI_TABLE_JSON).unwrap_or_default(),
        }
    }

    pub fn with_gi_table(mut self, gi_table: HashMap<String, f64>) -> Self {
        self.gi_table = gi_table;
        self
    }

    pub async fn suggest(
        &self,
        request: &MealPlanRequest,
    ) -> Result<Vec<MealSuggestion>, InfraError> {
        request.validate().map_err(InfraError::InvalidConfig)?;

        // The profile read is a consistency check; targets come from the
        // request itself.
        self.backend
            .fetch_user_profile(&request.user_id)
            .await?
            .ok_or_else(|| {
                InfraError::Backend(format!("no profile found for user {}", request.user_id))
            })?;

        let mut meals = Vec::with_capacity(MEAL_CALORIE_SPLIT.len());
        for (index, share) in MEAL_CALORIE_SPLIT.iter().enumerate() {
            let target = MacroTargets::for_meal(
                request.calories * share,
                request.calories,
                &request.macros,
            );
            let dishes = self
                .nutrition
                .search_dishes(&DishSearchRequest {
                    query: format!("{} dish", request.diet.trim()),
                    filters: filters_for(&target, request),
                })
                .await?;
            let candidates = self.apply_gi_filter(dishes, request);

            meals.push(match best_dish(&candidates, &target) {
                Some(dish) => MealSuggestion {
                    name: dish.food_name.clone(),
                    calories: Some(dish.calories),
                    protein_g: Some(dish.protein_g),
                    carbs_g: Some(dish.carbs_g),
                    fat_g: Some(dish.fat_g),
                    note: None,
                },
                None => MealSuggestion {
                    name: format!("Meal {}", index + 1),
                    calories: None,
                    protein_g: None,
                    carbs_g: None,
                    fat_g: None,
                    note: Some(NO_MATCH_NOTE.to_string()),
                },
            });
        }
        Ok(meals)
    }

    fn apply_gi_filter(&self, dishes: Vec<Dish>, request: &MealPlanRequest) -> Vec<Dish> {
        if !wants_low_gi(request) {
            return dishes;
        }
        dishes
            .into_iter()
            .filter(|dish| {
                let gi = self
                    .gi_table
                    .get(&dish.food_name.to_lowercase())
                    .copied()
                    .unwrap_or(DEFAULT_GI);
                gi < GI_CUTOFF
            })
            .collect()
    }
}

fn wants_low_gi(request: &MealPlanRequest) -> bool {
    request.health_conditions.has_diabetes || request.cycle_phase == Some(CyclePhase::Luteal)
}

fn filters_for(target: &MacroTargets, request: &MealPlanRequest) -> NutrientFilters {
    let mut carbs = NutrientRange::around(target.carbs_g, CARBS_TOLERANCE);
    if request.health_conditions.has_diabetes {
        carbs = NutrientRange::at_most(DIABETES_CARB_CEILING);
    }
    // Applied after the diabetes ceiling, so the luteal one wins when both hold.
    if request.cycle_phase == Some(CyclePhase::Luteal) {
        carbs = NutrientRange::at_most(LUTEAL_CARB_CEILING);
    }

    NutrientFilters {
        calories: NutrientRange::around(target.calories, CALORIE_TOLERANCE),
        protein_g: NutrientRange::around(target.protein_g, PROTEIN_TOLERANCE),
        carbs_g: carbs,
        fat_g: NutrientRange::around(target.fat_g, FAT_TOLERANCE),
        iron: (request.cycle_phase == Some(CyclePhase::Menstruation))
            .then(|| NutrientRange::at_least(MENSTRUATION_IRON_FLOOR)),
    }
}

fn score_dish(dish: &Dish, target: &MacroTargets) -> f64 {
    ((dish.calories - target.calories).powi(2)
        + (dish.protein_g - target.protein_g).powi(2)
        + (dish.carbs_g - target.carbs_g).powi(2)
        + (dish.fat_g - target.fat_g).powi(2))
    .sqrt()
}

fn best_dish<'a>(dishes: &'a [Dish], target: &MacroTargets) -> Option<&'a Dish> {
    dishes.iter().reduce(|best, dish| {
        if score_dish(dish, target) < score_dish(best, target) {
            dish
        } else {
            best
        }
    })
}
