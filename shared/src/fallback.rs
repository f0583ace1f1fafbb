use crate::nutrition::{FoodAnalysis, NutritionFacts};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Canned, pre-validated records served whenever the model cannot be used.
pub fn catalog() -> Vec<FoodAnalysis> {
    vec![
        FoodAnalysis {
            food_name: "Grilled Chicken Salad".to_string(),
            nutrition: NutritionFacts {
                serving_size: "1 bowl (300g)".to_string(),
                servings_per_container: "1".to_string(),
                calories: 320.0,
                total_fat: 12.0,
                saturated_fat: 3.0,
                trans_fat: 0.0,
                cholesterol: 85.0,
                sodium: 580.0,
                total_carbohydrate: 15.0,
                dietary_fiber: 5.0,
                total_sugars: 8.0,
                added_sugars: 2.0,
                protein: 35.0,
                vitamin_d: 0.0,
                calcium: 120.0,
                iron: 3.0,
                potassium: 650.0,
            },
        },
        FoodAnalysis {
            food_name: "Avocado Toast".to_string(),
            nutrition: NutritionFacts {
                serving_size: "2 slices (180g)".to_string(),
                servings_per_container: "1".to_string(),
                calories: 420.0,
                total_fat: 22.0,
                saturated_fat: 4.0,
                trans_fat: 0.0,
                cholesterol: 0.0,
                sodium: 380.0,
                total_carbohydrate: 45.0,
                dietary_fiber: 12.0,
                total_sugars: 6.0,
                added_sugars: 0.0,
                protein: 14.0,
                vitamin_d: 0.0,
                calcium: 80.0,
                iron: 4.0,
                potassium: 890.0,
            },
        },
        FoodAnalysis {
            food_name: "Healthy Mixed Salad".to_string(),
            nutrition: NutritionFacts {
                serving_size: "1 bowl (400g)".to_string(),
                servings_per_container: "1".to_string(),
                calories: 285.0,
                total_fat: 15.0,
                saturated_fat: 2.0,
                trans_fat: 0.0,
                cholesterol: 0.0,
                sodium: 320.0,
                total_carbohydrate: 32.0,
                dietary_fiber: 8.0,
                total_sugars: 12.0,
                added_sugars: 0.0,
                protein: 12.0,
                vitamin_d: 0.0,
                calcium: 150.0,
                iron: 4.0,
                potassium: 850.0,
            },
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum FallbackPolicy {
    #[default]
    Random,
    RoundRobin,
    /// Always the same entry; out-of-range indices wrap.
    Fixed(usize),
}

/// Picks catalog entries according to a [`FallbackPolicy`].
#[derive(Debug)]
pub struct FallbackPicker {
    policy: FallbackPolicy,
    catalog: Vec<FoodAnalysis>,
    next: Cell<usize>,
}

impl FallbackPicker {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            policy,
            catalog: catalog(),
            next: Cell::new(0),
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn pick(&self) -> FoodAnalysis {
        let len = self.catalog.len();
        let index = match self.policy {
            FallbackPolicy::Random => rand::thread_rng().gen_range(0..len),
            FallbackPolicy::RoundRobin => {
                let index = self.next.get() % len;
                self.next.set(index + 1);
                index
            }
            FallbackPolicy::Fixed(index) => index % len,
        };
        self.catalog[index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_are_valid() {
        let entries = catalog();
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert!(entry.validate().is_ok(), "{} is invalid", entry.food_name);
        }
        assert_eq!(entries[0].food_name, "Grilled Chicken Salad");
        assert_eq!(entries[0].nutrition.calories, 320.0);
        assert_eq!(entries[0].nutrition.protein, 35.0);
    }

    #[test]
    fn test_random_pick_is_from_catalog() {
        let picker = FallbackPicker::new(FallbackPolicy::Random);
        let entries = catalog();
        for _ in 0..20 {
            assert!(entries.contains(&picker.pick()));
        }
    }

    #[test]
    fn test_deterministic_policies() {
        let fixed = FallbackPicker::new(FallbackPolicy::Fixed(4));
        assert_eq!(fixed.pick().food_name, "Avocado Toast");
        assert_eq!(fixed.pick().food_name, "Avocado Toast");

        let rotating = FallbackPicker::new(FallbackPolicy::RoundRobin);
        let names: Vec<String> = (0..4).map(|_| rotating.pick().food_name).collect();
        assert_eq!(
            names,
            [
                "Grilled Chicken Salad",
                "Avocado Toast",
                "Healthy Mixed Salad",
                "Grilled Chicken Salad"
            ]
        );
    }
}
