use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumIter, IntoStaticStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Response is not a JSON object")]
    NotAnObject,
    #[error("Missing or empty foodName")]
    MissingFoodName,
    #[error("Missing nutrition object")]
    MissingNutrition,
    #[error("Nutrition schema mismatch: {0}")]
    Schema(String),
    #[error("{0} must be a non-negative number, got {1}")]
    InvalidAmount(Nutrient, f64),
}

/// Per-serving nutrient estimates. Field names follow the JSON shape the
/// model is asked to produce (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionFacts {
    pub serving_size: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub servings_per_container: String,
    pub calories: f64,
    pub total_fat: f64,
    pub saturated_fat: f64,
    pub trans_fat: f64,
    pub cholesterol: f64,
    pub sodium: f64,
    pub total_carbohydrate: f64,
    pub dietary_fiber: f64,
    pub total_sugars: f64,
    pub added_sugars: f64,
    pub protein: f64,
    pub vitamin_d: f64,
    pub calcium: f64,
    pub iron: f64,
    pub potassium: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    pub food_name: String,
    pub nutrition: NutritionFacts,
}

// Models sometimes answer `"servingsPerContainer": 1` instead of `"1"`
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "Expected string or number, got {}",
            other
        ))),
    }
}

impl NutritionFacts {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for nutrient in <Nutrient as strum::IntoEnumIterator>::iter() {
            let amount = nutrient.amount(self);
            if !amount.is_finite() || amount < 0.0 {
                return Err(ValidationError::InvalidAmount(nutrient, amount));
            }
        }
        Ok(())
    }
}

impl FoodAnalysis {
    /// Structurally checks a parsed model response and converts it into a
    /// record satisfying every field invariant.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut object) = value else {
            return Err(ValidationError::NotAnObject);
        };

        let food_name = match object.remove("foodName") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Err(ValidationError::MissingFoodName),
        };

        let nutrition = match object.remove("nutrition") {
            Some(nutrition @ Value::Object(_)) => nutrition,
            _ => return Err(ValidationError::MissingNutrition),
        };

        let nutrition: NutritionFacts = serde_json::from_value(nutrition)
            .map_err(|e| ValidationError::Schema(e.to_string()))?;

        let analysis = FoodAnalysis {
            food_name,
            nutrition,
        };
        analysis.validate()?;
        Ok(analysis)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.food_name.trim().is_empty() {
            return Err(ValidationError::MissingFoodName);
        }
        self.nutrition.validate()
    }
}

/// The numeric rows of a nutrition label, in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum Nutrient {
    #[strum(serialize = "Calories")]
    Calories,
    #[strum(serialize = "Total Fat")]
    TotalFat,
    #[strum(serialize = "Saturated Fat")]
    SaturatedFat,
    #[strum(serialize = "Trans Fat")]
    TransFat,
    #[strum(serialize = "Cholesterol")]
    Cholesterol,
    #[strum(serialize = "Sodium")]
    Sodium,
    #[strum(serialize = "Total Carbohydrate")]
    TotalCarbohydrate,
    #[strum(serialize = "Dietary Fiber")]
    DietaryFiber,
    #[strum(serialize = "Total Sugars")]
    TotalSugars,
    #[strum(serialize = "Added Sugars")]
    AddedSugars,
    #[strum(serialize = "Protein")]
    Protein,
    #[strum(serialize = "Vitamin D")]
    VitaminD,
    #[strum(serialize = "Calcium")]
    Calcium,
    #[strum(serialize = "Iron")]
    Iron,
    #[strum(serialize = "Potassium")]
    Potassium,
}

impl Nutrient {
    pub fn label(self) -> &'static str {
        self.into()
    }

    pub fn amount(self, facts: &NutritionFacts) -> f64 {
        match self {
            Nutrient::Calories => facts.calories,
            Nutrient::TotalFat => facts.total_fat,
            Nutrient::SaturatedFat => facts.saturated_fat,
            Nutrient::TransFat => facts.trans_fat,
            Nutrient::Cholesterol => facts.cholesterol,
            Nutrient::Sodium => facts.sodium,
            Nutrient::TotalCarbohydrate => facts.total_carbohydrate,
            Nutrient::DietaryFiber => facts.dietary_fiber,
            Nutrient::TotalSugars => facts.total_sugars,
            Nutrient::AddedSugars => facts.added_sugars,
            Nutrient::Protein => facts.protein,
            Nutrient::VitaminD => facts.vitamin_d,
            Nutrient::Calcium => facts.calcium,
            Nutrient::Iron => facts.iron,
            Nutrient::Potassium => facts.potassium,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories => "",
            Nutrient::Cholesterol
            | Nutrient::Sodium
            | Nutrient::Calcium
            | Nutrient::Iron
            | Nutrient::Potassium => "mg",
            Nutrient::VitaminD => "mcg",
            _ => "g",
        }
    }

    /// Reference daily value on a 2,000 calorie diet, in `unit()`.
    pub fn daily_value(self) -> Option<f64> {
        match self {
            Nutrient::TotalFat => Some(65.0),
            Nutrient::SaturatedFat => Some(20.0),
            Nutrient::Cholesterol => Some(300.0),
            Nutrient::Sodium => Some(2300.0),
            Nutrient::TotalCarbohydrate => Some(300.0),
            Nutrient::DietaryFiber => Some(25.0),
            Nutrient::AddedSugars => Some(50.0),
            Nutrient::VitaminD => Some(20.0),
            Nutrient::Calcium => Some(1300.0),
            Nutrient::Iron => Some(18.0),
            Nutrient::Potassium => Some(4700.0),
            Nutrient::Calories
            | Nutrient::TransFat
            | Nutrient::TotalSugars
            | Nutrient::Protein => None,
        }
    }

    pub fn percent_daily_value(self, facts: &NutritionFacts) -> Option<i64> {
        self.daily_value()
            .map(|dv| (self.amount(facts) / dv * 100.0).round() as i64)
    }

    pub fn formatted_amount(self, facts: &NutritionFacts) -> String {
        format!("{}{}", self.amount(facts), self.unit())
    }

    pub fn indent_level(self) -> u8 {
        match self {
            Nutrient::SaturatedFat
            | Nutrient::TransFat
            | Nutrient::DietaryFiber
            | Nutrient::TotalSugars => 1,
            Nutrient::AddedSugars => 2,
            _ => 0,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(
            self,
            Nutrient::TotalFat
                | Nutrient::Cholesterol
                | Nutrient::Sodium
                | Nutrient::TotalCarbohydrate
                | Nutrient::Protein
        )
    }

    /// Vitamins and minerals sit in their own block under the macronutrients.
    pub fn is_micronutrient(self) -> bool {
        matches!(
            self,
            Nutrient::VitaminD | Nutrient::Calcium | Nutrient::Iron | Nutrient::Potassium
        )
    }

    /// Rows below the calorie headline.
    pub fn label_rows() -> impl Iterator<Item = Nutrient> {
        <Nutrient as strum::IntoEnumIterator>::iter().filter(|n| *n != Nutrient::Calories)
    }
}
