use super::super::Model;
use super::super::Msg;
use serde_json::to_string_pretty;
use shared::{FoodAnalysis, Nutrient, NutritionFacts};
use yew::prelude::*;

pub fn render_results(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(analysis) = &model.analysis else {
        return html! {};
    };

    html! {
        <div class="results-container">
            <div class="result-header">
                <button class="analyze-btn secondary" onclick={ctx.link().callback(|_| Msg::Reset)}>
                    <i class="fa-solid fa-arrow-left"></i>{" Analyze Another Food"}
                </button>
            </div>
            {
                if model.used_fallback {
                    html! {
                        <p class="sample-data-notice">
                            <i class="fa-solid fa-circle-info"></i>
                            {" Showing sample data: the food could not be analyzed right now."}
                        </p>
                    }
                } else {
                    html! {}
                }
            }
            { render_nutrition_label(analysis) }
            <details class="raw-data">
                <summary>{"Raw data"}</summary>
                <pre>{ to_string_pretty(analysis).unwrap_or_default() }</pre>
            </details>
        </div>
    }
}

fn render_nutrition_label(analysis: &FoodAnalysis) -> Html {
    let facts = &analysis.nutrition;
    let (macros, micros): (Vec<Nutrient>, Vec<Nutrient>) =
        Nutrient::label_rows().partition(|n| !n.is_micronutrient());

    html! {
        <div class="nutrition-label">
            <h2 class="food-name">{ &analysis.food_name }</h2>
            <h3 class="label-title">{"Nutrition Facts"}</h3>

            <div class="serving-info">
                <div><span class="label-strong">{"Serving size"}</span>{" "}{ &facts.serving_size }</div>
                <div><span class="label-strong">{"Servings per container"}</span>{" "}{ &facts.servings_per_container }</div>
            </div>

            <div class="calories-row">
                <span>{"Calories"}</span>
                <span class="calories-value">{ facts.calories.to_string() }</span>
            </div>

            <div class="daily-value-header">{"% Daily Value*"}</div>

            <div class="nutrient-rows">
                { for macros.into_iter().map(|n| render_nutrient_row(n, facts)) }
            </div>
            <div class="nutrient-rows micronutrients">
                { for micros.into_iter().map(|n| render_nutrient_row(n, facts)) }
            </div>

            <p class="label-footnote">
                {"*The % Daily Value (DV) tells you how much a nutrient in a serving of food contributes to a daily diet. 2,000 calories a day is used for general nutrition advice."}
            </p>
        </div>
    }
}

fn render_nutrient_row(nutrient: Nutrient, facts: &NutritionFacts) -> Html {
    let label_class = classes!(
        match nutrient.indent_level() {
            1 => Some("indent"),
            2 => Some("sub-indent"),
            _ => None,
        },
        nutrient.is_bold().then_some("label-strong"),
    );

    html! {
        <div class={classes!("nutrient-row", (nutrient == Nutrient::Protein).then_some("border-top"))}>
            <span class={label_class}>
                { format!("{} {}", nutrient.label(), nutrient.formatted_amount(facts)) }
            </span>
            {
                match nutrient.percent_daily_value(facts) {
                    Some(percent) => html! { <span class="label-strong">{ format!("{}%", percent) }</span> },
                    None => html! {},
                }
            }
        </div>
    }
}
