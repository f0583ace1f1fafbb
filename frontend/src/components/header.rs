use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-utensils"></i> {" NutriScan"}</h1>
            <p class="subtitle">{"Instantly discover the nutritional content of any food with AI-powered analysis"}</p>
        </header>
    }
}
