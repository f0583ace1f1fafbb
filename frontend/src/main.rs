mod api;
mod camera;
mod components;

use api::{BrowserTimer, GeminiClient};
use camera::BrowserCamera;
use components::capture_section::render_capture_section;
use components::header::render_header;
use components::nutrition_label::render_results;
use components::utils::render_error_message;
use gloo_events::EventListener;
use gloo_file::File as GlooFile;
use shared::{AnalysisGateway, CaptureController, FoodAnalysis, ImagePayload};
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

type Gateway = AnalysisGateway<GeminiClient, BrowserTimer>;

// Yew msg components
enum Msg {
    // Camera operations
    StartCamera,
    StopCamera,
    CapturePhoto,
    CameraUpdated,

    // Image input
    FileChosen(GlooFile),
    PhotoReady(ImagePayload),
    ClearImage,

    // Analysis operations
    AnalysisFinished(FoodAnalysis, bool),
    Reset,

    // UI states
    SetError(Option<String>),
}

// Main component
struct Model {
    capture: CaptureController<BrowserCamera>,
    gateway: Rc<Gateway>,
    video_ref: NodeRef,
    preview_url: Option<String>,
    analysis: Option<FoodAnalysis>,
    used_fallback: bool,
    analyzing: bool,
    error: Option<String>,
    _pagehide_listener: Option<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let config = api::load_config();
        if !config.has_credential() {
            log::warn!("GEMINI_API_KEY not set at build time, analysis will use sample data");
        }
        let client = GeminiClient::new(&config);
        let gateway = Rc::new(AnalysisGateway::new(config, client, BrowserTimer));

        let video_ref = NodeRef::default();
        let capture = CaptureController::new(BrowserCamera::new(video_ref.clone()));

        // Release the camera when the page is hidden or navigated away from
        let pagehide_listener = web_sys::window().map(|window| {
            let capture = capture.clone();
            let link = ctx.link().clone();
            EventListener::new(&window, "pagehide", move |_| {
                capture.stop_camera();
                link.send_message(Msg::CameraUpdated);
            })
        });

        Self {
            capture,
            gateway,
            video_ref,
            preview_url: None,
            analysis: None,
            used_fallback: false,
            analyzing: false,
            error: None,
            _pagehide_listener: pagehide_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // Camera operations
            Msg::StartCamera => self.handle_start_camera(ctx),
            Msg::StopCamera => {
                self.capture.stop_camera();
                true
            }
            Msg::CapturePhoto => self.handle_capture_photo(ctx),
            Msg::CameraUpdated => true,

            // Image input
            Msg::FileChosen(file) => self.handle_file_chosen(ctx, file),
            Msg::PhotoReady(payload) => self.handle_photo_ready(ctx, payload),
            Msg::ClearImage => {
                if self.analyzing {
                    return false;
                }
                self.preview_url = None;
                true
            }

            // Analysis operations
            Msg::AnalysisFinished(analysis, used_fallback) => {
                self.handle_analysis_finished(analysis, used_fallback)
            }
            Msg::Reset => {
                self.analysis = None;
                self.preview_url = None;
                self.used_fallback = false;
                self.error = None;
                true
            }

            // UI states
            Msg::SetError(error) => {
                self.error = error;
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                {
                    if self.analysis.is_some() {
                        render_results(self, ctx)
                    } else {
                        render_capture_section(self, ctx)
                    }
                }
                { render_error_message(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Nutritional information is estimated. Consult healthcare professionals for dietary advice."}</p>
                </footer>
            </div>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.capture.stop_camera();
    }
}

// Handler methods
impl Model {
    fn handle_start_camera(&mut self, ctx: &Context<Self>) -> bool {
        if self.analyzing {
            return false;
        }
        self.error = None;

        let capture = self.capture.clone();
        let link = ctx.link().clone();
        spawn_local(async move {
            // Failures land in the controller's Error state and render from there
            let _ = capture.start_camera().await;
            link.send_message(Msg::CameraUpdated);
        });

        true
    }

    fn handle_capture_photo(&mut self, ctx: &Context<Self>) -> bool {
        let capture = self.capture.clone();
        let link = ctx.link().clone();
        spawn_local(async move {
            match capture.capture_photo().await {
                Some(payload) => link.send_message(Msg::PhotoReady(payload)),
                None => link.send_message(Msg::CameraUpdated),
            }
        });
        false
    }

    fn handle_file_chosen(&mut self, ctx: &Context<Self>, file: GlooFile) -> bool {
        if self.analyzing {
            log::warn!("Ignoring {} while an analysis is pending", file.name());
            return false;
        }
        // Moving on to analysis, the live preview is no longer needed
        self.capture.stop_camera();

        let capture = self.capture.clone();
        let link = ctx.link().clone();
        spawn_local(async move {
            match gloo_file::futures::read_as_bytes(&file).await {
                Ok(bytes) => {
                    let payload = capture.select_file(bytes, &file.raw_mime_type());
                    link.send_message(Msg::PhotoReady(payload));
                }
                Err(e) => link.send_message(Msg::SetError(Some(format!(
                    "Failed to read {}: {}",
                    file.name(),
                    e
                )))),
            }
        });

        true
    }

    fn handle_photo_ready(&mut self, ctx: &Context<Self>, payload: ImagePayload) -> bool {
        if self.analyzing {
            log::warn!("Dropping image {} while an analysis is pending", payload.id());
            return false;
        }

        self.preview_url = Some(payload.to_data_url());
        self.analyzing = true;
        self.error = None;

        let gateway = Rc::clone(&self.gateway);
        let link = ctx.link().clone();
        spawn_local(async move {
            let outcome = gateway.analyze_detailed(payload).await;
            let used_fallback = outcome.is_fallback();
            link.send_message(Msg::AnalysisFinished(outcome.analysis, used_fallback));
        });

        true
    }

    fn handle_analysis_finished(&mut self, analysis: FoodAnalysis, used_fallback: bool) -> bool {
        log::info!("Food analyzed successfully: {}", analysis.food_name);
        self.analyzing = false;
        self.used_fallback = used_fallback;
        self.analysis = Some(analysis);
        true
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
