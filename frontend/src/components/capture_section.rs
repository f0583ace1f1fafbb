use super::super::Model;
use super::super::Msg;
use super::utils::{debounce, first_file, trigger_file_input};
use shared::CameraState;
use web_sys::HtmlInputElement;
use yew::prelude::*;

const FILE_INPUT_ID: &str = "file-input";

pub fn render_capture_section(model: &Model, ctx: &Context<Model>) -> Html {
    let state = model.capture.state();
    let camera_visible = matches!(state, CameraState::CameraActive);

    html! {
        <div class="capture-section">
            { render_file_input(ctx) }

            // Kept mounted so the stream always has a surface to play into
            <video
                ref={model.video_ref.clone()}
                class={classes!("camera-preview", (!camera_visible).then_some("hidden"))}
                autoplay=true
            />

            {
                match &state {
                    CameraState::RequestingCamera => render_requesting(ctx),
                    CameraState::CameraActive => render_camera_controls(ctx),
                    CameraState::Idle | CameraState::Error(_) => match &model.preview_url {
                        Some(url) => render_image_preview(model, ctx, url),
                        None => render_capture_placeholder(model, ctx),
                    },
                }
            }

            { render_camera_error(&state) }
        </div>
    }
}

fn render_file_input(ctx: &Context<Model>) -> Html {
    let handle_change = ctx.link().batch_callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input.files().as_ref().and_then(first_file);

        input.set_value("");
        file.map(Msg::FileChosen)
    });

    html! {
        <input
            type="file"
            id={FILE_INPUT_ID}
            accept="image/*"
            style="display: none;"
            onchange={handle_change}
        />
    }
}

fn render_capture_placeholder(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();
    let open_picker = trigger_file_input(FILE_INPUT_ID);

    html! {
        <div class="capture-card">
            <div class="capture-icon"><i class="fa-solid fa-camera"></i></div>
            <h3>{"Capture Your Food"}</h3>
            <p class="subtitle">{"Take a photo or upload an image of any dish to get instant nutritional information"}</p>

            <div class="button-container">
                <button
                    id="take-photo-btn"
                    class="analyze-btn"
                    disabled={model.analyzing}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::StartCamera)
                    })}
                >
                    <i class="fa-solid fa-camera"></i>{" Take Photo"}
                </button>
                <button
                    id="upload-button"
                    class="analyze-btn secondary"
                    disabled={model.analyzing}
                    onclick={debounce(300, move || open_picker.emit(()))}
                >
                    <i class="fa-solid fa-upload"></i>{" Upload Image"}
                </button>
            </div>
        </div>
    }
}

fn render_requesting(ctx: &Context<Model>) -> Html {
    html! {
        <div class="camera-status">
            <i class="fa-solid fa-spinner fa-spin"></i>
            <p>{"Starting camera..."}</p>
            <button class="analyze-btn secondary" onclick={ctx.link().callback(|_| Msg::StopCamera)}>
                <i class="fa-solid fa-xmark"></i>{" Cancel"}
            </button>
        </div>
    }
}

fn render_camera_controls(ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();

    html! {
        <div class="button-container">
            <button
                id="capture-btn"
                class="analyze-btn"
                onclick={debounce(300, {
                    let link = link.clone();
                    move || link.send_message(Msg::CapturePhoto)
                })}
            >
                <i class="fa-solid fa-circle-dot"></i>{" Capture"}
            </button>
            <button class="analyze-btn secondary" onclick={link.callback(|_| Msg::StopCamera)}>
                <i class="fa-solid fa-xmark"></i>{" Cancel"}
            </button>
        </div>
    }
}

fn render_image_preview(model: &Model, ctx: &Context<Model>, url: &str) -> Html {
    html! {
        <div class="image-preview">
            <img id="actual-image-preview" src={url.to_string()} alt="Food preview" />
            <button
                class="remove-btn"
                title="Remove this image"
                disabled={model.analyzing}
                onclick={ctx.link().callback(|_| Msg::ClearImage)}
            >
                <i class="fa-solid fa-times"></i>
            </button>
            {
                if model.analyzing {
                    html! {
                        <div class="analyzing">
                            <i class="fa-solid fa-spinner fa-spin"></i>
                            <span>{" Analyzing nutritional content..."}</span>
                        </div>
                    }
                } else {
                    html! {}
                }
            }
        </div>
    }
}

fn render_camera_error(state: &CameraState) -> Html {
    match state {
        CameraState::Error(err) => html! {
            <div class="error-message camera-error">
                <i class="fa-solid fa-video-slash"></i>
                <p>{ err.user_message() }</p>
            </div>
        },
        _ => html! {},
    }
}
