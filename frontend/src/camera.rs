use async_trait::async_trait;
use futures::channel::oneshot;
use js_sys::{Object, Reflect};
use shared::capture::{CameraFeed, DeviceError, MediaDevices, VideoConstraints};
use shared::payload::{ImagePayload, JPEG_MIME};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, DomException, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaStreamTrack,
};
use yew::NodeRef;

// HTMLMediaElement.HAVE_CURRENT_DATA
const HAVE_CURRENT_DATA: u16 = 2;

/// `navigator.mediaDevices`, rendering into the page's `<video>` element.
pub struct BrowserCamera {
    video: NodeRef,
}

impl BrowserCamera {
    pub fn new(video: NodeRef) -> Self {
        Self { video }
    }
}

#[async_trait(?Send)]
impl MediaDevices for BrowserCamera {
    type Feed = VideoFeed;

    async fn open(&self, constraints: VideoConstraints) -> Result<VideoFeed, DeviceError> {
        let window = web_sys::window().ok_or(DeviceError::Unsupported)?;
        if !window.is_secure_context() {
            return Err(DeviceError::InsecureContext);
        }
        let media_devices = window
            .navigator()
            .media_devices()
            .map_err(|_| DeviceError::Unsupported)?;
        let video = self
            .video
            .cast::<HtmlVideoElement>()
            .ok_or_else(|| DeviceError::Other("Video element is not mounted".into()))?;

        let request = media_devices
            .get_user_media_with_constraints(&stream_constraints(constraints)?)
            .map_err(device_error)?;
        let stream = JsFuture::from(request)
            .await
            .map_err(device_error)?
            .dyn_into::<MediaStream>()
            .map_err(|_| DeviceError::Other("getUserMedia did not return a stream".into()))?;

        Ok(VideoFeed { stream, video })
    }
}

pub struct VideoFeed {
    stream: MediaStream,
    video: HtmlVideoElement,
}

#[async_trait(?Send)]
impl CameraFeed for VideoFeed {
    async fn play(&self) -> Result<(), DeviceError> {
        self.video.set_muted(true);
        let _ = self.video.set_attribute("playsinline", "true");
        self.video.set_src_object(Some(&self.stream));

        let promise = self.video.play().map_err(playback_error)?;
        JsFuture::from(promise).await.map_err(playback_error)?;
        Ok(())
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        let (width, height) = (self.video.video_width(), self.video.video_height());
        (width > 0 && height > 0 && self.video.ready_state() >= HAVE_CURRENT_DATA)
            .then_some((width, height))
    }

    async fn encode_frame(&self, quality: f64) -> Result<ImagePayload, DeviceError> {
        let (width, height) = self
            .frame_size()
            .ok_or_else(|| DeviceError::Encoding("video has no frame".into()))?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| DeviceError::Encoding("no document".into()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(encoding_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| DeviceError::Encoding("canvas element unavailable".into()))?;
        canvas.set_width(width);
        canvas.set_height(height);

        let context = canvas
            .get_context("2d")
            .map_err(encoding_error)?
            .ok_or_else(|| DeviceError::Encoding("2d context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| DeviceError::Encoding("2d context unavailable".into()))?;
        context
            .draw_image_with_html_video_element(&self.video, 0.0, 0.0)
            .map_err(encoding_error)?;

        let blob = canvas_to_blob(&canvas, JPEG_MIME, quality).await?;
        let bytes = gloo_file::futures::read_as_bytes(&gloo_file::Blob::from(blob))
            .await
            .map_err(|e| DeviceError::Encoding(e.to_string()))?;

        Ok(ImagePayload::new(bytes, JPEG_MIME))
    }

    fn stop(&self) {
        for track in self.stream.get_tracks().iter() {
            track.unchecked_into::<MediaStreamTrack>().stop();
        }
        self.video.set_src_object(None);
    }
}

fn stream_constraints(constraints: VideoConstraints) -> Result<MediaStreamConstraints, DeviceError> {
    let video = Object::new();
    if let Some(facing) = constraints.facing.as_constraint() {
        set(&video, "facingMode", &JsValue::from_str(facing))?;
    }
    set(&video, "width", &ideal(constraints.ideal_width)?)?;
    set(&video, "height", &ideal(constraints.ideal_height)?)?;

    let stream = MediaStreamConstraints::new();
    stream.set_video(&video);
    stream.set_audio(&JsValue::FALSE);
    Ok(stream)
}

fn ideal(value: u32) -> Result<JsValue, DeviceError> {
    let object = Object::new();
    set(&object, "ideal", &JsValue::from(value))?;
    Ok(object.into())
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), DeviceError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(device_error)
}

async fn canvas_to_blob(
    canvas: &HtmlCanvasElement,
    mime: &str,
    quality: f64,
) -> Result<web_sys::Blob, DeviceError> {
    let (sender, receiver) = oneshot::channel::<Option<web_sys::Blob>>();
    let callback = Closure::once(move |blob: Option<web_sys::Blob>| {
        let _ = sender.send(blob);
    });

    canvas
        .to_blob_with_type_and_encoder_options(
            callback.as_ref().unchecked_ref(),
            mime,
            &JsValue::from_f64(quality),
        )
        .map_err(encoding_error)?;

    let blob = receiver
        .await
        .map_err(|_| DeviceError::Encoding("toBlob callback was dropped".into()))?;
    drop(callback);
    blob.ok_or_else(|| DeviceError::Encoding("canvas produced no image".into()))
}

fn device_error(value: JsValue) -> DeviceError {
    if let Some(exception) = value.dyn_ref::<DomException>() {
        return DeviceError::from_dom_exception(&exception.name(), &exception.message());
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return DeviceError::from_dom_exception(
            &String::from(error.name()),
            &String::from(error.message()),
        );
    }
    DeviceError::Other(describe(&value))
}

// Autoplay rejections arrive as NotAllowedError too
fn playback_error(value: JsValue) -> DeviceError {
    DeviceError::Playback(describe(&value))
}

fn encoding_error(value: JsValue) -> DeviceError {
    DeviceError::Encoding(describe(&value))
}

fn describe(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return format!("{}: {}", String::from(error.name()), String::from(error.message()));
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
