//! Browser control panel: model picker, FOV and clip sliders, note toggle
//! and a view point JSON box.

use js_sys::Uint8Array;
use leptos::{html, prelude::*, task::spawn_local};
use winit::event_loop::EventLoopProxy;

use crate::{
    render::{
        clip::ClipFace,
        view_point::ViewPoint,
        viewer::{ScreenLabel, ScreenMarker},
    },
    LoadError, ViewerSession, ViewerWrapper,
};

/// Sent to the event loop whenever the panel touched the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellEvent {
    SessionChanged,
}

fn notify(proxy: &EventLoopProxy<ShellEvent>) {
    if proxy.send_event(ShellEvent::SessionChanged).is_err() {
        leptos::logging::warn!("event loop is gone, frame not requested");
    }
}

async fn read_file(file: web_sys::File) -> Result<Vec<u8>, String> {
    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer())
        .await
        .map_err(|err| format!("failed to read {}: {:?}", file.name(), err))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Panel-side mirror of the session values the sliders show.
#[derive(Clone, Copy)]
struct PanelState {
    fov: RwSignal<f64>,
    offsets: [RwSignal<f64>; 6],
    ranges: [RwSignal<(f64, f64)>; 6],
    notes_visible: RwSignal<bool>,
    view_point_json: RwSignal<String>,
    status: RwSignal<String>,
}

impl PanelState {
    fn new(session: &ViewerSession) -> Self {
        Self {
            fov: RwSignal::new(session.camera().fov()),
            offsets: std::array::from_fn(|_| RwSignal::new(0.0)),
            ranges: std::array::from_fn(|_| RwSignal::new((0.0, 0.0))),
            notes_visible: RwSignal::new(true),
            view_point_json: RwSignal::new(String::new()),
            status: RwSignal::new("no model loaded".to_owned()),
        }
    }

    fn refresh(&self, session: &ViewerSession) {
        self.fov.set(session.camera().fov());
        for face in ClipFace::ALL {
            if let Ok(offset) = session.clip_offset(face) {
                self.offsets[face.index()].set(offset);
            }
            if let Ok(range) = session.clip_offset_range(face) {
                self.ranges[face.index()].set(range);
            }
        }
    }
}

#[component]
fn ClipSlider(
    face: ClipFace,
    state: PanelState,
    viewer: ViewerWrapper,
    proxy: EventLoopProxy<ShellEvent>,
) -> impl IntoView {
    let idx = face.index();
    let on_input = move |ev| {
        if let Ok(value) = event_target_value(&ev).parse::<f64>() {
            state.offsets[idx].set(value);
            if let Err(err) = viewer.borrow_mut().set_clip_offset(face, value) {
                state.status.set(err.to_string());
            }
            notify(&proxy);
        }
    };
    view! {
        <label class = "flex items-center w-full text-sm">
            <span class = "w-16">{face.label()}</span>
            <input
                type = "range"
                class = "flex-1"
                step = "10"
                min = move || state.ranges[idx].get().0.to_string()
                max = move || state.ranges[idx].get().1.to_string()
                prop:value = move || state.offsets[idx].get().to_string()
                on:input = on_input
            />
        </label>
    }
}

#[component]
fn ControlPanel(
    viewer: ViewerWrapper,
    proxy: EventLoopProxy<ShellEvent>,
) -> impl IntoView {
    let state = PanelState::new(&viewer.borrow());

    let file_input = NodeRef::<html::Input>::new();
    let on_files = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |_| {
            let Some(files) = file_input.get().and_then(|input| input.files()) else {
                return;
            };
            let mut obj = None;
            let mut mtl = None;
            for i in 0..files.length() {
                if let Some(file) = files.item(i) {
                    let name = file.name().to_lowercase();
                    if name.ends_with(".obj") {
                        obj = Some(file);
                    } else if name.ends_with(".mtl") {
                        mtl = Some(file);
                    }
                }
            }
            let Some(obj) = obj else {
                state.status.set("choose an .obj file".to_owned());
                return;
            };
            let ticket = viewer.borrow_mut().begin_load(&obj.name());
            state.status.set(format!(
                "loading {} (load {})",
                ticket.model_url(),
                ticket.generation()
            ));
            let viewer = viewer.clone();
            let proxy = proxy.clone();
            spawn_local(async move {
                let obj_bytes = read_file(obj).await;
                let mtl_bytes = match mtl {
                    Some(file) => read_file(file).await.ok(),
                    None => None,
                };
                let name = ticket.model_url().to_owned();
                let result = match obj_bytes {
                    Ok(bytes) => viewer
                        .borrow_mut()
                        .load_obj(ticket, &bytes, mtl_bytes.as_deref()),
                    Err(err) => viewer
                        .borrow_mut()
                        .finish_load(ticket, Err(LoadError::Fetch(err))),
                };
                match result {
                    Ok(()) => {
                        state.refresh(&viewer.borrow());
                        state.status.set(format!("{} loaded", name));
                    }
                    Err(err) => state.status.set(err.to_string()),
                }
                notify(&proxy);
            });
        }
    };

    let on_fov = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |ev| {
            if let Ok(fov) = event_target_value(&ev).parse::<f64>() {
                state.fov.set(fov);
                viewer.borrow_mut().set_fov(Some(fov));
                notify(&proxy);
            }
        }
    };

    let reset_fov = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |_| {
            viewer.borrow_mut().set_fov(None);
            state.refresh(&viewer.borrow());
            notify(&proxy);
        }
    };

    let reset_view = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |_| {
            if let Err(err) = viewer.borrow_mut().reset_view() {
                state.status.set(err.to_string());
            }
            state.refresh(&viewer.borrow());
            notify(&proxy);
        }
    };

    let reset_clipping = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |_| {
            if let Err(err) = viewer.borrow_mut().reset_clipping() {
                state.status.set(err.to_string());
            }
            state.refresh(&viewer.borrow());
            notify(&proxy);
        }
    };

    let toggle_notes = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |_| {
            let visible = !state.notes_visible.get_untracked();
            state.notes_visible.set(visible);
            viewer.borrow_mut().set_notes_visible(visible);
            notify(&proxy);
        }
    };

    let load_view_point = {
        let viewer = viewer.clone();
        let proxy = proxy.clone();
        move |_| {
            let applied = ViewPoint::from_json(&state.view_point_json.get_untracked())
                .and_then(|vp| viewer.borrow_mut().apply_view_point(vp));
            match applied {
                Ok(()) => {
                    state.refresh(&viewer.borrow());
                    state.status.set("view point applied".to_owned());
                }
                Err(err) => state.status.set(err.to_string()),
            }
            notify(&proxy);
        }
    };

    let save_view_point = {
        let viewer = viewer.clone();
        move |_| {
            let captured = viewer
                .borrow()
                .capture_view_point()
                .and_then(|vp| vp.to_json());
            match captured {
                Ok(json) => state.view_point_json.set(json),
                Err(err) => state.status.set(err.to_string()),
            }
        }
    };

    const BUTTON_CLASS_ATTR: &str =
        "w-full p-1 mt-2 rounded-full border border-emerald-600 bg-emerald-100 hover:bg-emerald-200";

    view! {
        <div class = "flex flex-wrap max-w-sm mt-10 mr-10 ml-4 gap-1">
            <input type = "file" node_ref = file_input id = "add" on:change = on_files accept = ".obj,.mtl" multiple class = "opacity-0 w-0"/>
            <label for = "add" class = "w-full">
                <svg viewBox="0 0 24 24" stroke-linecap ="round" class = "w-8 h-8 stroke-emerald-900 bg-emerald-100 stroke-1 hover:stroke-2 hover:bg-emerald-200 rounded-full"><line x1="12" y1="5" x2="12" y2="19"></line><line x1="5" y1="12" x2="19" y2="12"></line></svg>
            </label>
            <p class = "w-full text-xs text-gray-500">{move || state.status.get()}</p>

            <label class = "flex items-center w-full text-sm">
                <span class = "w-16">"FOV"</span>
                <input
                    type = "range"
                    class = "flex-1"
                    min = "0.1"
                    max = "179"
                    step = "0.1"
                    prop:value = move || state.fov.get().to_string()
                    on:input = on_fov
                />
                <span class = "w-12 text-right">{move || format!("{:.1}", state.fov.get())}</span>
            </label>
            {ClipFace::ALL
                .into_iter()
                .map(|face| view! { <ClipSlider face state viewer = viewer.clone() proxy = proxy.clone()/> })
                .collect_view()}

            <button class = BUTTON_CLASS_ATTR on:click = reset_fov>"Reset FOV"</button>
            <button class = BUTTON_CLASS_ATTR on:click = reset_view>"Reset view"</button>
            <button class = BUTTON_CLASS_ATTR on:click = reset_clipping>"Reset clipping"</button>
            <button class = BUTTON_CLASS_ATTR on:click = toggle_notes>
                {move || if state.notes_visible.get() { "Hide notes" } else { "Show notes" }}
            </button>

            <textarea
                class = "w-full h-40 mt-2 text-xs font-mono border rounded"
                prop:value = move || state.view_point_json.get()
                on:input = move |ev| state.view_point_json.set(event_target_value(&ev))
            />
            <button class = BUTTON_CLASS_ATTR on:click = load_view_point>"Load view point"</button>
            <button class = BUTTON_CLASS_ATTR on:click = save_view_point>"Save view point"</button>
        </div>
    }
}

#[component]
fn NoteLayer(labels: RwSignal<Vec<ScreenLabel>>) -> impl IntoView {
    view! {
        <div class = "absolute inset-0 pointer-events-none">
            {move || {
                labels
                    .get()
                    .into_iter()
                    .map(|label| {
                        let style = format!("left: {}px; top: {}px;", label.x, label.y);
                        view! {
                            <div class = "absolute whitespace-pre text-xs bg-white/80 px-1 rounded" style = style>
                                {label.text}
                            </div>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}

/// Translucent red disc over the orbit target while dragging.
#[component]
fn TargetMarker(marker: RwSignal<Option<ScreenMarker>>) -> impl IntoView {
    move || {
        marker.get().map(|m| {
            let style = format!(
                "left: {}px; top: {}px; width: {}px; height: {}px;",
                m.x - m.radius,
                m.y - m.radius,
                2.0 * m.radius,
                2.0 * m.radius
            );
            view! {
                <div class = "absolute pointer-events-none rounded-full bg-red-600/50" style = style></div>
            }
        })
    }
}

#[component]
pub fn App(
    canvas: NodeRef<html::Canvas>,
    viewer: ViewerWrapper,
    proxy: EventLoopProxy<ShellEvent>,
    labels: RwSignal<Vec<ScreenLabel>>,
    marker: RwSignal<Option<ScreenMarker>>,
) -> impl IntoView {
    view! {
        <div class = "flex w-full h-full flex-1">
            <div>
                <ControlPanel viewer proxy/>
            </div>
            <div class = "relative w-full h-full">
                <canvas node_ref = canvas class = "w-full h-full"/>
                <NoteLayer labels/>
                <TargetMarker marker/>
            </div>
        </div>
    }
}
