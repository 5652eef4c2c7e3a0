#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::Result;
    use leptos::html::Canvas;
    use leptos::mount::mount_to_body;
    use leptos::prelude::*;
    use leptos::task::spawn_local;
    use nwview::render::render::{PendingRenderer, Renderer};
    use nwview::ui::{App, ShellEvent};
    use nwview::{
        PanKey, ScreenLabel, ScreenMarker, ScreenPoint, ViewerConfig, ViewerSession, ViewerWrapper,
    };
    use send_wrapper::SendWrapper;
    use web_sys::HtmlCanvasElement;
    use winit::application::ApplicationHandler;
    use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
    use winit::keyboard::{Key, NamedKey};
    use winit::platform::web::{EventLoopExtWebSys, WindowAttributesExtWebSys};
    use winit::window::Window;

    struct WinitApp {
        window: Option<Window>,
        canvas: HtmlCanvasElement,
        viewer: Rc<RefCell<ViewerSession>>,
        proxy: EventLoopProxy<ShellEvent>,
        labels: RwSignal<Vec<ScreenLabel>>,
        marker: RwSignal<Option<ScreenMarker>>,
        pending: Rc<PendingRenderer>,
    }

    impl WinitApp {
        /// Asks for a frame only when the session changed since the last one.
        fn poll_redraw(&self) {
            if self.viewer.borrow_mut().take_redraw_request() {
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
        }

        fn redraw(&self) {
            if let Err(msg) = self.viewer.borrow_mut().render() {
                leptos::logging::error!("failed to render because {:?}", msg);
            }
            let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
            let viewer = self.viewer.borrow();
            self.marker.set(viewer.target_marker_on_screen().map(|mut m| {
                m.x /= scale;
                m.y /= scale;
                m.radius /= scale;
                m
            }));
            let labels = viewer
                .note_labels()
                .into_iter()
                .map(|mut label| {
                    label.x /= scale;
                    label.y /= scale;
                    label
                })
                .collect();
            self.labels.set(labels);
        }

        fn create_renderer(&self, width: u32, height: u32) {
            if !self.pending.begin(width, height) {
                return;
            }
            let pending = self.pending.clone();
            let canvas = self.canvas.clone();
            let viewer = self.viewer.clone();
            let proxy = self.proxy.clone();
            spawn_local(async move {
                let created = Renderer::new(canvas, width, height).await;
                let (width, height) = pending.finish().unwrap_or((width, height));
                match created {
                    Ok(r) => {
                        viewer.borrow().render.borrow_mut().replace(r);
                        viewer.borrow_mut().resize(width, height);
                        if proxy.send_event(ShellEvent::SessionChanged).is_err() {
                            leptos::logging::warn!("event loop is gone");
                        }
                    }
                    Err(e) => {
                        leptos::logging::error!("create renderer failed by {:?}", e);
                    }
                }
            })
        }
    }

    impl ApplicationHandler<ShellEvent> for WinitApp {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            match event_loop
                .create_window(Window::default_attributes().with_canvas(Some(self.canvas.clone())))
            {
                Ok(window) => self.window = Some(window),
                Err(err) => leptos::logging::error!("create window failed: {}", err),
            }
        }

        fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ShellEvent) {
            match event {
                ShellEvent::SessionChanged => self.poll_redraw(),
            }
        }

        fn window_event(
            &mut self,
            _event_loop: &ActiveEventLoop,
            _window_id: winit::window::WindowId,
            event: WindowEvent,
        ) {
            match event {
                WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                    let key = match event.logical_key {
                        Key::Named(NamedKey::ArrowUp) => Some(PanKey::Up),
                        Key::Named(NamedKey::ArrowDown) => Some(PanKey::Down),
                        Key::Named(NamedKey::ArrowLeft) => Some(PanKey::Left),
                        Key::Named(NamedKey::ArrowRight) => Some(PanKey::Right),
                        _ => None,
                    };
                    if let Some(key) = key {
                        self.viewer.borrow_mut().key_pan(key);
                    }
                }

                WindowEvent::CursorMoved { position, .. } => {
                    self.viewer
                        .borrow_mut()
                        .mouse_move(ScreenPoint::new(position.x, position.y));
                }

                WindowEvent::MouseInput { state, button, .. } => match state {
                    ElementState::Pressed => match button {
                        MouseButton::Left => self.viewer.borrow_mut().mouse_down_left(),
                        MouseButton::Right => self.viewer.borrow_mut().mouse_down_right(),
                        _ => {}
                    },
                    ElementState::Released => self.viewer.borrow_mut().mouse_up(),
                },

                WindowEvent::MouseWheel { delta, .. } => match delta {
                    MouseScrollDelta::LineDelta(_, y) => {
                        self.viewer.borrow_mut().mouse_scroll(y as f64);
                    }
                    MouseScrollDelta::PixelDelta(size) => {
                        self.viewer.borrow_mut().mouse_scroll(size.y);
                    }
                },

                WindowEvent::RedrawRequested => self.redraw(),

                WindowEvent::Resized(size) => {
                    let has_renderer = self.viewer.borrow().render.borrow().is_some();
                    if has_renderer {
                        self.viewer.borrow_mut().resize(size.width, size.height);
                    } else {
                        self.create_renderer(size.width, size.height);
                    }
                }
                _ => {}
            }
            self.poll_redraw();
        }
    }

    pub fn run() -> Result<()> {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config = ViewerConfig::default();
        let render: Rc<RefCell<Option<Renderer>>> = Default::default();
        let viewer = Rc::new(RefCell::new(ViewerSession::new(render, config)));
        let viewer_wrapper: ViewerWrapper = SendWrapper::new(viewer.clone());

        let event_loop = EventLoop::<ShellEvent>::with_user_event().build()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        let proxy = event_loop.create_proxy();

        let canvas: NodeRef<Canvas> = NodeRef::new();
        let labels = RwSignal::new(Vec::<ScreenLabel>::new());
        let marker = RwSignal::new(None::<ScreenMarker>);
        {
            let proxy = proxy.clone();
            mount_to_body(move || {
                view! { <App canvas viewer = viewer_wrapper.clone() proxy = proxy.clone() labels marker/> }
            });
        }
        let canvas = canvas
            .get_untracked()
            .ok_or(anyhow::anyhow!("canvas was not mounted"))?;
        leptos::logging::log!("mounted");

        event_loop.spawn_app(WinitApp {
            window: None,
            canvas,
            viewer,
            proxy,
            labels,
            marker,
            pending: Rc::new(PendingRenderer::default()),
        });
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
fn main() -> anyhow::Result<()> {
    web::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    leptos::logging::log!("nwview runs in the browser, build it for wasm32-unknown-unknown");
}
