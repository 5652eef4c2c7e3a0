use anyhow::Result;
use cgmath::{Point2, Point3, Rotation, Vector3};
use std::{cell::RefCell, rc::Rc};

use crate::{
    config::ViewerConfig,
    error::{LoadError, ViewerError},
    loader,
};

use super::{
    camera::{CameraRig, PanKey},
    clip::{ClipFace, ClipPlaneSet},
    pick::{self, ScreenPoint},
    render::Renderer,
    scene::{wrap_label, NoteLabel, RawMesh, Scene},
    view_core::ViewCore,
    view_data::ViewData,
    view_point::{NoteRecord, ViewPoint, ViewPointCodec},
};

/// Which drag is in progress, with the last pointer position seen during it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MousePressed {
    Left(Option<ScreenPoint>),
    Right(Option<ScreenPoint>),
    None,
}

/// Identifies one model load. Only the most recent ticket may finish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    model_url: String,
}

impl LoadTicket {
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn model_url(&self) -> &str {
        &self.model_url
    }
}

/// A note label placed on screen, in pixels from the top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenLabel {
    pub name: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// The orbit target marker in pixels: centre and radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenMarker {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

struct LoadedModel {
    scene: Scene,
    clip: ClipPlaneSet,
}

/// Everything one viewport owns: the loaded model, its clip planes, the
/// camera and the GPU copies of the meshes.
pub struct ViewerSession {
    pub render: Rc<RefCell<Option<Renderer>>>,
    config: ViewerConfig,
    model: Option<LoadedModel>,
    model_url: Option<String>,
    generation: u64,
    view_point: Option<ViewPoint>,

    data: Vec<ViewData>,
    view_core: ViewCore,
    camera: CameraRig,

    width: f64,
    height: f64,
    current_pos: ScreenPoint,
    pub pressed_state: MousePressed,
    redraw: bool,
}

impl ViewerSession {
    pub fn new(render: Rc<RefCell<Option<Renderer>>>, config: ViewerConfig) -> Self {
        Self {
            render,
            camera: CameraRig::new(&config),
            config,
            model: None,
            model_url: None,
            generation: 0,
            view_point: None,
            data: vec![],
            view_core: ViewCore::default(),
            width: 1.0,
            height: 1.0,
            current_pos: ScreenPoint::new(0.0, 0.0),
            pressed_state: MousePressed::None,
            redraw: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[inline]
    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    #[inline]
    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.model.as_ref().map(|m| &m.scene)
    }

    pub fn clip(&self) -> Option<&ClipPlaneSet> {
        self.model.as_ref().map(|m| &m.clip)
    }

    /// The last view point applied, if any.
    #[inline]
    pub fn view_point(&self) -> Option<&ViewPoint> {
        self.view_point.as_ref()
    }

    fn loaded(&self) -> crate::error::Result<&LoadedModel> {
        self.model.as_ref().ok_or(ViewerError::ModelNotLoaded)
    }

    fn loaded_mut(&mut self) -> crate::error::Result<&mut LoadedModel> {
        self.model.as_mut().ok_or(ViewerError::ModelNotLoaded)
    }

    #[inline]
    fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Returns whether a frame is wanted and clears the request.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Starts a new load; any load still in flight becomes stale.
    pub fn begin_load(&mut self, model_url: &str) -> LoadTicket {
        self.generation += 1;
        leptos::logging::log!("loading model {} (load {})", model_url, self.generation);
        LoadTicket {
            generation: self.generation,
            model_url: model_url.to_owned(),
        }
    }

    /// Completes a load. Stale tickets and failed loads leave the current
    /// model untouched. On success the box is computed, clip planes go to
    /// their defaults and the default view is applied.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<Vec<RawMesh>, LoadError>,
    ) -> crate::error::Result<()> {
        if ticket.generation != self.generation {
            leptos::logging::warn!(
                "dropping load {} of {}, load {} is current",
                ticket.generation,
                ticket.model_url,
                self.generation
            );
            return Err(ViewerError::StaleLoad {
                ticket: ticket.generation,
                current: self.generation,
            });
        }
        let raw = result.map_err(|err| {
            leptos::logging::error!("failed to load {}: {}", ticket.model_url, err);
            err
        })?;

        let scene = Scene::from_raw(raw, self.config.hide_room_spaces);
        let bbox = scene.bbox();
        if !bbox.is_valid() {
            return Err(LoadError::EmptyModel.into());
        }
        let clip = ClipPlaneSet::new(bbox);
        let planes = clip.to_gpu();
        self.data = scene
            .meshes()
            .iter()
            .map(|mesh| ViewData::from_mesh(mesh, planes))
            .collect();
        self.model = Some(LoadedModel { scene, clip });
        self.model_url = Some(ticket.model_url);
        self.view_point = None;
        self.camera.apply_default_view(&bbox);
        self.request_redraw();
        Ok(())
    }

    /// Decodes an OBJ (and optional MTL) for `ticket` and finishes the load.
    pub fn load_obj(
        &mut self,
        ticket: LoadTicket,
        obj: &[u8],
        mtl: Option<&[u8]>,
    ) -> crate::error::Result<()> {
        let result = loader::parse_obj(obj, mtl);
        self.finish_load(ticket, result)
    }

    fn sync_clip_planes(&mut self) {
        if let Some(model) = self.model.as_ref() {
            let planes = model.clip.to_gpu();
            for data in self.data.iter_mut() {
                data.set_clip_planes(planes);
            }
        }
    }

    /// Loads a saved view: clip planes, camera and the view's notes.
    pub fn apply_view_point(&mut self, vp: ViewPoint) -> crate::error::Result<()> {
        let model = self.model.as_mut().ok_or(ViewerError::ModelNotLoaded)?;
        ViewPointCodec::load(&vp, &mut self.camera, &mut model.clip);

        if let Some(previous) = self.view_point.as_ref() {
            for (name, _) in previous.named_notes() {
                model.scene.remove_note(&name);
            }
        }
        let line_length = self.config.note_line_length;
        for (name, note) in vp.named_notes() {
            model.scene.insert_note(
                name,
                wrap_label(&note.text, line_length),
                Point3::from(note.position),
            );
        }

        self.view_point = Some(vp);
        self.sync_clip_planes();
        self.request_redraw();
        Ok(())
    }

    /// Frames the model and clears all clipping.
    pub fn apply_default_view(&mut self) -> crate::error::Result<()> {
        let model = self.loaded_mut()?;
        model.clip.reset();
        let bbox = *model.clip.bbox();
        self.camera.apply_default_view(&bbox);
        self.sync_clip_planes();
        self.request_redraw();
        Ok(())
    }

    pub fn reset_view(&mut self) -> crate::error::Result<()> {
        self.apply_default_view()
    }

    /// Current camera and clipping as a view point with empty metadata.
    pub fn capture_view_point(&self) -> crate::error::Result<ViewPoint> {
        let model = self.loaded()?;
        Ok(ViewPointCodec::save(&self.camera, &model.clip))
    }

    /// `None` restores the configured default.
    pub fn set_fov(&mut self, fov: Option<f64>) {
        self.camera.set_fov(fov);
        self.request_redraw();
    }

    /// Moves a clip face to `value` in plain axis coordinates.
    pub fn set_clip_offset(&mut self, face: ClipFace, value: f64) -> crate::error::Result<()> {
        self.loaded_mut()?.clip.set_offset(face, value);
        self.sync_clip_planes();
        self.request_redraw();
        Ok(())
    }

    pub fn clip_offset(&self, face: ClipFace) -> crate::error::Result<f64> {
        Ok(self.loaded()?.clip.offset(face))
    }

    pub fn clip_offset_range(&self, face: ClipFace) -> crate::error::Result<(f64, f64)> {
        Ok(self.loaded()?.clip.offset_range(face))
    }

    pub fn reset_clipping(&mut self) -> crate::error::Result<()> {
        self.loaded_mut()?.clip.reset();
        self.sync_clip_planes();
        self.request_redraw();
        Ok(())
    }

    pub fn set_mesh_visible(&mut self, idx: usize, visible: bool) -> crate::error::Result<()> {
        self.loaded_mut()?.scene.set_mesh_visible(idx, visible);
        if let Some(data) = self.data.get_mut(idx) {
            data.set_visible(visible);
        }
        self.request_redraw();
        Ok(())
    }

    /// First unclipped surface point under `point`, `Ok(None)` when there is
    /// none and the user has to try again.
    pub fn pick(&self, point: ScreenPoint) -> crate::error::Result<Option<Point3<f64>>> {
        let model = self.loaded()?;
        let ndc = point.to_ndc(self.width, self.height);
        let hit = pick::pick(ndc, &self.camera, &model.scene, &model.clip);
        if hit.is_none() {
            leptos::logging::log!("nothing visible under ({}, {})", point.x, point.y);
        }
        Ok(hit)
    }

    pub fn notes(&self) -> &[NoteLabel] {
        self.scene().map(|s| s.notes()).unwrap_or(&[])
    }

    /// Shows `note` under `name`, replacing any note of that name.
    pub fn insert_note(&mut self, name: String, note: &NoteRecord) -> crate::error::Result<()> {
        let line_length = self.config.note_line_length;
        self.loaded_mut()?.scene.insert_note(
            name,
            wrap_label(&note.text, line_length),
            Point3::from(note.position),
        );
        self.request_redraw();
        Ok(())
    }

    /// Places a new note on the surface under `point`. The returned record is
    /// what the data-access side stores; `Ok(None)` when nothing was hit.
    pub fn add_note_at(
        &mut self,
        point: ScreenPoint,
        text: &str,
    ) -> crate::error::Result<Option<NoteRecord>> {
        let Some(position) = self.pick(point)? else {
            return Ok(None);
        };
        let note = NoteRecord {
            url: None,
            text: text.to_owned(),
            position: position.into(),
            view_point: self.view_point.as_ref().and_then(|vp| vp.url.clone()),
        };
        self.insert_note(uuid::Uuid::new_v4().to_string(), &note)?;
        Ok(Some(note))
    }

    pub fn remove_note(&mut self, name: &str) -> bool {
        let removed = self
            .model
            .as_mut()
            .map(|m| m.scene.remove_note(name))
            .unwrap_or(false);
        if removed {
            self.request_redraw();
        }
        removed
    }

    pub fn set_notes_visible(&mut self, visible: bool) {
        if let Some(model) = self.model.as_mut() {
            model.scene.notes_visible = visible;
            self.request_redraw();
        }
    }

    /// Where each note label goes on screen. Hidden notes and notes behind
    /// the camera are left out.
    pub fn note_labels(&self) -> Vec<ScreenLabel> {
        let Some(scene) = self.scene() else {
            return vec![];
        };
        if !scene.notes_visible {
            return vec![];
        }
        scene
            .notes()
            .iter()
            .filter_map(|note| {
                let (x, y) = self.to_pixels(self.camera.project(note.position)?);
                Some(ScreenLabel {
                    name: note.name.clone(),
                    text: note.text.clone(),
                    x,
                    y,
                })
            })
            .collect()
    }

    #[inline]
    fn to_pixels(&self, ndc: Point2<f64>) -> (f64, f64) {
        (
            (ndc.x + 1.0) / 2.0 * self.width,
            (1.0 - ndc.y) / 2.0 * self.height,
        )
    }

    /// Centre and radius of the sphere marking the orbit target, shown only
    /// while a drag is in progress.
    pub fn target_marker(&self) -> Option<(Point3<f64>, f64)> {
        if self.pressed_state == MousePressed::None {
            return None;
        }
        let radius = self.camera.distance() * self.config.target_marker_scale;
        Some((self.camera.target(), radius))
    }

    pub fn target_marker_on_screen(&self) -> Option<ScreenMarker> {
        let (center, radius) = self.target_marker()?;
        let up = self.camera.orientation().rotate_vector(Vector3::unit_y());
        let (x, y) = self.to_pixels(self.camera.project(center)?);
        let (_, top) = self.to_pixels(self.camera.project(center + up * radius)?);
        Some(ScreenMarker {
            x,
            y,
            radius: (y - top).abs(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width as f64;
        self.height = height as f64;
        self.camera.set_aspect(self.width, self.height);
        if let Some(render) = self.render.borrow_mut().as_mut() {
            render.resize(width, height);
        }
        self.request_redraw();
    }

    pub fn mouse_down_left(&mut self) {
        self.pressed_state = MousePressed::Left(Some(self.current_pos));
        self.request_redraw();
    }

    pub fn mouse_down_right(&mut self) {
        self.pressed_state = MousePressed::Right(Some(self.current_pos));
        self.request_redraw();
    }

    pub fn mouse_up(&mut self) {
        if self.pressed_state != MousePressed::None {
            self.pressed_state = MousePressed::None;
            self.request_redraw();
        }
    }

    /// Left drag orbits, right drag pans.
    pub fn mouse_move(&mut self, pos: ScreenPoint) {
        self.current_pos = pos;
        let last = match &mut self.pressed_state {
            MousePressed::Left(last) | MousePressed::Right(last) => last.replace(pos),
            MousePressed::None => return,
        };
        let Some(last) = last else {
            return;
        };
        let (dx, dy) = (pos.x - last.x, pos.y - last.y);
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        match self.pressed_state {
            MousePressed::Left(_) => self.camera.orbit_by_pixels(dx, dy, self.height),
            MousePressed::Right(_) => self.camera.pan_by_pixels(dx, dy, self.height),
            MousePressed::None => {}
        }
        self.request_redraw();
    }

    /// Positive `delta_y` zooms in.
    pub fn mouse_scroll(&mut self, delta_y: f64) {
        if delta_y != 0.0 {
            self.camera.zoom(delta_y);
            self.request_redraw();
        }
    }

    pub fn key_pan(&mut self, key: PanKey) {
        self.camera.key_pan(key, self.height);
        self.request_redraw();
    }

    pub fn render(&mut self) -> Result<()> {
        if let Some(render) = self.render.borrow().as_ref() {
            let texture = render.surface.get_current_texture()?;
            let view = texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            let mut encoder = render
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: None,
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.config.clear_color()),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &render.depth_texture_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Discard,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                render_pass.set_viewport(0.0, 0.0, render.w() as f32, render.h() as f32, 0.0, 1.0);
                self.view_core
                    .render(render, &mut render_pass, &mut self.data, &self.camera);
            }
            render.queue.submit(std::iter::once(encoder.finish()));
            texture.present();
        } else {
            leptos::logging::log!("render is None");
        }
        Result::Ok(())
    }
}
