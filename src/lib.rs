pub mod config;
pub mod error;
pub mod loader;
pub mod render;
#[cfg(target_arch = "wasm32")]
pub mod ui;

pub use config::ViewerConfig;
pub use error::{LoadError, ViewerError};
pub use render::{
    camera::{CameraCapture, CameraRig, CameraState, PanKey},
    clip::{ClipFace, ClipPlane, ClipPlaneSet, ExternalClip},
    pick::{Ray, ScreenPoint},
    scene::{RawMesh, Scene},
    view_point::{NoteRecord, ViewPoint, ViewPointCodec},
    viewer::{LoadTicket, ScreenLabel, ScreenMarker, ViewerSession},
    BBox,
};

#[cfg(target_arch = "wasm32")]
pub type ViewerWrapper =
    send_wrapper::SendWrapper<std::rc::Rc<std::cell::RefCell<ViewerSession>>>;
