//! Reference client: network session, snapshot interpolation, frame and input loops

pub mod frame;
pub mod input;
pub mod interpolation;
pub mod session;

pub use frame::{FrameLoop, FrameMode, RenderSink};
pub use input::InputCapture;
pub use interpolation::{InterpolatedState, Reconciler};
pub use session::{ClientError, ClientSession};
