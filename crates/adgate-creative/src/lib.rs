//! AdGate Creative Handling
//!
//! Gates and renders operator-authored ad creatives:
//! - `validator`: static allow-list analysis of third-party markup before
//!   it is ever inserted into a document
//! - `renderer`: mounts validated markup and re-creates embedded script
//!   elements so they actually execute
//!
//! Only markup creatives carry executable content; static images and
//! provider slides are inert by construction.

mod creative;
mod markup;
mod renderer;
mod validator;

pub use creative::{Creative, SlideFormat};
pub use markup::{segment_markup, ScriptDescriptor, Segment};
pub use renderer::{CreativeHost, HostFault, RenderError, RenderPlan, SafeRenderer};
pub use validator::{ContentValidator, ValidationResult};
