//! Stagemix is the composite/transition engine of a live multi-source video
//! mixer.
//!
//! It describes named two-layer layouts ([`Composite`]), precomputes smooth
//! spline-animated paths between them ([`Transition`], [`Transitions`]), and
//! delivers frame-accurate property keyframes to an external real-time
//! compositor ([`Scene`], [`CompositorSink`]). The [`CompositeController`]
//! ties it together: it tracks the live layout and turns every operator
//! command into an animated transition or a hard cut.
//!
//! The crate owns no pipeline, no clock and no configuration file format;
//! the embedder supplies a built-once [`MixConfig`], forwards playout times
//! into [`CompositeController::push_if_dirty`] and implements
//! [`CompositorSink`] over its mixing pipeline.
#![forbid(unsafe_code)]

pub mod command;
pub mod composite;
pub mod config;
pub mod controller;
pub mod foundation;
pub mod frame;
pub mod graph;
pub mod scene;
pub mod spline;
pub mod transition;

pub use command::CompositeCommand;
pub use composite::{Composite, CompositeAttribute, CompositeId, CompositeTable, Orientation};
pub use config::{BackgroundSource, MixConfig};
pub use controller::CompositeController;
pub use foundation::core::{Corner, Fps, Point, Rect, Size, Timestamp, Vec2};
pub use foundation::error::{StagemixError, StagemixResult};
pub use frame::{Edges, Frame, RectI};
pub use graph::Transitions;
pub use scene::{CompositorSink, Scene, SinkProperty};
pub use transition::Transition;
