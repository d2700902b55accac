use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::foundation::core::{Fps, Timestamp};
use crate::frame::Frame;

/// One animatable property of a source in the downstream compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SinkProperty {
    PosX,
    PosY,
    Width,
    Height,
    /// Opacity 0.0–1.0.
    Alpha,
    /// Stacking order; negative hides the source.
    ZOrder,
    CropTop,
    CropLeft,
    CropBottom,
    CropRight,
}

/// Keyframe consumer of the external real-time compositor.
///
/// [`Scene::push`] delivers every staged frame as a set of property keyframes
/// at an absolute stream time; the implementation is expected to hand them to
/// interpolation-free control bindings of the mixing pipeline.
pub trait CompositorSink {
    fn property(&mut self, source: &str, prop: SinkProperty, at: Timestamp, value: f64);
}

/// Per-source pending-keyframe buffer between the command path and the
/// compositor clock.
///
/// The command path stages frames with [`Scene::commit`]/[`Scene::set`]; the
/// compositor's once-per-output-frame callback drains them with
/// [`Scene::push`] at the current playout time. Both paths are plain `&mut`
/// arithmetic on this single-threaded type; an embedder that runs them on
/// separate threads must turn the staging-map/dirty pair into an atomic
/// hand-off (single-slot mailbox) itself.
#[derive(Clone, Debug)]
pub struct Scene {
    frames: BTreeMap<String, Option<Vec<Frame>>>,
    frame_duration: i64,
    dirty: bool,
}

impl Scene {
    /// Create a scene managing the given source roster.
    pub fn new<S: Into<String>>(sources: impl IntoIterator<Item = S>, fps: Fps) -> Self {
        Self {
            frames: sources.into_iter().map(|s| (s.into(), None)).collect(),
            frame_duration: fps.frame_duration_nanos(),
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    /// Stage a frame sequence for a source, replacing anything pending.
    pub fn commit(&mut self, source: &str, frames: Vec<Frame>) {
        let Some(slot) = self.frames.get_mut(source) else {
            warn!(source, "commit to unknown source ignored");
            return;
        };
        debug!(count = frames.len(), source, "commit frame(s)");
        *slot = Some(frames);
        self.dirty = true;
    }

    /// Stage a single frame for a source.
    pub fn set(&mut self, source: &str, frame: Frame) {
        self.commit(source, vec![frame]);
    }

    /// Deliver all staged frames to the sink, starting at `at` and spacing
    /// subsequent frames one output-frame duration apart. Sources without
    /// staged frames are driven invisible. Clears the staging buffers and the
    /// dirty flag; a clean scene is a no-op.
    pub fn push(&mut self, sink: &mut dyn CompositorSink, at: Timestamp) {
        if !self.dirty {
            return;
        }
        for (source, slot) in &mut self.frames {
            let frames = slot.take().unwrap_or_else(|| vec![Frame::hidden()]);
            debug!(
                count = frames.len(),
                source = %source,
                at_ms = at.as_millis(),
                "pushing frame(s)"
            );
            let mut time = at;
            for frame in &frames {
                let cropped = frame.cropped();
                let alpha = frame.float_alpha();
                let zorder = if alpha == 0.0 {
                    -1
                } else {
                    frame.zorder.unwrap_or(-1)
                };
                sink.property(source, SinkProperty::PosX, time, cropped.x0);
                sink.property(source, SinkProperty::PosY, time, cropped.y0);
                sink.property(source, SinkProperty::Width, time, cropped.x1 - cropped.x0);
                sink.property(source, SinkProperty::Height, time, cropped.y1 - cropped.y0);
                sink.property(source, SinkProperty::Alpha, time, alpha);
                sink.property(source, SinkProperty::ZOrder, time, f64::from(zorder));
                sink.property(source, SinkProperty::CropTop, time, f64::from(frame.crop.top));
                sink.property(
                    source,
                    SinkProperty::CropLeft,
                    time,
                    f64::from(frame.crop.left),
                );
                sink.property(
                    source,
                    SinkProperty::CropBottom,
                    time,
                    f64::from(frame.crop.bottom),
                );
                sink.property(
                    source,
                    SinkProperty::CropRight,
                    time,
                    f64::from(frame.crop.right),
                );
                time = time.advanced(self.frame_duration);
            }
        }
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RectI;

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<(String, SinkProperty, Timestamp, f64)>,
    }

    impl CompositorSink for RecordingSink {
        fn property(&mut self, source: &str, prop: SinkProperty, at: Timestamp, value: f64) {
            self.events.push((source.to_string(), prop, at, value));
        }
    }

    fn fps() -> Fps {
        Fps::new(25, 1).unwrap()
    }

    fn visible_frame() -> Frame {
        Frame {
            rect: RectI::new(0, 0, 960, 540),
            zorder: Some(100),
            ..Frame::default()
        }
    }

    #[test]
    fn push_spaces_timestamps_by_frame_duration() {
        let mut scene = Scene::new(["cam1", "cam2"], fps());
        scene.commit("cam1", vec![visible_frame(); 3]);
        let mut sink = RecordingSink::default();
        scene.push(&mut sink, Timestamp::from_millis(1000));

        let times: Vec<i64> = sink
            .events
            .iter()
            .filter(|(s, p, _, _)| s == "cam1" && *p == SinkProperty::PosX)
            .map(|(_, _, t, _)| t.0)
            .collect();
        assert_eq!(
            times,
            vec![1_000_000_000, 1_040_000_000, 1_080_000_000]
        );
        assert!(!scene.is_dirty());
    }

    #[test]
    fn unstaged_source_is_driven_invisible() {
        let mut scene = Scene::new(["cam1", "cam2"], fps());
        scene.set("cam1", visible_frame());
        let mut sink = RecordingSink::default();
        scene.push(&mut sink, Timestamp(0));

        let cam2_z: Vec<f64> = sink
            .events
            .iter()
            .filter(|(s, p, _, _)| s == "cam2" && *p == SinkProperty::ZOrder)
            .map(|(_, _, _, v)| *v)
            .collect();
        assert_eq!(cam2_z, vec![-1.0]);
        let cam2_alpha: Vec<f64> = sink
            .events
            .iter()
            .filter(|(s, p, _, _)| s == "cam2" && *p == SinkProperty::Alpha)
            .map(|(_, _, _, v)| *v)
            .collect();
        assert_eq!(cam2_alpha, vec![0.0]);
    }

    #[test]
    fn clean_scene_push_is_noop() {
        let mut scene = Scene::new(["cam1"], fps());
        let mut sink = RecordingSink::default();
        scene.push(&mut sink, Timestamp(0));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn push_clears_staged_frames() {
        let mut scene = Scene::new(["cam1"], fps());
        scene.set("cam1", visible_frame());
        let mut sink = RecordingSink::default();
        scene.push(&mut sink, Timestamp(0));
        let first = sink.events.len();

        // second push is clean again
        scene.push(&mut sink, Timestamp::from_millis(40));
        assert_eq!(sink.events.len(), first);
    }

    #[test]
    fn unknown_source_commit_is_ignored() {
        let mut scene = Scene::new(["cam1"], fps());
        scene.set("nosuch", visible_frame());
        assert!(!scene.is_dirty());
    }

    #[test]
    fn zorder_is_hidden_for_transparent_frames() {
        let mut scene = Scene::new(["cam1"], fps());
        let mut frame = visible_frame();
        frame.alpha = 0;
        scene.set("cam1", frame);
        let mut sink = RecordingSink::default();
        scene.push(&mut sink, Timestamp(0));
        let z: Vec<f64> = sink
            .events
            .iter()
            .filter(|(_, p, _, _)| *p == SinkProperty::ZOrder)
            .map(|(_, _, _, v)| *v)
            .collect();
        assert_eq!(z, vec![-1.0]);
    }
}
