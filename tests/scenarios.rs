//! End-to-end layout switching scenarios: controller command in, compositor
//! keyframes out.

use stagemix::{
    BackgroundSource, CompositeController, CompositorSink, Fps, MixConfig, SinkProperty, Size,
    Timestamp,
};

#[derive(Default)]
struct RecordingSink {
    events: Vec<(String, SinkProperty, Timestamp, f64)>,
}

impl RecordingSink {
    fn values(&self, source: &str, prop: SinkProperty) -> Vec<f64> {
        self.events
            .iter()
            .filter(|(s, p, _, _)| s == source && *p == prop)
            .map(|(_, _, _, v)| *v)
            .collect()
    }

    fn times(&self, source: &str, prop: SinkProperty) -> Vec<i64> {
        self.events
            .iter()
            .filter(|(s, p, _, _)| s == source && *p == prop)
            .map(|(_, _, t, _)| t.0)
            .collect()
    }
}

impl CompositorSink for RecordingSink {
    fn property(&mut self, source: &str, prop: SinkProperty, at: Timestamp, value: f64) {
        self.events.push((source.to_string(), prop, at, value));
    }
}

fn items(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn config(transitions: &[(&str, &str)], backgrounds: Vec<BackgroundSource>) -> MixConfig {
    MixConfig {
        resolution: Size::new(1920.0, 1080.0),
        fps: Fps::new(25, 1).unwrap(),
        sources: vec!["cam1".into(), "cam2".into()],
        backgrounds,
        composites: items(&[
            ("fs.a", "*"),
            ("fs.b", "*"),
            ("fs.alpha-b", "0"),
            ("fs.noswap", "yes"),
            ("sbs.a", "0/0 0.5x1.0"),
            ("sbs.b", "0.5/0.0 0.5x1.0"),
        ]),
        transitions: items(transitions),
    }
}

/// Drain the initial hard cut the controller stages at construction.
fn settled(controller: &mut CompositeController) {
    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp(0));
}

#[test]
fn hard_cut_without_registered_transition() {
    let mut controller = CompositeController::new(&config(&[], vec![])).unwrap();
    settled(&mut controller);

    controller.set_composite_ex(Some("sbs"), Some("cam1"), Some("cam2"), true);
    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp::from_millis(2000));

    // one frame per source: cam1 takes the left half below, cam2 the right
    // half above
    assert_eq!(sink.values("cam1", SinkProperty::PosX), vec![0.0]);
    assert_eq!(sink.values("cam1", SinkProperty::Width), vec![960.0]);
    assert_eq!(sink.values("cam1", SinkProperty::ZOrder), vec![100.0]);
    assert_eq!(sink.values("cam2", SinkProperty::PosX), vec![960.0]);
    assert_eq!(sink.values("cam2", SinkProperty::Width), vec![960.0]);
    assert_eq!(sink.values("cam2", SinkProperty::ZOrder), vec![101.0]);
}

#[test]
fn registered_transition_animates_the_switch() {
    let mut controller =
        CompositeController::new(&config(&[("def", "500, fs / sbs")], vec![])).unwrap();
    settled(&mut controller);

    controller.set_composite_ex(Some("sbs"), Some("cam1"), Some("cam2"), true);
    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp::from_millis(2000));

    // 500ms at 25fps lands at 12 animation frames
    let widths = sink.values("cam1", SinkProperty::Width);
    assert_eq!(widths.len(), 12);
    // frame 0 is fs's A keyframe, the last frame sbs's A keyframe
    assert_eq!(widths[0], 1920.0);
    assert_eq!(*widths.last().unwrap(), 960.0);
    let xs = sink.values("cam1", SinkProperty::PosX);
    assert_eq!(xs[0], 0.0);
    assert_eq!(*xs.last().unwrap(), 0.0);
    // B slides in from fs's hidden frame to the right half
    let b_widths = sink.values("cam2", SinkProperty::Width);
    assert_eq!(b_widths.len(), 12);
    assert_eq!(*b_widths.last().unwrap(), 960.0);
    let b_alphas = sink.values("cam2", SinkProperty::Alpha);
    assert_eq!(b_alphas[0], 0.0);
    assert_eq!(*b_alphas.last().unwrap(), 1.0);
}

#[test]
fn push_timestamps_are_strictly_spaced_by_frame_duration() {
    let mut controller =
        CompositeController::new(&config(&[("def", "500, fs / sbs")], vec![])).unwrap();
    settled(&mut controller);

    controller.set_composite_ex(Some("sbs"), None, None, true);
    let mut sink = RecordingSink::default();
    let base = Timestamp::from_millis(3000);
    controller.push_if_dirty(&mut sink, base);

    let times = sink.times("cam1", SinkProperty::PosX);
    assert_eq!(times.len(), 12);
    let delta = 1_000_000_000 / 25;
    for (i, t) in times.iter().enumerate() {
        assert_eq!(*t, base.0 + i as i64 * delta);
    }
}

#[test]
fn push_is_idempotent_until_new_state_is_committed() {
    let mut controller = CompositeController::new(&config(&[], vec![])).unwrap();
    settled(&mut controller);

    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp::from_millis(40));
    assert!(sink.events.is_empty());

    controller.set_composite_ex(Some("sbs"), None, None, false);
    controller.push_if_dirty(&mut sink, Timestamp::from_millis(80));
    assert!(!sink.events.is_empty());
}

#[test]
fn background_cuts_and_fades_with_the_composite() {
    let backgrounds = vec![
        BackgroundSource {
            name: "bg".into(),
            composites: None,
        },
        BackgroundSource {
            name: "bg-side".into(),
            composites: Some(vec!["sbs".into()]),
        },
    ];
    let mut controller =
        CompositeController::new(&config(&[("def", "500, fs / sbs")], backgrounds)).unwrap();

    // the initial hard cut selects fs's background outright
    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp(0));
    assert_eq!(sink.values("bg", SinkProperty::ZOrder), vec![0.0]);

    // an animated switch fades the new background in over the transition
    controller.set_composite_ex(Some("sbs"), None, None, true);
    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp::from_millis(1000));

    let fade = sink.values("bg-side", SinkProperty::Alpha);
    assert_eq!(fade.len(), 12);
    assert_eq!(fade[0], 0.0);
    assert!(*fade.last().unwrap() > 0.9);
    assert!(fade.windows(2).all(|w| w[0] <= w[1]));
    // the old background stays put below while the new one fades in above
    assert_eq!(sink.values("bg", SinkProperty::ZOrder), vec![0.0]);
    assert_eq!(
        sink.values("bg-side", SinkProperty::ZOrder),
        vec![1.0; 12]
    );
}

#[test]
fn unused_sources_are_driven_invisible() {
    let mut cfg = config(&[], vec![]);
    cfg.sources.push("cam3".into());
    let mut controller = CompositeController::new(&cfg).unwrap();

    let mut sink = RecordingSink::default();
    controller.push_if_dirty(&mut sink, Timestamp(0));
    assert_eq!(sink.values("cam3", SinkProperty::ZOrder), vec![-1.0]);
    assert_eq!(sink.values("cam3", SinkProperty::Alpha), vec![0.0]);
}

#[test]
fn textual_commands_drive_the_controller() {
    let mut controller = CompositeController::new(&config(&[], vec![])).unwrap();
    settled(&mut controller);

    controller.set_composite("sbs(cam2,cam1)", false).unwrap();
    assert_eq!(controller.current().to_string(), "sbs(cam2,cam1)");

    // wildcards keep the current slots
    controller.set_composite("fs(*,*)", false).unwrap();
    assert_eq!(controller.current().to_string(), "fs(cam2,cam1)");

    assert!(controller.set_composite("((bad", false).is_err());
}

#[test]
fn malformed_rect_fails_construction_naming_the_composite() {
    let mut cfg = config(&[], vec![]);
    cfg.composites.push(("pip.a".into(), "abc".into()));
    let err = CompositeController::new(&cfg).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("pip"), "{msg}");
    assert!(msg.contains("abc"), "{msg}");
}
