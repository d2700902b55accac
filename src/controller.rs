use std::collections::BTreeSet;

use tracing::{debug, error, info, warn};

use crate::command::CompositeCommand;
use crate::composite::{Composite, CompositeId, CompositeTable};
use crate::config::MixConfig;
use crate::foundation::core::Timestamp;
use crate::foundation::error::{StagemixError, StagemixResult};
use crate::frame::{Frame, RectI};
use crate::graph::Transitions;
use crate::scene::{CompositorSink, Scene};
use crate::transition::{Transition, fade_alpha};

/// Stacking order of the A channel during normal layering.
const BELOW: i32 = 100;
/// Stacking order of the B channel during normal layering.
const ABOVE: i32 = 101;

/// The current-layout state machine.
///
/// Holds the composite table and transition pool built from configuration,
/// tracks which composite and sources are live, and turns every layout
/// request into either an animated transition or a hard cut committed to the
/// owned scenes. Unknown names never fail a call; they log and leave the
/// state untouched.
#[derive(Debug)]
pub struct CompositeController {
    config: MixConfig,
    composites: CompositeTable,
    transitions: Transitions,
    scene: Scene,
    bg_scene: Scene,
    composite: Option<CompositeId>,
    source_a: Option<String>,
    source_b: Option<String>,
}

/// A fully resolved layout request: wildcards filled, hidden-channel sources
/// reconciled, transition solved (or not).
struct ResolvedRequest {
    composite: Composite,
    a: String,
    b: String,
    /// Sources the A/B channel frame lists are committed to; differ from
    /// `a`/`b` when a reversed transition drives the channels crosswise.
    target_a: String,
    target_b: String,
    transition: Option<Transition>,
}

impl CompositeController {
    /// Build tables, scenes and the initial state from the configuration:
    /// the first target composite over the first two sources, staged as a
    /// hard cut.
    pub fn new(config: &MixConfig) -> StagemixResult<Self> {
        config.validate()?;
        let composites = CompositeTable::configure(&config.composites, config.resolution)?;
        let transitions = Transitions::configure(&config.transitions, &composites, config.fps)?;
        info!(
            composites = composites.len(),
            transitions = transitions.count(),
            sources = config.sources.len(),
            "configuring mixer"
        );
        let first_target = composites
            .targets()
            .first()
            .map(|c| c.id.to_string())
            .ok_or_else(|| StagemixError::configuration("no target composites configured"))?;
        let scene = Scene::new(config.sources.iter().cloned(), config.fps);
        let bg_scene = Scene::new(config.backgrounds.iter().map(|b| b.name.clone()), config.fps);

        let mut controller = Self {
            config: config.clone(),
            composites,
            transitions,
            scene,
            bg_scene,
            composite: None,
            source_a: None,
            source_b: None,
        };
        let a = controller.config.sources[0].clone();
        let b = controller.config.sources[1].clone();
        controller.set_composite_ex(
            Some(first_target.as_str()),
            Some(a.as_str()),
            Some(b.as_str()),
            false,
        );
        Ok(controller)
    }

    /// Switch to a new layout. Omitted arguments are filled from the current
    /// state; a fill-in that would alias A and B swaps the channels instead.
    /// With `use_transitions`, a matching animated path is committed when one
    /// exists, otherwise the switch is a hard cut.
    pub fn set_composite_ex(
        &mut self,
        new_composite: Option<&str>,
        new_a: Option<&str>,
        new_b: Option<&str>,
        use_transitions: bool,
    ) {
        info!(
            composite = new_composite.unwrap_or("*"),
            a = new_a.unwrap_or("*"),
            b = new_b.unwrap_or("*"),
            "request to set composite"
        );
        let Some(req) = self.resolve_request(new_composite, new_a, new_b, use_transitions) else {
            return;
        };

        match &req.transition {
            Some(t) => {
                debug!(name = %t.name(), "committing transition to scene");
                self.scene.commit(&req.target_a, t.a_frames(BELOW, ABOVE));
                self.scene.commit(&req.target_b, t.b_frames(ABOVE, BELOW));
            }
            None => {
                debug!(composite = %req.composite.id, "setting composite to scene");
                self.scene.set(&req.target_a, req.composite.a_at(BELOW));
                self.scene.set(&req.target_b, req.composite.b_at(ABOVE));
            }
        }
        let others: Vec<String> = self
            .config
            .sources
            .iter()
            .filter(|s| **s != req.target_a && **s != req.target_b)
            .cloned()
            .collect();
        for source in others {
            debug!(source = %source, "making source invisible");
            self.scene.set(&source, Frame::hidden());
        }

        self.apply_background(&req);

        self.composite = Some(req.composite.id.clone());
        self.source_a = Some(req.a);
        self.source_b = Some(req.b);
    }

    /// Parse and apply a textual `composite(A,B)` command.
    pub fn set_composite(&mut self, command: &str, use_transitions: bool) -> StagemixResult<()> {
        let command: CompositeCommand = command.parse()?;
        debug!(%command, "setting composite by command");
        self.set_composite_ex(
            command.composite.as_deref(),
            command.a.as_deref(),
            command.b.as_deref(),
            use_transitions,
        );
        Ok(())
    }

    /// Report whether a command would animate rather than cut, without
    /// touching any state.
    pub fn probe_transition(&self, command: &str) -> StagemixResult<bool> {
        let command: CompositeCommand = command.parse()?;
        Ok(self
            .resolve_request(
                command.composite.as_deref(),
                command.a.as_deref(),
                command.b.as_deref(),
                true,
            )
            .is_some_and(|r| r.transition.is_some()))
    }

    /// Push pending scene state at the current playout time. Call once per
    /// rendered output frame from the compositor's clock callback.
    pub fn push_if_dirty(&mut self, sink: &mut dyn CompositorSink, at: Timestamp) {
        if self.bg_scene.is_dirty() {
            debug!(at_ms = at.as_millis(), "applying new background state");
            self.bg_scene.push(sink, at);
        }
        if self.scene.is_dirty() {
            debug!(at_ms = at.as_millis(), "applying new mixer state");
            self.scene.push(sink, at);
        }
    }

    pub fn composite_name(&self) -> Option<String> {
        self.composite.as_ref().map(|id| id.to_string())
    }

    pub fn source_a(&self) -> Option<&str> {
        self.source_a.as_deref()
    }

    pub fn source_b(&self) -> Option<&str> {
        self.source_b.as_deref()
    }

    /// The current state as a `composite(A,B)` command.
    pub fn current(&self) -> CompositeCommand {
        CompositeCommand::new(
            self.composite_name(),
            self.source_a.clone(),
            self.source_b.clone(),
        )
    }

    fn resolve_request(
        &self,
        new_composite: Option<&str>,
        new_a: Option<&str>,
        new_b: Option<&str>,
        use_transitions: bool,
    ) -> Option<ResolvedRequest> {
        let current = self.composite.as_ref().map(|id| id.to_string());
        let cur_a = self.source_a.clone();
        let cur_b = self.source_b.clone();

        let mut name = new_composite.map(str::to_string);
        let mut a = new_a.map(str::to_string);
        let mut b = new_b.map(str::to_string);

        // Fill wildcards from the current state. Requesting the current A as
        // the new B (or vice versa) swaps the channels rather than aliasing
        // them.
        if let Some(cur_name) = &current {
            if name.is_none() || a.is_none() || b.is_none() {
                if name.is_none() {
                    name = Some(cur_name.clone());
                }
                if a.is_none() {
                    a = if b != cur_a { cur_a.clone() } else { cur_b.clone() };
                }
                if b.is_none() {
                    b = if a == cur_b { cur_a.clone() } else { cur_b.clone() };
                }
                debug!(
                    composite = name.as_deref().unwrap_or("*"),
                    a = a.as_deref().unwrap_or("*"),
                    b = b.as_deref().unwrap_or("*"),
                    "completed wildcarded composite"
                );
            }
        }

        let (Some(name), Some(mut a), Some(mut b)) = (name, a, b) else {
            error!("incomplete composite request and no current state to fill it from");
            return None;
        };
        assert_ne!(a, b, "channels A and B must not resolve to the same source");

        let Some(new_comp) = self.composites.get(&name) else {
            error!(composite = %name, "unknown composite");
            return None;
        };
        if !self.config.sources.contains(&a) {
            error!(source = %a, "unknown source");
            return None;
        }
        if !self.config.sources.contains(&b) {
            error!(source = %b, "unknown source");
            return None;
        }

        let mut transition = None;
        let mut target_a = a.clone();
        let mut target_b = b.clone();

        if use_transitions {
            if let (Some(cur_id), Some(mut cur_a), Some(mut cur_b)) =
                (self.composite.as_ref(), cur_a, cur_b)
            {
                if let Some(cur_comp) = self.composites.resolve(cur_id) {
                    let old = (cur_a.clone(), cur_b.clone(), a.clone(), b.clone());
                    let distinct: BTreeSet<&str> =
                        [&old.0, &old.1, &old.2, &old.3].map(String::as_str).into();

                    // Three or four distinct sources cannot transition as-is;
                    // when a composite hides its B channel, the hidden source
                    // can be relabeled to make the jump solvable.
                    if distinct.len() == 3 {
                        if cur_comp.covered() {
                            debug!("current composite hides channel B, relabeling it");
                            if cur_a == a {
                                cur_b = b.clone();
                            } else if cur_a == b {
                                cur_b = a.clone();
                            } else if new_comp.covered() {
                                b = cur_a.clone();
                                cur_b = a.clone();
                            }
                        } else if new_comp.covered() {
                            if cur_a == a {
                                b = cur_b.clone();
                            }
                            if cur_b == a {
                                b = cur_a.clone();
                            }
                        }
                    } else if distinct.len() == 4 && cur_comp.covered() && new_comp.covered() {
                        debug!("both composites hide channel B, exchanging the hidden sources");
                        cur_b = a.clone();
                        b = cur_a.clone();
                    }
                    if old != (cur_a.clone(), cur_b.clone(), a.clone(), b.clone()) {
                        info!(
                            from = %format!("({},{}) -> ({},{})", old.0, old.1, old.2, old.3),
                            to = %format!("({cur_a},{cur_b}) -> ({a},{b})"),
                            "changed requested transition channels"
                        );
                    }

                    target_a = a.clone();
                    target_b = b.clone();
                    if (cur_a.as_str(), cur_b.as_str()) == (a.as_str(), b.as_str()) {
                        if *cur_id != new_comp.id {
                            transition = self
                                .transitions
                                .solve(&cur_comp, &new_comp, false)
                                .map(|(t, _)| t);
                        }
                    } else if (cur_a.as_str(), cur_b.as_str()) == (b.as_str(), a.as_str()) {
                        if let Some((t, swap)) = self.transitions.solve(&cur_comp, &new_comp, true)
                        {
                            if !swap {
                                target_a = b.clone();
                                target_b = a.clone();
                            }
                            transition = Some(t);
                        }
                    }
                    if transition.is_none() {
                        warn!(
                            from = %cur_comp.id,
                            to = %new_comp.id,
                            "no transition found, falling back to hard cut"
                        );
                    }
                }
            }
        }

        Some(ResolvedRequest {
            composite: new_comp,
            a,
            b,
            target_a,
            target_b,
            transition,
        })
    }

    /// Switch the background layer to the one the new composite wants: fade
    /// it in over a transition, cut otherwise.
    fn apply_background(&mut self, req: &ResolvedRequest) {
        let cur_bg = self
            .composite
            .as_ref()
            .and_then(|id| self.config.background_for(&id.to_string()))
            .map(str::to_string);
        let new_bg = self
            .config
            .background_for(&req.composite.id.to_string())
            .map(str::to_string);
        if cur_bg == new_bg {
            return;
        }
        let Some(new_bg) = new_bg else {
            return;
        };

        let full = Frame {
            rect: RectI::new(
                0,
                0,
                self.config.resolution.width as i32,
                self.config.resolution.height as i32,
            ),
            key: true,
            ..Frame::default()
        };
        match &req.transition {
            Some(t) => {
                debug!(background = %new_bg, "committing background fade to scene");
                // keep the old background below while the new one fades in
                // above it
                if let Some(cur_bg) = &cur_bg {
                    self.bg_scene.set(cur_bg, full.at_zorder(0));
                }
                let mut start = full.at_zorder(1);
                start.alpha = 0;
                self.bg_scene.commit(&new_bg, fade_alpha(&start, 255, t.frames()));
            }
            None => {
                debug!(background = %new_bg, "setting new background to scene");
                self.bg_scene.set(&new_bg, full.at_zorder(0));
            }
        }
        let others: Vec<String> = self
            .config
            .backgrounds
            .iter()
            .map(|b| b.name.clone())
            .filter(|name| Some(name) != cur_bg.as_ref() && *name != new_bg)
            .collect();
        for bg in others {
            debug!(background = %bg, "making background source invisible");
            self.bg_scene.set(&bg, Frame::hidden());
        }
    }
}
