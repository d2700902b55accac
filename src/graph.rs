use std::fmt;

use tracing::{debug, warn};

use crate::composite::{Composite, CompositeTable};
use crate::foundation::core::Fps;
use crate::foundation::error::{StagemixError, StagemixResult};
use crate::transition::Transition;

/// The pool of precomputed transitions between target composites, with the
/// lookup logic that matches a requested layout change against it.
///
/// Solve queries never mutate the pool.
#[derive(Clone, Debug)]
pub struct Transitions {
    transitions: Vec<Transition>,
    targets: Vec<Composite>,
    pub fps: Fps,
}

impl Transitions {
    pub fn new(targets: Vec<Composite>, fps: Fps) -> Self {
        Self {
            transitions: Vec::new(),
            targets,
            fps,
        }
    }

    pub fn count(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn targets(&self) -> &[Composite] {
        &self.targets
    }

    /// Add a transition to the pool, calculating it over `frames` steps.
    ///
    /// A begin/end-compatible entry makes this a no-op; a reversed match is
    /// reused by appending its reversal instead of calculating anew.
    pub fn add(&mut self, mut transition: Transition, frames: f64) {
        let mut reversed = None;
        for t in &self.transitions {
            if t.begin().equals(transition.begin(), true, false)
                && t.end().equals(transition.end(), true, false)
            {
                return;
            }
            if t.begin().equals(transition.end(), true, false)
                && t.end().equals(transition.begin(), true, false)
            {
                reversed = Some(t.reversed());
                break;
            }
        }
        if let Some(reversed) = reversed {
            self.transitions.push(reversed);
            return;
        }
        transition.calculate(frames - 1.0);
        self.transitions.push(transition);
    }

    /// Build the pool from `name = <milliseconds>,<slash-separated composite
    /// sequence>` configuration lines. `*` in a sequence slot expands over
    /// every target composite.
    pub fn configure(
        cfg: &[(String, String)],
        composites: &CompositeTable,
        fps: Fps,
    ) -> StagemixResult<Self> {
        let targets: Vec<Composite> = composites.targets().into_iter().cloned().collect();
        let target_names: Vec<String> = targets.iter().map(|c| c.id.to_string()).collect();
        let mut transitions = Self::new(targets, fps);

        for (t_name, value) in cfg {
            let Some((time, sequence)) = value.split_once(',') else {
                return Err(StagemixError::configuration(format!(
                    "syntax error in transition '{t_name}' (must be: 'milliseconds,sequence')"
                )));
            };
            let time: f64 = time.trim().parse().map_err(|_| {
                StagemixError::configuration(format!(
                    "bad transition time '{time}' in transition '{t_name}'"
                ))
            })?;
            let frames = fps.as_f64() * time / 1000.0;
            let sequence: Vec<String> = sequence
                .split('/')
                .map(|s| s.trim().to_lowercase())
                .collect();
            let wildcarded = sequence.iter().any(|s| s == "*");

            for seq in parse_asterisk(&sequence, &target_names) {
                let name = if wildcarded {
                    format!("{t_name}({})", seq.join("/"))
                } else {
                    t_name.clone()
                };
                let mut transition = Transition::new(&name);
                for c_name in &seq {
                    let composite = composites.get(c_name).ok_or_else(|| {
                        StagemixError::configuration(format!(
                            "composite '{c_name}' could not be found in transition {name}"
                        ))
                    })?;
                    transition.push(composite);
                }
                transitions.add(transition, frames - 1.0);
            }
        }
        debug!(
            count = transitions.count(),
            "loaded transitions from configuration"
        );
        Ok(transitions)
    }

    /// Find a transition from `begin` to `end`, also probing the swapped
    /// destination orientation (`flip`) and the reversed direction of every
    /// pool entry. Returns the transition and whether a swap was applied.
    pub fn solve(&self, begin: &Composite, end: &Composite, flip: bool) -> Option<(Transition, bool)> {
        debug!(
            begin = %begin.id,
            end = %end.id,
            flip,
            "solving transition"
        );
        for t in &self.transitions {
            if t.begin().equals(begin, true, false) && t.end().equals(end, true, flip) {
                debug!(name = %t.name(), "solved directly");
                return Some((t.clone(), false));
            }
            if t.begin().equals(begin, true, flip) && t.end().equals(end, true, false) {
                debug!(name = %t.name(), "solved with swap");
                return Some((t.clone(), true));
            }
            if t.begin().equals(end, true, false) && t.end().equals(begin, true, flip) {
                debug!(name = %t.name(), "solved reversed with swap");
                return Some((t.reversed(), true));
            }
            if t.begin().equals(end, true, flip) && t.end().equals(begin, true, false) {
                debug!(name = %t.name(), "solved reversed");
                return Some((t.reversed(), false));
            }
        }
        warn!(begin = %begin.id, end = %end.id, "no transition found");
        None
    }
}

impl fmt::Display for Transitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.transitions {
            writeln!(f, "{}", t.name())?;
        }
        Ok(())
    }
}

/// Expand `*` slots in a sequence over all available composite names,
/// recursively, yielding every variant.
fn parse_asterisk(sequence: &[String], names: &[String]) -> Vec<Vec<String>> {
    let mut sequences = Vec::new();
    for (k, slot) in sequence.iter().enumerate() {
        if slot == "*" {
            for name in names {
                let mut expanded = sequence.to_vec();
                expanded[k] = name.clone();
                sequences.extend(parse_asterisk(&expanded, names));
            }
        }
    }
    if sequences.is_empty() {
        sequences.push(sequence.to_vec());
    }
    sequences
}

/// A sequence that walks every ordered pair of the given items at least once,
/// used to exercise all transitions in characterization tests.
pub fn travel<T: Clone + PartialEq>(items: &[T]) -> Option<Vec<T>> {
    if items.len() == 1 {
        return Some(vec![items[0].clone(), items[0].clone()]);
    }
    travel_from(items, vec![items.first()?.clone()])
}

fn travel_from<T: Clone + PartialEq>(items: &[T], previous: Vec<T>) -> Option<Vec<T>> {
    if previous.len() == items.len() * items.len() + 1 {
        return Some(previous);
    }
    for a in items {
        let last = previous.last()?;
        let pair = [last.clone(), a.clone()];
        if !contains_pair(&previous, &pair) {
            let mut next = previous.clone();
            next.push(a.clone());
            if let Some(r) = travel_from(items, next) {
                return Some(r);
            }
        }
    }
    None
}

fn contains_pair<T: PartialEq>(sequence: &[T], pair: &[T; 2]) -> bool {
    sequence
        .windows(2)
        .any(|w| w[0] == pair[0] && w[1] == pair[1])
}
