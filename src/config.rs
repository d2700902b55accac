use crate::foundation::core::{Fps, Size};
use crate::foundation::error::{StagemixError, StagemixResult};

/// A background layer source and the composites it serves.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BackgroundSource {
    pub name: String,
    /// Composite names this background has affinity for; `None` serves all.
    #[serde(default)]
    pub composites: Option<Vec<String>>,
}

/// The mixer configuration, built once by the embedding loader and passed by
/// reference into every constructor. Composite and transition entries stay in
/// their raw `name[.attr] = value` line form; the syntax of the file they
/// came from is not this crate's concern.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MixConfig {
    /// Output resolution all proportional coordinates refer to.
    pub resolution: Size,
    pub fps: Fps,
    /// Video sources selectable for the A and B channels.
    pub sources: Vec<String>,
    #[serde(default)]
    pub backgrounds: Vec<BackgroundSource>,
    /// `<name>.<attribute> = <value>` composite entries.
    #[serde(default)]
    pub composites: Vec<(String, String)>,
    /// `<name> = <milliseconds>,<sequence>` transition entries.
    #[serde(default)]
    pub transitions: Vec<(String, String)>,
}

impl MixConfig {
    pub fn validate(&self) -> StagemixResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(StagemixError::configuration("fps must have num>0 and den>0"));
        }
        if self.resolution.width <= 0.0 || self.resolution.height <= 0.0 {
            return Err(StagemixError::configuration(
                "resolution width/height must be > 0",
            ));
        }
        if self.sources.len() < 2 {
            return Err(StagemixError::configuration(
                "at least two video sources are required",
            ));
        }
        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i].contains(source) {
                return Err(StagemixError::configuration(format!(
                    "duplicate video source '{source}'"
                )));
            }
        }
        if self.composites.is_empty() {
            return Err(StagemixError::configuration(
                "at least one composite must be configured",
            ));
        }
        for bg in &self.backgrounds {
            if bg.name.trim().is_empty() {
                return Err(StagemixError::configuration(
                    "background source name must be non-empty",
                ));
            }
        }
        Ok(())
    }

    /// The background source serving a composite: the first one listing it,
    /// else the first unrestricted one.
    pub fn background_for(&self, composite: &str) -> Option<&str> {
        let listed = self.backgrounds.iter().find(|bg| {
            bg.composites
                .as_ref()
                .is_some_and(|list| list.iter().any(|c| c == composite))
        });
        if let Some(bg) = listed {
            return Some(&bg.name);
        }
        self.backgrounds
            .iter()
            .find(|bg| bg.composites.is_none())
            .map(|bg| bg.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MixConfig {
        MixConfig {
            resolution: Size::new(1920.0, 1080.0),
            fps: Fps { num: 25, den: 1 },
            sources: vec!["cam1".into(), "cam2".into()],
            backgrounds: vec![],
            composites: vec![("fs.a".into(), "*".into())],
            transitions: vec![],
        }
    }

    #[test]
    fn validate_accepts_base() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn validate_rejects_single_source() {
        let mut cfg = base();
        cfg.sources.truncate(1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_resolution() {
        let mut cfg = base();
        cfg.resolution = Size::new(0.0, 1080.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn background_affinity_prefers_listing() {
        let mut cfg = base();
        cfg.backgrounds = vec![
            BackgroundSource {
                name: "bg".into(),
                composites: None,
            },
            BackgroundSource {
                name: "bg-side".into(),
                composites: Some(vec!["sbs".into()]),
            },
        ];
        assert_eq!(cfg.background_for("sbs"), Some("bg-side"));
        assert_eq!(cfg.background_for("fs"), Some("bg"));
    }

    #[test]
    fn no_backgrounds_resolves_to_none() {
        assert_eq!(base().background_for("fs"), None);
    }

    #[test]
    fn json_roundtrip() {
        let cfg = base();
        let s = serde_json::to_string(&cfg).unwrap();
        let de: MixConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.sources, cfg.sources);
        assert_eq!(de.fps, cfg.fps);
    }
}
