//! Flux checkpoints a remote backend can be asked to run.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Which Flux.1 checkpoint to sample from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluxModel {
    /// Guidance-distilled 4-step model.
    #[default]
    Schnell,
    /// Higher quality, needs 20-50 steps.
    Dev,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown model '{0}', expected 'schnell' or 'dev'")]
pub struct UnknownModel(pub String);

impl FluxModel {
    /// Hugging Face repository the backend loads.
    pub fn repo_id(self) -> &'static str {
        match self {
            Self::Schnell => "black-forest-labs/FLUX.1-schnell",
            Self::Dev => "black-forest-labs/FLUX.1-dev",
        }
    }

    /// Step counts the checkpoint is tuned for.
    pub fn recommended_steps(self) -> RangeInclusive<u32> {
        match self {
            Self::Schnell => 1..=4,
            Self::Dev => 20..=50,
        }
    }
}

impl fmt::Display for FluxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.repo_id())
    }
}

/// Accepts the short name or the full repository id.
impl FromStr for FluxModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Self::Schnell, Self::Dev]
            .into_iter()
            .find(|m| {
                s.eq_ignore_ascii_case(m.repo_id())
                    || m.repo_id()
                        .rsplit_once('-')
                        .is_some_and(|(_, short)| s.eq_ignore_ascii_case(short))
            })
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_full_names_parse() {
        assert_eq!("schnell".parse::<FluxModel>().unwrap(), FluxModel::Schnell);
        assert_eq!("DEV".parse::<FluxModel>().unwrap(), FluxModel::Dev);
        assert_eq!(
            "black-forest-labs/FLUX.1-dev".parse::<FluxModel>().unwrap(),
            FluxModel::Dev
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "sdxl".parse::<FluxModel>().unwrap_err();
        assert!(err.to_string().contains("sdxl"));
    }

    #[test]
    fn display_is_the_repo_id() {
        assert_eq!(
            FluxModel::default().to_string(),
            "black-forest-labs/FLUX.1-schnell"
        );
    }
}
