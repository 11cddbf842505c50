use std::fmt;
use std::str::FromStr;

/// Pipeline step a job is waiting for or currently executing.
///
/// Stages only ever advance in pipeline order; a job never moves back to an
/// earlier stage except by retrying the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Transcode,
    Asr,
    AsrCompleted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcode => "TRANSCODE",
            Stage::Asr => "ASR",
            Stage::AsrCompleted => "ASR_COMPLETED",
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSCODE" => Ok(Stage::Transcode),
            "ASR" => Ok(Stage::Asr),
            "ASR_COMPLETED" => Ok(Stage::AsrCompleted),
            _ => Err(format!("Invalid stage: {}", s)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
