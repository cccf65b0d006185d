use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Behaviour when a watch subscription is triggered again while its previous
/// pipeline invocation is still running.
///
/// - `Queue`: remember the trigger and start another invocation when the
///   current one finishes (default behaviour).
/// - `Cancel`: abort the running invocation and start a fresh one right away.
///
/// In both cases two invocations of the same subscription never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    Cancel,
}

impl Default for TriggerWhileRunningBehaviour {
    fn default() -> Self {
        TriggerWhileRunningBehaviour::Queue
    }
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Target platform identifier handed to the packager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux32,
    Linux64,
    Win32,
    Win64,
    Osx32,
    Osx64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux32 => "linux32",
            Platform::Linux64 => "linux64",
            Platform::Win32 => "win32",
            Platform::Win64 => "win64",
            Platform::Osx32 => "osx32",
            Platform::Osx64 => "osx64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linux32" => Ok(Platform::Linux32),
            "linux64" => Ok(Platform::Linux64),
            "win32" => Ok(Platform::Win32),
            "win64" => Ok(Platform::Win64),
            "osx32" => Ok(Platform::Osx32),
            "osx64" => Ok(Platform::Osx64),
            other => Err(format!(
                "invalid platform: {other} (expected one of linux32, linux64, win32, win64, osx32, osx64)"
            )),
        }
    }
}
