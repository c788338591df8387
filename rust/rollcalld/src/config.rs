use std::path::PathBuf;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

pub const DEFAULT_AUTOSAVE_SECS: u64 = 10;
pub const DEFAULT_QUESTION_END_DELAY_MS: u64 = 1500;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub autosave_interval: Duration,
    pub question_end_delay: Duration,
    pub seed: Option<u64>,
    pub workspace: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autosave_interval: Duration::from_secs(DEFAULT_AUTOSAVE_SECS),
            question_end_delay: Duration::from_millis(DEFAULT_QUESTION_END_DELAY_MS),
            seed: None,
            workspace: None,
        }
    }
}

fn parse_u64(key: &str, raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let autosave = lookup("ROLLCALLD_AUTOSAVE_SECS");
        if let Some(secs) = parse_u64("ROLLCALLD_AUTOSAVE_SECS", autosave) {
            if secs == 0 {
                log::warn!("ignoring ROLLCALLD_AUTOSAVE_SECS=0");
            } else {
                cfg.autosave_interval = Duration::from_secs(secs);
            }
        }
        if let Some(ms) = parse_u64(
            "ROLLCALLD_QUESTION_END_DELAY_MS",
            lookup("ROLLCALLD_QUESTION_END_DELAY_MS"),
        ) {
            cfg.question_end_delay = Duration::from_millis(ms);
        }
        cfg.seed = parse_u64("ROLLCALLD_SEED", lookup("ROLLCALLD_SEED"));
        cfg.workspace = lookup("ROLLCALLD_WORKSPACE")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        cfg
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
