use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use rebate_core::{EngineOptions, RewardPreference};

use crate::state::{ensure_rebate_home, rebate_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogSection,
    pub engine: EngineSection,
    pub recommend: RecommendSection,
    pub plan: PlanSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// File path or http(s) URL
    pub source: String,
    /// Optional spend ledger CSV
    pub ledger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// IANA zone used for "today"
    pub timezone: String,
    pub lookahead_days: u32,
    pub alternate_payment_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendSection {
    pub limit: usize,
    pub owned_cards: Vec<String>,
    /// "cash" or "miles"
    pub prefer: RewardPreference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSection {
    pub max_cards: usize,
    pub no_annual_fee_only: bool,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            source: "catalog.json".to_string(),
            ledger: None,
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            timezone: "Asia/Hong_Kong".to_string(),
            lookahead_days: engine.lookahead_days,
            alternate_payment_methods: engine.alternate_payment_methods,
        }
    }
}

impl Default for RecommendSection {
    fn default() -> Self {
        Self {
            limit: EngineOptions::default().limit,
            owned_cards: Vec::new(),
            prefer: RewardPreference::Cash,
        }
    }
}

impl Default for PlanSection {
    fn default() -> Self {
        Self {
            max_cards: 3,
            no_annual_fee_only: false,
        }
    }
}

impl Config {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            lookahead_days: self.engine.lookahead_days,
            alternate_payment_methods: self.engine.alternate_payment_methods.clone(),
            limit: self.recommend.limit,
            owned_cards: self.recommend.owned_cards.clone(),
            preference: self.recommend.prefer,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(rebate_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = ensure_rebate_home()?.join("config.toml");
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    let p = config_path()?;
    if p.exists() {
        println!("# {}", p.display());
    } else {
        println!("# {} (not found, showing defaults)", p.display());
    }
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
