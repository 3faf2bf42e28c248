/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems found while loading are kept in `warnings` and logged once the
/// logger is up.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub rules: RulesConfig,
    pub controls: ControlsConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    /// Pack file inside `levels_dir`; the built-in pack when absent.
    pub pack: Option<PathBuf>,
    pub riddles_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub bomb_fuse_ticks: u32,
    pub bomb_radius: i32,
    /// Blink period of an armed bomb, in ticks.
    pub bomb_blink_rate: u32,
    pub torch_radius: i32,
    pub riddle_lives: u32,
}

/// Key strings for one avatar. Matched case-insensitively.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PlayerKeys {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub stay: String,
    pub drop: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub player1: PlayerKeys,
    pub player2: PlayerKeys,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    /// Which avatar the pad drives: 1 or 2.
    pub avatar: usize,
    pub drop: Vec<String>,
    pub stay: Vec<String>,
    pub pause: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    rules: RulesConfig,
    #[serde(default)]
    controls: ControlsConfig,
    #[serde(default)]
    gamepad: GamepadConfig,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    pack: Option<String>,
    #[serde(default)]
    riddles_file: Option<String>,
    #[serde(default)]
    log_file: Option<String>,
}

// ── Defaults ──

fn default_levels_dir() -> String { "levels".into() }

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { tick_rate_ms: 100 }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            bomb_fuse_ticks: 50,
            bomb_radius: 5,
            bomb_blink_rate: 10,
            torch_radius: 2,
            riddle_lives: 3,
        }
    }
}

impl PlayerKeys {
    fn new(keys: [&str; 6]) -> Self {
        let [up, down, left, right, stay, drop] = keys.map(String::from);
        PlayerKeys { up, down, left, right, stay, drop }
    }
}

impl Default for PlayerKeys {
    fn default() -> Self {
        PlayerKeys::new(["w", "x", "a", "d", "s", "e"])
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        ControlsConfig {
            player1: PlayerKeys::new(["w", "x", "a", "d", "s", "e"]),
            player2: PlayerKeys::new(["i", "m", "j", "l", "k", "o"]),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        GamepadConfig {
            avatar: 2,
            drop: vec!["A".into(), "X".into()],
            stay: vec!["B".into(), "Y".into()],
            pause: vec!["Start".into()],
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            pack: None,
            riddles_file: None,
            log_file: None,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[PathBuf::from(".")], vec![])
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/tandem`, (4) `/usr/share/tandem`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        Self::from_toml(toml_cfg, &search_dirs, warnings)
    }

    /// Parse a config document directly. Used by tests and tooling.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg: TomlConfig = toml::from_str(text)?;
        Ok(Self::from_toml(cfg, &[PathBuf::from(".")], vec![]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf], mut warnings: Vec<String>) -> Self {
        let levels_dir_str = &cfg.general.levels_dir;
        let levels_dir = if Path::new(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let mut gamepad = cfg.gamepad;
        if !(1..=2).contains(&gamepad.avatar) {
            warnings.push(format!("gamepad.avatar = {} is not 1 or 2; using 2", gamepad.avatar));
            gamepad.avatar = 2;
        }
        let mut rules = cfg.rules;
        if rules.bomb_radius < 0 || rules.torch_radius < 0 {
            warnings.push("negative radius in [rules]; using defaults".into());
            let defaults = RulesConfig::default();
            rules.bomb_radius = defaults.bomb_radius;
            rules.torch_radius = defaults.torch_radius;
        }

        GameConfig {
            timing: cfg.timing,
            rules,
            controls: cfg.controls,
            gamepad,
            pack: cfg.general.pack.map(|p| levels_dir.join(p)),
            levels_dir,
            riddles_file: cfg.general.riddles_file.map(PathBuf::from),
            log_file: cfg.general.log_file.map(PathBuf::from),
            warnings,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tandem");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/tandem");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("config.toml parse error: {e}; using default settings"));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::parse("").expect("empty config");
        assert_eq!(cfg.timing.tick_rate_ms, 100);
        assert_eq!(cfg.rules.bomb_fuse_ticks, 50);
        assert_eq!(cfg.rules.bomb_radius, 5);
        assert_eq!(cfg.rules.torch_radius, 2);
        assert_eq!(cfg.controls.player2.drop, "o");
        assert_eq!(cfg.gamepad.avatar, 2);
        assert!(cfg.pack.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse(
            "[rules]\nbomb_radius = 3\n\n[controls.player1]\ndrop = \"q\"\n\n[general]\npack = \"extra.toml\"\n",
        )
        .expect("valid config");
        assert_eq!(cfg.rules.bomb_radius, 3);
        assert_eq!(cfg.rules.bomb_fuse_ticks, 50);
        assert_eq!(cfg.controls.player1.drop, "q");
        assert_eq!(cfg.controls.player1.up, "w");
        assert_eq!(cfg.pack, Some(cfg.levels_dir.join("extra.toml")));
    }

    #[test]
    fn bad_gamepad_avatar_is_corrected() {
        let cfg = GameConfig::parse("[gamepad]\navatar = 5\n").expect("valid config");
        assert_eq!(cfg.gamepad.avatar, 2);
        assert_eq!(cfg.warnings.len(), 1);
    }
}
