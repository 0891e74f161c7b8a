use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn key_match(key: &KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|binding| is_match(key, binding))
}

fn is_match(key: &KeyEvent, binding: &str) -> bool {
    let binding = binding.to_lowercase();

    let mut target_modifiers = KeyModifiers::NONE;
    let mut target_code = KeyCode::Null;

    for part in binding.split('+') {
        match part {
            "ctrl" => target_modifiers.insert(KeyModifiers::CONTROL),
            "opt" | "alt" => target_modifiers.insert(KeyModifiers::ALT),
            "shift" => target_modifiers.insert(KeyModifiers::SHIFT),
            "enter" => target_code = KeyCode::Enter,
            "esc" => target_code = KeyCode::Esc,
            "backspace" => target_code = KeyCode::Backspace,
            "tab" => target_code = KeyCode::Tab,
            "backtab" => target_code = KeyCode::BackTab,
            "space" => target_code = KeyCode::Char(' '),
            "up" => target_code = KeyCode::Up,
            "down" => target_code = KeyCode::Down,
            "left" => target_code = KeyCode::Left,
            "right" => target_code = KeyCode::Right,
            "home" => target_code = KeyCode::Home,
            "end" => target_code = KeyCode::End,
            "delete" => target_code = KeyCode::Delete,
            c if c.chars().count() == 1 => {
                if let Some(ch) = c.chars().next() {
                    target_code = KeyCode::Char(ch);
                }
            }
            _ => {}
        }
    }

    let code_matches = if key.code == target_code {
        true
    } else if let (KeyCode::Char(c), KeyCode::Char(tc)) = (key.code, target_code) {
        c.to_lowercase().next() == Some(tc)
    } else {
        false
    };
    if !code_matches {
        return false;
    }

    // Enter must match modifiers exactly so `enter` and `shift+enter` can coexist.
    if target_code == KeyCode::Enter {
        return key.modifiers == target_modifiers;
    }

    let mut key_mods = key.modifiers;
    if !target_modifiers.contains(KeyModifiers::SHIFT) {
        key_mods.remove(KeyModifiers::SHIFT);
    }
    key_mods.contains(target_modifiers)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "makecommand", "nexus")
}

pub fn default_data_dir() -> PathBuf {
    if let Some(path) = std::env::var_os("NEXUS_DATA_DIR") {
        return PathBuf::from(path);
    }
    if let Some(dirs) = project_dirs() {
        return dirs.data_dir().to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".nexus")
}

pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("NEXUS_CONFIG") {
        return PathBuf::from(path);
    }
    if let Some(dirs) = project_dirs() {
        return dirs.config_dir().join("config.toml");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".nexus-config.toml")
}

/// Path of the stored Google bearer token, one key for the whole session.
pub fn google_token_path(config: &Config) -> PathBuf {
    config.data.data_dir.join("google_token.json")
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub google: GoogleConfig,
    pub keybindings: KeyBindings,
    pub theme: Theme,
    pub data: DataConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub anon_key: String,
    pub email: String,
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            anon_key: String::new(),
            email: String::new(),
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GoogleConfig {
    pub enabled: bool,
    pub client_id: String,
    pub redirect_port: u16,
    pub timeout_seconds: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            // 0 binds an ephemeral loopback port for the OAuth redirect.
            redirect_port: 0,
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KeyBindings {
    pub global: GlobalBindings,
    pub list: ListBindings,
    pub form: FormBindings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GlobalBindings {
    pub quit: Vec<String>,
    pub help: Vec<String>,
    pub next_view: Vec<String>,
    pub prev_view: Vec<String>,
    pub new_item: Vec<String>,
    pub refresh: Vec<String>,
    pub search: Vec<String>,
    pub google_connect: Vec<String>,
    pub google_lists: Vec<String>,
}

impl Default for GlobalBindings {
    fn default() -> Self {
        Self {
            quit: vec!["ctrl+q".to_string(), "q".to_string()],
            help: vec!["?".to_string()],
            next_view: vec!["tab".to_string()],
            prev_view: vec!["backtab".to_string()],
            new_item: vec!["n".to_string()],
            refresh: vec!["r".to_string()],
            search: vec!["/".to_string()],
            google_connect: vec!["g".to_string()],
            google_lists: vec!["l".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ListBindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub toggle: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
    pub filter: Vec<String>,
    pub sort: Vec<String>,
    pub sync: Vec<String>,
}

impl Default for ListBindings {
    fn default() -> Self {
        Self {
            up: vec!["k".to_string(), "up".to_string()],
            down: vec!["j".to_string(), "down".to_string()],
            toggle: vec!["space".to_string()],
            edit: vec!["e".to_string()],
            delete: vec!["d".to_string()],
            filter: vec!["f".to_string()],
            sort: vec!["s".to_string()],
            sync: vec!["shift+s".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FormBindings {
    pub submit: Vec<String>,
    pub cancel: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
}

impl Default for FormBindings {
    fn default() -> Self {
        Self {
            submit: vec!["shift+enter".to_string()],
            cancel: vec!["esc".to_string()],
            next_field: vec!["tab".to_string()],
            prev_field: vec!["backtab".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    pub border_default: String,
    pub border_editing: String,
    pub border_search: String,
    pub accent: String,
    pub task_done: String,
    pub task_urgent: String,
    pub tag: String,
    pub timestamp: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_default: "Reset".to_string(),
            border_editing: "Green".to_string(),
            border_search: "Cyan".to_string(),
            accent: "Cyan".to_string(),
            task_done: "Green".to_string(),
            task_urgent: "Red".to_string(),
            tag: "Yellow".to_string(),
            timestamp: "Blue".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = config_path();

        let mut config = if let Ok(content) = fs::read_to_string(&config_path) {
            match toml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config.toml ({config_path:?}), using defaults: {e}");
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        let changed = config.normalize_paths();

        if changed || !config_path.exists() {
            let _ = config.save_to_path(&config_path);
        }

        config
    }

    pub fn save_to_path(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).unwrap_or_default();
        fs::write(path, content)
    }

    fn normalize_paths(&mut self) -> bool {
        let mut changed = false;

        if self.data.data_dir.as_os_str().is_empty() {
            self.data.data_dir = default_data_dir();
            changed = true;
        }

        if self.data.data_dir.is_relative() {
            self.data.data_dir = default_data_dir().join(&self.data.data_dir);
            changed = true;
        }

        // Trailing slash on the gateway URL breaks path joins downstream.
        while self.gateway.base_url.ends_with('/') {
            self.gateway.base_url.pop();
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn key_match_distinguishes_enter_and_shift_enter() {
        let plain = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let shifted = KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT);
        let submit = vec!["shift+enter".to_string()];

        assert!(!key_match(&plain, &submit));
        assert!(key_match(&shifted, &submit));
    }

    #[test]
    fn key_match_is_case_insensitive_for_chars() {
        let key = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT);
        assert!(key_match(&key, &["q".to_string()]));
    }

    #[test]
    fn normalize_strips_trailing_slash_from_gateway_url() {
        let mut config = Config::default();
        config.gateway.base_url = "https://example.supabase.co/".to_string();
        config.normalize_paths();
        assert_eq!(config.gateway.base_url, "https://example.supabase.co");
    }
}
