use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use crate::db::ensure_parent_dir;
use crate::error::AppError;

const THEME_KEY: &str = "theme";
const WEEK_START_KEY: &str = "weekStart";
const LOCALE_KEY: &str = "locale";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sunday" => Some(Self::Sunday),
            "monday" => Some(Self::Monday),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ko => "ko",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Self::En),
            "ko" => Some(Self::Ko),
            _ => None,
        }
    }

    pub fn default_week_start(&self) -> WeekStart {
        match self {
            Self::Ko => WeekStart::Monday,
            Self::En => WeekStart::Sunday,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PreferenceChange {
    Theme(Theme),
    WeekStart(WeekStart),
    Locale(Locale),
}

/// Fan-out of preference changes to every open view.
#[derive(Clone, Debug)]
pub struct PreferenceBus {
    sender: broadcast::Sender<PreferenceChange>,
}

impl PreferenceBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreferenceChange> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers saw the change.
    pub fn publish(&self, change: PreferenceChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }
}

/// String-keyed preferences persisted as a flat JSON object.
pub struct Preferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
    bus: PreferenceBus,
}

impl Preferences {
    pub fn load(path: &Path, bus: PreferenceBus) -> Result<Self, AppError> {
        let values = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable preferences");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
            bus,
        })
    }

    pub fn theme(&self) -> Theme {
        self.get(THEME_KEY).and_then(Theme::parse).unwrap_or_default()
    }

    pub fn locale(&self) -> Locale {
        self.get(LOCALE_KEY).and_then(Locale::parse).unwrap_or_default()
    }

    /// Saved week start, or the locale's default when none is saved.
    pub fn week_start(&self) -> WeekStart {
        self.get(WEEK_START_KEY)
            .and_then(WeekStart::parse)
            .unwrap_or_else(|| self.locale().default_week_start())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), AppError> {
        self.set(THEME_KEY, theme.as_str())?;
        self.bus.publish(PreferenceChange::Theme(theme));
        Ok(())
    }

    pub fn set_week_start(&mut self, week_start: WeekStart) -> Result<(), AppError> {
        self.set(WEEK_START_KEY, week_start.as_str())?;
        self.bus.publish(PreferenceChange::WeekStart(week_start));
        Ok(())
    }

    pub fn set_locale(&mut self, locale: Locale) -> Result<(), AppError> {
        let week_start_before = self.week_start();
        self.set(LOCALE_KEY, locale.as_str())?;
        self.bus.publish(PreferenceChange::Locale(locale));
        let week_start_after = self.week_start();
        if week_start_after != week_start_before {
            self.bus
                .publish(PreferenceChange::WeekStart(week_start_after));
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.insert(key.to_string(), value.to_string());
        ensure_parent_dir(&self.path)?;
        fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}
