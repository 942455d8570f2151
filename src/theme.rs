use ratatui::style::Color;
use tracing::warn;

use crate::db::Db;
use crate::types::THEME_KEY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemePreference {
    Light,
    Dark,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(ThemePreference::Light),
            "dark" => Some(ThemePreference::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }

    pub fn theme(self) -> Theme {
        match self {
            ThemePreference::Light => light(),
            ThemePreference::Dark => dark(),
        }
    }

    /// Stored preference, falling back to the system one when unset or
    /// unrecognized.
    pub fn load(db: &Db) -> Self {
        match db.get_setting(THEME_KEY) {
            Ok(Some(s)) => Self::parse(&s).unwrap_or_else(system_preference),
            Ok(None) => system_preference(),
            Err(e) => {
                warn!(error = %e, "failed to read theme preference");
                system_preference()
            }
        }
    }

    pub fn save(self, db: &Db) {
        if let Err(e) = db.set_setting(THEME_KEY, self.as_str()) {
            warn!(error = %e, "failed to persist theme preference");
        }
    }
}

/// Terminals advertise their palette through `COLORFGBG` ("fg;bg"). A
/// background index of 7 or 15 is a light terminal; anything else, or no
/// hint at all, is treated as dark.
pub fn system_preference() -> ThemePreference {
    from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

fn from_colorfgbg(value: Option<&str>) -> ThemePreference {
    let bg = value
        .and_then(|v| v.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok());
    match bg {
        Some(7) | Some(15) => ThemePreference::Light,
        _ => ThemePreference::Dark,
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub fg: Color,
    pub bg: Color,
    pub dim: Color,
    pub border: Color,
    pub positive: Color,
    pub accent: Color,
    pub input_accent: Color,
    pub title: Color,
    pub warning: Color,
    pub error: Color,
}

pub fn dark() -> Theme {
    Theme {
        fg: Color::Indexed(253),        // bright white
        bg: Color::Reset,
        dim: Color::Indexed(243),       // mid gray
        border: Color::Indexed(240),
        positive: Color::Indexed(46),   // vivid green
        accent: Color::Indexed(81),     // sky cyan
        input_accent: Color::Indexed(214), // bitcoin orange
        title: Color::Indexed(255),
        warning: Color::Indexed(220),   // gold
        error: Color::Indexed(196),
    }
}

pub fn light() -> Theme {
    Theme {
        fg: Color::Indexed(234),        // near black
        bg: Color::Indexed(231),        // white
        dim: Color::Indexed(246),       // mid gray
        border: Color::Indexed(251),    // light gray
        positive: Color::Indexed(28),   // dark green
        accent: Color::Indexed(25),     // dark blue
        input_accent: Color::Indexed(166), // burnt orange
        title: Color::Indexed(232),     // black
        warning: Color::Indexed(130),   // dark orange
        error: Color::Indexed(124),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_toggle() {
        assert_eq!(ThemePreference::parse("dark"), Some(ThemePreference::Dark));
        assert_eq!(ThemePreference::parse("light"), Some(ThemePreference::Light));
        assert_eq!(ThemePreference::parse("Dark"), None);
        assert_eq!(ThemePreference::Dark.toggled(), ThemePreference::Light);
        assert_eq!(ThemePreference::Light.toggled().as_str(), "dark");
    }

    #[test]
    fn colorfgbg_hint() {
        assert_eq!(from_colorfgbg(Some("0;15")), ThemePreference::Light);
        assert_eq!(from_colorfgbg(Some("0;default;7")), ThemePreference::Light);
        assert_eq!(from_colorfgbg(Some("15;0")), ThemePreference::Dark);
        assert_eq!(from_colorfgbg(Some("garbage")), ThemePreference::Dark);
        assert_eq!(from_colorfgbg(None), ThemePreference::Dark);
    }

    #[test]
    fn persisted_preference_wins() {
        let db = Db::open_in_memory().unwrap();
        ThemePreference::Light.save(&db);
        assert_eq!(ThemePreference::load(&db), ThemePreference::Light);
        assert_eq!(db.get_setting(THEME_KEY).unwrap().as_deref(), Some("light"));

        ThemePreference::Dark.save(&db);
        assert_eq!(ThemePreference::load(&db), ThemePreference::Dark);
    }

    #[test]
    fn unknown_stored_value_falls_back_to_system() {
        let db = Db::open_in_memory().unwrap();
        db.set_setting(THEME_KEY, "solarized").unwrap();
        assert_eq!(ThemePreference::load(&db), system_preference());
    }
}
