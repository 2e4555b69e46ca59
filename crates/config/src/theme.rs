// Theme configuration
// Built-in terminal palettes: dark (default), light (reverse video), mono.

use serde::{Deserialize, Serialize};

/// Theme source - which built-in palette to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSource {
    /// Light if the terminal reports a light background, mono under NO_COLOR, else dark
    #[default]
    Auto,
    Dark,
    Light,
    Mono,
}

/// Framework-agnostic terminal color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermColor {
    /// Terminal default
    Reset,
    Black,
    Cyan,
    Yellow,
    /// Normal-intensity white (SGR 37/47)
    Silver,
    /// Bright white (SGR 97/107)
    White,
    /// 256-color palette index
    Indexed(u8),
}

/// Attributes drawn for one piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paint {
    pub fg: TermColor,
    pub bg: TermColor,
    pub bold: bool,
    pub reverse: bool,
}

impl Paint {
    pub const PLAIN: Paint = Paint {
        fg: TermColor::Reset,
        bg: TermColor::Reset,
        bold: false,
        reverse: false,
    };

    pub const fn new(fg: TermColor, bg: TermColor, bold: bool) -> Self {
        Self {
            fg,
            bg,
            bold,
            reverse: false,
        }
    }
}

/// Styles of the cursor cell and of alternating rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyle {
    pub cursor: Paint,
    pub even: Paint,
    pub odd: Paint,
}

impl RowStyle {
    /// Even and odd exchanged, so striping continues below an odd-sized header.
    pub fn swapped(self) -> Self {
        Self {
            cursor: self.cursor,
            even: self.odd,
            odd: self.even,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub header: RowStyle,
    pub body: RowStyle,
    pub status: Paint,
    pub separator: Paint,
}

impl Theme {
    pub fn dark() -> Self {
        let cursor = Paint::new(TermColor::Black, TermColor::White, false);
        Self {
            name: "dark",
            header: RowStyle {
                cursor,
                even: Paint::new(TermColor::Cyan, TermColor::Indexed(235), true),
                odd: Paint::new(TermColor::Cyan, TermColor::Reset, true),
            },
            body: RowStyle {
                cursor,
                even: Paint::new(TermColor::Reset, TermColor::Indexed(235), true),
                odd: Paint::new(TermColor::Reset, TermColor::Reset, true),
            },
            status: Paint::new(TermColor::Yellow, TermColor::Reset, false),
            separator: Paint::new(TermColor::Black, TermColor::Reset, true),
        }
    }

    /// For terminals with a light background
    pub fn light() -> Self {
        let dark = Self::dark();
        Self {
            name: "light",
            header: RowStyle {
                cursor: Paint::new(TermColor::Cyan, TermColor::Black, false),
                even: Paint::new(TermColor::Cyan, TermColor::Indexed(252), false),
                odd: dark.header.odd,
            },
            body: RowStyle {
                cursor: Paint::new(TermColor::Silver, TermColor::Black, false),
                even: Paint::new(TermColor::Reset, TermColor::Indexed(252), false),
                odd: dark.body.odd,
            },
            ..dark
        }
    }

    pub fn mono() -> Self {
        let style = RowStyle {
            cursor: Paint {
                reverse: true,
                ..Paint::PLAIN
            },
            even: Paint::PLAIN,
            odd: Paint::PLAIN,
        };
        Self {
            name: "mono",
            header: style,
            body: style,
            status: Paint::PLAIN,
            separator: Paint::PLAIN,
        }
    }

    /// Pick the palette for `source`; `reverse_video` (--rv) forces light.
    pub fn resolve(source: ThemeSource, reverse_video: bool) -> Self {
        let colorfgbg = std::env::var("COLORFGBG").ok();
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::resolve_with(source, reverse_video, colorfgbg.as_deref(), no_color)
    }

    pub fn resolve_with(
        source: ThemeSource,
        reverse_video: bool,
        colorfgbg: Option<&str>,
        no_color: bool,
    ) -> Self {
        if reverse_video {
            return Self::light();
        }
        match source {
            ThemeSource::Dark => Self::dark(),
            ThemeSource::Light => Self::light(),
            ThemeSource::Mono => Self::mono(),
            ThemeSource::Auto if colorfgbg.is_some_and(is_light_background) => Self::light(),
            ThemeSource::Auto if no_color => Self::mono(),
            ThemeSource::Auto => Self::dark(),
        }
    }
}

/// `COLORFGBG` is "FG;BG"; a foreground index below the background's means a light terminal.
fn is_light_background(colorfgbg: &str) -> bool {
    let Some((fg, bg)) = colorfgbg.split_once(';') else {
        return false;
    };
    match (fg.trim().parse::<i64>(), bg.trim().parse::<i64>()) {
        (Ok(fg), Ok(bg)) => fg < bg,
        _ => false,
    }
}
