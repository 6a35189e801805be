use std::fmt;
use std::str::FromStr;

/// Locales the bundled generator can produce values for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    EnUs,
    FrFr,
    DeDe,
    PtBr,
    JaJp,
    ZhCn,
}

impl Locale {
    pub const ALL: &'static [Locale] = &[
        Locale::EnUs,
        Locale::FrFr,
        Locale::DeDe,
        Locale::PtBr,
        Locale::JaJp,
        Locale::ZhCn,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en_US" | "en" => Some(Self::EnUs),
            "fr_FR" => Some(Self::FrFr),
            "de_DE" => Some(Self::DeDe),
            "pt_BR" => Some(Self::PtBr),
            "ja_JP" => Some(Self::JaJp),
            "zh_CN" => Some(Self::ZhCn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::FrFr => "fr_FR",
            Self::DeDe => "de_DE",
            Self::PtBr => "pt_BR",
            Self::JaJp => "ja_JP",
            Self::ZhCn => "zh_CN",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let supported: Vec<&str> = Self::ALL.iter().map(|l| l.as_str()).collect();
            format!(
                "Unsupported locale '{s}'. Must be one of: {}",
                supported.join(", ")
            )
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
