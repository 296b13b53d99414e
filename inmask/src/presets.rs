//! Preset masks
//!
//! Ready-made options for common formats. Every preset takes an
//! [`OptionsPatch`] that is applied last, so caller settings win.

use std::fmt;
use std::str::FromStr;

use inmask_core::{
    CharMatcher, MaskError, MaskOptions, MaskSession, OptionsPatch, PatternRule, TextSurface,
};

/// A preset format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// `MM/DD/YYYY`
    Date,
    /// `(XXX) XXX-XXXX`
    Phone,
    /// `XXXX XXXX XXXX XXXX`
    Card,
    /// `HH:MM`
    Time,
    /// `XXX.XXX.XXX.XXX`
    Ip,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Date,
        Preset::Phone,
        Preset::Card,
        Preset::Time,
        Preset::Ip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Date => "date",
            Preset::Phone => "phone",
            Preset::Card => "card",
            Preset::Time => "time",
            Preset::Ip => "ip",
        }
    }

    /// The preset's default mask
    pub fn mask(self) -> &'static str {
        match self {
            Preset::Date => "##/##/####",
            Preset::Phone => "(###) ###-####",
            Preset::Card => "#### #### #### ####",
            Preset::Time => "##:##",
            Preset::Ip => "###.###.###.###",
        }
    }

    /// Options for this preset with a caller patch applied on top
    pub fn options_with(self, patch: OptionsPatch) -> MaskOptions {
        let mask = patch.mask.clone().unwrap_or_else(|| self.mask().to_string());
        let mut options = MaskOptions::new(mask);
        if self == Preset::Date {
            date_rules(&mut options);
        }
        options.apply(patch);
        options
    }

    pub fn options(self) -> MaskOptions {
        self.options_with(OptionsPatch::new())
    }

    /// Create an unmounted session for this preset
    pub fn create<S: TextSurface>(self, patch: OptionsPatch) -> MaskSession<S> {
        MaskSession::new(self.options_with(patch))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MaskError::UnknownPreset(s.to_string()))
    }
}

fn date_rules(options: &mut MaskOptions) {
    options.patterns.insert(
        '#',
        PatternRule::new(CharMatcher::Digit).with_validator(is_valid_date),
    );
    if options
        .mask
        .chars()
        .any(|c| matches!(c.to_ascii_uppercase(), 'Y' | 'M' | 'D'))
    {
        for key in ['Y', 'M', 'D'] {
            options.patterns.insert(key, PatternRule::new(CharMatcher::Digit));
        }
    }
}

/// Eight digits read as month, day and year: month 1-12, day 1-31, year from 1000
pub fn is_valid_date(raw: &str) -> bool {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return false;
    }
    let (Ok(month), Ok(day), Ok(year)) = (
        digits[0..2].parse::<u32>(),
        digits[2..4].parse::<u32>(),
        digits[4..].parse::<u32>(),
    ) else {
        return false;
    };
    (1..=12).contains(&month) && (1..=31).contains(&day) && year >= 1000
}
