//! Core options.
//!
//! The option table lives in `options.toml` and is parsed once into
//! [`SCHEMA`]: categories first, then options in display order. Each option
//! names the value that switches its [`Effect`] on;
//! [`Settings::read`] asks the host for every key and folds the effects into
//! an [`EngineConfig`] plus the bridge-side flags.

use crate::abi::{EngineConfig, Region, TvStandard};
use crate::host::Host;
use serde::Deserialize;

const OPTIONS_TOML: &str = include_str!("options.toml");

lazy_static::lazy_static! {
    /// The parsed option table. Empty (and logged) if the embedded document is invalid.
    pub static ref SCHEMA: Schema = Schema::parse(OPTIONS_TOML).unwrap_or_else(|e| {
        log::error!("core option table rejected: {e}");
        Schema::default()
    });
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to parse option table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("option {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Options listing more values than this are rejected. The frontend's value
/// arrays hold 128 entries including the terminator.
pub const MAX_VALUES: usize = 127;

/// A group of options, shown as a submenu by frontends that support it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Category {
    pub key: String,
    pub label: String,
    pub info: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OptionValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// What an option controls.
#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Effect {
    TvStandard,
    /// On means overseas.
    Region,
    CdAddon,
    TallInterlace,
    LowPassFilter,
    LadderEffect,
    DisableSpritePlane,
    DisableWindowPlane,
    DisablePlane { index: usize },
    DisableFm { index: usize },
    DisableDac,
    DisablePsgTone { index: usize },
    DisablePsgNoise,
    DisablePcm { index: usize },
}

impl Effect {
    fn apply(self, settings: &mut Settings, on: bool) {
        let engine = &mut settings.engine;
        match self {
            Effect::TvStandard => {
                engine.tv_standard = if on { TvStandard::Pal } else { TvStandard::Ntsc }
            }
            Effect::Region => {
                engine.region = if on { Region::Overseas } else { Region::Domestic }
            }
            Effect::CdAddon => engine.cd_addon = on,
            Effect::TallInterlace => settings.tall_interlace = on,
            Effect::LowPassFilter => engine.low_pass_filter_disabled = !on,
            Effect::LadderEffect => engine.fm.ladder_effect_disabled = !on,
            Effect::DisableSpritePlane => engine.vdp.sprites_disabled = on,
            Effect::DisableWindowPlane => engine.vdp.window_disabled = on,
            Effect::DisablePlane { index } => set_flag(&mut engine.vdp.planes_disabled, index, on),
            Effect::DisableFm { index } => set_flag(&mut engine.fm.channels_disabled, index, on),
            Effect::DisableDac => engine.fm.dac_disabled = on,
            Effect::DisablePsgTone { index } => set_flag(&mut engine.psg.tones_disabled, index, on),
            Effect::DisablePsgNoise => engine.psg.noise_disabled = on,
            Effect::DisablePcm { index } => set_flag(&mut engine.pcm.channels_disabled, index, on),
        }
    }

    /// Number of flags an indexed effect addresses.
    fn index_limit(self) -> Option<(usize, usize)> {
        match self {
            Effect::DisablePlane { index } => Some((index, 2)),
            Effect::DisableFm { index } => Some((index, 6)),
            Effect::DisablePsgTone { index } => Some((index, 3)),
            Effect::DisablePcm { index } => Some((index, 8)),
            _ => None,
        }
    }
}

fn set_flag(flags: &mut [bool], index: usize, on: bool) {
    if let Some(flag) = flags.get_mut(index) {
        *flag = on;
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OptionDef {
    pub key: String,
    /// Full label, prefixed with the category for flat option lists.
    pub label: String,
    #[serde(default)]
    pub info: Option<String>,
    pub category: String,
    pub values: Vec<OptionValue>,
    pub default: String,
    pub on: String,
    pub effect: Effect,
}

impl OptionDef {
    /// The libretro `SET_VARIABLES` value string: `"Label; default|other|..."`.
    pub fn variable_description(&self) -> String {
        let others = self
            .values
            .iter()
            .map(|v| v.value.as_str())
            .filter(|v| *v != self.default);
        let choices: Vec<&str> = std::iter::once(self.default.as_str()).chain(others).collect();
        format!("{}; {}", self.label, choices.join("|"))
    }

    /// The label without its `"Category > "` prefix, for grouped option lists.
    pub fn categorised_label(&self) -> &str {
        self.label
            .split_once(" > ")
            .map_or(self.label.as_str(), |(_, label)| label)
    }

    fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.value == value)
    }

    fn validate(&self) -> Result<(), OptionsError> {
        let invalid = |reason: String| OptionsError::Invalid {
            key: self.key.clone(),
            reason,
        };
        if self.values.is_empty() || self.values.len() > MAX_VALUES {
            return Err(invalid(format!(
                "{} values listed, expected 1 to {MAX_VALUES}",
                self.values.len()
            )));
        }
        if !self.has_value(&self.default) {
            return Err(invalid(format!("default {:?} is not a listed value", self.default)));
        }
        if !self.has_value(&self.on) {
            return Err(invalid(format!("on value {:?} is not a listed value", self.on)));
        }
        if let Some((index, limit)) = self.effect.index_limit() {
            if index >= limit {
                return Err(invalid(format!("index {index} out of range (max {})", limit - 1)));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Schema {
    #[serde(rename = "category", default)]
    pub categories: Vec<Category>,
    #[serde(rename = "option", default)]
    pub options: Vec<OptionDef>,
}

impl Schema {
    pub fn parse(text: &str) -> Result<Self, OptionsError> {
        let schema: Schema = toml::from_str(text)?;
        for option in &schema.options {
            option.validate()?;
            if !schema.categories.iter().any(|c| c.key == option.category) {
                return Err(OptionsError::Invalid {
                    key: option.key.clone(),
                    reason: format!("unknown category {:?}", option.category),
                });
            }
        }
        Ok(schema)
    }

    pub fn get(&self, key: &str) -> Option<&OptionDef> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Settings with every option at its default value.
    pub fn defaults(&self) -> Settings {
        self.fold(|option| option.default.clone())
    }

    fn fold(&self, mut value_of: impl FnMut(&OptionDef) -> String) -> Settings {
        let mut settings = Settings::default();
        for option in &self.options {
            let value = value_of(option);
            option.effect.apply(&mut settings, value == option.on);
        }
        settings
    }
}

/// Everything the user's option choices decide.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub engine: EngineConfig,
    /// Show Interlace Mode 2 at full height instead of squashing it.
    pub tall_interlace: bool,
}

impl Settings {
    /// Read every option from the host. Keys the host has no value for use the default.
    pub fn read(schema: &Schema, host: &mut dyn Host) -> Self {
        schema.fold(|option| {
            host.option_value(&option.key)
                .filter(|v| option.has_value(v))
                .unwrap_or_else(|| option.default.clone())
        })
    }

    pub fn pal(&self) -> bool {
        self.engine.tv_standard == TvStandard::Pal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses_and_validates() {
        let schema = Schema::parse(OPTIONS_TOML).unwrap();
        assert_eq!(schema.options.len(), 29);
        assert_eq!(SCHEMA.options.len(), schema.options.len());
    }

    #[test]
    fn defaults_match_a_stock_console() {
        let settings = SCHEMA.defaults();
        assert!(!settings.pal());
        assert_eq!(settings.engine.region, Region::Overseas);
        assert!(!settings.engine.low_pass_filter_disabled);
        assert!(!settings.engine.fm.ladder_effect_disabled);
        assert!(!settings.engine.cd_addon);
        assert!(!settings.tall_interlace);
        assert!(settings.engine.pcm.channels_disabled.iter().all(|d| !d));
    }

    #[test]
    fn variable_description_lists_default_first() {
        let option = SCHEMA.get("mdretro_lowpass_filter").unwrap();
        assert_eq!(
            option.variable_description(),
            "Audio > Low-Pass Filter; enabled|disabled"
        );
        let option = SCHEMA.get("mdretro_disable_fm3").unwrap();
        assert_eq!(
            option.variable_description(),
            "Debug > Disable FM3; disabled|enabled"
        );
    }

    #[test]
    fn every_option_belongs_to_a_listed_category() {
        let keys: Vec<&str> = SCHEMA.categories.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["console", "video", "audio", "debug"]);
        let option = SCHEMA.get("mdretro_tv_standard").unwrap();
        assert_eq!(option.category, "console");
        assert_eq!(option.categorised_label(), "TV Standard");
        assert_eq!(option.values[1].label.as_deref(), Some("PAL (50Hz)"));
        assert!(SCHEMA.options.iter().all(|o| o.info.is_some()));
    }

    #[test]
    fn rejects_unknown_category() {
        let text = r#"
[[category]]
key = "audio"
label = "Audio"
info = "Sound."

[[option]]
key = "k"
label = "K"
category = "video"
values = [{ value = "enabled" }, { value = "disabled" }]
default = "disabled"
on = "enabled"
effect = { kind = "disable-dac" }
"#;
        assert!(matches!(
            Schema::parse(text),
            Err(OptionsError::Invalid { reason, .. }) if reason.contains("video")
        ));
    }

    #[test]
    fn rejects_default_outside_values() {
        let text = r#"
[[option]]
key = "k"
label = "K"
category = "debug"
values = [{ value = "enabled" }, { value = "disabled" }]
default = "maybe"
on = "enabled"
effect = { kind = "disable-dac" }
"#;
        assert!(matches!(
            Schema::parse(text),
            Err(OptionsError::Invalid { key, .. }) if key == "k"
        ));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let text = r#"
[[option]]
key = "k"
label = "K"
category = "debug"
values = [{ value = "enabled" }, { value = "disabled" }]
default = "disabled"
on = "enabled"
effect = { kind = "disable-fm", index = 6 }
"#;
        assert!(Schema::parse(text).is_err());
    }

    #[test]
    fn indexed_effects_set_their_channel() {
        let schema = Schema::parse(OPTIONS_TOML).unwrap();
        let settings = schema.fold(|option| {
            if option.key == "mdretro_disable_pcm5" || option.key == "mdretro_disable_plane_b" {
                "enabled".to_string()
            } else {
                option.default.clone()
            }
        });
        assert_eq!(
            settings.engine.pcm.channels_disabled,
            [false, false, false, false, true, false, false, false]
        );
        assert_eq!(settings.engine.vdp.planes_disabled, [false, true]);
    }
}
