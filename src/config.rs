use serde::{Deserialize, Serialize};

/// The six `Heap::roots_` indices `list-specials` reports, in `roots_`'s
/// conventional early-root ordering. These are not part of the `v8dbg_*`
/// symbol contract — they're only known to the
/// real V8-header-linked generator utility, so hosts that know their V8
/// build's layout configure them here instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootIndices {
    pub undefined_value: u32,
    pub null_value: u32,
    pub true_value: u32,
    pub false_value: u32,
    pub nan_value: u32,
    pub minus_zero_value: u32,
}

impl Default for RootIndices {
    fn default() -> RootIndices {
        RootIndices {
            undefined_value: 0,
            null_value: 1,
            true_value: 2,
            false_value: 3,
            nan_value: 4,
            minus_zero_value: 5,
        }
    }
}

/// Tunables left as implementation parameters rather than pinned to one
/// value. A host may load overrides for these from a
/// `v8dbg.toml` file via [`Config::from_toml_str`]; absent that,
/// [`Config::default`] matches the values the original mdb module used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, getset::Getters, getset::CopyGetters)]
pub struct Config {
    /// Size of the scratch buffer used by the top-level `print-string`
    /// command (the `jsstr` buffer in the original module).
    #[getset(get_copy = "pub")]
    string_buf_len: usize,

    /// Independent, smaller cap used when rendering a string-typed field
    /// inline while printing an object (`obj_print_fields`'s own `buf[256]`).
    #[getset(get_copy = "pub")]
    field_print_buf_len: usize,

    /// Maximum depth of concatenation-tree ("cons string") recursion before
    /// decoding is aborted with `Error::StringDecodingLimitExceeded`.
    #[getset(get_copy = "pub")]
    max_string_depth: usize,

    /// Number of spaces added per indent level when printing nested objects
    /// or verbose frames.
    #[getset(get_copy = "pub")]
    indent_width: usize,

    /// Byte offset from an external string's `resource` field to its
    /// NUL-terminated backing character data. Defaults to the Node.js
    /// `node::ExternalAsciiStringResource` layout (`NODE_OFF_EXTSTR_DATA`),
    /// the original module's default backing-resource layout.
    #[getset(get_copy = "pub")]
    external_string_backing_offset: u32,

    /// `Heap::roots_` indices used by `list-specials`. `None` disables the
    /// command with a graceful "not configured" message rather than
    /// guessing.
    #[getset(get = "pub")]
    root_indices: Option<RootIndices>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            string_buf_len: 256,
            field_print_buf_len: 256,
            max_string_depth: 1024,
            indent_width: 4,
            external_string_backing_offset: 4,
            root_indices: Some(RootIndices::default()),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Override the string buffer length. `pub(crate)`: production
    /// callers configure this through [`Config::from_toml_str`]; other
    /// modules' tests use this to exercise truncation/limit behavior
    /// without writing TOML by hand.
    pub(crate) fn set_string_buf_len(&mut self, len: usize) {
        self.string_buf_len = len;
    }

    pub(crate) fn set_max_string_depth(&mut self, depth: usize) {
        self.max_string_depth = depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_module_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.string_buf_len(), 256);
        assert_eq!(cfg.max_string_depth(), 1024);
        assert_eq!(cfg.external_string_backing_offset(), 4);
        assert!(cfg.root_indices().is_some());
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config::default();
        let text = cfg.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn partial_toml_override_still_needs_full_struct() {
        let mut cfg = Config::default();
        cfg.string_buf_len = 64;
        let text = cfg.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.string_buf_len(), 64);
    }
}
