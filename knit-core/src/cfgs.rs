//! Single interface for registering all of the [`Config`]s for `knit`.
//!
//! [`Config`]: knit_cfg::Config

use knit_cfg::{Config, ConfigSet, ConfigSetBuilder};

pub static WORKSPACE_FILENAME: Config<&'static str> = Config::new(
    "workspace_filename",
    "The filename of the workspace definition, relative to the workspace root.",
    "knit.toml",
);

pub static LOG_OVERRIDES: Config<bool> = Config::new(
    "log_overrides",
    "Log every setting that gets overridden by a later bundle while resolving a unit.",
    false,
);

pub static MAX_CAPABILITY_DEPTH: Config<u64> = Config::new(
    "max_capability_depth",
    "The longest allowed chain of capability requirements.",
    64,
);

pub fn all_cfgs(builder: &mut ConfigSetBuilder) {
    builder
        .register(&WORKSPACE_FILENAME)
        .register(&LOG_OVERRIDES)
        .register(&MAX_CAPABILITY_DEPTH);
}

/// Returns a [`ConfigSet`] with every config at its default value.
pub fn default_configs() -> ConfigSet {
    let mut builder = ConfigSet::builder();
    all_cfgs(&mut builder);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_defaults() {
        let configs = default_configs();
        assert_eq!(WORKSPACE_FILENAME.read(&configs), "knit.toml");
        assert_eq!(LOG_OVERRIDES.read(&configs), false);
        assert_eq!(MAX_CAPABILITY_DEPTH.read(&configs), 64);
    }
}
