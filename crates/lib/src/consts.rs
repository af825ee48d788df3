/// Application name used for config and data directories.
pub const APP_NAME: &str = "stackwright";

/// Scope namespace for per-component variables (`component.<id>.container.ip`).
pub const COMPONENT_SCOPE_PREFIX: &str = "component";

/// Scope namespace for stack-level variables.
pub const STACK_SCOPE_PREFIX: &str = "stack";

/// Scope namespace for version-control variables.
pub const VCS_SCOPE_PREFIX: &str = "vcs";

/// Image label carrying the owning stack id.
pub const STACK_LABEL: &str = "stack";

/// Image label carrying the component id.
pub const COMPONENT_LABEL: &str = "component";

/// Default manifest file name looked up by the CLI.
pub const DEFAULT_MANIFEST: &str = "stack.yml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "STACKWRIGHT_CONFIG";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STACKWRIGHT_DATA_DIR";
