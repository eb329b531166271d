//! Global constants used throughout the Rally Tools codebase.
//!
//! Timeouts, paging parameters, environment names and file locations shared by
//! several modules.

/// Default timeout for a single API request, in seconds.
///
/// Applied to every request issued by the API client, including each page of a
/// paginated fetch and each preset code download.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Page size used when indexing collection endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default number of preset code downloads in flight at once.
pub const MIN_PARALLELISM: usize = 10;

/// Names shorter than this are never treated as implicit code references.
///
/// Short names like `"QC"` or `"mxf"` match almost any source file as substrings.
pub const MIN_REFERENCE_NAME_LEN: usize = 4;

/// Environment names that refer to the local, offline pseudo-environment.
///
/// No request is ever issued for these; paginated fetches return an empty result.
pub const LOCAL_ENVIRONMENTS: &[&str] = &["LOCAL", "LOC"];

/// Media type requested from and sent to the Rally API.
pub const API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Directory of the global configuration file, relative to the home directory.
pub const CONFIG_DIR_NAME: &str = ".rally";

/// File name of the global configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the global configuration file path.
pub const CONFIG_PATH_ENV: &str = "RALLY_CONFIG";

/// Environment variable disabling progress spinners.
pub const NO_PROGRESS_ENV: &str = "RALLY_NO_PROGRESS";
