pub const REDEPLOYER_LOG_CONFIG_FILE_ENV: &str = "REDEPLOYER_LOG_CONFIG_FILE";
pub const REDEPLOYER_VERBOSITY_ENV: &str = "REDEPLOYER_VERBOSITY";
pub const REDEPLOYER_IN_CLUSTER_ENV: &str = "REDEPLOYER_IN_CLUSTER";
pub const REDEPLOYER_K8S_NO_VERIFY_ENV: &str = "REDEPLOYER_K8S_NO_VERIFY";
/// Server side watch timeout, kept below the 295s the API server allows.
pub const DEFAULT_SERVER_TIMEOUT_SECONDS: u32 = 290;
pub const MAX_SERVER_TIMEOUT_SECONDS: u32 = 294;
pub const JOB_NAME_SUFFIX_LENGTH: usize = 5;
/// Job names end up in the `job-name` label of their pods
pub const MAX_JOB_NAME_LENGTH: usize = 63;
