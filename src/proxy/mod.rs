mod client;
pub mod decode;

pub use client::{CloudUsageUpdate, ProxyClient};
pub use client::{
    PATH_BLOG_POSTS, PATH_CRON, PATH_CRON_RUN, PATH_GATEWAY_HEALTH, PATH_HISTORY,
    PATH_INFERENCE, PATH_INFERENCE_CLOUD, PATH_LOGS, PATH_MEMORY_SEARCH, PATH_NOTES,
    PATH_NOTES_RAW, PATH_NOTES_REINDEX, PATH_POLLERS_RUN, PATH_POLLERS_STATUS, PATH_SESSIONS,
    PATH_SESSIONS_SPAWN, PATH_SESSIONS_TERMINATE, PATH_SETTINGS, PATH_USAGE, PATH_WORKFLOWS,
};
