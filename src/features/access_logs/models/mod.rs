mod access_log;

pub use access_log::{AccessLogEntry, AccessLogFilter, AuditAction, NewAccessLog};
