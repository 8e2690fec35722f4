use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单个定时任务的状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// 最近一次成功执行的时间（RFC 3339）
    pub last_run: Option<String>,
    pub interval_minutes: u64,
    /// 距离下次到期还有多少分钟，从未执行或已过期时为 0
    pub next_run_in: u64,
}

impl JobStatus {
    pub fn compute(last_run: Option<DateTime<Utc>>, interval: Duration, now: DateTime<Utc>) -> Self {
        let next_run_in = match last_run {
            None => 0,
            Some(last) => {
                let elapsed = (now - last).num_seconds().max(0) as u64;
                interval.as_secs().saturating_sub(elapsed) / 60
            }
        };

        Self {
            last_run: last_run.map(|t| t.to_rfc3339()),
            interval_minutes: interval.as_secs() / 60,
            next_run_in,
        }
    }
}
