use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 尚未同步过的数据集在缓存中的时间戳占位值
pub const SYNC_NEVER: &str = "never";

/// 采集并上传的数据集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Patients,
    Appointments,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::Patients, Dataset::Appointments];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Patients => "patients",
            Dataset::Appointments => "appointments",
        }
    }

    /// 最近一次成功上传内容的摘要
    pub fn hash_key(&self) -> String {
        format!("{}_hash", self.name())
    }

    /// 最近一次成功同步的时间
    pub fn sync_key(&self) -> String {
        format!("last_{}_sync", self.name())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patients" => Ok(Dataset::Patients),
            "appointments" => Ok(Dataset::Appointments),
            _ => Err(format!(
                "Invalid dataset: {s}. Valid datasets: patients, appointments"
            )),
        }
    }
}
