use serde::{Deserialize, Serialize};

/// 患者列表中的一行
///
/// 所有字段都是页面上的原始文本，不做业务校验。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub sr_no: String,
    pub patient_id: String,
    pub name: String,
    pub age: String,
    pub gender: String,
    pub mobile: String,
    pub category: String,
    pub outstanding: String,
    pub date: String,
    /// 患者详情页链接（姓名列中的 a 标签）
    pub link: Option<String>,
}

impl PatientRecord {
    /// 列表每行至少需要的单元格数量，不足的行直接跳过
    pub const COLUMN_COUNT: usize = 9;
}

/// 日历中一条预约的详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub date: String,
    pub department: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub start_time: String,
    pub end_time: String,
    pub doctor: String,
    pub remark: String,
    pub status: String,
}

impl AppointmentRecord {
    /// 详情弹窗中的字段名与选择器，按输出顺序排列
    pub const FIELDS: [(&'static str, &'static str); 9] = [
        ("date", "#app_date"),
        ("department", "#clinic_list"),
        ("patient_name", "#p_name"),
        ("patient_phone", "#p_mobile_no"),
        ("start_time", "#start_time"),
        ("end_time", "#end_time"),
        ("doctor", "#doc_list"),
        ("remark", "#purpose_visit"),
        ("status", "#status"),
    ];

    /// 按 FIELDS 顺序构造，缺失的值补空字符串
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Self {
            date: next(),
            department: next(),
            patient_name: next(),
            patient_phone: next(),
            start_time: next(),
            end_time: next(),
            doctor: next(),
            remark: next(),
            status: next(),
        }
    }
}
