use thiserror::Error;


#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("登录失败: {0}")]
    Authentication(String),
    #[error("等待页面元素超时: {selector}")]
    ExtractionTimeout { selector: String },
    #[error("日历导航超出限制: 目标日期 {target}, 已尝试 {steps} 步")]
    NavigationTimeout { target: String, steps: u32 },
    #[error("数据提取错误: {0}")]
    Extraction(String),
    #[error("浏览器错误: {0}")]
    Browser(String),
    #[error("上传失败: {dataset} (尝试 {attempts} 次) - {message}")]
    Upload {
        dataset: String,
        attempts: u32,
        message: String,
    },
    #[error("未知的任务: {name}")]
    UnknownJob { name: String },
    #[error("任务已存在: {name}")]
    DuplicateJob { name: String },
    #[error("缓存错误: {0}")]
    Cache(String),
    #[error("网络错误: {0}")]
    Network(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("操作超时: {0}")]
    Timeout(String),
    #[error("操作已取消")]
    Cancelled,
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type CollectorResult<T> = Result<T, CollectorError>;

impl CollectorError {
    pub fn extraction_timeout<S: Into<String>>(selector: S) -> Self {
        Self::ExtractionTimeout {
            selector: selector.into(),
        }
    }
    pub fn unknown_job<S: Into<String>>(name: S) -> Self {
        Self::UnknownJob { name: name.into() }
    }
    pub fn duplicate_job<S: Into<String>>(name: S) -> Self {
        Self::DuplicateJob { name: name.into() }
    }
    pub fn browser<S: Into<String>>(msg: S) -> Self {
        Self::Browser(msg.into())
    }

    /// 传输层的瞬时故障可以在同一次运行内重试；选择器、登录等错误留给下一个调度周期
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CollectorError::Network(_) | CollectorError::Cache(_) | CollectorError::Timeout(_)
        )
    }

    /// 稳定的错误类别名，用于日志字段和指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            CollectorError::Authentication(_) => "authentication",
            CollectorError::ExtractionTimeout { .. } => "extraction_timeout",
            CollectorError::NavigationTimeout { .. } => "navigation_timeout",
            CollectorError::Extraction(_) => "extraction",
            CollectorError::Browser(_) => "browser",
            CollectorError::Upload { .. } => "upload",
            CollectorError::UnknownJob { .. } => "unknown_job",
            CollectorError::DuplicateJob { .. } => "duplicate_job",
            CollectorError::Cache(_) => "cache",
            CollectorError::Network(_) => "network",
            CollectorError::Serialization(_) => "serialization",
            CollectorError::Configuration(_) => "configuration",
            CollectorError::Timeout(_) => "timeout",
            CollectorError::Cancelled => "cancelled",
            CollectorError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for CollectorError {
    fn from(err: anyhow::Error) -> Self {
        CollectorError::Internal(err.to_string())
    }
}
