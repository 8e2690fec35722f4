use async_trait::async_trait;
use collector_errors::CollectorResult;
use std::time::Duration;

/// 键值缓存服务接口
///
/// 保存内容摘要和同步时间戳，多个进程共享时后写入者生效。
#[async_trait]
pub trait CacheService: Send + Sync {
    /// 读取字符串值，不存在时返回 None
    async fn get(&self, key: &str) -> CollectorResult<Option<String>>;

    /// 写入字符串值，ttl 为 None 时使用实现的默认过期时间
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CollectorResult<()>;

    /// 检查键是否存在
    async fn exists(&self, key: &str) -> CollectorResult<bool>;

    /// 删除键，返回是否确实删除了
    async fn delete(&self, key: &str) -> CollectorResult<bool>;
}
