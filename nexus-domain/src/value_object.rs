//! 值对象（Value Object）与聚合标识
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑；
//! 聚合标识（`AggregateId`）本身也是一种值对象。
//!

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::Hash;

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 聚合标识能力
///
/// 任何可比较、可哈希、可显示的 `'static` 类型都可以作为聚合标识。
/// 推荐每种聚合使用独立的 newtype（见 `#[entity_id]`），
/// 这样即使两种聚合的字符串值相同，在分发注册表中也不会冲突。
pub trait AggregateId: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> AggregateId for T where T: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static
{}

/// 注册表中的聚合定位键：标识类型 + 标识值
///
/// # 示例
///
/// ```
/// use nexus_domain::value_object::AggregateKey;
///
/// let a = AggregateKey::of(&"m1".to_string());
/// let b = AggregateKey::of(&"m1".to_string());
/// assert_eq!(a, b);
/// assert_eq!(a.id(), "m1");
/// assert_eq!(a.to_string(), "String:m1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    type_id: TypeId,
    type_name: &'static str,
    id: String,
}

impl AggregateKey {
    pub fn of<I: AggregateId>(id: &I) -> Self {
        Self {
            type_id: TypeId::of::<I>(),
            type_name: short_type_name::<I>(),
            id: id.to_string(),
        }
    }

    /// 标识的字符串形式
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 标识类型名（去除模块路径）
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_of<I: AggregateId>(&self) -> bool {
        self.type_id == TypeId::of::<I>()
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    // 泛型参数中也可能包含 `::`，只截取最外层路径
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
