//! 主体解析接口
//!
//! 规则针对的主体（通常是用户）只需要暴露两种能力：
//! - 按名称读取属性
//! - 按名称调用零参数能力
//!
//! 能力通过显式注册表声明，不依赖运行时反射。未注册的能力名在解析时视为缺失。

use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// 可被规则评估的主体
#[cfg_attr(test, mockall::automock)]
pub trait Subject: Send + Sync {
    /// 按名称读取属性，不存在时返回 `None`
    fn attribute(&self, name: &str) -> Option<Value>;

    /// 调用零参数能力，未暴露该能力时返回 `None`
    fn invoke(&self, _capability: &str) -> Option<Value> {
        None
    }

    /// 按不含能力标记的点号路径读取属性
    ///
    /// 默认逐段调用 `attribute`。能按引用遍历自身结构的主体可以覆盖它，只转换最终的叶子。
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut parts = path.split('.');
        let mut current = self.attribute(parts.next()?)?;
        for part in parts {
            current = current.attribute(part)?;
        }

        Some(current)
    }
}

/// 零参数能力
pub type CapabilityFn<T> = fn(&T) -> Value;

/// 按类型构建的能力注册表
///
/// 通常配合 `OnceLock` 每个类型只构建一次：
///
/// ```
/// use rule_engine::{CapabilityRegistry, Subject, Value};
/// use std::sync::OnceLock;
///
/// struct Member {
///     role: String,
/// }
///
/// fn capabilities() -> &'static CapabilityRegistry<Member> {
///     static REGISTRY: OnceLock<CapabilityRegistry<Member>> = OnceLock::new();
///     REGISTRY.get_or_init(|| {
///         CapabilityRegistry::new().with("isStaff", |m: &Member| Value::from(m.role == "staff"))
///     })
/// }
///
/// impl Subject for Member {
///     fn attribute(&self, name: &str) -> Option<Value> {
///         match name {
///             "role" => Some(Value::from(&self.role)),
///             _ => None,
///         }
///     }
///
///     fn invoke(&self, capability: &str) -> Option<Value> {
///         capabilities().invoke(self, capability)
///     }
/// }
///
/// let member = Member { role: "staff".to_string() };
/// assert_eq!(member.invoke("isStaff"), Some(Value::Bool(true)));
/// assert_eq!(member.invoke("delete"), None);
/// ```
pub struct CapabilityRegistry<T> {
    entries: HashMap<&'static str, CapabilityFn<T>>,
}

impl<T> CapabilityRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 注册一个能力，同名能力会被覆盖
    pub fn with(mut self, name: &'static str, capability: CapabilityFn<T>) -> Self {
        self.entries.insert(name, capability);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn invoke(&self, target: &T, name: &str) -> Option<Value> {
        self.entries.get(name).map(|capability| capability(target))
    }
}

impl<T> Default for CapabilityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CapabilityRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &names)
            .finish()
    }
}

type RecordCapability = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// 映射型主体
///
/// 把一组属性和闭包形式的能力适配成 [`Subject`]，适合没有专门类型的主体或测试场景。
#[derive(Clone, Default)]
pub struct Record {
    attributes: BTreeMap<String, Value>,
    capabilities: HashMap<String, RecordCapability>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_capability<F>(mut self, name: impl Into<String>, capability: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.capabilities.insert(name.into(), Arc::new(capability));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<_> = self.capabilities.keys().collect();
        capabilities.sort_unstable();
        f.debug_struct("Record")
            .field("attributes", &self.attributes)
            .field("capabilities", &capabilities)
            .finish()
    }
}

impl Subject for Record {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    fn invoke(&self, capability: &str) -> Option<Value> {
        self.capabilities.get(capability).map(|f| f(self))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(Arc::new(record))
    }
}

/// 值本身也可以作为主体：映射按键读取，列表按下标读取，嵌套主体透传
impl Subject for Value {
    fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(name).cloned(),
            Value::List(items) => items.get(name.parse::<usize>().ok()?).cloned(),
            Value::Object(subject) => subject.attribute(name),
            _ => None,
        }
    }

    fn invoke(&self, capability: &str) -> Option<Value> {
        match self {
            Value::Object(subject) => subject.invoke(capability),
            _ => None,
        }
    }

    fn lookup(&self, path: &str) -> Option<Value> {
        let mut current = self;
        let mut rest = path;
        loop {
            if let Value::Object(subject) = current {
                return subject.lookup(rest);
            }

            let (name, tail) = match rest.split_once('.') {
                Some((name, tail)) => (name, Some(tail)),
                None => (rest, None),
            };
            current = match current {
                Value::Map(map) => map.get(name)?,
                Value::List(items) => items.get(name.parse::<usize>().ok()?)?,
                _ => return None,
            };

            match tail {
                Some(tail) => rest = tail,
                None => return Some(current.clone()),
            }
        }
    }
}

/// 已解码的 JSON 文档可直接作为主体
impl Subject for serde_json::Value {
    fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            serde_json::Value::Object(map) => map.get(name).map(Value::from),
            serde_json::Value::Array(items) => items.get(name.parse::<usize>().ok()?).map(Value::from),
            _ => None,
        }
    }

    fn lookup(&self, path: &str) -> Option<Value> {
        path.split('.')
            .try_fold(self, |current, name| match current {
                serde_json::Value::Object(map) => map.get(name),
                serde_json::Value::Array(items) => items.get(name.parse::<usize>().ok()?),
                _ => None,
            })
            .map(Value::from)
    }
}
