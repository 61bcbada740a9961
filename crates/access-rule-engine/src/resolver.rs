//! 字段路径解析
//!
//! 路径按 `.` 分段，从主体开始逐段向下解析：
//! - 普通段读取当前值的属性（映射按键，列表按下标）
//! - 以 `()` 结尾的段调用当前值上同名的零参数能力
//!
//! 任意一段无法继续时返回 `None`，调用方把它当作 `null`，不会报错。

use crate::subject::Subject;
use crate::value::Value;

/// 能力调用标记
pub const CAPABILITY_MARKER: &str = "()";

/// 路径段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Attribute(&'a str),
    Capability(&'a str),
}

impl<'a> Segment<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.strip_suffix(CAPABILITY_MARKER) {
            Some(name) => Self::Capability(name),
            None => Self::Attribute(raw),
        }
    }

    fn apply(self, target: &dyn Subject) -> Option<Value> {
        match self {
            Self::Attribute(name) => target.attribute(name),
            Self::Capability("") => None,
            Self::Capability(name) => target.invoke(name),
        }
    }
}

/// 解析字段路径
///
/// 每个能力段在一次解析中只调用一次；前面的段缺失时后面的能力不会被调用。
pub fn resolve(subject: &dyn Subject, path: &str) -> Option<Value> {
    if !path.contains(CAPABILITY_MARKER) {
        return subject.lookup(path);
    }

    let mut segments = path.split('.').map(Segment::parse);
    let mut current = segments.next()?.apply(subject)?;
    for segment in segments {
        current = segment.apply(&current)?;
    }

    Some(current)
}
