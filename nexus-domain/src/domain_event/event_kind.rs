use serde::Serialize;
use std::fmt;

/// 事件类别判别值
///
/// 处理器以此为键注册与查找，取代“以运行时类型名作为键”的做法。
///
/// ```
/// use nexus_domain::domain_event::EventKind;
///
/// const CREATED: EventKind = EventKind::new("ChatEvent.Created");
/// assert_eq!(CREATED.as_str(), "ChatEvent.Created");
/// assert_eq!(CREATED, EventKind::from("ChatEvent.Created"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventKind(&'static str);

impl EventKind {
    pub const fn new(kind: &'static str) -> Self {
        Self(kind)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl From<&'static str> for EventKind {
    fn from(kind: &'static str) -> Self {
        Self::new(kind)
    }
}

impl AsRef<str> for EventKind {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
