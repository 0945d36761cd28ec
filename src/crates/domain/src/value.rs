use std::fmt::{self, Display};

// 聚合 ID 新类型，统一生成常用 trait 实现
macro_rules! define_id {
    ($name:ident $(, $extra:ident)*) => {
        #[derive(Debug, Clone, Copy, PartialEq $(, $extra)*)]
        pub struct $name(i64);

        impl $name {
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(VideoId, Eq, Hash, PartialOrd, Ord);
define_id!(UserId, Eq, Hash, PartialOrd, Ord);
define_id!(CommentId, Eq, Hash, PartialOrd, Ord);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversions_preserve_raw_value() {
        let video = VideoId::from(42);
        assert_eq!(video.as_i64(), 42);
        assert_eq!(i64::from(video), 42);
        assert_eq!(video.to_string(), "42");
        assert_eq!(UserId::from(7), UserId::from(7));
    }
}
