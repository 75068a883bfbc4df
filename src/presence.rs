//! 可选字段模型 (Field Presence Model)
//!
//! 每个可选字段都是 (值, 是否存在) 的组合。内部用 `Option<T>` 表示,
//! 但对外保持哨兵值语义: 未设置时 `get()` 返回该类型的哨兵值而不是报错,
//! `set()` 一个哨兵值等价于 `remove()`。
//!
//! | 类型 | 哨兵值 |
//! |------|--------|
//! | `u64` | `u64::MAX` (即 `size_t(-1)`) |
//! | `f64` | 任意负数, `get()` 返回 `-1.0` |
//! | 枚举 | `None` |

/// 带哨兵值的标量类型
pub trait Sentinel: Copy + PartialEq {
    /// 未设置时 `get()` 返回的值
    const UNSET: Self;

    /// 该值是否表示"未设置"
    fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }
}

impl Sentinel for u64 {
    const UNSET: Self = u64::MAX;
}

impl Sentinel for f64 {
    const UNSET: Self = -1.0;

    // 非负 double 字段: 负数和 NaN 都视为未设置
    fn is_unset(&self) -> bool {
        self.is_nan() || *self < 0.0
    }
}

/// 可选标量字段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optional<T> {
    value: Option<T>,
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Sentinel> Optional<T> {
    pub const fn unset() -> Self {
        Self { value: None }
    }

    pub fn has(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> T {
        self.value.unwrap_or(T::UNSET)
    }

    /// 设置为哨兵值时字段变为未设置
    pub fn set(&mut self, v: T) {
        self.value = if v.is_unset() { None } else { Some(v) };
    }

    pub fn remove(&mut self) {
        self.value = None;
    }

    pub fn as_option(&self) -> Option<T> {
        self.value
    }
}

impl<T: Sentinel> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        let mut field = Self::unset();
        if let Some(v) = value {
            field.set(v);
        }
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_presence() {
        let mut f = Optional::<u64>::unset();
        assert!(!f.has());
        assert_eq!(f.get(), u64::MAX);

        f.set(0);
        assert!(f.has());
        assert_eq!(f.get(), 0);

        f.remove();
        assert!(!f.has());
        assert_eq!(f.get(), u64::MAX);

        // 哨兵值本身不算设置
        f.set(u64::MAX);
        assert!(!f.has());
    }

    #[test]
    fn test_f64_negative_is_unset() {
        let mut f = Optional::<f64>::unset();
        f.set(0.0);
        assert!(f.has());
        f.set(-0.5);
        assert!(!f.has());
        assert_eq!(f.get(), -1.0);
        f.set(f64::NAN);
        assert!(!f.has());
    }

    #[test]
    fn test_from_option() {
        let f: Optional<u64> = Some(5).into();
        assert_eq!(f.as_option(), Some(5));
        let f: Optional<f64> = Some(-3.0).into();
        assert_eq!(f.as_option(), None);
    }
}
