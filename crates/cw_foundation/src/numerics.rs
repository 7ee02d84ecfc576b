// crates/cw_foundation/src/numerics.rs

//! Kahan 求和算法
//!
//! 聚合时一个单元可能汇总数千个流域的负荷，使用补偿求和减少累加误差。

/// Kahan 求和器
///
/// # 示例
///
/// ```rust
/// use cw_foundation::numerics::KahanSum;
///
/// let total = KahanSum::sum_iter(vec![0.1; 10]);
/// assert!((total - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    /// 创建新的求和器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个值
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// 获取当前求和值
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// 合并另一个部分和（并行归约时使用）
    #[inline]
    pub fn merge(&mut self, other: KahanSum) {
        self.add(other.sum);
        self.add(-other.compensation);
    }

    /// 从迭代器求和
    pub fn sum_iter<I: IntoIterator<Item = f64>>(iter: I) -> f64 {
        let mut kahan = Self::new();
        for v in iter {
            kahan.add(v);
        }
        kahan.value()
    }
}

impl Extend<f64> for KahanSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.add(v);
        }
    }
}
