// ==========================================
// 考试引擎 - 抽题随机源
// ==========================================
// 生产环境熵初始化；测试使用固定种子以便复现
// ==========================================

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub struct SelectionRng {
    inner: Mutex<StdRng>,
}

impl SelectionRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// 原地洗牌
    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        items.shuffle(&mut *rng);
    }

    /// 洗牌后取前 count 个（无放回均匀抽样）
    pub fn sample<T>(&self, mut items: Vec<T>, count: usize) -> Vec<T> {
        self.shuffle(&mut items);
        items.truncate(count);
        items
    }

    /// 在 [0, len) 中随机取一个下标
    pub fn choose_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let mut rng = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Some(rng.gen_range(0..len))
    }
}

impl Default for SelectionRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
