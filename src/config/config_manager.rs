// ==========================================
// 考试引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// EngineSettings - 引擎运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub min_duration_minutes: i64,
    pub max_duration_minutes: i64,
    pub absent_grace_minutes: i64, // 开考后多久未进场视为缺考
    pub sweep_interval_secs: u64,
    pub pass_score: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_duration_minutes: 1,
            max_duration_minutes: 180,
            absent_grace_minutes: 10,
            sweep_interval_secs: 60,
            pass_score: Decimal::new(60, 0),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取整数配置，不存在或格式错误时返回默认值
    fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        Ok(match self.get_config_value(key)? {
            Some(v) => v.trim().parse::<i64>().unwrap_or_else(|_| {
                tracing::warn!(key, value = %v, "配置值不是整数，使用默认值");
                default
            }),
            None => default,
        })
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 引擎参数 =====

    /// 加载引擎运行参数（缺省项取默认值）
    ///
    /// 最短时长大于最长时长时视为配置错误
    pub fn load_engine_settings(&self) -> Result<EngineSettings, Box<dyn Error>> {
        let defaults = EngineSettings::default();

        let min_duration_minutes =
            self.get_i64_or(config_keys::MIN_DURATION_MINUTES, defaults.min_duration_minutes)?;
        let max_duration_minutes =
            self.get_i64_or(config_keys::MAX_DURATION_MINUTES, defaults.max_duration_minutes)?;
        if min_duration_minutes < 1 || min_duration_minutes > max_duration_minutes {
            return Err(format!(
                "考试时长配置非法: min={}, max={}",
                min_duration_minutes, max_duration_minutes
            )
            .into());
        }

        let absent_grace_minutes =
            self.get_i64_or(config_keys::ABSENT_GRACE_MINUTES, defaults.absent_grace_minutes)?;
        let sweep_interval_secs = self
            .get_i64_or(config_keys::SWEEP_INTERVAL_SECS, defaults.sweep_interval_secs as i64)?
            .max(1) as u64;

        let pass_score = match self.get_config_value(config_keys::PASS_SCORE)? {
            Some(v) => Decimal::from_str(v.trim()).unwrap_or(defaults.pass_score),
            None => defaults.pass_score,
        };

        Ok(EngineSettings {
            min_duration_minutes,
            max_duration_minutes,
            absent_grace_minutes: absent_grace_minutes.max(0),
            sweep_interval_secs,
            pass_score,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 考试时长（分钟）
    pub const MIN_DURATION_MINUTES: &str = "exam.min_duration_minutes";
    pub const MAX_DURATION_MINUTES: &str = "exam.max_duration_minutes";

    // 缺考判定宽限（分钟）
    pub const ABSENT_GRACE_MINUTES: &str = "exam.absent_grace_minutes";

    // 后台巡检间隔（秒）
    pub const SWEEP_INTERVAL_SECS: &str = "sweep.interval_secs";

    // 及格线
    pub const PASS_SCORE: &str = "grading.pass_score";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let manager = memory_manager();
        let settings = manager.load_engine_settings().unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_override_values() {
        let manager = memory_manager();
        manager.set_global_config_value(config_keys::MAX_DURATION_MINUTES, "120").unwrap();
        manager.set_global_config_value(config_keys::ABSENT_GRACE_MINUTES, "15").unwrap();
        manager.set_global_config_value(config_keys::SWEEP_INTERVAL_SECS, "abc").unwrap();

        let settings = manager.load_engine_settings().unwrap();
        assert_eq!(settings.max_duration_minutes, 120);
        assert_eq!(settings.absent_grace_minutes, 15);
        assert_eq!(settings.sweep_interval_secs, 60);
    }

    #[test]
    fn test_invalid_duration_bounds() {
        let manager = memory_manager();
        manager.set_global_config_value(config_keys::MIN_DURATION_MINUTES, "200").unwrap();
        assert!(manager.load_engine_settings().is_err());
    }

    #[test]
    fn test_snapshot_contains_keys() {
        let manager = memory_manager();
        manager.set_global_config_value(config_keys::PASS_SCORE, "55").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("grading.pass_score"));
    }
}
