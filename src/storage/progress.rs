//! 进度记录数据库操作模块
//!
//! 提供 ProgressRecord 的持久化操作，包括：
//! - 幂等 upsert 与批量导入（单事务）
//! - 按学科 / 学生的查询
//! - 聚合统计（进度页展示用）

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::models::ProgressRecord;
use crate::storage::{StorageError, StorageResult};

/// 单个学生或学科的聚合统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStats {
    /// 完成的游戏局数
    pub games_played: i32,
    /// 总得分
    pub total_score: i64,
    /// 总用时（秒）
    pub total_time_spent: i64,
    /// 达到过的最高关卡
    pub best_level: i32,
}

impl Default for ProgressStats {
    fn default() -> Self {
        Self {
            games_played: 0,
            total_score: 0,
            total_time_spent: 0,
            best_level: 0,
        }
    }
}

/// 进度记录仓库
///
/// 提供进度记录的数据库操作接口
pub struct ProgressRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressRepository {
    /// 创建新的仓库实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    // ========== 基本操作 ==========

    /// 插入或整条替换单条记录
    ///
    /// 每次调用原子生效；返回实际使用的 ID（缺省时生成）。
    pub fn upsert(&self, record: &ProgressRecord) -> StorageResult<String> {
        let conn = self.get_connection()?;
        record.upsert(&conn)
    }

    /// 批量 upsert
    ///
    /// 整批在单个事务中执行，要么全部落库要么全部回滚，
    /// 不会出现一个信封只导入一半的状态。
    pub fn upsert_batch(&self, records: &[ProgressRecord]) -> StorageResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(record.upsert(&tx)?);
        }
        tx.commit()?;

        Ok(ids)
    }

    // ========== 查询 ==========

    /// 按学科查询进度记录
    ///
    /// 最新在前（按完成时间倒序），最多返回 `limit` 条。
    /// 上限是展示成本的取舍，超出部分不算错误。
    pub fn query_by_subject(
        &self,
        subject: &str,
        limit: i32,
    ) -> StorageResult<Vec<ProgressRecord>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM game_progress
            WHERE subject = ?1
            ORDER BY date DESC
            LIMIT ?2
            "#,
        )?;

        let records = stmt
            .query_map(params![subject, limit], |row| ProgressRecord::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// 查询一名学生的全部进度记录
    ///
    /// 最新在前，不设上限（导出链路要求完整性优先）。
    pub fn query_by_student(&self, student_id: &str) -> StorageResult<Vec<ProgressRecord>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM game_progress
            WHERE student_id = ?1
            ORDER BY date DESC
            "#,
        )?;

        let records = stmt
            .query_map(params![student_id], |row| ProgressRecord::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    // ========== 统计 ==========

    /// 学生维度聚合统计
    pub fn student_stats(&self, student_id: &str) -> StorageResult<ProgressStats> {
        let conn = self.get_connection()?;

        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*) as games,
                COALESCE(SUM(score), 0) as total_score,
                COALESCE(SUM(time_spent), 0) as total_time,
                COALESCE(MAX(level), 0) as best_level
            FROM game_progress
            WHERE student_id = ?1
            "#,
            params![student_id],
            |row| {
                Ok(ProgressStats {
                    games_played: row.get(0)?,
                    total_score: row.get(1)?,
                    total_time_spent: row.get(2)?,
                    best_level: row.get(3)?,
                })
            },
        )?;

        Ok(stats)
    }

    /// 学科维度聚合统计
    pub fn subject_stats(&self, subject: &str) -> StorageResult<ProgressStats> {
        let conn = self.get_connection()?;

        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*) as games,
                COALESCE(SUM(score), 0) as total_score,
                COALESCE(SUM(time_spent), 0) as total_time,
                COALESCE(MAX(level), 0) as best_level
            FROM game_progress
            WHERE subject = ?1
            "#,
            params![subject],
            |row| {
                Ok(ProgressStats {
                    games_played: row.get(0)?,
                    total_score: row.get(1)?,
                    total_time_spent: row.get(2)?,
                    best_level: row.get(3)?,
                })
            },
        )?;

        Ok(stats)
    }

    /// 记录总数
    pub fn count_all(&self) -> StorageResult<i64> {
        let conn = self.get_connection()?;

        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM game_progress", [], |row| row.get(0))?;

        Ok(count)
    }
}
