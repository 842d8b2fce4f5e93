//! 数据模型定义
//!
//! 定义本地进度存储所需的数据结构，以及与数据库交互的方法。

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::StorageResult;

// ============================================================
// ProgressRecord - 游戏进度记录
// ============================================================

/// 游戏进度记录
///
/// 一名学生在一个游戏里的一次结算成绩。记录一经写入不做局部修改，
/// 相同 `id` 的再次写入视为整条替换——这是导入合并幂等性的基础。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// 记录唯一标识（缺省时由存储层生成）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 学生 ID（存在性由认证模块负责，这里不校验）
    pub student_id: String,
    /// 游戏 ID（如 "math_9th_formula_builder"）
    pub game_id: String,
    /// 得分
    pub score: i32,
    /// 用时（秒）
    pub time_spent: i32,
    /// 达到的最高关卡
    pub level: i32,
    /// 年级（9 或 10）
    pub grade: i32,
    /// 学科（"Math" / "Physics" / "Chemistry" / "Biology"）
    pub subject: String,
    /// 完成时间（ISO-8601 字符串，由调用方提供）
    pub date: String,
}

impl ProgressRecord {
    /// 创建新的进度记录，完成时间取当前时刻
    pub fn new(
        student_id: impl Into<String>,
        game_id: impl Into<String>,
        score: i32,
        time_spent: i32,
        level: i32,
        grade: i32,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(Self::generate_id()),
            student_id: student_id.into(),
            game_id: game_id.into(),
            score,
            time_spent,
            level,
            grade,
            subject: subject.into(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// 生成全局唯一的记录 ID
    ///
    /// 毫秒时间戳 + 随机后缀，多台设备各自生成也不会冲突。
    pub fn generate_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
    }

    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            student_id: row.get("student_id")?,
            game_id: row.get("game_id")?,
            score: row.get("score")?,
            time_spent: row.get("time_spent")?,
            level: row.get("level")?,
            grade: row.get("grade")?,
            subject: row.get("subject")?,
            date: row.get("date")?,
        })
    }

    /// 插入或整条替换 (upsert)
    ///
    /// 记录没有 `id` 时先生成一个；返回实际使用的 ID。
    pub fn upsert(&self, conn: &Connection) -> StorageResult<String> {
        let id = match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => Self::generate_id(),
        };

        conn.execute(
            r#"
            INSERT INTO game_progress (
                id, student_id, game_id, score, time_spent,
                level, grade, subject, date
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
            )
            ON CONFLICT(id) DO UPDATE SET
                student_id = excluded.student_id,
                game_id = excluded.game_id,
                score = excluded.score,
                time_spent = excluded.time_spent,
                level = excluded.level,
                grade = excluded.grade,
                subject = excluded.subject,
                date = excluded.date
            "#,
            params![
                id,
                self.student_id,
                self.game_id,
                self.score,
                self.time_spent,
                self.level,
                self.grade,
                self.subject,
                self.date,
            ],
        )?;

        Ok(id)
    }
}
