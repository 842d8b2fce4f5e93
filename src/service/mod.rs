//! 进度领域服务模块
//!
//! 面向界面层的高层 API：游戏结算时保存一次成绩、进度页查询历史、
//! 学生端导出全量记录、教师端合并导入。服务自身无状态，
//! 所有持久化都落在 storage 模块的 Record Store 上。

pub mod mirror;

use std::sync::Arc;

use chrono::DateTime;
use thiserror::Error;

use crate::service::mirror::ScoreMirror;
use crate::storage::models::ProgressRecord;
use crate::storage::progress::ProgressStats;
use crate::storage::{Storage, StorageError};

/// 按学科查询时的默认上限（进度页一次展示的最大条数）
pub const DEFAULT_SUBJECT_LIMIT: i32 = 200;

// ============================================================
// 错误类型定义
// ============================================================

/// 领域服务错误
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 记录缺少必填字段；校验失败时不会触碰存储
    #[error("记录校验失败: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================
// ProgressService - 进度领域服务
// ============================================================

/// 进度领域服务
///
/// 游戏屏幕和进度页使用的入口。持有组合根注入的 [`Storage`]，
/// 可选地挂一个最佳努力远端镜像。
pub struct ProgressService {
    storage: Arc<Storage>,
    mirror: Option<ScoreMirror>,
}

impl ProgressService {
    /// 创建服务（仅本地存储）
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            mirror: None,
        }
    }

    /// 附加最佳努力远端镜像
    ///
    /// 本地写入是事实来源；镜像失败只记日志，永不影响保存结果。
    pub fn with_mirror(mut self, mirror: ScoreMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    // ========== 保存 ==========

    /// 保存一次游戏结算成绩
    ///
    /// 必填字段（student_id / game_id / subject）为空时返回校验错误；
    /// 数值越界（负分、年级不在 9/10、关卡小于 1）按原样落库，
    /// 只记 warn 日志（取舍记录见 DESIGN.md）。
    ///
    /// 返回实际使用的记录 ID（调用方未提供时由存储层生成）。
    pub fn save_progress(&self, mut record: ProgressRecord) -> ServiceResult<String> {
        validate_record(&record).map_err(ServiceError::Validation)?;
        warn_out_of_range(&record);

        let id = self.storage.progress().upsert(&record)?;

        // 最佳努力远端镜像：后台推送，不等待结果
        if let Some(mirror) = &self.mirror {
            record.id = Some(id.clone());
            mirror.push_detached(record);
        }

        Ok(id)
    }

    // ========== 查询 ==========

    /// 查询某学科的进度历史（最新在前，最多 [`DEFAULT_SUBJECT_LIMIT`] 条）
    ///
    /// 可选按学生和年级过滤；过滤在内存中进行，不改变排序。
    pub fn subject_history(
        &self,
        subject: &str,
        filter_student_id: Option<&str>,
        filter_grade: Option<i32>,
    ) -> ServiceResult<Vec<ProgressRecord>> {
        let mut records = self
            .storage
            .progress()
            .query_by_subject(subject, DEFAULT_SUBJECT_LIMIT)?;

        if let Some(student_id) = filter_student_id {
            records.retain(|r| r.student_id == student_id);
        }
        if let Some(grade) = filter_grade {
            records.retain(|r| r.grade == grade);
        }

        Ok(records)
    }

    /// 导出一名学生的全部进度
    ///
    /// 返回的序列就是迁移信封的 data 部分（最新在前，不设上限）。
    pub fn export_student(&self, student_id: &str) -> ServiceResult<Vec<ProgressRecord>> {
        Ok(self.storage.progress().query_by_student(student_id)?)
    }

    // ========== 导入 ==========

    /// 合并导入一批记录
    ///
    /// 先整批校验再单事务落库：任意一条记录无效时整批拒绝，
    /// 存储保持原状。相同 `id` 的记录整条替换，重复导入为幂等操作。
    ///
    /// 返回落库的记录条数。
    pub fn import_records(&self, records: Vec<ProgressRecord>) -> ServiceResult<usize> {
        for (index, record) in records.iter().enumerate() {
            validate_record(record).map_err(|e| {
                ServiceError::Validation(format!("第 {} 条记录: {}", index + 1, e))
            })?;
        }

        let ids = self.storage.progress().upsert_batch(&records)?;
        Ok(ids.len())
    }

    // ========== 统计 ==========

    /// 学生维度聚合统计（进度页头部展示用）
    pub fn student_stats(&self, student_id: &str) -> ServiceResult<ProgressStats> {
        Ok(self.storage.progress().student_stats(student_id)?)
    }

    /// 学科维度聚合统计
    pub fn subject_stats(&self, subject: &str) -> ServiceResult<ProgressStats> {
        Ok(self.storage.progress().subject_stats(subject)?)
    }
}

// ============================================================
// 校验
// ============================================================

/// 校验必填字段
fn validate_record(record: &ProgressRecord) -> Result<(), String> {
    if record.student_id.trim().is_empty() {
        return Err("student_id 不能为空".to_string());
    }
    if record.game_id.trim().is_empty() {
        return Err("game_id 不能为空".to_string());
    }
    if record.subject.trim().is_empty() {
        return Err("subject 不能为空".to_string());
    }
    Ok(())
}

/// 数值越界与可疑时间戳只告警，不拒绝
fn warn_out_of_range(record: &ProgressRecord) {
    if record.score < 0 {
        log::warn!(
            "负分记录: game_id={} score={}",
            record.game_id,
            record.score
        );
    }
    if record.grade != 9 && record.grade != 10 {
        log::warn!(
            "年级越界: student_id={} grade={}",
            record.student_id,
            record.grade
        );
    }
    if record.level < 1 {
        log::warn!("关卡越界: game_id={} level={}", record.game_id, record.level);
    }
    if record.time_spent < 0 {
        log::warn!(
            "用时为负: game_id={} time_spent={}",
            record.game_id,
            record.time_spent
        );
    }
    if DateTime::parse_from_rfc3339(&record.date).is_err() {
        log::warn!("完成时间不是 ISO-8601: date={}", record.date);
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    fn service() -> ProgressService {
        let storage = Storage::in_memory().expect("Failed to create in-memory storage");
        ProgressService::new(Arc::new(storage))
    }

    fn record(student: &str, subject: &str, grade: i32, date: &str) -> ProgressRecord {
        ProgressRecord {
            id: None,
            student_id: student.to_string(),
            game_id: "math_9th_formula_builder".to_string(),
            score: 100,
            time_spent: 42,
            level: 2,
            grade,
            subject: subject.to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn test_save_then_query_basic_scenario() {
        let service = service();

        let id = service
            .save_progress(record("S1", "Math", 9, "2024-01-01T00:00:00Z"))
            .expect("Failed to save progress");

        let history = service.subject_history("Math", None, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id.as_deref(), Some(id.as_str()));
        assert_eq!(history[0].score, 100);
        assert_eq!(history[0].time_spent, 42);
        assert_eq!(history[0].date, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_save_rejects_missing_required_fields() {
        let service = service();

        let result = service.save_progress(record("", "Math", 9, "2024-01-01T00:00:00Z"));
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        let result = service.save_progress(record("S1", "", 9, "2024-01-01T00:00:00Z"));
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        // 校验失败时不触碰存储
        let history = service.subject_history("Math", None, None).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_save_keeps_out_of_range_values() {
        let service = service();

        // 负分与越界年级按原样落库（只产生 warn 日志）
        let mut r = record("S1", "Math", 11, "2024-01-01T00:00:00Z");
        r.score = -5;
        service.save_progress(r).expect("Failed to save");

        let history = service.subject_history("Math", None, None).unwrap();
        assert_eq!(history[0].score, -5);
        assert_eq!(history[0].grade, 11);
    }

    #[test]
    fn test_save_twice_same_id_is_idempotent() {
        let service = service();

        let mut r = record("S1", "Math", 9, "2024-01-01T00:00:00Z");
        r.id = Some("p-1".to_string());
        service.save_progress(r.clone()).unwrap();

        r.score = 120;
        service.save_progress(r).unwrap();

        let history = service.subject_history("Math", None, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, 120);
    }

    #[test]
    fn test_subject_history_filters() {
        let service = service();

        service
            .save_progress(record("S1", "Math", 9, "2024-01-01T00:00:00Z"))
            .unwrap();
        service
            .save_progress(record("S2", "Math", 10, "2024-01-02T00:00:00Z"))
            .unwrap();
        service
            .save_progress(record("S1", "Physics", 9, "2024-01-03T00:00:00Z"))
            .unwrap();

        let all_math = service.subject_history("Math", None, None).unwrap();
        assert_eq!(all_math.len(), 2);

        let s1_math = service.subject_history("Math", Some("S1"), None).unwrap();
        assert_eq!(s1_math.len(), 1);
        assert_eq!(s1_math[0].student_id, "S1");

        let grade10 = service.subject_history("Math", None, Some(10)).unwrap();
        assert_eq!(grade10.len(), 1);
        assert_eq!(grade10[0].student_id, "S2");

        let none = service.subject_history("Math", Some("S2"), Some(9)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let service = service();

        service
            .save_progress(record("S1", "Math", 9, "2024-01-01T00:00:00Z"))
            .unwrap();

        let batch = vec![
            record("S2", "Math", 9, "2024-01-02T00:00:00Z"),
            // 无效记录：student_id 为空
            record("", "Math", 9, "2024-01-03T00:00:00Z"),
        ];

        let result = service.import_records(batch);
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        // 整批被拒，行数不变
        let history = service.subject_history("Math", None, None).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_import_export_roundtrip_is_noop() {
        let service = service();

        for day in 1..=3 {
            service
                .save_progress(record(
                    "S1",
                    "Math",
                    9,
                    &format!("2024-01-0{}T00:00:00Z", day),
                ))
                .unwrap();
        }

        let exported = service.export_student("S1").unwrap();
        assert_eq!(exported.len(), 3);

        // 把自己的导出再导回来：行数、内容都不变
        let imported = service.import_records(exported.clone()).unwrap();
        assert_eq!(imported, 3);

        let after = service.export_student("S1").unwrap();
        assert_eq!(after, exported);
    }

    #[test]
    fn test_stats_totals() {
        let service = service();

        let mut a = record("S1", "Math", 9, "2024-01-01T00:00:00Z");
        a.score = 10;
        a.level = 4;
        let mut b = record("S1", "Physics", 9, "2024-01-02T00:00:00Z");
        b.score = 20;
        service.save_progress(a).unwrap();
        service.save_progress(b).unwrap();

        let stats = service.student_stats("S1").unwrap();
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.total_score, 30);
        assert_eq!(stats.best_level, 4);

        let math = service.subject_stats("Math").unwrap();
        assert_eq!(math.games_played, 1);
        assert_eq!(math.total_score, 10);
    }
}
