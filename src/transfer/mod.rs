//! 进度迁移编解码模块
//!
//! 把一批进度记录封装为带版本号的 JSON 信封字符串，
//! 供剪贴板 / 二维码 / 文件分享三种通道复用；
//! 解码时校验信封结构与版本。
//!
//! 编解码与存储层解耦：信封只是字符串，传输方式可以任意替换。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::models::ProgressRecord;

/// 信封类型判别值
pub const ENVELOPE_TYPE: &str = "game_progress";

/// 当前信封版本
pub const ENVELOPE_VERSION: i64 = 1;

// ============================================================
// 错误类型定义
// ============================================================

/// 迁移编解码错误
///
/// 解析失败与结构不符是两类错误，调用方据此展示不同提示
/// （"剪贴板不是合法 JSON" vs "剪贴板里不是进度数据"）。
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("载荷不是合法的 JSON: {0}")]
    Parse(String),

    #[error("载荷不是进度数据: {0}")]
    Format(String),

    #[error("不支持的载荷版本: {0}")]
    UnsupportedVersion(i64),
}

// ============================================================
// TransferEnvelope - 迁移信封
// ============================================================

/// 迁移信封
///
/// 线上格式: `{"type":"game_progress","version":1,"data":[...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: i64,
    pub data: Vec<ProgressRecord>,
}

impl TransferEnvelope {
    /// 用当前版本包裹一批记录
    pub fn wrap(records: Vec<ProgressRecord>) -> Self {
        Self {
            kind: ENVELOPE_TYPE.to_string(),
            version: ENVELOPE_VERSION,
            data: records,
        }
    }
}

// ============================================================
// 编解码
// ============================================================

/// 序列化为信封字符串
///
/// 记录原样写入 data 数组，保证和 [`decode`] 无损往返。
pub fn encode(records: &[ProgressRecord]) -> Result<String, TransferError> {
    let envelope = TransferEnvelope::wrap(records.to_vec());

    serde_json::to_string(&envelope).map_err(|e| TransferError::Format(e.to_string()))
}

/// 解析并校验信封字符串
///
/// 校验顺序：JSON 合法性 → type 判别 → 版本 → data 结构。
/// 任何一步失败都整体拒绝，不做部分导入。
pub fn decode(text: &str) -> Result<Vec<ProgressRecord>, TransferError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| TransferError::Parse(e.to_string()))?;

    if value.get("type").and_then(Value::as_str) != Some(ENVELOPE_TYPE) {
        return Err(TransferError::Format(
            "type 字段缺失或不匹配".to_string(),
        ));
    }

    // 版本守卫：只接受识别的版本，未来版本明确报错而不是静默接受
    match value.get("version").and_then(Value::as_i64) {
        Some(ENVELOPE_VERSION) => {}
        Some(version) => return Err(TransferError::UnsupportedVersion(version)),
        None => return Err(TransferError::Format("version 字段缺失".to_string())),
    }

    let data = value
        .get("data")
        .cloned()
        .ok_or_else(|| TransferError::Format("data 字段缺失".to_string()))?;

    if !data.is_array() {
        return Err(TransferError::Format("data 字段不是数组".to_string()));
    }

    serde_json::from_value::<Vec<ProgressRecord>>(data)
        .map_err(|e| TransferError::Format(format!("记录结构不合法: {}", e)))
}

// ============================================================
// 测试
// ============================================================
