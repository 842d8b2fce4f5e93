//! StemQuest 进度核心库
//!
//! 面向 9/10 年级理科学习游戏应用的本地进度持久化与离线迁移核心：
//! - [`storage`]：SQLite 本地存储（进度表、迁移、仓库）
//! - [`service`]：面向界面层的进度领域服务
//! - [`transfer`]：设备间迁移信封的编解码
//!
//! 游戏屏幕、进度页、二维码 / 剪贴板 / 文件分享均为外部调用方：
//! 结算时调 [`service::ProgressService::save_progress`]，
//! 学生端导出走 [`service::ProgressService::export_student`] + [`transfer::encode`]，
//! 教师端导入走 [`transfer::decode`] + [`service::ProgressService::import_records`]。

pub mod service;
pub mod storage;
pub mod transfer;

pub use service::mirror::{MirrorConfig, ScoreMirror};
pub use service::{ProgressService, ServiceError, ServiceResult};
pub use storage::{
    ProgressRecord, ProgressRepository, ProgressStats, Storage, StorageError, StorageResult,
};
pub use transfer::{decode, encode, TransferEnvelope, TransferError};
